//! Route guarding: one decision per navigation attempt.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DenialKind, Explanation, LayoutError, PortalLayout, Principal, RoleSet, SessionState, evaluate, explain};

/// A route declaration.
///
/// `required_roles: None` opens the route to any resolved principal; an
/// explicit set restricts it to those roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRule {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<RoleSet>,
}

impl RouteRule {
    pub fn open(path: &str) -> Self {
        Self {
            path: path.to_string(),
            required_roles: None,
        }
    }

    pub fn restricted(path: &str, required_roles: RoleSet) -> Self {
        Self {
            path: path.to_string(),
            required_roles: Some(required_roles),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param,
}

/// Compiled path pattern (`/shops/:id`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self, LayoutError> {
        let invalid = || LayoutError::InvalidPath(pattern.to_string());

        let rest = pattern.strip_prefix('/').ok_or_else(invalid)?;
        if rest.is_empty() {
            return Ok(Self { segments: Vec::new() });
        }

        let mut segments = Vec::new();
        for raw in rest.split('/') {
            let segment = match raw.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Param,
                Some(_) => return Err(invalid()),
                None if raw.is_empty() => return Err(invalid()),
                None => Segment::Static(raw.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts = split_path(path);
        parts.len() == self.segments.len()
            && self.segments.iter().zip(&parts).all(|(seg, part)| match seg {
                Segment::Static(s) => s == part,
                Segment::Param => !part.is_empty(),
            })
    }

    /// Number of literal segments; more specific patterns win.
    fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Static(_)))
            .count()
    }
}

/// Split a location into path segments, dropping query/fragment and a trailing slash.
fn split_path(path: &str) -> Vec<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_start_matches('/').trim_end_matches('/');
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

/// Outcome of guarding a single navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Principal resolution is still in flight; render a neutral placeholder.
    Loading,
    /// No principal: send the user to the login route.
    RedirectToLogin { to: String },
    /// Principal lacks the role: show access denied, then redirect.
    Denied { redirect_to: String, after_ms: u64 },
    Allowed { route: String },
    /// No route is declared for this location.
    NotFound,
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allowed { .. })
    }
}

/// Route guard built from a static route table.
///
/// Holds no per-principal state; every call recomputes the verdict.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    routes: Vec<(RoutePattern, RouteRule)>,
    login_path: String,
    landing_path: String,
    denied_redirect_after: Duration,
}

impl RouteGuard {
    pub fn from_layout(layout: &PortalLayout) -> Result<Self, LayoutError> {
        let routes = layout
            .routes
            .iter()
            .map(|rule| Ok((RoutePattern::parse(&rule.path)?, rule.clone())))
            .collect::<Result<Vec<_>, LayoutError>>()?;

        Ok(Self {
            routes,
            login_path: layout.login_path.clone(),
            landing_path: layout.landing_path.clone(),
            denied_redirect_after: Duration::from_millis(layout.denied_redirect_after_ms),
        })
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    /// Most specific rule matching `path`; declaration order breaks ties.
    pub fn route_for(&self, path: &str) -> Option<&RouteRule> {
        let mut best: Option<(&RoutePattern, &RouteRule)> = None;
        for (pattern, rule) in &self.routes {
            if !pattern.matches(path) {
                continue;
            }
            match best {
                Some((b, _)) if b.specificity() >= pattern.specificity() => {}
                _ => best = Some((pattern, rule)),
            }
        }
        best.map(|(_, rule)| rule)
    }

    pub fn check(&self, path: &str, session: &SessionState) -> GuardDecision {
        let principal = match session {
            SessionState::Loading => return GuardDecision::Loading,
            SessionState::Absent => {
                return GuardDecision::RedirectToLogin {
                    to: self.login_path.clone(),
                };
            }
            SessionState::Resolved(p) => p,
        };

        let Some(rule) = self.route_for(path) else {
            tracing::debug!(path, "no route declared");
            return GuardDecision::NotFound;
        };

        let allowed = match &rule.required_roles {
            None => true,
            Some(required) => evaluate(Some(principal), required),
        };

        if allowed {
            GuardDecision::Allowed {
                route: rule.path.clone(),
            }
        } else {
            tracing::info!(path, role = %principal.role_name, "route access denied");
            GuardDecision::Denied {
                redirect_to: self.landing_path.clone(),
                after_ms: self.denied_redirect_after.as_millis() as u64,
            }
        }
    }

    /// Explain the route rule for `path`; `None` when no route matches.
    pub fn explain(&self, path: &str, principal: Option<&Principal>) -> Option<Explanation> {
        let rule = self.route_for(path)?;

        Some(match (&rule.required_roles, principal) {
            (Some(required), _) => explain(principal, required),
            (None, Some(p)) => Explanation {
                granted: true,
                role: Some(p.role_name.to_string()),
                required: Vec::new(),
                reason: "Route is open to any authenticated principal".to_string(),
                denial: None,
            },
            (None, None) => Explanation {
                granted: false,
                role: None,
                required: Vec::new(),
                reason: "No authenticated principal".to_string(),
                denial: Some(DenialKind::NoPrincipal),
            },
        })
    }
}
