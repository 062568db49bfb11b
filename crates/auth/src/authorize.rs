use serde::Serialize;

use crate::{AuthError, Principal, RoleSet};

/// Decide whether `principal` may reach a unit guarded by `required`.
///
/// - No IO
/// - No panics
/// - Fail-closed: no principal, or an empty role set, is a denial
pub fn evaluate(principal: Option<&Principal>, required: &RoleSet) -> bool {
    match principal {
        Some(p) => required.allows(&p.role_name),
        None => false,
    }
}

/// [`evaluate`] for callers that want the denial as an error value.
pub fn require<'a>(
    principal: Option<&'a Principal>,
    required: &RoleSet,
) -> Result<&'a Principal, AuthError> {
    let Some(p) = principal else {
        return Err(AuthError::NotAuthenticated);
    };

    if evaluate(Some(p), required) {
        Ok(p)
    } else {
        tracing::debug!(role = %p.role_name, required = %required, "authorization denied");
        Err(AuthError::AuthorizationDenied {
            role: p.role_name.to_string(),
            required: required.to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
///
/// `granted` always equals what [`evaluate`] returns for the same input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub granted: bool,
    pub role: Option<String>,
    pub required: Vec<String>,
    pub reason: String,
    pub denial: Option<DenialKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    NoPrincipal,
    EmptyRoleSet,
    RoleNotPermitted,
}

/// Explain why an authorization decision was made (or would be made).
pub fn explain(principal: Option<&Principal>, required: &RoleSet) -> Explanation {
    let role = principal.map(|p| p.role_name.to_string());
    let required_names = required.names();

    let (granted, reason, denial) = match principal {
        None => (
            false,
            "No authenticated principal".to_string(),
            Some(DenialKind::NoPrincipal),
        ),
        Some(_) if required.is_empty() => (
            false,
            "No role is permitted on this unit".to_string(),
            Some(DenialKind::EmptyRoleSet),
        ),
        Some(p) if required.allows(&p.role_name) => (
            true,
            format!("Role '{}' is one of {}", p.role_name, required),
            None,
        ),
        Some(p) => (
            false,
            format!("Role '{}' is not one of {}", p.role_name, required),
            Some(DenialKind::RoleNotPermitted),
        ),
    };

    Explanation {
        granted,
        role,
        required: required_names,
        reason,
        denial,
    }
}
