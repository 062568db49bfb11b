//! Static portal layout: menu, route table and field gates.
//!
//! A layout is declared once at startup (built-in or loaded from JSON) and is
//! never mutated afterwards. [`PortalLayout::validate`] enforces that every
//! protected unit names at least one role.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::guard::RoutePattern;
use crate::{FieldRule, MenuItem, MenuNode, RoleName, RoleSet, RouteRule};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("'{0}' declares an empty role set")]
    EmptyRoleSet(String),

    #[error("route '{0}' is declared more than once")]
    DuplicateRoute(String),

    #[error("invalid path pattern '{0}'")]
    InvalidPath(String),

    #[error("failed to read layout: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse layout: {0}")]
    Parse(#[from] serde_json::Error),
}

fn default_redirect_after_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalLayout {
    pub login_path: String,
    pub landing_path: String,
    #[serde(default = "default_redirect_after_ms")]
    pub denied_redirect_after_ms: u64,
    pub menu: Vec<MenuNode>,
    pub routes: Vec<RouteRule>,
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

impl PortalLayout {
    pub fn from_json_str(json: &str) -> Result<Self, LayoutError> {
        let layout: Self = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        RoutePattern::parse(&self.login_path)?;
        RoutePattern::parse(&self.landing_path)?;

        for node in &self.menu {
            match node {
                MenuNode::Item(item) => validate_item(item)?,
                MenuNode::Group(group) => {
                    if group.required_roles.as_ref().is_some_and(RoleSet::is_empty) {
                        return Err(LayoutError::EmptyRoleSet(group.label.clone()));
                    }
                    for child in &group.children {
                        validate_item(child)?;
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        for route in &self.routes {
            RoutePattern::parse(&route.path)?;
            if route.required_roles.as_ref().is_some_and(RoleSet::is_empty) {
                return Err(LayoutError::EmptyRoleSet(route.path.clone()));
            }
            if !seen.insert(route.path.as_str()) {
                return Err(LayoutError::DuplicateRoute(route.path.clone()));
            }
        }

        for field in &self.fields {
            if field.required_roles.is_empty() {
                return Err(LayoutError::EmptyRoleSet(field.key.clone()));
            }
        }

        Ok(())
    }

    /// Built-in layout of the mall admin portal.
    pub fn mall_admin() -> Self {
        use RoleName::*;

        let everyone = || RoleSet::of([SuperAdmin, MallAdmin, ShopAdmin, Finance, Sales]);
        let admins = || RoleSet::of([SuperAdmin, MallAdmin]);
        let shops = || RoleSet::of([SuperAdmin, MallAdmin, Sales]);
        let catalogue = || RoleSet::of([SuperAdmin, MallAdmin, ShopAdmin]);
        let billing = || RoleSet::of([SuperAdmin, MallAdmin, Finance]);
        let root = || RoleSet::of([SuperAdmin]);

        let item = |path: &str, label: &str, roles: RoleSet| MenuItem {
            path: path.to_string(),
            label: label.to_string(),
            required_roles: roles,
        };

        let menu = vec![
            MenuNode::item("/dashboard", "Dashboard", everyone()),
            MenuNode::group(
                "Mall",
                None,
                vec![
                    item("/shops", "Shops", shops()),
                    item("/categories", "Categories", admins()),
                    item("/products", "Products", catalogue()),
                ],
            ),
            MenuNode::group(
                "Access",
                Some(admins()),
                vec![item("/users", "Users", admins()), item("/roles", "Roles & Permissions", root())],
            ),
            MenuNode::group(
                "Billing",
                None,
                vec![
                    item("/plans", "Subscription Plans", RoleSet::of([SuperAdmin, Finance])),
                    item("/reports", "Reports", billing()),
                ],
            ),
            MenuNode::group(
                "Content",
                None,
                vec![item("/ads", "Advertisements", shops()), item("/pages", "Pages", admins())],
            ),
            MenuNode::group(
                "Inbox",
                None,
                vec![
                    item("/contacts", "Contact Forms", admins()),
                    item("/requests", "Requests", shops()),
                ],
            ),
        ];

        let routes = vec![
            RouteRule::restricted("/dashboard", everyone()),
            RouteRule::open("/profile"),
            RouteRule::restricted("/shops", shops()),
            RouteRule::restricted("/shops/new", admins()),
            RouteRule::restricted("/shops/:id", shops()),
            RouteRule::restricted("/categories", admins()),
            RouteRule::restricted("/categories/:id", admins()),
            RouteRule::restricted("/products", catalogue()),
            RouteRule::restricted("/products/:id", catalogue()),
            RouteRule::restricted("/users", admins()),
            RouteRule::restricted("/users/:id", admins()),
            RouteRule::restricted("/roles", root()),
            RouteRule::restricted("/roles/:id", root()),
            RouteRule::restricted("/plans", RoleSet::of([SuperAdmin, Finance])),
            RouteRule::restricted("/plans/:id", RoleSet::of([SuperAdmin, Finance])),
            RouteRule::restricted("/reports", billing()),
            RouteRule::restricted("/ads", shops()),
            RouteRule::restricted("/ads/:id", shops()),
            RouteRule::restricted("/pages", admins()),
            RouteRule::restricted("/pages/:id", admins()),
            RouteRule::restricted("/contacts", admins()),
            RouteRule::restricted("/requests", shops()),
            RouteRule::restricted("/requests/:id", shops()),
        ];

        let fields = vec![
            FieldRule::new("product.shop_selector", admins()),
            FieldRule::new("user.role_selector", root()),
            FieldRule::new("shop.subscription_plan", billing()),
            FieldRule::new("shop.verification_toggle", admins()),
            FieldRule::new("report.export", billing()),
            FieldRule::new("request.assign", shops()),
        ];

        Self {
            login_path: "/login".to_string(),
            landing_path: "/dashboard".to_string(),
            denied_redirect_after_ms: default_redirect_after_ms(),
            menu,
            routes,
            fields,
        }
    }
}

fn validate_item(item: &MenuItem) -> Result<(), LayoutError> {
    RoutePattern::parse(&item.path)?;
    if item.required_roles.is_empty() {
        return Err(LayoutError::EmptyRoleSet(item.path.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_layout_is_valid() {
        PortalLayout::mall_admin().validate().unwrap();
    }

    #[test]
    fn layout_survives_json() {
        let layout = PortalLayout::mall_admin();
        let json = serde_json::to_string_pretty(&layout).unwrap();
        assert_eq!(PortalLayout::from_json_str(&json).unwrap(), layout);
    }

    #[test]
    fn empty_role_set_on_menu_item_is_rejected() {
        let json = r#"{
            "loginPath": "/login",
            "landingPath": "/dashboard",
            "menu": [{ "kind": "item", "path": "/shops", "label": "Shops", "requiredRoles": [] }],
            "routes": []
        }"#;

        let err = PortalLayout::from_json_str(json).unwrap_err();
        assert!(matches!(err, LayoutError::EmptyRoleSet(ref unit) if unit == "/shops"));
    }

    #[test]
    fn duplicate_route_is_rejected() {
        let mut layout = PortalLayout::mall_admin();
        layout.routes.push(RouteRule::open("/profile"));
        assert!(matches!(layout.validate(), Err(LayoutError::DuplicateRoute(_))));
    }

    #[test]
    fn redirect_delay_defaults_when_omitted() {
        let json = r#"{ "loginPath": "/login", "landingPath": "/", "menu": [], "routes": [] }"#;
        let layout = PortalLayout::from_json_str(json).unwrap();
        assert_eq!(layout.denied_redirect_after_ms, 3000);
        assert!(layout.fields.is_empty());
    }
}
