//! Menu declaration and the role-filtered view of it.

use serde::{Deserialize, Serialize};

use crate::{Principal, RoleSet, evaluate};

/// A single navigable menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub path: String,
    pub label: String,
    pub required_roles: RoleSet,
}

/// A labelled group of menu entries.
///
/// The group's own rule, when declared, gates the whole group; children are
/// gated independently on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuGroup {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<RoleSet>,
    pub children: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuNode {
    Item(MenuItem),
    Group(MenuGroup),
}

impl MenuNode {
    pub fn item(path: &str, label: &str, required_roles: RoleSet) -> Self {
        MenuNode::Item(MenuItem {
            path: path.to_string(),
            label: label.to_string(),
            required_roles,
        })
    }

    pub fn group(label: &str, required_roles: Option<RoleSet>, children: Vec<MenuItem>) -> Self {
        MenuNode::Group(MenuGroup {
            label: label.to_string(),
            required_roles,
            children,
        })
    }

    pub fn label(&self) -> &str {
        match self {
            MenuNode::Item(item) => &item.label,
            MenuNode::Group(group) => &group.label,
        }
    }
}

/// Produce the part of `tree` that `principal` may see.
///
/// Declaration order is preserved. Groups left without visible children are
/// dropped, so an absent principal always gets an empty menu.
pub fn filter_menu(tree: &[MenuNode], principal: Option<&Principal>) -> Vec<MenuNode> {
    let mut visible = Vec::with_capacity(tree.len());

    for node in tree {
        match node {
            MenuNode::Item(item) => {
                if evaluate(principal, &item.required_roles) {
                    visible.push(node.clone());
                }
            }
            MenuNode::Group(group) => {
                if let Some(required) = &group.required_roles {
                    if !evaluate(principal, required) {
                        continue;
                    }
                }

                let children: Vec<MenuItem> = group
                    .children
                    .iter()
                    .filter(|c| evaluate(principal, &c.required_roles))
                    .cloned()
                    .collect();

                if !children.is_empty() {
                    visible.push(MenuNode::Group(MenuGroup {
                        label: group.label.clone(),
                        required_roles: group.required_roles.clone(),
                        children,
                    }));
                }
            }
        }
    }

    tracing::debug!(
        role = principal.map(|p| p.role_name.as_str()).unwrap_or("<none>"),
        declared = tree.len(),
        visible = visible.len(),
        "menu filtered"
    );

    visible
}

/// Label of the group holding the entry for `current_path`, if any.
///
/// Presentation only: decides which group renders expanded.
pub fn expanded_group<'a>(menu: &'a [MenuNode], current_path: &str) -> Option<&'a str> {
    menu.iter().find_map(|node| match node {
        MenuNode::Group(group) if group.children.iter().any(|c| is_active(&c.path, current_path)) => {
            Some(group.label.as_str())
        }
        _ => None,
    })
}

fn is_active(item_path: &str, current_path: &str) -> bool {
    current_path == item_path
        || current_path
            .strip_prefix(item_path)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorize::tests::principal;
    use crate::{PortalLayout, RoleName};
    use proptest::prelude::*;

    fn labels(menu: &[MenuNode]) -> Vec<&str> {
        menu.iter().map(|n| n.label()).collect()
    }

    fn item(path: &str, roles: &[RoleName]) -> MenuItem {
        MenuItem {
            path: path.to_string(),
            label: path.trim_start_matches('/').to_string(),
            required_roles: RoleSet::of(roles.iter().cloned()),
        }
    }

    #[test]
    fn finance_does_not_see_shops() {
        let tree = vec![
            MenuNode::item(
                "/shops",
                "Shops",
                RoleSet::of([RoleName::SuperAdmin, RoleName::MallAdmin, RoleName::Sales]),
            ),
            MenuNode::item("/plans", "Plans", RoleSet::of([RoleName::Finance])),
        ];

        let finance = principal(RoleName::Finance);
        let visible = filter_menu(&tree, Some(&finance));

        assert_eq!(labels(&visible), vec!["Plans"]);
    }

    #[test]
    fn absent_principal_sees_nothing() {
        let layout = PortalLayout::mall_admin();
        assert!(filter_menu(&layout.menu, None).is_empty());
    }

    #[test]
    fn group_without_visible_children_is_dropped() {
        let tree = vec![
            MenuNode::group(
                "Access",
                None,
                vec![item("/users", &[RoleName::SuperAdmin]), item("/roles", &[RoleName::SuperAdmin])],
            ),
            MenuNode::item("/dashboard", "Dashboard", RoleSet::of([RoleName::Sales])),
        ];

        let sales = principal(RoleName::Sales);
        assert_eq!(labels(&filter_menu(&tree, Some(&sales))), vec!["Dashboard"]);
    }

    #[test]
    fn group_rule_short_circuits_children() {
        let tree = vec![MenuNode::group(
            "Billing",
            Some(RoleSet::of([RoleName::Finance])),
            vec![item("/plans", &[RoleName::Finance, RoleName::Sales])],
        )];

        let sales = principal(RoleName::Sales);
        assert!(filter_menu(&tree, Some(&sales)).is_empty());

        let finance = principal(RoleName::Finance);
        assert_eq!(filter_menu(&tree, Some(&finance)).len(), 1);
    }

    #[test]
    fn children_keep_declaration_order() {
        let tree = vec![MenuNode::group(
            "Mall",
            None,
            vec![
                item("/zeta", &[RoleName::MallAdmin]),
                item("/hidden", &[RoleName::SuperAdmin]),
                item("/alpha", &[RoleName::MallAdmin]),
            ],
        )];

        let mall_admin = principal(RoleName::MallAdmin);
        let visible = filter_menu(&tree, Some(&mall_admin));
        let MenuNode::Group(group) = &visible[0] else {
            panic!("expected group");
        };
        let paths: Vec<&str> = group.children.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["/zeta", "/alpha"]);
    }

    #[test]
    fn expanded_group_tracks_nested_paths() {
        let layout = PortalLayout::mall_admin();
        let admin = principal(RoleName::SuperAdmin);
        let visible = filter_menu(&layout.menu, Some(&admin));

        assert_eq!(expanded_group(&visible, "/shops/42"), Some("Mall"));
        assert_eq!(expanded_group(&visible, "/shopsx"), None);
        assert_eq!(expanded_group(&visible, "/dashboard"), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: filtering is idempotent and never yields an empty group.
        #[test]
        fn filtering_is_stable_and_drops_empty_groups(
            role_idx in 0usize..5,
            present in any::<bool>(),
        ) {
            let roles = [
                RoleName::SuperAdmin,
                RoleName::MallAdmin,
                RoleName::ShopAdmin,
                RoleName::Finance,
                RoleName::Sales,
            ];
            let layout = PortalLayout::mall_admin();
            let p = principal(roles[role_idx].clone());
            let subject = present.then_some(&p);

            let first = filter_menu(&layout.menu, subject);
            let second = filter_menu(&layout.menu, subject);
            prop_assert_eq!(&first, &second);

            // Filtering an already filtered view changes nothing.
            prop_assert_eq!(filter_menu(&first, subject), first.clone());

            for node in &first {
                if let MenuNode::Group(group) = node {
                    prop_assert!(!group.children.is_empty());
                }
            }
        }
    }
}
