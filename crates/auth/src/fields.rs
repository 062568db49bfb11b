//! Per-field gating for forms and row actions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Principal, RoleSet, evaluate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    /// Dotted key, `<screen>.<field>` (e.g. `product.shop_selector`).
    pub key: String,
    pub required_roles: RoleSet,
}

impl FieldRule {
    pub fn new(key: &str, required_roles: RoleSet) -> Self {
        Self {
            key: key.to_string(),
            required_roles,
        }
    }
}

/// Lookup table of field rules. Unknown keys are hidden.
#[derive(Debug, Clone, Default)]
pub struct FieldGates {
    rules: BTreeMap<String, RoleSet>,
}

impl FieldGates {
    pub fn new(rules: &[FieldRule]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|r| (r.key.clone(), r.required_roles.clone()))
                .collect(),
        }
    }

    pub fn is_visible(&self, key: &str, principal: Option<&Principal>) -> bool {
        self.rules
            .get(key)
            .is_some_and(|required| evaluate(principal, required))
    }

    pub fn visible(&self, principal: Option<&Principal>) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter(|(_, required)| evaluate(principal, required))
            .map(|(key, _)| key.clone())
            .collect()
    }
}
