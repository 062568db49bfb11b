use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use mall_auth::{GuardDecision, MenuNode, ShopScope};

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MenuQuery {
    /// Current location; used to pick the group rendered expanded.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MenuResponse {
    pub menu: Vec<MenuNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub path: String,
    #[serde(flatten)]
    pub decision: GuardDecision,
}

#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    pub role: String,
    pub fields: BTreeSet<String>,
    pub shop_scope: ShopScope,
}
