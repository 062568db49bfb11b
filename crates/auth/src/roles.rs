use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use mall_core::DomainError;

/// Role name used for RBAC.
///
/// The built-in portal roles are closed variants. Any other non-blank name is
/// an administrator-defined role and lands in [`RoleName::Custom`]; parsing is
/// exact-case, so `"superadmin"` is a custom role and never `SuperAdmin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoleName {
    SuperAdmin,
    MallAdmin,
    ShopAdmin,
    Finance,
    Sales,
    Custom(String),
}

impl RoleName {
    pub fn parse(name: &str) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("role name cannot be blank"));
        }

        Ok(match name {
            "superAdmin" => RoleName::SuperAdmin,
            "mallAdmin" => RoleName::MallAdmin,
            "shopAdmin" => RoleName::ShopAdmin,
            "Finance" => RoleName::Finance,
            "Sales" => RoleName::Sales,
            other => RoleName::Custom(other.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            RoleName::SuperAdmin => "superAdmin",
            RoleName::MallAdmin => "mallAdmin",
            RoleName::ShopAdmin => "shopAdmin",
            RoleName::Finance => "Finance",
            RoleName::Sales => "Sales",
            RoleName::Custom(name) => name,
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, RoleName::Custom(_))
    }
}

impl core::str::FromStr for RoleName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoleName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.as_str().to_string()
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of roles allowed to reach a navigable unit.
///
/// Membership is exact; there is no hierarchy. An empty set allows nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<RoleName>);

impl RoleSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn of(roles: impl IntoIterator<Item = RoleName>) -> Self {
        roles.into_iter().collect()
    }

    pub fn allows(&self, role: &RoleName) -> bool {
        self.0.contains(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleName> {
        self.0.iter()
    }

    /// Role names as wire strings, in set order.
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|r| r.as_str().to_string()).collect()
    }
}

impl FromIterator<RoleName> for RoleSet {
    fn from_iter<T: IntoIterator<Item = RoleName>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl core::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("[")?;
        for (i, role) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(role.as_str())?;
        }
        f.write_str("]")
    }
}
