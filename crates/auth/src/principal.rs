use serde::{Deserialize, Serialize};

use mall_core::{DomainError, RoleId, ShopId, UserId};

use crate::RoleName;

/// A fully resolved principal for authorization decisions.
///
/// Built once per session at the identity boundary (see [`PrincipalRecord`])
/// and shared as an immutable snapshot afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    /// Present when the identity service reports the role as a record.
    pub role_id: Option<RoleId>,
    pub role_name: RoleName,
    pub shop_id: Option<ShopId>,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
}

/// The `role` attribute as the identity service sends it.
///
/// Older endpoints populate the role document (`{ "_id": .., "name": .. }`),
/// others send the bare name. Both collapse into a single [`RoleName`] when the
/// record becomes a [`Principal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleField {
    Record {
        #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
        id: Option<RoleId>,
        name: String,
    },
    Name(String),
}

impl RoleField {
    pub fn name(&self) -> &str {
        match self {
            RoleField::Record { name, .. } => name,
            RoleField::Name(name) => name,
        }
    }

    pub fn id(&self) -> Option<RoleId> {
        match self {
            RoleField::Record { id, .. } => *id,
            RoleField::Name(_) => None,
        }
    }
}

/// Principal as exchanged with the identity endpoint (`GET /auth/me`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalRecord {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub role: RoleField,
    #[serde(default, alias = "shop", skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<ShopId>,
    /// Missing flags read as `false`.
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TryFrom<PrincipalRecord> for Principal {
    type Error = DomainError;

    /// Normalize an identity record into a principal.
    ///
    /// Rejects blank role names and inactive accounts; neither may take part in
    /// an authorization decision.
    fn try_from(record: PrincipalRecord) -> Result<Self, Self::Error> {
        let role_name = RoleName::parse(record.role.name())?;

        if !record.is_active {
            return Err(DomainError::invariant("account is inactive"));
        }

        Ok(Self {
            id: record.id,
            role_id: record.role.id(),
            role_name,
            shop_id: record.shop_id,
            is_active: record.is_active,
            is_email_verified: record.is_email_verified,
            email: record.email,
            phone: record.phone,
            name: record.name,
        })
    }
}

impl From<&Principal> for PrincipalRecord {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.id,
            role: RoleField::Record {
                id: p.role_id,
                name: p.role_name.as_str().to_string(),
            },
            shop_id: p.shop_id,
            is_active: p.is_active,
            is_email_verified: p.is_email_verified,
            email: p.email.clone(),
            phone: p.phone.clone(),
            name: p.name.clone(),
        }
    }
}

/// Which shops' records a principal may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "shopId", rename_all = "snake_case")]
pub enum ShopScope {
    All,
    Own(ShopId),
    Nothing,
}

impl ShopScope {
    /// Mall-level roles see every shop; shop admins and custom roles are
    /// confined to their own shop, or to nothing when they have none.
    pub fn for_principal(principal: Option<&Principal>) -> Self {
        let Some(p) = principal else {
            return ShopScope::Nothing;
        };

        match p.role_name {
            RoleName::SuperAdmin | RoleName::MallAdmin | RoleName::Finance | RoleName::Sales => {
                ShopScope::All
            }
            RoleName::ShopAdmin | RoleName::Custom(_) => {
                p.shop_id.map(ShopScope::Own).unwrap_or(ShopScope::Nothing)
            }
        }
    }

    pub fn permits(&self, shop_id: ShopId) -> bool {
        match self {
            ShopScope::All => true,
            ShopScope::Own(own) => *own == shop_id,
            ShopScope::Nothing => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(role: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "_id": UserId::new().to_string(),
            "role": role,
            "isActive": true,
            "isEmailVerified": true,
            "email": "ops@mall.example",
        })
    }

    #[test]
    fn role_object_and_string_normalize_to_same_name() {
        let role_id = RoleId::new();
        let as_object: PrincipalRecord = serde_json::from_value(record_json(
            serde_json::json!({ "_id": role_id.to_string(), "name": "Finance" }),
        ))
        .unwrap();
        let as_string: PrincipalRecord =
            serde_json::from_value(record_json(serde_json::json!("Finance"))).unwrap();

        let a = Principal::try_from(as_object).unwrap();
        let b = Principal::try_from(as_string).unwrap();

        assert_eq!(a.role_name, RoleName::Finance);
        assert_eq!(b.role_name, RoleName::Finance);
        assert_eq!(a.role_id, Some(role_id));
        assert_eq!(b.role_id, None);
    }

    #[test]
    fn inactive_account_is_rejected() {
        let mut json = record_json(serde_json::json!("superAdmin"));
        json["isActive"] = serde_json::json!(false);
        let record: PrincipalRecord = serde_json::from_value(json).unwrap();

        let err = Principal::try_from(record).unwrap_err();
        assert!(err.to_string().contains("inactive"));
    }

    #[test]
    fn missing_active_flag_reads_as_inactive() {
        let mut json = record_json(serde_json::json!("superAdmin"));
        json.as_object_mut().unwrap().remove("isActive");
        let record: PrincipalRecord = serde_json::from_value(json).unwrap();

        assert!(Principal::try_from(record).is_err());
    }

    #[test]
    fn blank_role_is_rejected() {
        let record: PrincipalRecord =
            serde_json::from_value(record_json(serde_json::json!({ "name": "  " }))).unwrap();
        assert!(matches!(
            Principal::try_from(record),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn shop_scope_follows_role() {
        let shop = ShopId::new();
        let record: PrincipalRecord =
            serde_json::from_value(record_json(serde_json::json!("shopAdmin"))).unwrap();
        let mut p = Principal::try_from(record).unwrap();

        assert_eq!(ShopScope::for_principal(Some(&p)), ShopScope::Nothing);

        p.shop_id = Some(shop);
        let scope = ShopScope::for_principal(Some(&p));
        assert_eq!(scope, ShopScope::Own(shop));
        assert!(scope.permits(shop));
        assert!(!scope.permits(ShopId::new()));

        p.role_name = RoleName::MallAdmin;
        assert!(ShopScope::for_principal(Some(&p)).permits(ShopId::new()));

        assert_eq!(ShopScope::for_principal(None), ShopScope::Nothing);
    }
}
