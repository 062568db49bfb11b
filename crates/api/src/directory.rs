//! In-memory directory of admin accounts backing the identity endpoints.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{OnceLock, PoisonError, RwLock};

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use serde::Deserialize;
use thiserror::Error;

use mall_auth::{LoginIdentifier, PrincipalRecord, RoleField, RoleName};
use mall_core::{DomainError, RoleId, ShopId, UserId};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Account registration input (also the seed file entry shape).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub password: String,
    pub role: RoleName,
    #[serde(default)]
    pub role_id: Option<RoleId>,
    #[serde(default)]
    pub shop_id: Option<ShopId>,
    #[serde(default = "enabled")]
    pub is_active: bool,
    #[serde(default)]
    pub is_email_verified: bool,
}

fn enabled() -> bool {
    true
}

impl NewAccount {
    pub fn new(email: &str, password: &str, role: RoleName) -> Self {
        Self {
            email: Some(email.to_string()),
            phone: None,
            name: None,
            password: password.to_string(),
            role,
            role_id: None,
            shop_id: None,
            is_active: true,
            is_email_verified: true,
        }
    }
}

#[derive(Debug, Clone)]
struct Account {
    id: UserId,
    email: Option<String>,
    phone: Option<String>,
    name: Option<String>,
    role: RoleName,
    role_id: Option<RoleId>,
    shop_id: Option<ShopId>,
    is_active: bool,
    is_email_verified: bool,
    password_hash: String,
}

impl Account {
    fn record(&self) -> PrincipalRecord {
        PrincipalRecord {
            id: self.id,
            role: RoleField::Record {
                id: self.role_id,
                name: self.role.as_str().to_string(),
            },
            shop_id: self.shop_id,
            is_active: self.is_active,
            is_email_verified: self.is_email_verified,
            email: self.email.clone(),
            phone: self.phone.clone(),
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct UserDirectory {
    accounts: RwLock<HashMap<UserId, Account>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let entries: Vec<NewAccount> = serde_json::from_str(&json)?;

        let directory = Self::new();
        for entry in entries {
            directory.register(entry)?;
        }
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn register(&self, account: NewAccount) -> Result<UserId, DirectoryError> {
        let email = account.email.as_deref().map(normalize_email).filter(|e| !e.is_empty());
        let phone = account
            .phone
            .as_deref()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        if email.is_none() && phone.is_none() {
            return Err(DomainError::validation("an email or phone is required").into());
        }
        if email.as_deref().is_some_and(|e| !e.contains('@')) {
            return Err(DomainError::validation("invalid email format").into());
        }
        if account.password.is_empty() {
            return Err(DomainError::validation("password cannot be empty").into());
        }

        let password_hash = hash_password(&account.password)?;

        let mut accounts = self.write();
        let taken = accounts.values().any(|a| {
            (email.is_some() && a.email == email) || (phone.is_some() && a.phone == phone)
        });
        if taken {
            return Err(DomainError::invariant("email or phone already registered").into());
        }

        let id = UserId::new();
        accounts.insert(
            id,
            Account {
                id,
                email,
                phone,
                name: account.name,
                role: account.role,
                role_id: account.role_id,
                shop_id: account.shop_id,
                is_active: account.is_active,
                is_email_verified: account.is_email_verified,
                password_hash,
            },
        );

        tracing::debug!(user = %id, "account registered");
        Ok(id)
    }

    /// Look up by identifier and check the password.
    ///
    /// Unknown identifiers still pay for one Argon2 verification, so response
    /// time does not reveal which accounts exist. Inactive accounts are
    /// returned as-is; the caller decides.
    pub fn authenticate(&self, identifier: &LoginIdentifier<'_>, password: &str) -> Option<PrincipalRecord> {
        let accounts = self.read();
        let account = accounts.values().find(|a| match identifier {
            LoginIdentifier::Email(email) => a.email.as_deref() == Some(normalize_email(email).as_str()),
            LoginIdentifier::Phone(phone) => a.phone.as_deref() == Some(phone.trim()),
        });

        match account {
            Some(account) => verify_password(&account.password_hash, password).then(|| account.record()),
            None => {
                verify_password(dummy_hash(), password);
                None
            }
        }
    }

    pub fn get(&self, id: UserId) -> Option<PrincipalRecord> {
        self.read().get(&id).map(Account::record)
    }

    pub fn set_active(&self, id: UserId, active: bool) -> Result<(), DirectoryError> {
        let mut accounts = self.write();
        let account = accounts.get_mut(&id).ok_or(DomainError::NotFound)?;
        account.is_active = active;
        Ok(())
    }

    pub fn set_role(&self, id: UserId, role: RoleName) -> Result<(), DirectoryError> {
        let mut accounts = self.write();
        let account = accounts.get_mut(&id).ok_or(DomainError::NotFound)?;
        account.role = role;
        account.role_id = None;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<UserId, Account>> {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<UserId, Account>> {
        self.accounts.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String, DirectoryError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| DirectoryError::Hash(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| DirectoryError::Hash(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DirectoryError::Hash(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Hash verified against when no account matches.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        hash_password("mall-admin-unmatched-login").unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not prepare dummy password hash");
            String::new()
        })
    })
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}
