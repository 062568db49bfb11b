//! `mall-auth`: access-control kernel of the mall admin portal.
//!
//! Pure policy (evaluation, menu filtering, route guarding, field gates) plus
//! the session resolver, which reaches the identity service and the persisted
//! credential only through the [`IdentityProvider`] and [`CredentialStore`]
//! traits. Decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod error;
pub mod fields;
pub mod guard;
pub mod identity;
pub mod layout;
pub mod navigation;
pub mod principal;
pub mod roles;
pub mod session;

pub use authorize::{DenialKind, Explanation, evaluate, explain, require};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use credentials::{CredentialStore, InMemoryCredentialStore};
pub use error::AuthError;
pub use fields::{FieldGates, FieldRule};
pub use guard::{GuardDecision, RouteGuard, RouteRule};
pub use identity::{Credentials, IdentityError, IdentityProvider, LoginIdentifier, LoginResponse};
pub use layout::{LayoutError, PortalLayout};
pub use navigation::{MenuGroup, MenuItem, MenuNode, expanded_group, filter_menu};
pub use principal::{Principal, PrincipalRecord, RoleField, ShopScope};
pub use roles::{RoleName, RoleSet};
pub use session::{SessionResolver, SessionState, SessionStatus};
