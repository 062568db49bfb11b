//! Console client for the mall admin portal.
//!
//! Drives the same session, navigation and routing kernel as the web shell,
//! against a running `mall-api`.

pub mod cli;
pub mod http;
pub mod store;

pub use http::HttpIdentityProvider;
pub use store::FileCredentialStore;
