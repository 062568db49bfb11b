//! `mall-core`: shared identifiers and the domain error model.
//!
//! This crate contains **pure** primitives (no transport or storage concerns).

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{RoleId, ShopId, UserId};
