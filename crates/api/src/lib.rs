//! HTTP API: identity endpoints and the portal's access-control views.

pub mod app;
pub mod config;
pub mod context;
pub mod directory;
pub mod middleware;
pub mod tokens;
