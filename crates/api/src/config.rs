//! Service configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `MALL_BIND_ADDR`, default `0.0.0.0:8080`.
    pub bind_addr: SocketAddr,
    /// `MALL_JWT_SECRET`; falls back to an insecure dev secret with a warning.
    pub jwt_secret: String,
    /// `MALL_TOKEN_TTL_MINUTES`, default 480.
    pub token_ttl_minutes: i64,
    /// `MALL_SEED_FILE`: JSON list of accounts loaded into the directory.
    pub seed_file: Option<PathBuf>,
    /// `MALL_PORTAL_LAYOUT`: JSON layout replacing the built-in one.
    pub layout_file: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_minutes: 480,
            seed_file: None,
            layout_file: None,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = Self::default();

        if let Some(addr) = lookup("MALL_BIND_ADDR") {
            cfg.bind_addr = addr
                .parse()
                .with_context(|| format!("MALL_BIND_ADDR is not a socket address: {addr}"))?;
        }

        match lookup("MALL_JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => cfg.jwt_secret = secret,
            None => tracing::warn!("MALL_JWT_SECRET not set; using insecure dev default"),
        }

        if let Some(ttl) = lookup("MALL_TOKEN_TTL_MINUTES") {
            cfg.token_ttl_minutes = ttl
                .parse()
                .with_context(|| format!("MALL_TOKEN_TTL_MINUTES is not an integer: {ttl}"))?;
            anyhow::ensure!(cfg.token_ttl_minutes > 0, "MALL_TOKEN_TTL_MINUTES must be positive");
        }

        cfg.seed_file = lookup("MALL_SEED_FILE").map(PathBuf::from);
        cfg.layout_file = lookup("MALL_PORTAL_LAYOUT").map(PathBuf::from);

        Ok(cfg)
    }
}
