//! Command-line front-end: argument parsing and command dispatch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use mall_auth::{
    Credentials, PortalLayout, PrincipalRecord, RouteGuard, SessionResolver, SessionState, expanded_group,
    filter_menu,
};

use crate::{FileCredentialStore, HttpIdentityProvider};

#[derive(Parser)]
#[command(name = "mall-console")]
#[command(about = "Mall admin portal from the terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the portal API
    #[arg(long, env = "MALL_API_URL", default_value = "http://127.0.0.1:8080", global = true)]
    pub api_url: String,

    /// JSON portal layout replacing the built-in one
    #[arg(long, env = "MALL_PORTAL_LAYOUT", global = true)]
    pub layout: Option<PathBuf>,

    /// Session token file (defaults to the user data directory)
    #[arg(long, env = "MALL_SESSION_FILE", global = true)]
    pub session_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and persist the session token
    Login {
        #[arg(long, conflicts_with = "phone", required_unless_present = "phone")]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long, env = "MALL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the persisted session
    Logout,

    /// Show the current principal
    Whoami,

    /// Print the menu visible to the current principal
    Menu {
        /// Current location, used to pick the expanded group
        #[arg(long)]
        path: Option<String>,
    },

    /// Ask the route guard whether a location may be opened
    Open { path: String },
}

pub type Resolver = SessionResolver<HttpIdentityProvider, FileCredentialStore>;

impl Cli {
    pub fn session_store(&self) -> anyhow::Result<FileCredentialStore> {
        match &self.session_file {
            Some(path) => Ok(FileCredentialStore::new(path)),
            None => FileCredentialStore::default_location(),
        }
    }
}

/// Run one command. Only `menu` and `open` read the portal layout.
pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let resolver = SessionResolver::new(HttpIdentityProvider::new(&cli.api_url), cli.session_store()?);

    match cli.command {
        Commands::Login { email, phone, password } => {
            let credentials = Credentials { email, phone, password };
            let principal = resolver.login(&credentials).await.context("login failed")?;
            print_json(&PrincipalRecord::from(principal.as_ref()))?;
        }
        Commands::Logout => {
            resolver.logout();
            println!("logged out");
        }
        Commands::Whoami => {
            let state = bootstrap(&resolver).await;
            let Some(principal) = state.principal() else {
                eprintln!("not logged in");
                return Ok(ExitCode::FAILURE);
            };
            print_json(&PrincipalRecord::from(principal))?;
        }
        Commands::Menu { path } => {
            let layout = load_layout(cli.layout.as_deref())?;
            let state = bootstrap(&resolver).await;
            let menu = filter_menu(&layout.menu, state.principal());
            let expanded = path.as_deref().and_then(|p| expanded_group(&menu, p));
            print_json(&serde_json::json!({ "menu": menu, "expanded": expanded }))?;
        }
        Commands::Open { path } => {
            let layout = load_layout(cli.layout.as_deref())?;
            let guard = RouteGuard::from_layout(&layout).context("portal layout is invalid")?;
            let state = bootstrap(&resolver).await;
            let decision = guard.check(&path, &state);
            print_json(&decision)?;
            if !decision.is_allowed() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_layout(path: Option<&Path>) -> anyhow::Result<PortalLayout> {
    match path {
        Some(path) => PortalLayout::load(path)
            .with_context(|| format!("failed to load portal layout from {}", path.display())),
        None => Ok(PortalLayout::mall_admin()),
    }
}

async fn bootstrap(resolver: &Resolver) -> SessionState {
    let state = resolver.bootstrap().await;
    tracing::debug!(status = ?state.status(), "session bootstrapped");
    state
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
