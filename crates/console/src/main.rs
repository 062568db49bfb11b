// Console front-end for the mall admin portal.

use std::process::ExitCode;

use clap::Parser;

use mall_console::cli::{self, Cli};
use mall_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    mall_observability::logging::init(LogFormat::Pretty, if cli.verbose { "debug" } else { "warn" });

    cli::run(cli).await
}
