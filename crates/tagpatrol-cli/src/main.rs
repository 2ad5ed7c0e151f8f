//! Tag Patrol CLI - checks cloud resource tags against declarative policies.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so reports on stdout stay machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagpatrol=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => commands::scan::run(&args).await,
        Commands::Validate(args) => commands::validate::run(&args),
        Commands::Version => {
            println!("TagPatrol version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
