//! CLI commands and argument parsing.

pub mod scan;
pub mod validate;

use clap::{Parser, Subcommand};

/// Tag Patrol - Tag Compliance Checker for Cloud Resources
#[derive(Parser)]
#[command(name = "tagpatrol")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Scan resources against a tag policy
    Scan(scan::ScanArgs),

    /// Validate a tag policy without scanning
    Validate(validate::ValidateArgs),

    /// Print version information
    Version,
}
