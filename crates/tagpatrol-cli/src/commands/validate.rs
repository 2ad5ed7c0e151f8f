//! Validate command implementation.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use tagpatrol_core::{ResourceDefinition, StringCheck, Validation};
use tagpatrol_policy::PolicyParser;

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the tag policy file
    #[arg(short, long, env = "TAGPATROL_POLICY")]
    pub policy: PathBuf,

    /// Show the resolved policy of every definition
    #[arg(short, long)]
    pub verbose: bool,
}

/// Runs the validate command.
pub fn run(args: &ValidateArgs) -> Result<()> {
    info!(path = ?args.policy, "Validating policy");

    let definitions = PolicyParser::new()
        .parse_file(&args.policy)
        .with_context(|| format!("Invalid policy {}", args.policy.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Tag Patrol Policy Validator")?;
    writeln!(out, "===========================")?;
    writeln!(out, "Path: {}", args.policy.display())?;
    writeln!(out)?;

    for definition in &definitions {
        describe(definition, args.verbose, &mut out)?;
    }

    writeln!(out, "\nValidated {} resource definitions", definitions.len())?;
    Ok(())
}

fn describe(definition: &ResourceDefinition, verbose: bool, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "✓ {definition}")?;
    if !verbose {
        return Ok(());
    }

    let policy = &definition.policy;
    if !policy.mandatory_keys.is_empty() {
        writeln!(out, "  Mandatory keys: {}", policy.mandatory_keys.join(", "))?;
    }
    for (key, validation) in &policy.validations {
        writeln!(out, "  Validation {key}: {}", validation_summary(validation))?;
    }
    for (i, rule) in policy.rules.iter().enumerate() {
        writeln!(out, "  Rule {}: when {}", i + 1, rule.when)?;
    }
    Ok(())
}

fn validation_summary(validation: &Validation) -> String {
    match validation {
        Validation::String(StringCheck::Any) | Validation::Bool => {
            validation.type_name().to_string()
        }
        Validation::String(StringCheck::OneOf(values)) => {
            format!("string in [{}]", values.join(", "))
        }
        Validation::String(StringCheck::Pattern(regex)) => {
            format!("string matching /{}/", regex.as_str())
        }
        Validation::Int(check) => {
            let mut summary = String::from("int");
            if let Some(min) = check.min {
                summary.push_str(&format!(" >= {min}"));
            }
            if let Some(max) = check.max {
                summary.push_str(&format!(" <= {max}"));
            }
            if !check.allowed.is_empty() {
                summary.push_str(&format!(" in [{}]", check.allowed.join(", ")));
            }
            summary
        }
    }
}
