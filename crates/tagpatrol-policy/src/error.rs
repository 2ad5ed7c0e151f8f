//! Error types for policy loading and resolution.

use std::path::PathBuf;

use tagpatrol_core::ValidationErrors;
use thiserror::Error;

/// Result type alias for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Errors that can occur while turning a policy file into definitions.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// The policy file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    FileRead {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The policy is not well-formed YAML or does not fit the document shape.
    #[error("failed to decode YAML: {source}")]
    Decode {
        /// Underlying decoder error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The document decoded but violates structural rules.
    #[error("failed to validate policy: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl PolicyError {
    /// Returns the structural violations, if this is a validation failure.
    #[must_use]
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}
