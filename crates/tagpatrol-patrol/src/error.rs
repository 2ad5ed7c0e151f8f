//! Error types for the patrol crate.
//!
//! Compliance findings are never errors. The errors here cover resource
//! discovery, policy loading and the two ways a run can end early.

use std::path::PathBuf;
use std::sync::Arc;

use tagpatrol_policy::PolicyError;
use thiserror::Error;

use crate::scan::ScanResult;

/// Result type alias for patrol operations.
pub type Result<T> = std::result::Result<T, PatrolError>;

/// Errors that can end a scan run.
#[derive(Error, Debug)]
pub enum PatrolError {
    /// The caller's cancellation token fired before every definition was
    /// scanned.
    #[error("scan cancelled after {} completed definition(s)", .partial.len())]
    Cancelled {
        /// Results that completed before cancellation was observed.
        partial: Vec<ScanResult>,
    },

    /// Resource discovery failed and the run was configured to stop on the
    /// first failure.
    #[error("scan stopped on error: {source}")]
    StoppedOnError {
        /// The discovery failure that stopped the run.
        #[source]
        source: Arc<FetchError>,
        /// Results completed so far, including the failing one.
        partial: Vec<ScanResult>,
    },

    /// The policy could not be loaded.
    #[error("error parsing policy: {0}")]
    Policy(#[from] PolicyError),

    /// The patrol configuration is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for invalidity.
        reason: String,
    },
}

impl PatrolError {
    /// Returns the results that completed before the run ended early.
    #[must_use]
    pub fn partial_results(&self) -> &[ScanResult] {
        match self {
            Self::Cancelled { partial } | Self::StoppedOnError { partial, .. } => partial,
            Self::Policy(_) | Self::InvalidConfig { .. } => &[],
        }
    }

    /// Consumes the error and returns its partial results.
    #[must_use]
    pub fn into_partial_results(self) -> Vec<ScanResult> {
        match self {
            Self::Cancelled { partial } | Self::StoppedOnError { partial, .. } => partial,
            Self::Policy(_) | Self::InvalidConfig { .. } => Vec::new(),
        }
    }

    /// Returns true if the run was cancelled by the caller.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// A discovery failure for one resource definition.
#[derive(Error, Debug)]
#[error("error finding resources for {definition}: {source}")]
pub struct FetchError {
    /// The `service.resource_type` name of the definition.
    pub definition: String,
    /// The finder's error.
    #[source]
    pub source: FinderError,
}

/// Errors reported by a [`crate::ResourceFinder`].
#[derive(Error, Debug)]
pub enum FinderError {
    /// The finder observed a fired cancellation token.
    #[error("resource discovery cancelled")]
    Cancelled,

    /// Discovery failed in the provider.
    #[error("discovery failed for {service}.{resource_type}: {reason}")]
    Discovery {
        /// Service name.
        service: String,
        /// Resource type name.
        resource_type: String,
        /// Failure reason.
        reason: String,
    },

    /// The task scanning the definition panicked.
    #[error("resource scan panicked: {reason}")]
    Panicked {
        /// Panic message.
        reason: String,
    },

    /// An inventory file could not be read.
    #[error("failed to read inventory file {path}: {source}")]
    InventoryRead {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An inventory document could not be decoded.
    #[error("failed to decode inventory: {source}")]
    InventoryDecode {
        /// Underlying decoder error.
        #[source]
        source: serde_yaml::Error,
    },
}
