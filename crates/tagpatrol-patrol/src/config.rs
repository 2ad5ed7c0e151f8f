//! Patrol configuration.

use crate::error::{PatrolError, Result};

/// Default number of definitions scanned at the same time.
pub const DEFAULT_CONCURRENT_WORKERS: usize = 10;

/// Configuration for a [`crate::Patrol`].
///
/// # Examples
///
/// ```rust
/// use tagpatrol_patrol::PatrolConfig;
///
/// let config = PatrolConfig::builder()
///     .concurrent_workers(4)
///     .stop_on_error(true)
///     .build();
///
/// assert_eq!(config.concurrent_workers, 4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatrolConfig {
    /// Maximum number of definitions fetched and evaluated concurrently.
    pub concurrent_workers: usize,

    /// Stop dispatching new definitions after the first discovery failure.
    pub stop_on_error: bool,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            concurrent_workers: DEFAULT_CONCURRENT_WORKERS,
            stop_on_error: false,
        }
    }
}

impl PatrolConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> PatrolConfigBuilder {
        PatrolConfigBuilder::default()
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PatrolError::InvalidConfig`] if `concurrent_workers` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.concurrent_workers == 0 {
            return Err(PatrolError::InvalidConfig {
                reason: "concurrent_workers must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`PatrolConfig`].
#[derive(Debug, Default)]
pub struct PatrolConfigBuilder {
    concurrent_workers: Option<usize>,
    stop_on_error: Option<bool>,
}

impl PatrolConfigBuilder {
    /// Sets the maximum number of concurrent workers.
    #[must_use]
    pub const fn concurrent_workers(mut self, workers: usize) -> Self {
        self.concurrent_workers = Some(workers);
        self
    }

    /// Sets whether the first discovery failure stops the run.
    #[must_use]
    pub const fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = Some(stop);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> PatrolConfig {
        let defaults = PatrolConfig::default();
        PatrolConfig {
            concurrent_workers: self
                .concurrent_workers
                .unwrap_or(defaults.concurrent_workers),
            stop_on_error: self.stop_on_error.unwrap_or(defaults.stop_on_error),
        }
    }
}
