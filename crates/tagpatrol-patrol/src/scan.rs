//! Per-definition scan results and their aggregate summary.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tagpatrol_core::{CloudResource, ResourceDefinition};

use crate::error::FetchError;

/// Outcome of scanning one resource definition.
#[derive(Debug)]
pub struct ScanResult {
    /// The definition that was scanned.
    pub definition: ResourceDefinition,

    /// Every resource found, with its findings recorded.
    ///
    /// Empty when discovery failed.
    pub resources: Vec<Box<dyn CloudResource>>,

    /// Resources that ended without compliance errors.
    pub compliant_count: usize,

    /// Resources with at least one compliance error.
    pub non_compliant_count: usize,

    /// The discovery failure, if any.
    pub error: Option<Arc<FetchError>>,
}

impl ScanResult {
    /// Creates a result for a definition whose discovery failed.
    #[must_use]
    pub fn failed(definition: ResourceDefinition, error: FetchError) -> Self {
        Self {
            definition,
            resources: Vec::new(),
            compliant_count: 0,
            non_compliant_count: 0,
            error: Some(Arc::new(error)),
        }
    }

    /// Returns true if discovery failed for this definition.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Iterates over the resources that carry compliance errors.
    pub fn non_compliant(&self) -> impl Iterator<Item = &dyn CloudResource> + '_ {
        self.resources
            .iter()
            .map(|r| &**r)
            .filter(|r| !r.is_compliant())
    }
}

/// Aggregate view over a set of scan results.
///
/// Definitions whose discovery failed count towards `errored` only; their
/// resources (there are none) are not part of the totals.
///
/// # Examples
///
/// ```rust
/// use tagpatrol_patrol::Summary;
///
/// let summary = Summary::from_results(&[]);
/// assert_eq!(summary.compliant_percentage(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Number of definitions processed.
    pub definitions: usize,
    /// Resources found across successful definitions.
    pub total_resources: usize,
    /// Resources without compliance errors.
    pub compliant: usize,
    /// Resources with compliance errors.
    pub non_compliant: usize,
    /// Definitions whose discovery failed.
    pub errored: usize,
}

impl Summary {
    /// Reduces results into a summary.
    #[must_use]
    pub fn from_results(results: &[ScanResult]) -> Self {
        results.iter().fold(
            Self {
                definitions: results.len(),
                ..Self::default()
            },
            |mut summary, result| {
                if result.is_error() {
                    summary.errored += 1;
                } else {
                    summary.total_resources += result.resources.len();
                    summary.compliant += result.compliant_count;
                    summary.non_compliant += result.non_compliant_count;
                }
                summary
            },
        )
    }

    /// Percentage of resources that are compliant; zero when none were found.
    #[must_use]
    pub fn compliant_percentage(&self) -> f64 {
        percentage(self.compliant, self.total_resources)
    }

    /// Percentage of resources that are non-compliant; zero when none were
    /// found.
    #[must_use]
    pub fn non_compliant_percentage(&self) -> f64 {
        percentage(self.non_compliant, self.total_resources)
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / total as f64
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "  Processed {} resource definitions", self.definitions)?;
        writeln!(f, "  Found {} resources", self.total_resources)?;
        writeln!(
            f,
            "  Compliant: {} resources ({:.1}%)",
            self.compliant,
            self.compliant_percentage()
        )?;
        writeln!(
            f,
            "  Non-compliant: {} resources ({:.1}%)",
            self.non_compliant,
            self.non_compliant_percentage()
        )?;
        writeln!(
            f,
            "  Errors: {} resource definitions had errors",
            self.errored
        )
    }
}
