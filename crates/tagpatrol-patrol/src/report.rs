//! Scan reports and their output formats.
//!
//! A [`ScanReport`] is a serializable snapshot of a finished (or partially
//! finished) run. [`Reporter`]s render it to any writer.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tagpatrol_core::CloudResource;
use uuid::Uuid;

use crate::error::PatrolError;
use crate::scan::{ScanResult, Summary};

/// Serializable record of one scan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Identifier of the run.
    pub scan_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Aggregate counts.
    pub summary: Summary,
    /// One row per scanned definition, in completion order.
    pub definitions: Vec<DefinitionReport>,
}

impl ScanReport {
    /// Builds a report from scan results.
    #[must_use]
    pub fn new(
        scan_id: Uuid,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        results: &[ScanResult],
    ) -> Self {
        Self {
            scan_id,
            started_at,
            finished_at,
            summary: Summary::from_results(results),
            definitions: results.iter().map(DefinitionReport::from_result).collect(),
        }
    }

    /// Returns true if every scanned resource is compliant and no definition
    /// failed.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.summary.non_compliant == 0 && self.summary.errored == 0
    }
}

/// Report row for one definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionReport {
    /// Service name.
    pub service: String,
    /// Resource type name.
    pub resource_type: String,
    /// Compliant resource count.
    pub compliant: usize,
    /// Non-compliant resource count.
    pub non_compliant: usize,
    /// Discovery error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-compliant resources with their findings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceReport>,
}

impl DefinitionReport {
    fn from_result(result: &ScanResult) -> Self {
        Self {
            service: result.definition.service.clone(),
            resource_type: result.definition.resource_type.clone(),
            compliant: result.compliant_count,
            non_compliant: result.non_compliant_count,
            error: result.error.as_ref().map(ToString::to_string),
            resources: result.non_compliant().map(ResourceReport::from_resource).collect(),
        }
    }

    /// Returns the `service.resource_type` name.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}.{}", self.service, self.resource_type)
    }
}

/// Findings recorded on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReport {
    /// Resource identifier.
    pub id: String,
    /// Region label.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    /// Compliance errors, in recording order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Compliance warnings, in recording order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ResourceReport {
    /// Captures a resource's identity and findings.
    #[must_use]
    pub fn from_resource(resource: &dyn CloudResource) -> Self {
        Self {
            id: resource.id().to_string(),
            region: resource.region().to_string(),
            errors: resource.compliance_errors().to_vec(),
            warnings: resource.compliance_warnings().to_vec(),
        }
    }
}

/// A report together with the reason its run ended early, if it did.
///
/// Aborted runs still produce a report over the definitions that finished.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Report over every result received.
    pub report: ScanReport,
    /// Cancellation or stop-on-error, if the run did not complete.
    pub aborted: Option<PatrolError>,
}

impl ScanOutcome {
    /// Returns true if every definition was scanned.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

/// Trait for rendering scan reports.
pub trait Reporter {
    /// Writes the report.
    ///
    /// # Errors
    ///
    /// Returns an IO error if writing to output fails.
    fn report(&self, report: &ScanReport, out: &mut dyn Write) -> io::Result<()>;
}

/// Human-readable text reporter.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    /// Whether to use ANSI colors.
    use_colors: bool,
}

impl ConsoleReporter {
    /// Creates a new console reporter with colors enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self { use_colors: true }
    }

    /// Sets whether to use colors.
    #[must_use]
    pub const fn with_colors(mut self, colors: bool) -> Self {
        self.use_colors = colors;
        self
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, report: &ScanReport, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", report.summary)?;

        for row in &report.definitions {
            if let Some(error) = &row.error {
                writeln!(
                    out,
                    "{} {}: {error}",
                    self.paint("31", "Error processing"),
                    row.name()
                )?;
                continue;
            }

            if row.non_compliant == 0 {
                continue;
            }

            writeln!(
                out,
                "\nResource: {} - Compliant: {}, Non-compliant: {}",
                row.name(),
                row.compliant,
                row.non_compliant
            )?;
            for resource in &row.resources {
                writeln!(out, "  Non-compliant resource: {}", resource.id)?;
                for error in &resource.errors {
                    writeln!(out, "    {} {error}", self.paint("31", "Error:"))?;
                }
                for warning in &resource.warnings {
                    writeln!(out, "    {} {warning}", self.paint("33", "Warning:"))?;
                }
            }
        }

        Ok(())
    }
}

/// JSON reporter.
#[derive(Debug, Default)]
pub struct JsonReporter {
    /// Whether to pretty-print the JSON.
    pretty: bool,
}

impl JsonReporter {
    /// Creates a new JSON reporter producing compact output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to pretty-print.
    #[must_use]
    pub const fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Reporter for JsonReporter {
    fn report(&self, report: &ScanReport, out: &mut dyn Write) -> io::Result<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        }
        .map_err(io::Error::other)?;

        writeln!(out, "{json}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, FinderError};
    use tagpatrol_core::{ResourceDefinition, TagPolicy, TaggedResource};

    fn sample_report() -> ScanReport {
        let mut bad = TaggedResource::new("i-2", "ec2", "instance");
        bad.add_compliance_error("Missing mandatory tag: `owner`".to_string());
        bad.add_compliance_warning("Missing recommended tag `team` based on rule condition".to_string());

        let results = vec![
            ScanResult {
                definition: ResourceDefinition::new("ec2", "instance", TagPolicy::default()),
                resources: vec![
                    Box::new(TaggedResource::new("i-1", "ec2", "instance")) as Box<dyn CloudResource>,
                    Box::new(bad),
                ],
                compliant_count: 1,
                non_compliant_count: 1,
                error: None,
            },
            ScanResult::failed(
                ResourceDefinition::new("s3", "bucket", TagPolicy::default()),
                FetchError {
                    definition: "s3.bucket".to_string(),
                    source: FinderError::Discovery {
                        service: "s3".to_string(),
                        resource_type: "bucket".to_string(),
                        reason: "access denied".to_string(),
                    },
                },
            ),
        ];

        let now = Utc::now();
        ScanReport::new(Uuid::now_v7(), now, now, &results)
    }

    fn render(reporter: &dyn Reporter, report: &ScanReport) -> String {
        let mut out = Vec::new();
        reporter.report(report, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_report_rows() {
        let report = sample_report();

        assert_eq!(report.definitions.len(), 2);
        assert_eq!(report.definitions[0].resources.len(), 1);
        assert_eq!(report.definitions[0].resources[0].id, "i-2");
        assert!(report.definitions[1]
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("error finding resources for s3.bucket")));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_resource_report_keeps_findings() {
        let report = sample_report();
        let row = &report.definitions[0].resources[0];

        assert_eq!(row.errors, ["Missing mandatory tag: `owner`"]);
        assert_eq!(row.warnings.len(), 1);

        let json = serde_json::to_string(row).unwrap();
        let decoded: ResourceReport = serde_json::from_str(&json).unwrap();
        assert_eq!(&decoded, row);
    }

    #[test]
    fn test_console_reporter_plain() {
        let output = render(&ConsoleReporter::new().with_colors(false), &sample_report());

        assert!(output.starts_with("Summary:\n  Processed 2 resource definitions\n"));
        assert!(output.contains("Error processing s3.bucket: error finding resources for s3.bucket"));
        assert!(output.contains("\nResource: ec2.instance - Compliant: 1, Non-compliant: 1\n"));
        assert!(output.contains("  Non-compliant resource: i-2\n"));
        assert!(output.contains("    Error: Missing mandatory tag: `owner`\n"));
        assert!(output.contains("    Warning: Missing recommended tag `team`"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_console_reporter_colors() {
        let output = render(&ConsoleReporter::new(), &sample_report());
        assert!(output.contains("\x1b[31mError:\x1b[0m"));
        assert!(output.contains("\x1b[33mWarning:\x1b[0m"));
    }

    #[test]
    fn test_json_reporter_round_trip() {
        let report = sample_report();
        let output = render(&JsonReporter::new(), &report);

        assert_eq!(output.lines().count(), 1);
        let decoded: ScanReport = serde_json::from_str(&output).unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn test_json_reporter_pretty() {
        let output = render(&JsonReporter::new().with_pretty(true), &sample_report());
        assert!(output.contains("\n  \"scanId\""));
        assert!(output.contains("\"nonCompliant\": 1"));
    }
}
