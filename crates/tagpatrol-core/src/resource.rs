//! Cloud resource model.
//!
//! This module defines the [`CloudResource`] capability trait that the rule
//! engine and the scan orchestrator operate on, plus [`TaggedResource`], a
//! provider-neutral implementation used for inventories and reports.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag set of a resource: tag key to tag value.
///
/// Keys are case-sensitive and unique.
pub type Tags = BTreeMap<String, String>;

/// A taggable cloud object together with its compliance findings.
///
/// Findings are append-only during an evaluation pass. A resource is
/// compliant exactly when it carries no compliance errors; warnings never
/// affect compliance.
pub trait CloudResource: fmt::Debug + Send + Sync {
    /// Returns the unique identifier (an ARN, a resource path, ...).
    fn id(&self) -> &str;

    /// Returns the resource type label (e.g. `instance`, `bucket`).
    fn resource_type(&self) -> &str;

    /// Returns the service label (e.g. `ec2`, `s3`).
    fn service(&self) -> &str;

    /// Returns the cloud provider label.
    fn provider(&self) -> &str;

    /// Returns the region the resource lives in.
    fn region(&self) -> &str;

    /// Returns the owning account, project or subscription.
    fn owner_id(&self) -> &str;

    /// Returns the resource tags.
    fn tags(&self) -> &Tags;

    /// Returns the recorded compliance errors, in recording order.
    fn compliance_errors(&self) -> &[String];

    /// Returns the recorded compliance warnings, in recording order.
    fn compliance_warnings(&self) -> &[String];

    /// Records a compliance error.
    fn add_compliance_error(&mut self, message: String);

    /// Records a compliance warning.
    fn add_compliance_warning(&mut self, message: String);

    /// Returns whether the resource has no compliance errors.
    fn is_compliant(&self) -> bool {
        self.compliance_errors().is_empty()
    }
}

/// Provider-neutral cloud resource.
///
/// # Examples
///
/// ```rust
/// use tagpatrol_core::{CloudResource, TaggedResource};
///
/// let instance = TaggedResource::new("i-0abc", "ec2", "instance")
///     .with_provider("aws")
///     .with_region("eu-west-1")
///     .with_tag("owner", "platform");
///
/// assert_eq!(instance.tags().get("owner").map(String::as_str), Some("platform"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedResource {
    /// Unique identifier.
    pub id: String,

    /// Service label.
    pub service: String,

    /// Resource type label.
    pub resource_type: String,

    /// Cloud provider label.
    #[serde(default)]
    pub provider: String,

    /// Region label.
    #[serde(default)]
    pub region: String,

    /// Owning account label.
    #[serde(default)]
    pub owner_id: String,

    /// Resource tags.
    #[serde(default)]
    pub tags: Tags,

    /// Recorded compliance errors. Only evaluation writes these; decoded
    /// records always start without findings.
    #[serde(skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    /// Recorded compliance warnings.
    #[serde(skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl TaggedResource {
    /// Creates an untagged resource with no findings.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        service: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            service: service.into(),
            resource_type: resource_type.into(),
            provider: String::new(),
            region: String::new(),
            owner_id: String::new(),
            tags: Tags::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Sets the provider label.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Sets the region label.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Sets the owning account label.
    #[must_use]
    pub fn with_owner_id(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }

    /// Adds a single tag, replacing any previous value for the key.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds every tag from the iterator.
    #[must_use]
    pub fn with_tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

impl CloudResource for TaggedResource {
    fn id(&self) -> &str {
        &self.id
    }

    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn service(&self) -> &str {
        &self.service
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn compliance_errors(&self) -> &[String] {
        &self.errors
    }

    fn compliance_warnings(&self) -> &[String] {
        &self.warnings
    }

    fn add_compliance_error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn add_compliance_warning(&mut self, message: String) {
        self.warnings.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_resource_is_compliant() {
        let resource = TaggedResource::new("i-123", "ec2", "instance");

        assert!(resource.is_compliant());
        assert!(resource.compliance_errors().is_empty());
        assert!(resource.compliance_warnings().is_empty());
        assert!(resource.tags().is_empty());
    }

    #[test]
    fn test_warnings_do_not_affect_compliance() {
        let mut resource = TaggedResource::new("i-123", "ec2", "instance");
        resource.add_compliance_warning("Missing recommended tag `owner`".to_string());

        assert!(resource.is_compliant());
        assert_eq!(resource.compliance_warnings().len(), 1);
    }

    #[test]
    fn test_errors_make_resource_non_compliant() {
        let mut resource = TaggedResource::new("i-123", "ec2", "instance");
        resource.add_compliance_error("first".to_string());
        resource.add_compliance_error("second".to_string());

        assert!(!resource.is_compliant());
        assert_eq!(resource.compliance_errors(), ["first", "second"]);
    }

    #[test]
    fn test_builder_sets_metadata() {
        let resource = TaggedResource::new("arn:aws:s3:::logs", "s3", "bucket")
            .with_provider("aws")
            .with_region("us-east-1")
            .with_owner_id("123456789012")
            .with_tags([("environment", "prod"), ("owner", "data")]);

        assert_eq!(resource.id(), "arn:aws:s3:::logs");
        assert_eq!(resource.service(), "s3");
        assert_eq!(resource.resource_type(), "bucket");
        assert_eq!(resource.provider(), "aws");
        assert_eq!(resource.region(), "us-east-1");
        assert_eq!(resource.owner_id(), "123456789012");
        assert_eq!(resource.tags().len(), 2);
    }

    #[test]
    fn test_tag_keys_are_case_sensitive() {
        let resource = TaggedResource::new("i-1", "ec2", "instance")
            .with_tag("Owner", "a")
            .with_tag("owner", "b");

        assert_eq!(resource.tags().len(), 2);
    }

    #[test]
    fn test_inventory_record_deserialization() {
        let json = r#"{
            "id": "i-1",
            "service": "ec2",
            "resourceType": "instance",
            "region": "eu-west-1",
            "tags": {"environment": "dev"}
        }"#;

        let resource: TaggedResource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.resource_type, "instance");
        assert_eq!(resource.provider, "");
        assert_eq!(resource.tags.get("environment").unwrap(), "dev");
        assert!(resource.is_compliant());
    }

    #[test]
    fn test_serialization_skips_empty_findings() {
        let resource = TaggedResource::new("i-1", "ec2", "instance");
        let json = serde_json::to_string(&resource).unwrap();

        assert!(json.contains(r#""resourceType":"instance""#));
        assert!(!json.contains("errors"));
        assert!(!json.contains("warnings"));
    }

    #[test]
    fn test_decoded_findings_are_ignored() {
        let json = r#"{
            "id": "i-1",
            "service": "ec2",
            "resourceType": "instance",
            "errors": ["Missing mandatory tag: `owner`"],
            "warnings": ["advisory"]
        }"#;

        let resource: TaggedResource = serde_json::from_str(json).unwrap();
        assert!(resource.is_compliant());
        assert!(resource.compliance_errors().is_empty());
        assert!(resource.compliance_warnings().is_empty());
    }
}
