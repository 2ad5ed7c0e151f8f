//! Resource discovery.
//!
//! The [`ResourceFinder`] trait is the seam between the scanner and a cloud
//! provider. Transport, pagination and authentication are the finder's
//! concern; the scanner only asks for the resources of one
//! (service, resource type) pair at a time.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tagpatrol_core::{CloudResource, TaggedResource};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::FinderError;

/// Trait for resource discovery.
#[async_trait]
pub trait ResourceFinder: Send + Sync {
    /// Returns every resource of the given service and resource type.
    ///
    /// Implementations should stop early and return
    /// [`FinderError::Cancelled`] once `cancel` fires. A failed lookup
    /// returns no resources at all.
    async fn find_resources(
        &self,
        cancel: &CancellationToken,
        service: &str,
        resource_type: &str,
    ) -> Result<Vec<Box<dyn CloudResource>>, FinderError>;
}

/// Inventory file layout: a flat list of resources.
///
/// ```yaml
/// resources:
///   - id: i-0abc
///     service: ec2
///     resourceType: instance
///     region: eu-west-1
///     tags:
///       environment: prod
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Every resource in the inventory.
    #[serde(default)]
    pub resources: Vec<TaggedResource>,
}

/// Finder backed by an in-memory inventory.
///
/// Every lookup returns fresh copies, so findings recorded during one scan
/// never leak into the next.
///
/// # Examples
///
/// ```rust
/// use tagpatrol_core::TaggedResource;
/// use tagpatrol_patrol::StaticFinder;
///
/// let finder = StaticFinder::new()
///     .with_resource(TaggedResource::new("i-1", "ec2", "instance"))
///     .with_resource(TaggedResource::new("logs", "s3", "bucket"));
///
/// assert_eq!(finder.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticFinder {
    resources: BTreeMap<(String, String), Vec<TaggedResource>>,
}

impl StaticFinder {
    /// Creates an empty finder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource to the inventory.
    #[must_use]
    pub fn with_resource(mut self, resource: TaggedResource) -> Self {
        self.insert(resource);
        self
    }

    /// Adds a resource to the inventory.
    pub fn insert(&mut self, resource: TaggedResource) {
        let key = (resource.service.clone(), resource.resource_type.clone());
        self.resources.entry(key).or_default().push(resource);
    }

    /// Returns the total number of resources in the inventory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.values().map(Vec::len).sum()
    }

    /// Returns true if the inventory holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Loads an inventory from a YAML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn from_inventory_file(path: impl AsRef<Path>) -> Result<Self, FinderError> {
        let path = path.as_ref();
        debug!(?path, "Loading inventory file");

        let content = fs::read_to_string(path).map_err(|e| FinderError::InventoryRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_inventory_str(&content)
    }

    /// Loads an inventory from a YAML or JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be decoded.
    pub fn from_inventory_str(content: &str) -> Result<Self, FinderError> {
        let inventory: Inventory = serde_yaml::from_str(content)
            .map_err(|source| FinderError::InventoryDecode { source })?;

        let finder = inventory
            .resources
            .into_iter()
            .fold(Self::new(), Self::with_resource);
        debug!(resources = finder.len(), "Loaded inventory");
        Ok(finder)
    }
}

#[async_trait]
impl ResourceFinder for StaticFinder {
    async fn find_resources(
        &self,
        cancel: &CancellationToken,
        service: &str,
        resource_type: &str,
    ) -> Result<Vec<Box<dyn CloudResource>>, FinderError> {
        if cancel.is_cancelled() {
            return Err(FinderError::Cancelled);
        }

        let found: Vec<Box<dyn CloudResource>> = self
            .resources
            .get(&(service.to_string(), resource_type.to_string()))
            .into_iter()
            .flatten()
            .map(|r| Box::new(r.clone()) as Box<dyn CloudResource>)
            .collect();

        debug!(service, resource_type, count = found.len(), "Found resources");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = r"
resources:
  - id: i-1
    service: ec2
    resourceType: instance
    tags:
      environment: prod
  - id: i-2
    service: ec2
    resourceType: instance
  - id: logs
    service: s3
    resourceType: bucket
";

    #[tokio::test]
    async fn test_find_by_service_and_type() {
        let finder = StaticFinder::from_inventory_str(INVENTORY).unwrap();
        let cancel = CancellationToken::new();

        let instances = finder
            .find_resources(&cancel, "ec2", "instance")
            .await
            .unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].id(), "i-1");
        assert_eq!(
            instances[0].tags().get("environment").map(String::as_str),
            Some("prod")
        );

        let volumes = finder.find_resources(&cancel, "ec2", "volume").await.unwrap();
        assert!(volumes.is_empty());
    }

    #[tokio::test]
    async fn test_lookups_return_fresh_copies() {
        let finder = StaticFinder::new().with_resource(TaggedResource::new("a", "s3", "bucket"));
        let cancel = CancellationToken::new();

        let mut first = finder.find_resources(&cancel, "s3", "bucket").await.unwrap();
        first[0].add_compliance_error("missing owner".to_string());

        let second = finder.find_resources(&cancel, "s3", "bucket").await.unwrap();
        assert!(second[0].is_compliant());
    }

    #[tokio::test]
    async fn test_cancelled_lookup() {
        let finder = StaticFinder::from_inventory_str(INVENTORY).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = finder
            .find_resources(&cancel, "ec2", "instance")
            .await
            .unwrap_err();
        assert!(matches!(err, FinderError::Cancelled));
    }

    #[test]
    fn test_json_inventory() {
        let finder = StaticFinder::from_inventory_str(
            r#"{"resources": [{"id": "vol-1", "service": "ec2", "resourceType": "volume"}]}"#,
        )
        .unwrap();
        assert_eq!(finder.len(), 1);
    }

    #[test]
    fn test_malformed_inventory() {
        let err = StaticFinder::from_inventory_str("resources: [{id: 1").unwrap_err();
        assert!(matches!(err, FinderError::InventoryDecode { .. }));
    }

    #[test]
    fn test_missing_inventory_file() {
        let err = StaticFinder::from_inventory_file("/no/such/inventory.yaml").unwrap_err();
        assert!(err.to_string().contains("/no/such/inventory.yaml"));
    }
}
