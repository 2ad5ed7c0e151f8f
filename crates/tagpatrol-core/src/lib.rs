//! # Tag Patrol Core
//!
//! Core types shared by every Tag Patrol crate.
//!
//! This crate provides the foundational data structures used throughout the
//! tagging-compliance pipeline:
//!
//! - [`CloudResource`] - Capability trait for any taggable cloud object
//! - [`TaggedResource`] - Provider-neutral resource implementation
//! - [`PolicyDocument`] - Raw policy document as authored in YAML
//! - [`ResourceDefinition`] - Flattened, blueprint-merged policy for one
//!   (service, resource type) pair
//! - [`ValidationErrors`] - Aggregate of structural policy violations
//!
//! ## Raw and resolved policies
//!
//! A policy exists in two shapes. The [`document`] module mirrors the YAML
//! file one-to-one, including unresolved `extends` references and condition
//! nodes that may carry any number of operators. The [`policy`] module holds
//! the resolved form that the rule engine consumes: blueprints are merged,
//! regular expressions are compiled and every condition is a single
//! [`Condition`] variant. Only `tagpatrol-policy` converts between the two.
//!
//! ## Example
//!
//! ```rust
//! use tagpatrol_core::{CloudResource, TaggedResource};
//!
//! let mut bucket = TaggedResource::new("arn:aws:s3:::logs", "s3", "bucket")
//!     .with_tag("environment", "prod");
//!
//! assert!(bucket.is_compliant());
//! bucket.add_compliance_error("Missing mandatory tag: `owner`".to_string());
//! assert!(!bucket.is_compliant());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod document;
pub mod policy;
pub mod resource;
pub mod validation;


// Re-export main types at crate root
pub use document::{Blueprint, PolicyDocument, ResourceConfig};
pub use policy::{
    Action, Condition, IntCheck, ResourceDefinition, Rule, StringCheck, TagPolicy, Validation,
};
pub use resource::{CloudResource, TaggedResource, Tags};
pub use validation::{ValidationError, ValidationErrorKind, ValidationErrors};
