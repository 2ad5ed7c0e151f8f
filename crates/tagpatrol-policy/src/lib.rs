//! # Tag Patrol Policy
//!
//! Loading, structural validation and blueprint resolution of tag policies.
//!
//! This crate provides functionality for:
//!
//! - Decoding YAML policy documents from files, bytes or strings
//! - Checking a document for internal consistency, collecting every violation
//! - Flattening blueprints into one [`ResourceDefinition`] per
//!   (service, resource type) pair
//!
//! ## Example
//!
//! ```rust
//! use tagpatrol_policy::PolicyParser;
//!
//! let definitions = PolicyParser::new().parse_str(
//!     r"
//! blueprints:
//!   base:
//!     mandatoryKeys: [environment, owner]
//! resources:
//!   ec2:
//!     instance:
//!       extends: [blueprints.base]
//!       mandatoryKeys: [name]
//! ",
//! )?;
//!
//! assert_eq!(definitions.len(), 1);
//! assert_eq!(definitions[0].policy.mandatory_keys.len(), 3);
//! # Ok::<(), tagpatrol_policy::PolicyError>(())
//! ```
//!
//! [`ResourceDefinition`]: tagpatrol_core::ResourceDefinition

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod parser;
pub mod resolver;
pub mod validator;


pub use error::{PolicyError, Result};
pub use parser::PolicyParser;
pub use resolver::resolve;
pub use validator::validate_document;
