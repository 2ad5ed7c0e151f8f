//! # Tag Patrol Ruler
//!
//! The rule engine that checks cloud resources against a resolved tag policy.
//!
//! Evaluating a resource runs three passes in a fixed order:
//!
//! 1. **Mandatory keys** - every missing key is an error
//! 2. **Value validation** - present tags are checked against their declared
//!    type (`string`, `bool`, `int`) and constraints
//! 3. **Conditional rules** - each rule whose condition holds applies its
//!    required keys, recommended keys and literal messages
//!
//! Findings are recorded on the resource itself. They are data, never errors:
//! the engine has no failure mode.
//!
//! ## Example
//!
//! ```rust
//! use tagpatrol_core::{Action, CloudResource, Condition, Rule, TagPolicy, TaggedResource};
//! use tagpatrol_ruler::{DefaultRuler, Ruler};
//!
//! let policy = TagPolicy {
//!     mandatory_keys: vec!["owner".to_string()],
//!     rules: vec![Rule {
//!         when: Condition::equals("environment", "prod"),
//!         then: Action {
//!             should_contain_keys: vec!["backup-policy".to_string()],
//!             ..Action::default()
//!         },
//!     }],
//!     ..TagPolicy::default()
//! };
//!
//! let mut resource = TaggedResource::new("i-1", "ec2", "instance")
//!     .with_tag("environment", "prod");
//! DefaultRuler::new().validate(&mut resource, &policy);
//!
//! assert_eq!(resource.compliance_errors(), ["Missing mandatory tag: `owner`"]);
//! assert_eq!(resource.compliance_warnings().len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod condition;
pub mod ruler;
pub mod values;

#[cfg(test)]
mod proptest_tests;

pub use condition::evaluate;
pub use ruler::{ComplianceCount, DefaultRuler, Ruler};
pub use values::validate_value;
