//! Resolved policy model.
//!
//! A [`ResourceDefinition`] is the flattened, blueprint-merged policy for one
//! (service, resource type) pair. It is built once by the resolver and only
//! read afterwards; regular expressions are already compiled and every
//! [`Condition`] is exactly one operator.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

/// Fully resolved policy for one (service, resource type) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    /// Service name (e.g. `ec2`).
    pub service: String,

    /// Resource type name (e.g. `instance`).
    pub resource_type: String,

    /// Merged tag policy.
    pub policy: TagPolicy,
}

impl ResourceDefinition {
    /// Creates a definition with the given policy.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        resource_type: impl Into<String>,
        policy: TagPolicy,
    ) -> Self {
        Self {
            service: service.into(),
            resource_type: resource_type.into(),
            policy,
        }
    }

    /// Returns the `service.resource_type` display name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tagpatrol_core::{ResourceDefinition, TagPolicy};
    ///
    /// let def = ResourceDefinition::new("ec2", "instance", TagPolicy::default());
    /// assert_eq!(def.name(), "ec2.instance");
    /// ```
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}.{}", self.service, self.resource_type)
    }
}

impl fmt::Display for ResourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service, self.resource_type)
    }
}

/// Mandatory keys, value validations and conditional rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagPolicy {
    /// Keys that must be present; no duplicates.
    pub mandatory_keys: Vec<String>,

    /// Value validations keyed by tag key.
    pub validations: BTreeMap<String, Validation>,

    /// Rules in evaluation order.
    pub rules: Vec<Rule>,
}

impl TagPolicy {
    /// Returns true if the policy imposes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mandatory_keys.is_empty() && self.validations.is_empty() && self.rules.is_empty()
    }
}

/// Value validation for a present tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Free-form string, optionally constrained.
    String(StringCheck),
    /// Exactly `true` or `false`.
    Bool,
    /// Base-10 integer, optionally bounded.
    Int(IntCheck),
}

impl Validation {
    /// Returns the declared type name as written in policy files.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Bool => "bool",
            Self::Int(_) => "int",
        }
    }
}

/// Constraint on a string tag. Allow-list and pattern are exclusive.
#[derive(Debug, Clone)]
pub enum StringCheck {
    /// Any value is accepted.
    Any,
    /// The value must be one of these literals.
    OneOf(Vec<String>),
    /// The value must match this pattern.
    Pattern(Regex),
}

impl PartialEq for StringCheck {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, Self::Any) => true,
            (Self::OneOf(a), Self::OneOf(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// Constraints on an integer tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntCheck {
    /// Inclusive lower bound.
    pub min: Option<i64>,
    /// Inclusive upper bound.
    pub max: Option<i64>,
    /// Accepted literal values; empty means any.
    pub allowed: Vec<String>,
}

/// A conditional rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Trigger.
    pub when: Condition,
    /// Effects applied when the trigger holds.
    pub then: Action,
}

/// Boolean predicate over a tag set.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The key is present, whatever its value.
    Exists {
        /// Tag key.
        key: String,
    },
    /// The key is present with exactly this value.
    Equals {
        /// Tag key.
        key: String,
        /// Expected value.
        value: String,
    },
    /// The key is absent or has a different value.
    NotEquals {
        /// Tag key.
        key: String,
        /// Rejected value.
        value: String,
    },
    /// The key is present and its value contains the substring.
    Contains {
        /// Tag key.
        key: String,
        /// Required substring.
        substring: String,
    },
    /// The key's value parses as a number strictly above the threshold.
    GreaterThan {
        /// Tag key.
        key: String,
        /// Exclusive lower threshold.
        threshold: f64,
    },
    /// The key's value parses as a number strictly below the threshold.
    LessThan {
        /// Tag key.
        key: String,
        /// Exclusive upper threshold.
        threshold: f64,
    },
    /// Every sub-condition holds.
    And(Vec<Condition>),
    /// At least one sub-condition holds.
    Or(Vec<Condition>),
}

impl Condition {
    /// Shorthand for [`Condition::Exists`].
    #[must_use]
    pub fn exists(key: impl Into<String>) -> Self {
        Self::Exists { key: key.into() }
    }

    /// Shorthand for [`Condition::Equals`].
    #[must_use]
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Shorthand for [`Condition::NotEquals`].
    #[must_use]
    pub fn not_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::NotEquals {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Shorthand for [`Condition::Contains`].
    #[must_use]
    pub fn contains(key: impl Into<String>, substring: impl Into<String>) -> Self {
        Self::Contains {
            key: key.into(),
            substring: substring.into(),
        }
    }

    /// Shorthand for [`Condition::GreaterThan`].
    #[must_use]
    pub fn greater_than(key: impl Into<String>, threshold: f64) -> Self {
        Self::GreaterThan {
            key: key.into(),
            threshold,
        }
    }

    /// Shorthand for [`Condition::LessThan`].
    #[must_use]
    pub fn less_than(key: impl Into<String>, threshold: f64) -> Self {
        Self::LessThan {
            key: key.into(),
            threshold,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, parts: &[Condition], op: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{part}")?;
            }
            write!(f, ")")
        }

        match self {
            Self::Exists { key } => write!(f, "exists({key})"),
            Self::Equals { key, value } => write!(f, "{key} == {value:?}"),
            Self::NotEquals { key, value } => write!(f, "{key} != {value:?}"),
            Self::Contains { key, substring } => write!(f, "{key} contains {substring:?}"),
            Self::GreaterThan { key, threshold } => write!(f, "{key} > {threshold}"),
            Self::LessThan { key, threshold } => write!(f, "{key} < {threshold}"),
            Self::And(parts) => join(f, parts, "&&"),
            Self::Or(parts) => join(f, parts, "||"),
        }
    }
}

/// Effects of a matching rule. All four are independent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    /// Keys whose absence is recorded as an error.
    pub must_contain_keys: Vec<String>,
    /// Keys whose absence is recorded as a warning.
    pub should_contain_keys: Vec<String>,
    /// Literal error recorded verbatim.
    pub error: Option<String>,
    /// Literal warning recorded verbatim.
    pub warn: Option<String>,
}
