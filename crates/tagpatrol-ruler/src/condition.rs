//! Condition evaluation.

use tagpatrol_core::{Condition, Tags};

/// Evaluates a condition against a tag set.
///
/// Evaluation never fails: a numeric comparison against a value that does not
/// parse as a number is simply false. `NotEquals` is satisfied by an absent
/// key.
///
/// # Examples
///
/// ```rust
/// use tagpatrol_core::{Condition, Tags};
/// use tagpatrol_ruler::evaluate;
///
/// let tags: Tags = [("environment".to_string(), "prod".to_string())].into();
///
/// assert!(evaluate(&Condition::equals("environment", "prod"), &tags));
/// assert!(evaluate(&Condition::not_equals("tier", "gold"), &tags));
/// assert!(!evaluate(&Condition::greater_than("environment", 1.0), &tags));
/// ```
#[must_use]
pub fn evaluate(condition: &Condition, tags: &Tags) -> bool {
    match condition {
        Condition::Exists { key } => tags.contains_key(key),
        Condition::Equals { key, value } => tags.get(key).is_some_and(|v| v == value),
        Condition::NotEquals { key, value } => tags.get(key).map_or(true, |v| v != value),
        Condition::Contains { key, substring } => {
            tags.get(key).is_some_and(|v| v.contains(substring.as_str()))
        }
        Condition::GreaterThan { key, threshold } => {
            numeric(tags, key).is_some_and(|n| n > *threshold)
        }
        Condition::LessThan { key, threshold } => {
            numeric(tags, key).is_some_and(|n| n < *threshold)
        }
        Condition::And(parts) => !parts.is_empty() && parts.iter().all(|c| evaluate(c, tags)),
        Condition::Or(parts) => parts.iter().any(|c| evaluate(c, tags)),
    }
}

fn numeric(tags: &Tags, key: &str) -> Option<f64> {
    tags.get(key)?.parse().ok()
}
