//! Property-based tests for the rule engine.

use proptest::prelude::*;
use tagpatrol_core::{
    CloudResource, Condition, IntCheck, TagPolicy, TaggedResource, Tags, Validation,
};

use crate::{evaluate, validate_value, DefaultRuler, Ruler};

fn key_strategy() -> impl Strategy<Value = String> {
    "(environment|owner|name|team|cost-center|ttl|tier|critical)"
}

fn tags_strategy() -> impl Strategy<Value = Tags> {
    prop::collection::btree_map(key_strategy(), "[a-z0-9]{0,8}", 0..6)
}

proptest! {
    #[test]
    fn one_error_per_missing_mandatory_key(
        keys in prop::collection::btree_set(key_strategy(), 0..8),
        tags in tags_strategy(),
    ) {
        let policy = TagPolicy {
            mandatory_keys: keys.iter().cloned().collect(),
            ..TagPolicy::default()
        };
        let mut resource = TaggedResource::new("r", "ec2", "instance").with_tags(tags.clone());

        DefaultRuler::new().validate(&mut resource, &policy);

        for key in &keys {
            let message = format!("Missing mandatory tag: `{key}`");
            let expected = usize::from(!tags.contains_key(key));
            let found = resource.compliance_errors().iter().filter(|e| **e == message).count();
            prop_assert_eq!(found, expected);
        }
        let missing = keys.iter().filter(|k| !tags.contains_key(*k)).count();
        prop_assert_eq!(resource.compliance_errors().len(), missing);
        prop_assert_eq!(resource.is_compliant(), missing == 0);
    }

    #[test]
    fn bounded_int_accepts_exactly_the_range(n in -200i64..200) {
        let check = Validation::Int(IntCheck { min: Some(1), max: Some(90), allowed: Vec::new() });
        let errors = validate_value("ttl", &n.to_string(), &check);

        if (1..=90).contains(&n) {
            prop_assert!(errors.is_empty());
        } else {
            prop_assert_eq!(errors.len(), 1);
        }
    }

    #[test]
    fn non_numeric_int_yields_single_error(value in "[a-z]{1,10}") {
        let check = Validation::Int(IntCheck {
            min: Some(1),
            max: Some(90),
            allowed: vec!["30".to_string()],
        });
        let errors = validate_value("ttl", &value, &check);
        prop_assert_eq!(errors.len(), 1);
        prop_assert!(errors[0].ends_with("which is not a valid integer"));
    }

    #[test]
    fn not_equals_is_negated_equals(tags in tags_strategy(), key in key_strategy(), value in "[a-z0-9]{0,8}") {
        let equals = evaluate(&Condition::equals(key.clone(), value.clone()), &tags);
        let not_equals = evaluate(&Condition::not_equals(key, value), &tags);
        prop_assert_ne!(equals, not_equals);
    }

    #[test]
    fn and_or_agree_with_parts(tags in tags_strategy(), keys in prop::collection::vec(key_strategy(), 1..5)) {
        let parts: Vec<Condition> = keys.iter().map(Condition::exists).collect();
        let results: Vec<bool> = parts.iter().map(|c| evaluate(c, &tags)).collect();

        prop_assert_eq!(evaluate(&Condition::And(parts.clone()), &tags), results.iter().all(|r| *r));
        prop_assert_eq!(evaluate(&Condition::Or(parts), &tags), results.iter().any(|r| *r));
    }
}
