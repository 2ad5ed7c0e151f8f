//! Blueprint resolution.
//!
//! Turns a [`PolicyDocument`] into one [`ResourceDefinition`] per declared
//! (service, resource type) pair. Each definition merges the resource's own
//! policy with every blueprint it extends:
//!
//! - mandatory keys: the resource's own keys first, then each blueprint's,
//!   without duplicates
//! - validations: a blueprint validation applies only when the resource does
//!   not define one for the same key; among blueprints, the later reference
//!   wins
//! - rules: blueprint rules in `extends` order, then the resource's own

use std::collections::BTreeMap;

use regex::Regex;
use tagpatrol_core::document::{RawAction, RawCondition, RawTagPolicy, RawValidation};
use tagpatrol_core::{
    Action, Condition, IntCheck, PolicyDocument, ResourceConfig, ResourceDefinition, Rule,
    StringCheck, TagPolicy, Validation,
};
use tracing::{debug, warn};

use crate::error::Result;
use crate::validator::validate_document;

/// Validates a document and flattens it into resolved definitions.
///
/// Definitions come out ordered by service, then resource type. A declared
/// resource type without configuration resolves to an empty definition.
///
/// # Errors
///
/// Returns [`crate::PolicyError::Invalid`] with every structural violation
/// when the document is not internally consistent.
pub fn resolve(doc: &PolicyDocument) -> Result<Vec<ResourceDefinition>> {
    validate_document(doc)?;

    let definitions: Vec<_> = doc
        .resource_entries()
        .map(|(service, resource_type, config)| {
            let policy = config.map_or_else(TagPolicy::default, |c| merge(doc, c));
            debug!(
                service,
                resource_type,
                mandatory_keys = policy.mandatory_keys.len(),
                validations = policy.validations.len(),
                rules = policy.rules.len(),
                "Resolved resource definition"
            );
            ResourceDefinition::new(service, resource_type, policy)
        })
        .collect();

    Ok(definitions)
}

fn merge(doc: &PolicyDocument, config: &ResourceConfig) -> TagPolicy {
    let own = &config.policy;

    let mut blueprints: Vec<&RawTagPolicy> = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    for name in config.blueprint_names() {
        if seen.contains(&name) {
            continue;
        }
        seen.push(name);
        if let Some(blueprint) = doc.blueprint(name) {
            blueprints.push(&blueprint.policy);
        }
    }

    let mut mandatory_keys: Vec<String> = Vec::new();
    let all_keys = own
        .mandatory_keys
        .iter()
        .chain(blueprints.iter().flat_map(|b| b.mandatory_keys.iter()));
    for key in all_keys {
        if !mandatory_keys.contains(key) {
            mandatory_keys.push(key.clone());
        }
    }

    let mut raw_validations: BTreeMap<&str, &RawValidation> = BTreeMap::new();
    for blueprint in &blueprints {
        for (key, validation) in &blueprint.validations {
            if !own.validations.contains_key(key) {
                if let Some(validation) = validation {
                    raw_validations.insert(key, validation);
                }
            }
        }
    }
    for (key, validation) in &own.validations {
        if let Some(validation) = validation {
            raw_validations.insert(key, validation);
        }
    }

    let validations = raw_validations
        .into_iter()
        .filter_map(|(key, raw)| {
            let resolved = convert_validation(raw);
            if resolved.is_none() {
                warn!(key, "Skipping unresolvable validation");
            }
            resolved.map(|v| (key.to_string(), v))
        })
        .collect();

    let rules = blueprints
        .iter()
        .flat_map(|b| b.rules.iter())
        .chain(own.rules.iter())
        .filter_map(|raw| {
            let rule = raw
                .when
                .as_ref()
                .and_then(convert_condition)
                .zip(raw.then.as_ref().map(convert_action))
                .map(|(when, then)| Rule { when, then });
            if rule.is_none() {
                warn!("Skipping unresolvable rule");
            }
            rule
        })
        .collect();

    TagPolicy {
        mandatory_keys,
        validations,
        rules,
    }
}

fn convert_validation(raw: &RawValidation) -> Option<Validation> {
    match raw.tag_type.as_deref().map(str::trim)? {
        "bool" => Some(Validation::Bool),
        "int" => Some(Validation::Int(IntCheck {
            min: raw.min(),
            max: raw.max(),
            allowed: raw.allowed_values.clone(),
        })),
        "string" => {
            let check = if let Some(pattern) = raw.pattern() {
                StringCheck::Pattern(Regex::new(pattern).ok()?)
            } else if raw.allowed_values.is_empty() {
                StringCheck::Any
            } else {
                StringCheck::OneOf(raw.allowed_values.clone())
            };
            Some(Validation::String(check))
        }
        _ => None,
    }
}

fn convert_condition(raw: &RawCondition) -> Option<Condition> {
    if raw.operator_count() != 1 {
        return None;
    }

    if let Some(c) = &raw.exists {
        return Some(Condition::exists(&c.key));
    }
    if let Some(c) = &raw.equals {
        return Some(Condition::equals(&c.key, c.value_string()?));
    }
    if let Some(c) = &raw.not_equals {
        return Some(Condition::not_equals(&c.key, c.value_string()?));
    }
    if let Some(c) = &raw.contains {
        return Some(Condition::contains(&c.key, &c.value));
    }
    if let Some(c) = &raw.greater_than {
        return Some(Condition::greater_than(&c.key, c.value?));
    }
    if let Some(c) = &raw.less_than {
        return Some(Condition::less_than(&c.key, c.value?));
    }
    if let Some(children) = raw.and.as_ref().filter(|c| !c.is_empty()) {
        let children = children.iter().map(convert_condition).collect::<Option<_>>()?;
        return Some(Condition::And(children));
    }
    if let Some(children) = raw.or.as_ref().filter(|c| !c.is_empty()) {
        let children = children.iter().map(convert_condition).collect::<Option<_>>()?;
        return Some(Condition::Or(children));
    }
    None
}

fn convert_action(raw: &RawAction) -> Action {
    Action {
        must_contain_keys: raw.must_contain_keys.clone(),
        should_contain_keys: raw.should_contain_keys.clone(),
        error: raw.error.clone().filter(|m| !m.is_empty()),
        warn: raw.warn.clone().filter(|m| !m.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_yaml(yaml: &str) -> Vec<ResourceDefinition> {
        let doc: PolicyDocument = serde_yaml::from_str(yaml).unwrap();
        resolve(&doc).unwrap()
    }

    #[test]
    fn test_resolve_without_blueprints() {
        let defs = resolve_yaml(
            r"
resources:
  ec2:
    instance:
      mandatoryKeys: [name, environment]
",
        );

        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name(), "ec2.instance");
        assert_eq!(defs[0].policy.mandatory_keys, ["name", "environment"]);
    }

    #[test]
    fn test_empty_config_resolves_to_empty_definition() {
        let defs = resolve_yaml("resources:\n  s3:\n    bucket:\n");

        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name(), "s3.bucket");
        assert!(defs[0].policy.is_empty());
    }

    #[test]
    fn test_definitions_are_ordered() {
        let defs = resolve_yaml(
            r"
resources:
  s3:
    bucket:
  ec2:
    volume:
    instance:
",
        );

        let names: Vec<_> = defs.iter().map(ResourceDefinition::name).collect();
        assert_eq!(names, ["ec2.instance", "ec2.volume", "s3.bucket"]);
    }

    #[test]
    fn test_mandatory_keys_are_merged_without_duplicates() {
        let defs = resolve_yaml(
            r"
blueprints:
  base:
    mandatoryKeys: [environment, owner]
  billing:
    mandatoryKeys: [owner, cost-center]
resources:
  ec2:
    instance:
      extends: [blueprints.base, blueprints.billing]
      mandatoryKeys: [name, owner]
",
        );

        assert_eq!(
            defs[0].policy.mandatory_keys,
            ["name", "owner", "environment", "cost-center"]
        );
    }

    #[test]
    fn test_own_validation_overrides_blueprint() {
        let defs = resolve_yaml(
            r#"
blueprints:
  base:
    validations:
      environment:
        type: string
        allowedValues: [prod, dev]
      backup:
        type: bool
resources:
  ec2:
    instance:
      extends: [blueprints.base]
      validations:
        environment:
          type: string
          regex: "^(prod|staging)$"
"#,
        );

        let validations = &defs[0].policy.validations;
        assert_eq!(validations.len(), 2);
        assert_eq!(validations["backup"], Validation::Bool);
        match &validations["environment"] {
            Validation::String(StringCheck::Pattern(re)) => {
                assert_eq!(re.as_str(), "^(prod|staging)$");
            }
            other => panic!("unexpected validation: {other:?}"),
        }
    }

    #[test]
    fn test_later_blueprint_validation_wins() {
        let defs = resolve_yaml(
            r"
blueprints:
  first:
    validations:
      ttl:
        type: int
        maxValue: 30
  second:
    validations:
      ttl:
        type: int
        maxValue: 90
resources:
  ec2:
    instance:
      extends: [blueprints.first, blueprints.second]
",
        );

        assert_eq!(
            defs[0].policy.validations["ttl"],
            Validation::Int(IntCheck {
                min: None,
                max: Some(90),
                allowed: Vec::new(),
            })
        );
    }

    #[test]
    fn test_rules_blueprints_first_then_own() {
        let defs = resolve_yaml(
            r"
blueprints:
  base:
    rules:
      - when:
          exists: {key: a}
        then:
          warn: from blueprint
resources:
  ec2:
    instance:
      extends: [blueprints.base]
      rules:
        - when:
            exists: {key: b}
          then:
            error: from resource
",
        );

        let rules = &defs[0].policy.rules;
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].when, Condition::exists("a"));
        assert_eq!(rules[0].then.warn.as_deref(), Some("from blueprint"));
        assert_eq!(rules[1].when, Condition::exists("b"));
        assert_eq!(rules[1].then.error.as_deref(), Some("from resource"));
    }

    #[test]
    fn test_repeated_extends_merges_once() {
        let defs = resolve_yaml(
            r"
blueprints:
  base:
    rules:
      - when:
          exists: {key: a}
        then:
          warn: once
resources:
  ec2:
    instance:
      extends: [blueprints.base, blueprints.base]
",
        );

        assert_eq!(defs[0].policy.rules.len(), 1);
    }

    #[test]
    fn test_conditions_are_converted() {
        let defs = resolve_yaml(
            r"
resources:
  ec2:
    instance:
      rules:
        - when:
            and:
              - equals: {key: replicas, value: 3}
              - or:
                  - notEquals: {key: environment, value: dev}
                  - contains: {key: name, value: web}
                  - greaterThan: {key: tier, value: 2}
                  - lessThan: {key: ttl, value: 7.5}
          then:
            mustContainKeys: [owner]
            shouldContainKeys: [team]
",
        );

        let rule = &defs[0].policy.rules[0];
        assert_eq!(
            rule.when,
            Condition::And(vec![
                Condition::equals("replicas", "3"),
                Condition::Or(vec![
                    Condition::not_equals("environment", "dev"),
                    Condition::contains("name", "web"),
                    Condition::greater_than("tier", 2.0),
                    Condition::less_than("ttl", 7.5),
                ]),
            ])
        );
        assert_eq!(rule.then.must_contain_keys, ["owner"]);
        assert_eq!(rule.then.should_contain_keys, ["team"]);
    }

    #[test]
    fn test_invalid_document_is_rejected() {
        let doc: PolicyDocument =
            serde_yaml::from_str("resources:\n  ec2:\n    instance:\n      extends: [base]\n")
                .unwrap();

        let err = resolve(&doc).unwrap_err();
        assert_eq!(err.validation_errors().map(|e| e.len()), Some(1));
    }
}
