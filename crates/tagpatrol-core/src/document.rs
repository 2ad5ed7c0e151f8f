//! Raw policy document.
//!
//! These types mirror the YAML policy file one-to-one. They are deliberately
//! permissive: a condition may carry zero or several operators, `extends`
//! references are plain strings and validation types are free-form. The
//! policy crate checks a [`PolicyDocument`] for structural consistency and
//! resolves it into [`crate::ResourceDefinition`]s.
//!
//! ```yaml
//! blueprints:
//!   base:
//!     mandatoryKeys: [environment, owner]
//! resources:
//!   ec2:
//!     instance:
//!       extends: [blueprints.base]
//!       validations:
//!         environment:
//!           type: string
//!           allowedValues: [prod, staging, dev]
//!   s3:
//!     bucket:
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Prefix every `extends` reference must carry.
pub const BLUEPRINT_PREFIX: &str = "blueprints";

/// Resource configurations of one service, keyed by resource type.
///
/// A `None` configuration is a declared resource type without any policy.
pub type ServiceResources = BTreeMap<String, Option<ResourceConfig>>;

/// Top-level policy document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Reusable policy fragments, keyed by blueprint name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub blueprints: BTreeMap<String, Option<Blueprint>>,

    /// Per-service resource configurations.
    ///
    /// `None` when the document has no `resources` section at all.
    #[serde(default)]
    pub resources: Option<BTreeMap<String, Option<ServiceResources>>>,
}

impl PolicyDocument {
    /// Looks up a blueprint by its bare name.
    #[must_use]
    pub fn blueprint(&self, name: &str) -> Option<&Blueprint> {
        self.blueprints.get(name).and_then(Option::as_ref)
    }

    /// Iterates over every declared `(service, resource type, configuration)`.
    pub fn resource_entries(
        &self,
    ) -> impl Iterator<Item = (&str, &str, Option<&ResourceConfig>)> + '_ {
        self.resources
            .iter()
            .flat_map(BTreeMap::iter)
            .filter_map(|(service, types)| types.as_ref().map(|types| (service, types)))
            .flat_map(|(service, types)| {
                types.iter().map(move |(resource_type, config)| {
                    (service.as_str(), resource_type.as_str(), config.as_ref())
                })
            })
    }
}

/// A named, reusable policy fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// The fragment's policy.
    #[serde(flatten)]
    pub policy: RawTagPolicy,
}

/// Policy configuration for one resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// The resource type's own policy.
    #[serde(flatten)]
    pub policy: RawTagPolicy,

    /// Blueprint references in the form `blueprints.<name>`.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,
}

impl ResourceConfig {
    /// Returns the blueprint names referenced by `extends`.
    ///
    /// References that are not in the `blueprints.<name>` form are skipped.
    pub fn blueprint_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.extends.iter().filter_map(|r| parse_blueprint_ref(r))
    }
}

/// Parses a `blueprints.<name>` reference into its name.
///
/// # Examples
///
/// ```rust
/// use tagpatrol_core::document::parse_blueprint_ref;
///
/// assert_eq!(parse_blueprint_ref("blueprints.base"), Some("base"));
/// assert_eq!(parse_blueprint_ref("base"), None);
/// assert_eq!(parse_blueprint_ref("blueprints."), None);
/// assert_eq!(parse_blueprint_ref("blueprints.a.b"), None);
/// ```
#[must_use]
pub fn parse_blueprint_ref(reference: &str) -> Option<&str> {
    let (prefix, name) = reference.trim().split_once('.')?;
    (prefix == BLUEPRINT_PREFIX && !name.is_empty() && !name.contains('.')).then_some(name)
}

/// Mandatory keys, validations and rules as authored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTagPolicy {
    /// Tag keys that must be present.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub mandatory_keys: Vec<String>,

    /// Per-tag value validations.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "BTreeMap::is_empty")]
    pub validations: BTreeMap<String, Option<RawValidation>>,

    /// Conditional rules, in declaration order.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RawRule>,
}

/// Value validation for one tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawValidation {
    /// Declared value type: `string`, `bool` or `int`.
    #[serde(rename = "type", default)]
    pub tag_type: Option<String>,

    /// Closed list of acceptable values.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,

    /// Pattern the value must match (string type only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    /// Inclusive lower bound (int type only). Zero means unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,

    /// Inclusive upper bound (int type only). Zero means unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
}

impl RawValidation {
    /// Returns the lower bound, treating zero as unset.
    #[must_use]
    pub fn min(&self) -> Option<i64> {
        self.min_value.filter(|v| *v != 0)
    }

    /// Returns the upper bound, treating zero as unset.
    #[must_use]
    pub fn max(&self) -> Option<i64> {
        self.max_value.filter(|v| *v != 0)
    }

    /// Returns the regex, treating an empty pattern as unset.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.regex.as_deref().filter(|r| !r.is_empty())
    }
}

/// A `when`/`then` pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRule {
    /// Trigger condition.
    #[serde(default)]
    pub when: Option<RawCondition>,

    /// Effects applied when the condition holds.
    #[serde(default)]
    pub then: Option<RawAction>,
}

/// Condition node; well-formed nodes set exactly one operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCondition {
    /// Key presence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<KeyCondition>,

    /// Value equality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<ValueCondition>,

    /// Value inequality; an absent key satisfies it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_equals: Option<ValueCondition>,

    /// Substring containment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<SubstringCondition>,

    /// Numeric strictly-greater-than.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greater_than: Option<NumericCondition>,

    /// Numeric strictly-less-than.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub less_than: Option<NumericCondition>,

    /// Conjunction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<RawCondition>>,

    /// Disjunction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<RawCondition>>,
}

impl RawCondition {
    /// Counts the operators this node selects.
    ///
    /// Empty `and`/`or` lists do not count as a selected operator.
    #[must_use]
    pub fn operator_count(&self) -> usize {
        [
            self.exists.is_some(),
            self.equals.is_some(),
            self.not_equals.is_some(),
            self.contains.is_some(),
            self.greater_than.is_some(),
            self.less_than.is_some(),
            self.and.as_ref().is_some_and(|c| !c.is_empty()),
            self.or.as_ref().is_some_and(|c| !c.is_empty()),
        ]
        .into_iter()
        .filter(|selected| *selected)
        .count()
    }
}

/// Operand of `exists`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCondition {
    /// Tag key.
    #[serde(default)]
    pub key: String,
}

/// Operand of `equals` and `notEquals`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueCondition {
    /// Tag key.
    #[serde(default)]
    pub key: String,

    /// Scalar to compare against, compared by its string form.
    #[serde(default)]
    pub value: Option<serde_yaml::Value>,
}

impl ValueCondition {
    /// Returns the string form of the comparison value.
    ///
    /// Returns `None` when the value is missing or not a scalar.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tagpatrol_core::document::ValueCondition;
    ///
    /// let condition: ValueCondition = serde_yaml::from_str("{key: replicas, value: 3}").unwrap();
    /// assert_eq!(condition.value_string().as_deref(), Some("3"));
    /// ```
    #[must_use]
    pub fn value_string(&self) -> Option<String> {
        match self.value.as_ref()? {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            serde_yaml::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Operand of `contains`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstringCondition {
    /// Tag key.
    #[serde(default)]
    pub key: String,

    /// Substring the value must contain.
    #[serde(default)]
    pub value: String,
}

/// Operand of `greaterThan` and `lessThan`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericCondition {
    /// Tag key.
    #[serde(default)]
    pub key: String,

    /// Numeric threshold.
    #[serde(default)]
    pub value: Option<f64>,
}

/// Effects of a matching rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAction {
    /// Keys whose absence is an error.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub must_contain_keys: Vec<String>,

    /// Keys whose absence is a warning.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub should_contain_keys: Vec<String>,

    /// Literal warning message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<String>,

    /// Literal error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Deserializes an explicit YAML `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> PolicyDocument {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_minimal_document() {
        let doc = parse(
            r"
resources:
  ec2:
    instance:
      mandatoryKeys:
        - name
        - environment
",
        );

        assert!(doc.blueprints.is_empty());
        let entries: Vec<_> = doc.resource_entries().collect();
        assert_eq!(entries.len(), 1);
        let (service, resource_type, config) = entries[0];
        assert_eq!(service, "ec2");
        assert_eq!(resource_type, "instance");
        assert_eq!(config.unwrap().policy.mandatory_keys, ["name", "environment"]);
    }

    #[test]
    fn test_empty_resource_config_is_none() {
        let doc = parse(
            r"
resources:
  s3:
    bucket:
",
        );

        let entries: Vec<_> = doc.resource_entries().collect();
        assert_eq!(entries, vec![("s3", "bucket", None)]);
    }

    #[test]
    fn test_missing_resources_section() {
        let doc = parse("blueprints:\n  base:\n    mandatoryKeys: [owner]\n");

        assert!(doc.resources.is_none());
        assert!(doc.blueprint("base").is_some());
        assert_eq!(doc.resource_entries().count(), 0);
    }

    #[test]
    fn test_parse_blueprint_and_extends() {
        let doc = parse(
            r"
blueprints:
  base:
    mandatoryKeys: [environment, owner]
resources:
  ec2:
    instance:
      extends: [blueprints.base, nonsense]
",
        );

        let config = doc.resource_entries().next().unwrap().2.unwrap();
        assert_eq!(config.extends.len(), 2);
        let names: Vec<_> = config.blueprint_names().collect();
        assert_eq!(names, ["base"]);
        assert_eq!(
            doc.blueprint("base").unwrap().policy.mandatory_keys,
            ["environment", "owner"]
        );
    }

    #[test]
    fn test_parse_validation_fields() {
        let doc = parse(
            r#"
resources:
  ec2:
    instance:
      validations:
        ttl:
          type: int
          minValue: 1
          maxValue: 90
        name:
          type: string
          regex: "^[a-z-]+$"
"#,
        );

        let config = doc.resource_entries().next().unwrap().2.unwrap();
        let ttl = config.policy.validations["ttl"].as_ref().unwrap();
        assert_eq!(ttl.tag_type.as_deref(), Some("int"));
        assert_eq!(ttl.min(), Some(1));
        assert_eq!(ttl.max(), Some(90));

        let name = config.policy.validations["name"].as_ref().unwrap();
        assert_eq!(name.pattern(), Some("^[a-z-]+$"));
    }

    #[test]
    fn test_zero_bounds_are_unset() {
        let validation = RawValidation {
            tag_type: Some("int".to_string()),
            min_value: Some(0),
            max_value: Some(0),
            ..RawValidation::default()
        };

        assert_eq!(validation.min(), None);
        assert_eq!(validation.max(), None);
    }

    #[test]
    fn test_operator_count() {
        let condition: RawCondition = serde_yaml::from_str(
            r"
exists:
  key: a
equals:
  key: b
  value: c
",
        )
        .unwrap();
        assert_eq!(condition.operator_count(), 2);

        let unknown: RawCondition = serde_yaml::from_str("invalidCondition:\n  key: test\n").unwrap();
        assert_eq!(unknown.operator_count(), 0);

        let empty_and: RawCondition = serde_yaml::from_str("and: []\n").unwrap();
        assert_eq!(empty_and.operator_count(), 0);
    }

    #[test]
    fn test_value_string_forms() {
        let cases = [
            ("{key: k, value: prod}", Some("prod")),
            ("{key: k, value: 3}", Some("3")),
            ("{key: k, value: true}", Some("true")),
            ("{key: k, value: 1.5}", Some("1.5")),
            ("{key: k}", None),
            ("{key: k, value: [a]}", None),
        ];

        for (yaml, expected) in cases {
            let condition: ValueCondition = serde_yaml::from_str(yaml).unwrap();
            assert_eq!(condition.value_string().as_deref(), expected, "{yaml}");
        }
    }

    #[test]
    fn test_parse_nested_rule() {
        let doc = parse(
            r#"
resources:
  ec2:
    instance:
      rules:
        - when:
            and:
              - equals:
                  key: environment
                  value: prod
              - exists:
                  key: critical
          then:
            mustContainKeys: [dr-policy]
            error: "Critical production resources need a DR policy"
"#,
        );

        let config = doc.resource_entries().next().unwrap().2.unwrap();
        let rule = &config.policy.rules[0];
        let when = rule.when.as_ref().unwrap();
        assert_eq!(when.operator_count(), 1);
        assert_eq!(when.and.as_ref().unwrap().len(), 2);
        let then = rule.then.as_ref().unwrap();
        assert_eq!(then.must_contain_keys, ["dr-policy"]);
        assert!(then.warn.is_none());
    }
}
