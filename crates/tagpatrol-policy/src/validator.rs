//! Structural validation of policy documents.
//!
//! The validator walks the whole [`PolicyDocument`] and records every
//! violation it finds instead of stopping at the first one. The checks are:
//!
//! - `resources` must be present and non-empty
//! - every condition selects exactly one operator, with its operands set
//! - validation types are `string`, `bool` or `int`, and each constraint is
//!   only used with the types that support it
//! - regular expressions compile, `regex` and `allowedValues` are exclusive
//!   and `maxValue >= minValue`
//! - every `extends` entry reads `blueprints.<name>` and names a declared
//!   blueprint
//!
//! Blueprints are checked with the same rules as resource configurations.

use regex::Regex;
use tagpatrol_core::document::{
    parse_blueprint_ref, RawAction, RawCondition, RawTagPolicy, RawValidation, ResourceConfig,
    ValueCondition,
};
use tagpatrol_core::{PolicyDocument, ValidationError, ValidationErrors};
use tracing::debug;

/// Declared value types accepted in `validations`.
pub const TAG_TYPES: [&str; 3] = ["bool", "string", "int"];

const EXACTLY_ONE_OPERATOR: &str =
    "A condition must specify exactly one operator (e.g., exists, equals, and, or).";

/// Checks a policy document for internal consistency.
///
/// # Errors
///
/// Returns every violation found, in document order.
///
/// # Examples
///
/// ```rust
/// use tagpatrol_core::PolicyDocument;
/// use tagpatrol_policy::validate_document;
///
/// let doc: PolicyDocument = serde_yaml::from_str("blueprints: {}").unwrap();
/// let errors = validate_document(&doc).unwrap_err();
/// assert!(errors.to_string().contains("'resources' is required"));
/// ```
pub fn validate_document(doc: &PolicyDocument) -> std::result::Result<(), ValidationErrors> {
    let mut validator = DocumentValidator::new(doc);
    validator.check_blueprints();
    validator.check_resources();

    debug!(
        violations = validator.errors.len(),
        "Validated policy document"
    );
    validator.errors.into_result()
}

struct DocumentValidator<'a> {
    doc: &'a PolicyDocument,
    errors: ValidationErrors,
}

impl<'a> DocumentValidator<'a> {
    fn new(doc: &'a PolicyDocument) -> Self {
        Self {
            doc,
            errors: ValidationErrors::new(),
        }
    }

    fn check_blueprints(&mut self) {
        for (name, blueprint) in &self.doc.blueprints {
            let path = format!("blueprints.{name}");
            match blueprint {
                Some(blueprint) => self.check_policy(&path, &blueprint.policy),
                None => self.errors.add(ValidationError::required(path)),
            }
        }
    }

    fn check_resources(&mut self) {
        let Some(resources) = &self.doc.resources else {
            self.errors.add(ValidationError::required("resources"));
            return;
        };
        if resources.is_empty() {
            self.errors.add(ValidationError::empty("resources"));
            return;
        }

        for (service, types) in resources {
            let service_path = format!("resources.{service}");
            if service.trim().is_empty() {
                self.errors.add(ValidationError::required("resources.<service>"));
            }
            let Some(types) = types else {
                self.errors.add(ValidationError::required(service_path));
                continue;
            };

            for (resource_type, config) in types {
                let path = format!("{service_path}.{resource_type}");
                if resource_type.trim().is_empty() {
                    self.errors
                        .add(ValidationError::required(format!("{service_path}.<resourceType>")));
                }
                if let Some(config) = config {
                    self.check_policy(&path, &config.policy);
                    self.check_extends(&path, &format!("{service}.{resource_type}"), config);
                }
            }
        }
    }

    fn check_extends(&mut self, path: &str, owner: &str, config: &ResourceConfig) {
        for (i, reference) in config.extends.iter().enumerate() {
            let field = format!("{path}.extends[{i}]");
            let Some(name) = parse_blueprint_ref(reference) else {
                self.errors.add(ValidationError::format(
                    field,
                    format!("'{reference}' must be in the format 'blueprints.name'."),
                ));
                continue;
            };
            if !self.doc.blueprints.contains_key(name) {
                self.errors.add(ValidationError::reference(
                    field,
                    format!(
                        "Blueprint '{name}' referenced in '{owner}' does not exist in the 'blueprints' section."
                    ),
                ));
            }
        }
    }

    fn check_policy(&mut self, path: &str, policy: &RawTagPolicy) {
        for (i, key) in policy.mandatory_keys.iter().enumerate() {
            if key.trim().is_empty() {
                self.errors
                    .add(ValidationError::required(format!("{path}.mandatoryKeys[{i}]")));
            }
        }

        for (key, validation) in &policy.validations {
            let field = format!("{path}.validations.{key}");
            if key.trim().is_empty() {
                self.errors
                    .add(ValidationError::required(format!("{path}.validations.<key>")));
            }
            match validation {
                Some(validation) => self.check_validation(&field, validation),
                None => self.errors.add(ValidationError::required(field)),
            }
        }

        for (i, rule) in policy.rules.iter().enumerate() {
            let rule_path = format!("{path}.rules[{i}]");
            match &rule.when {
                Some(when) => self.check_condition(&format!("{rule_path}.when"), when),
                None => self
                    .errors
                    .add(ValidationError::required(format!("{rule_path}.when"))),
            }
            match &rule.then {
                Some(then) => self.check_action(&format!("{rule_path}.then"), then),
                None => self
                    .errors
                    .add(ValidationError::required(format!("{rule_path}.then"))),
            }
        }
    }

    fn check_validation(&mut self, path: &str, v: &RawValidation) {
        if let Some(regex) = v.pattern() {
            if let Err(e) = Regex::new(regex) {
                self.errors.add(ValidationError::format(
                    path,
                    format!("Field 'regex' must be a valid regular expression: {e}"),
                ));
            }
        }

        for (i, value) in v.allowed_values.iter().enumerate() {
            if value.is_empty() {
                self.errors
                    .add(ValidationError::required(format!("{path}.allowedValues[{i}]")));
            }
        }

        // An explicit zero minimum still bounds a non-zero maximum.
        if let Some(max) = v.max() {
            let min = v.min_value.unwrap_or(0);
            if max < min {
                self.errors.add(ValidationError::range(
                    path,
                    format!(
                        "Field 'maxValue' ({max}) must be greater than or equal to 'minValue' ({min})."
                    ),
                ));
            }
        }

        let tag_type = match v.tag_type.as_deref().map(str::trim) {
            None | Some("") => {
                self.errors.add(ValidationError::required(format!("{path}.type")));
                return;
            }
            Some(t) if !TAG_TYPES.contains(&t) => {
                self.errors.add(ValidationError::format(
                    path,
                    format!("Field 'type' must be one of [bool, string, int] (got '{t}')."),
                ));
                return;
            }
            Some(t) => t,
        };

        let has_allowed = !v.allowed_values.is_empty();
        let has_regex = v.pattern().is_some();

        if tag_type == "bool" {
            let extras = [
                ("minValue", v.min().is_some()),
                ("maxValue", v.max().is_some()),
                ("allowedValues", has_allowed),
                ("regex", has_regex),
            ];
            for (field, present) in extras {
                if present {
                    self.errors.add(ValidationError::constraint(
                        path,
                        format!("Field '{field}' is not applicable when type is 'bool'."),
                    ));
                }
            }
        }

        if tag_type != "int" {
            for (field, present) in [("minValue", v.min().is_some()), ("maxValue", v.max().is_some())] {
                if present {
                    self.errors.add(ValidationError::constraint(
                        path,
                        format!(
                            "Field '{field}' is only applicable when type is 'int' (current type: '{tag_type}')."
                        ),
                    ));
                }
            }
        }

        if has_allowed && tag_type != "int" && tag_type != "string" {
            self.errors.add(ValidationError::constraint(
                path,
                format!(
                    "Field 'allowedValues' is only applicable when type is 'int' or 'string' (current type: '{tag_type}')."
                ),
            ));
        }

        if has_regex && tag_type != "string" {
            self.errors.add(ValidationError::constraint(
                path,
                format!(
                    "Field 'regex' is only applicable when type is 'string' (current type: '{tag_type}')."
                ),
            ));
        }

        if has_regex && has_allowed {
            self.errors.add(ValidationError::constraint(
                path,
                "Cannot specify both Regex and AllowedValues.",
            ));
        }
    }

    fn check_condition(&mut self, path: &str, c: &RawCondition) {
        if c.operator_count() != 1 {
            self.errors
                .add(ValidationError::constraint(path, EXACTLY_ONE_OPERATOR));
        }

        if let Some(exists) = &c.exists {
            self.require_key(&format!("{path}.exists"), &exists.key);
        }
        if let Some(equals) = &c.equals {
            self.check_value_condition(&format!("{path}.equals"), equals);
        }
        if let Some(not_equals) = &c.not_equals {
            self.check_value_condition(&format!("{path}.notEquals"), not_equals);
        }
        if let Some(contains) = &c.contains {
            let field = format!("{path}.contains");
            self.require_key(&field, &contains.key);
            if contains.value.is_empty() {
                self.errors
                    .add(ValidationError::required(format!("{field}.value")));
            }
        }
        for (name, numeric) in [("greaterThan", &c.greater_than), ("lessThan", &c.less_than)] {
            if let Some(numeric) = numeric {
                let field = format!("{path}.{name}");
                self.require_key(&field, &numeric.key);
                if numeric.value.is_none() {
                    self.errors
                        .add(ValidationError::required(format!("{field}.value")));
                }
            }
        }
        for (name, children) in [("and", &c.and), ("or", &c.or)] {
            for (i, child) in children.iter().flatten().enumerate() {
                self.check_condition(&format!("{path}.{name}[{i}]"), child);
            }
        }
    }

    fn check_value_condition(&mut self, path: &str, c: &ValueCondition) {
        self.require_key(path, &c.key);
        if c.value_string().is_none() {
            let field = format!("{path}.value");
            if c.value.as_ref().map_or(true, serde_yaml::Value::is_null) {
                self.errors.add(ValidationError::required(field));
            } else {
                self.errors.add(ValidationError::format(
                    field,
                    "Field 'value' must be a scalar (string, number or boolean).",
                ));
            }
        }
    }

    fn check_action(&mut self, path: &str, action: &RawAction) {
        for (name, keys) in [
            ("mustContainKeys", &action.must_contain_keys),
            ("shouldContainKeys", &action.should_contain_keys),
        ] {
            for (i, key) in keys.iter().enumerate() {
                if key.trim().is_empty() {
                    self.errors
                        .add(ValidationError::required(format!("{path}.{name}[{i}]")));
                }
            }
        }
    }

    fn require_key(&mut self, path: &str, key: &str) {
        if key.trim().is_empty() {
            self.errors
                .add(ValidationError::required(format!("{path}.key")));
        }
    }
}
