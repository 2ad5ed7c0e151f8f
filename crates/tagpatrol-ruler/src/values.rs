//! Type-specific tag value validation.

use tagpatrol_core::{IntCheck, StringCheck, Validation};

/// Checks one present tag value against its validation.
///
/// Returns the error messages in the order the checks run; an empty vector
/// means the value is acceptable.
///
/// # Examples
///
/// ```rust
/// use tagpatrol_core::{IntCheck, Validation};
/// use tagpatrol_ruler::validate_value;
///
/// let ttl = Validation::Int(IntCheck { min: Some(1), max: Some(90), allowed: vec![] });
///
/// assert!(validate_value("ttl", "30", &ttl).is_empty());
/// assert_eq!(
///     validate_value("ttl", "150", &ttl),
///     ["Tag `ttl` has value `150` which is greater than maximum: 90"]
/// );
/// ```
#[must_use]
pub fn validate_value(key: &str, value: &str, validation: &Validation) -> Vec<String> {
    match validation {
        Validation::String(check) => check_string(key, value, check).into_iter().collect(),
        Validation::Bool => check_bool(key, value).into_iter().collect(),
        Validation::Int(check) => check_int(key, value, check),
    }
}

fn check_string(key: &str, value: &str, check: &StringCheck) -> Option<String> {
    match check {
        StringCheck::Any => None,
        StringCheck::OneOf(allowed) => not_allowed(key, value, allowed),
        StringCheck::Pattern(re) => (!re.is_match(value)).then(|| {
            format!(
                "Tag `{key}` with value `{value}` does not match regex: `{}`",
                re.as_str()
            )
        }),
    }
}

fn check_bool(key: &str, value: &str) -> Option<String> {
    (value != "true" && value != "false")
        .then(|| format!("Tag `{key}` has value `{value}` which is not a valid boolean"))
}

fn check_int(key: &str, value: &str, check: &IntCheck) -> Vec<String> {
    let Ok(n) = value.parse::<i64>() else {
        return vec![format!(
            "Tag `{key}` has value `{value}` which is not a valid integer"
        )];
    };

    let mut errors = Vec::new();
    if let Some(min) = check.min.filter(|min| n < *min) {
        errors.push(format!(
            "Tag `{key}` has value `{n}` which is less than minimum: {min}"
        ));
    }
    if let Some(max) = check.max.filter(|max| n > *max) {
        errors.push(format!(
            "Tag `{key}` has value `{n}` which is greater than maximum: {max}"
        ));
    }
    errors.extend(not_allowed(key, value, &check.allowed));
    errors
}

fn not_allowed(key: &str, value: &str, allowed: &[String]) -> Option<String> {
    (!allowed.is_empty() && !allowed.iter().any(|a| a == value)).then(|| {
        format!(
            "Tag `{key}` has value `{value}` which is not in allowed values: `{}`",
            allowed.join(", ")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn ttl() -> Validation {
        Validation::Int(IntCheck {
            min: Some(1),
            max: Some(90),
            allowed: Vec::new(),
        })
    }

    #[test]
    fn test_int_within_bounds() {
        assert!(validate_value("ttl", "30", &ttl()).is_empty());
        assert!(validate_value("ttl", "1", &ttl()).is_empty());
        assert!(validate_value("ttl", "90", &ttl()).is_empty());
    }

    #[test]
    fn test_int_out_of_bounds() {
        assert_eq!(
            validate_value("ttl", "150", &ttl()),
            ["Tag `ttl` has value `150` which is greater than maximum: 90"]
        );
        assert_eq!(
            validate_value("ttl", "-3", &ttl()),
            ["Tag `ttl` has value `-3` which is less than minimum: 1"]
        );
    }

    #[test]
    fn test_int_parse_failure_stops_further_checks() {
        let check = Validation::Int(IntCheck {
            min: Some(1),
            max: Some(90),
            allowed: vec!["30".to_string()],
        });

        assert_eq!(
            validate_value("ttl", "thirty", &check),
            ["Tag `ttl` has value `thirty` which is not a valid integer"]
        );
        assert_eq!(validate_value("ttl", "1.5", &check).len(), 1);
    }

    #[test]
    fn test_int_errors_accumulate() {
        let check = Validation::Int(IntCheck {
            min: None,
            max: Some(10),
            allowed: vec!["1".to_string(), "5".to_string()],
        });

        let errors = validate_value("replicas", "20", &check);
        assert_eq!(
            errors,
            [
                "Tag `replicas` has value `20` which is greater than maximum: 10",
                "Tag `replicas` has value `20` which is not in allowed values: `1, 5`",
            ]
        );
    }

    #[test]
    fn test_int_allowed_values_compare_literal_text() {
        let check = Validation::Int(IntCheck {
            allowed: vec!["5".to_string()],
            ..IntCheck::default()
        });

        assert!(validate_value("n", "5", &check).is_empty());
        assert_eq!(validate_value("n", "05", &check).len(), 1);
    }

    #[test]
    fn test_bool_is_case_sensitive() {
        assert!(validate_value("backup", "true", &Validation::Bool).is_empty());
        assert!(validate_value("backup", "false", &Validation::Bool).is_empty());
        assert_eq!(
            validate_value("backup", "True", &Validation::Bool),
            ["Tag `backup` has value `True` which is not a valid boolean"]
        );
    }

    #[test]
    fn test_string_allowed_values() {
        let check = Validation::String(StringCheck::OneOf(vec![
            "prod".to_string(),
            "dev".to_string(),
        ]));

        assert!(validate_value("environment", "prod", &check).is_empty());
        assert_eq!(
            validate_value("environment", "qa", &check),
            ["Tag `environment` has value `qa` which is not in allowed values: `prod, dev`"]
        );
    }

    #[test]
    fn test_string_pattern() {
        let check = Validation::String(StringCheck::Pattern(Regex::new("^[a-z-]+$").unwrap()));

        assert!(validate_value("name", "web-server", &check).is_empty());
        assert_eq!(
            validate_value("name", "Web_Server", &check),
            ["Tag `name` with value `Web_Server` does not match regex: `^[a-z-]+$`"]
        );
    }

    #[test]
    fn test_string_any() {
        let check = Validation::String(StringCheck::Any);
        assert!(validate_value("note", "", &check).is_empty());
    }
}
