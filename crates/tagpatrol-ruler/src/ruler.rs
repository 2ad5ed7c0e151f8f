//! The [`Ruler`] seam and its default implementation.

use tagpatrol_core::{Action, CloudResource, TagPolicy};
use tracing::trace;

use crate::condition::evaluate;
use crate::values::validate_value;

/// Number of resources that ended compliant and non-compliant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComplianceCount {
    /// Resources without compliance errors.
    pub compliant: usize,
    /// Resources with at least one compliance error.
    pub non_compliant: usize,
}

impl ComplianceCount {
    /// Returns the total number of resources counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.compliant + self.non_compliant
    }
}

/// Checks resources against a resolved tag policy.
///
/// Implementations record findings on the resource and never fail.
/// Calling [`Ruler::validate`] twice on the same resource records every
/// finding twice.
pub trait Ruler: Send + Sync {
    /// Evaluates one resource, recording errors and warnings on it.
    fn validate(&self, resource: &mut dyn CloudResource, policy: &TagPolicy);

    /// Evaluates every resource and counts how many ended compliant.
    ///
    /// A resource that already carried errors before the call counts as
    /// non-compliant.
    fn validate_all(
        &self,
        resources: &mut [Box<dyn CloudResource>],
        policy: &TagPolicy,
    ) -> ComplianceCount {
        let mut count = ComplianceCount::default();
        for resource in resources.iter_mut() {
            self.validate(resource.as_mut(), policy);
            if resource.is_compliant() {
                count.compliant += 1;
            } else {
                count.non_compliant += 1;
            }
        }
        count
    }
}

/// The standard rule engine.
///
/// Runs mandatory-key checks, then value validations in key order, then the
/// conditional rules in declaration order.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRuler;

impl DefaultRuler {
    /// Creates a new rule engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn check_mandatory_keys(resource: &mut dyn CloudResource, keys: &[String]) {
        for key in keys {
            if !resource.tags().contains_key(key) {
                resource.add_compliance_error(format!("Missing mandatory tag: `{key}`"));
            }
        }
    }

    fn check_values(resource: &mut dyn CloudResource, policy: &TagPolicy) {
        let findings: Vec<String> = policy
            .validations
            .iter()
            .filter_map(|(key, validation)| {
                resource
                    .tags()
                    .get(key)
                    .map(|value| validate_value(key, value, validation))
            })
            .flatten()
            .collect();

        for finding in findings {
            resource.add_compliance_error(finding);
        }
    }

    fn apply_rules(resource: &mut dyn CloudResource, policy: &TagPolicy) {
        for rule in &policy.rules {
            if evaluate(&rule.when, resource.tags()) {
                trace!(id = resource.id(), condition = %rule.when, "Rule matched");
                Self::apply_action(resource, &rule.then);
            }
        }
    }

    fn apply_action(resource: &mut dyn CloudResource, action: &Action) {
        for key in &action.must_contain_keys {
            if !resource.tags().contains_key(key) {
                resource.add_compliance_error(format!(
                    "Missing required tag `{key}` based on rule condition"
                ));
            }
        }

        for key in &action.should_contain_keys {
            if !resource.tags().contains_key(key) {
                resource.add_compliance_warning(format!(
                    "Missing recommended tag `{key}` based on rule condition"
                ));
            }
        }

        if let Some(error) = &action.error {
            resource.add_compliance_error(error.clone());
        }

        if let Some(warn) = &action.warn {
            resource.add_compliance_warning(warn.clone());
        }
    }
}

impl Ruler for DefaultRuler {
    fn validate(&self, resource: &mut dyn CloudResource, policy: &TagPolicy) {
        Self::check_mandatory_keys(resource, &policy.mandatory_keys);
        Self::check_values(resource, policy);
        Self::apply_rules(resource, policy);

        trace!(
            id = resource.id(),
            errors = resource.compliance_errors().len(),
            warnings = resource.compliance_warnings().len(),
            "Evaluated resource"
        );
    }
}
