//! Per-form validation state.

use std::collections::BTreeMap;

use super::{
    validate_field, validate_values, FormValues, ValidationErrors, ValidationOutcome,
    ValidationRules,
};

/// Values, touched flags and error messages for one form instance.
///
/// Touched fields are re-validated as their values change; untouched fields
/// are only validated by [`FormState::validate_all`].
#[derive(Debug, Clone)]
pub struct FormState {
    initial_values: FormValues,
    values: FormValues,
    rules: ValidationRules,
    touched: BTreeMap<String, bool>,
    errors: ValidationErrors,
}

impl FormState {
    /// Create a form from its initial values and rule map.
    pub fn new(initial_values: FormValues, rules: ValidationRules) -> Self {
        Self {
            values: initial_values.clone(),
            initial_values,
            rules,
            touched: BTreeMap::new(),
            errors: ValidationErrors::new(),
        }
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn touched(&self) -> &BTreeMap<String, bool> {
        &self.touched
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.get(field).copied().unwrap_or(false)
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Update a value. A touched field is re-validated immediately.
    pub fn set_value(&mut self, field: &str, value: impl Into<String>) {
        self.values.insert(field.to_string(), value.into());
        if self.is_touched(field) {
            self.refresh_error(field);
        }
    }

    /// Record touched state. Touching a field validates it.
    pub fn set_field_touched(&mut self, field: &str, touched: bool) {
        self.touched.insert(field.to_string(), touched);
        if touched {
            self.refresh_error(field);
        }
    }

    /// Validate `value` as if it were the value of `field`, using the
    /// current values (or `all_values` when given) for cross-field rules.
    pub fn validate_field(
        &self,
        field: &str,
        value: &str,
        all_values: Option<&FormValues>,
    ) -> String {
        validate_field(
            &self.rules,
            field,
            value,
            all_values.unwrap_or(&self.values),
        )
    }

    /// Validate every ruled field and replace the error map.
    pub fn validate_all(&mut self) -> ValidationOutcome {
        let outcome = validate_values(&self.rules, &self.values);
        self.errors = outcome.errors.clone();
        outcome
    }

    /// Record errors found outside the rule map, keeping existing ones.
    pub fn merge_errors(&mut self, errors: ValidationErrors) {
        self.errors
            .extend(errors.into_iter().filter(|(_, message)| !message.is_empty()));
    }

    /// Restore the initial values and clear errors and touched flags.
    pub fn reset_form(&mut self) {
        self.values = self.initial_values.clone();
        self.errors.clear();
        self.touched.clear();
    }

    /// Replace the initial values (e.g. when loading a record for editing)
    /// and reset to them.
    pub fn reinitialize(&mut self, initial_values: FormValues) {
        self.initial_values = initial_values;
        self.reset_form();
    }

    /// No recorded errors.
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// At least one recorded error.
    pub fn has_errors(&self) -> bool {
        self.errors.values().any(|message| !message.is_empty())
    }

    fn refresh_error(&mut self, field: &str) {
        let message = validate_field(&self.rules, field, self.value(field), &self.values);
        if message.is_empty() {
            self.errors.remove(field);
        } else {
            self.errors.insert(field.to_string(), message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{form_values, ValidationRule, REQUIRED_MESSAGE};
    use proptest::prelude::*;

    fn make_form() -> FormState {
        let mut rules = ValidationRules::new();
        rules.insert("name".into(), ValidationRule::new().required().min_length(2));
        rules.insert("code".into(), ValidationRule::new().required());
        rules.insert("memo".into(), ValidationRule::new().max_length(10));
        FormState::new(form_values([("name", ""), ("code", ""), ("memo", "")]), rules)
    }

    #[test]
    fn test_untouched_field_not_validated_on_change() {
        let mut form = make_form();
        form.set_value("name", "a");
        assert!(form.errors().is_empty());
        assert!(form.is_valid());
    }

    #[test]
    fn test_touch_validates_and_change_revalidates() {
        let mut form = make_form();
        form.set_field_touched("name", true);
        assert_eq!(form.error("name"), Some(REQUIRED_MESSAGE));

        form.set_value("name", "a");
        assert_eq!(form.error("name"), Some("Must be at least 2 characters"));

        form.set_value("name", "Aoi");
        assert_eq!(form.error("name"), None);
        assert!(!form.has_errors());
    }

    #[test]
    fn test_untouch_does_not_validate() {
        let mut form = make_form();
        form.set_field_touched("code", false);
        assert!(form.errors().is_empty());
        assert!(!form.is_touched("code"));
    }

    #[test]
    fn test_validate_all_on_empty_form() {
        let mut form = make_form();
        let outcome = form.validate_all();

        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors.contains_key("name"));
        assert!(outcome.errors.contains_key("code"));
        assert_eq!(form.errors(), &outcome.errors);
        assert!(form.has_errors());
        assert!(!form.is_valid());
    }

    #[test]
    fn test_validate_all_replaces_stale_errors() {
        let mut form = make_form();
        form.validate_all();
        form.set_value("name", "Aoi");
        form.set_value("code", "P-1");

        let outcome = form.validate_all();
        assert!(outcome.is_valid);
        assert!(form.errors().is_empty());
    }

    #[test]
    fn test_merge_errors_keeps_rule_errors() {
        let mut form = make_form();
        form.validate_all();
        form.merge_errors(form_values([("code", "Unknown code"), ("notes", "")]));

        assert!(!form.is_valid());
        assert_eq!(form.error("name"), Some(REQUIRED_MESSAGE));
        assert_eq!(form.error("code"), Some("Unknown code"));
        assert_eq!(form.error("notes"), None);
    }

    #[test]
    fn test_validate_field_with_explicit_values() {
        let form = make_form();
        assert_eq!(form.validate_field("name", "x", None), "Must be at least 2 characters");
        assert_eq!(form.validate_field("unruled", "", None), "");
    }

    #[test]
    fn test_reset_form_restores_initial_state() {
        let mut form = make_form();
        let initial = form.values().clone();

        form.set_value("name", "Aoi");
        form.set_field_touched("memo", true);
        form.set_value("memo", "far too long for this");
        form.validate_all();
        assert!(form.has_errors());

        form.reset_form();
        assert_eq!(form.values(), &initial);
        assert!(form.errors().is_empty());
        assert!(form.touched().is_empty());
    }

    #[test]
    fn test_reinitialize_sets_new_baseline() {
        let mut form = make_form();
        form.reinitialize(form_values([("name", "Rin"), ("code", "P-9")]));
        form.set_value("name", "Changed");
        form.reset_form();
        assert_eq!(form.value("name"), "Rin");
        assert_eq!(form.value("memo"), "");
    }

    proptest! {
        #[test]
        fn prop_is_valid_and_has_errors_agree(
            name in "[a-z]{0,4}",
            code in "[A-Z0-9-]{0,3}",
            touch_name in any::<bool>(),
            run_all in any::<bool>(),
        ) {
            let mut form = make_form();
            form.set_field_touched("name", touch_name);
            form.set_value("name", name);
            form.set_value("code", code);
            if run_all {
                form.validate_all();
            }
            prop_assert_eq!(form.is_valid(), !form.has_errors());
        }
    }
}
