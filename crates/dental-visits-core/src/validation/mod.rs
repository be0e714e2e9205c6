//! Declarative form validation.
//!
//! A [`ValidationRule`] describes the constraints on one field; a
//! [`ValidationRules`] map keys rules by field name. [`validate_field`]
//! evaluates one field, [`FormState`] tracks values, touched flags and errors
//! for a whole form.
//!
//! Validation never fails: every outcome is an entry (or the absence of one)
//! in a [`ValidationErrors`] map.

mod form;
mod rules;

pub use form::*;
pub use rules::*;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;

/// Current form values, keyed by field name. Missing keys read as `""`.
pub type FormValues = BTreeMap<String, String>;

/// Error messages keyed by field name. Only fields with a violation appear.
pub type ValidationErrors = BTreeMap<String, String>;

/// Rules keyed by field name.
pub type ValidationRules = BTreeMap<String, ValidationRule>;

/// Cross-field validator: receives the field value and every form value,
/// returns an error message or `None`.
pub type CustomValidator = Arc<dyn Fn(&str, &FormValues) -> Option<String> + Send + Sync>;

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const PATTERN_MESSAGE: &str = "Invalid format";

/// Constraints for a single field.
#[derive(Clone, Default)]
pub struct ValidationRule {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    /// Message used when `pattern` does not match
    pub pattern_message: Option<String>,
    pub custom: Option<CustomValidator>,
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("required", &self.required)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(Regex::as_str))
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl ValidationRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: Regex, message: impl Into<String>) -> Self {
        self.pattern = Some(pattern);
        self.pattern_message = Some(message.into());
        self
    }

    pub fn custom<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str, &FormValues) -> Option<String> + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(validator));
        self
    }

    /// Evaluate this rule. Returns the first violated constraint's message,
    /// or an empty string when the value passes.
    ///
    /// Order: required, min length, max length, pattern, custom. An empty
    /// optional value skips the length and pattern checks; the custom
    /// validator still runs so it can decide required-ness from other fields.
    pub fn check(&self, value: &str, all_values: &FormValues) -> String {
        let is_empty = value.trim().is_empty();

        if self.required && is_empty {
            return REQUIRED_MESSAGE.to_string();
        }

        if !is_empty {
            let length = value.chars().count();
            if let Some(min) = self.min_length {
                if length < min {
                    return format!("Must be at least {} characters", min);
                }
            }
            if let Some(max) = self.max_length {
                if length > max {
                    return format!("Must be at most {} characters", max);
                }
            }
            if let Some(pattern) = &self.pattern {
                if !pattern.is_match(value) {
                    return self
                        .pattern_message
                        .clone()
                        .unwrap_or_else(|| PATTERN_MESSAGE.to_string());
                }
            }
        }

        self.custom
            .as_ref()
            .and_then(|custom| custom(value, all_values))
            .unwrap_or_default()
    }
}

/// Outcome of validating every ruled field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: ValidationErrors,
}

/// Validate one field against its rule. Fields without a rule always pass.
pub fn validate_field(
    rules: &ValidationRules,
    field: &str,
    value: &str,
    all_values: &FormValues,
) -> String {
    rules
        .get(field)
        .map(|rule| rule.check(value, all_values))
        .unwrap_or_default()
}

/// Validate every ruled field in `values`.
pub fn validate_values(rules: &ValidationRules, values: &FormValues) -> ValidationOutcome {
    let errors: ValidationErrors = rules
        .iter()
        .filter_map(|(field, rule)| {
            let value = values.get(field).map(String::as_str).unwrap_or("");
            let message = rule.check(value, values);
            (!message.is_empty()).then(|| (field.clone(), message))
        })
        .collect();

    ValidationOutcome {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Build a [`FormValues`] map from string pairs.
pub fn form_values<'a, I>(pairs: I) -> FormValues
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rules_for(field: &str, rule: ValidationRule) -> ValidationRules {
        let mut rules = ValidationRules::new();
        rules.insert(field.to_string(), rule);
        rules
    }

    #[test]
    fn test_required_rejects_whitespace() {
        let rules = rules_for("name", ValidationRule::new().required());
        let values = FormValues::new();

        assert_eq!(validate_field(&rules, "name", "", &values), REQUIRED_MESSAGE);
        assert_eq!(validate_field(&rules, "name", "   ", &values), REQUIRED_MESSAGE);
        assert_eq!(validate_field(&rules, "name", "Aki", &values), "");
    }

    #[test]
    fn test_check_order_reports_first_failure() {
        let rule = ValidationRule::new()
            .required()
            .min_length(3)
            .pattern(Regex::new(r"^\d+$").unwrap(), "Digits only")
            .custom(|_, _| Some("custom".into()));
        let values = FormValues::new();

        assert_eq!(rule.check("", &values), REQUIRED_MESSAGE);
        assert_eq!(rule.check("ab", &values), "Must be at least 3 characters");
        assert_eq!(rule.check("abc", &values), "Digits only");
        assert_eq!(rule.check("123", &values), "custom");
    }

    #[test]
    fn test_max_length() {
        let rule = ValidationRule::new().max_length(4);
        let values = FormValues::new();
        assert_eq!(rule.check("abcd", &values), "");
        assert_eq!(rule.check("abcde", &values), "Must be at most 4 characters");
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let rule = ValidationRule::new().max_length(4);
        assert_eq!(rule.check("山田花子", &FormValues::new()), "");
    }

    #[test]
    fn test_empty_optional_skips_length_and_pattern_but_runs_custom() {
        let rule = ValidationRule::new()
            .min_length(5)
            .pattern(Regex::new(r"^x+$").unwrap(), "x only")
            .custom(|value, all| {
                (value.is_empty() && all.get("mode").map(String::as_str) == Some("strict"))
                    .then(|| "needed in strict mode".to_string())
            });

        let relaxed = form_values([("mode", "relaxed")]);
        let strict = form_values([("mode", "strict")]);

        assert_eq!(rule.check("", &relaxed), "");
        assert_eq!(rule.check("", &strict), "needed in strict mode");
    }

    #[test]
    fn test_unknown_field_passes() {
        let rules = ValidationRules::new();
        assert_eq!(validate_field(&rules, "anything", "", &FormValues::new()), "");
    }

    #[test]
    fn test_validate_values_one_error_per_required_field() {
        let mut rules = ValidationRules::new();
        rules.insert("a".into(), ValidationRule::new().required());
        rules.insert("b".into(), ValidationRule::new().required().min_length(2));
        rules.insert("c".into(), ValidationRule::new().max_length(2));

        let outcome = validate_values(&rules, &FormValues::new());
        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors["a"], REQUIRED_MESSAGE);
        assert_eq!(outcome.errors["b"], REQUIRED_MESSAGE);
    }

    proptest! {
        #[test]
        fn prop_min_length_boundary(n in 1usize..40) {
            let rule = ValidationRule::new().required().min_length(n);
            let values = FormValues::new();
            let short = "a".repeat(n - 1);
            let exact = "a".repeat(n);

            prop_assert!(!rule.check(&short, &values).is_empty());
            prop_assert!(rule.check(&exact, &values).is_empty());
        }

        #[test]
        fn prop_max_length_boundary(n in 0usize..40) {
            let rule = ValidationRule::new().max_length(n);
            let values = FormValues::new();
            prop_assert!(!rule.check(&"b".repeat(n + 1), &values).is_empty());
            prop_assert!(rule.check(&"b".repeat(n), &values).is_empty());
        }
    }
}
