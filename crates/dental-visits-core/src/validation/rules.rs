//! Stock rules for the patient, hygienist and visit record forms.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use super::{FormValues, ValidationRule, ValidationRules};
use crate::models::{parse_time, VisitStatus};

pub const CANCELLATION_REASON_REQUIRED: &str = "Cancellation reason is required";
pub const TIME_FORMAT_MESSAGE: &str = "Time must be in HH:MM format";
pub const TIME_ORDER_MESSAGE: &str = "End time must be after start time";
pub const NUMBER_MESSAGE: &str = "Must be a number";

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const PHONE_PATTERN: &str = r"^[0-9+()\- ]{6,20}$";
const CODE_PATTERN: &str = r"^[A-Za-z0-9-]+$";
const DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}$";
const ID_PATTERN: &str = r"^\s*\d{1,18}\s*$";

fn cached(cell: &'static OnceLock<Regex>, pattern: &'static str) -> Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("built-in pattern compiles"))
        .clone()
}

pub fn email_regex() -> Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    cached(&CELL, EMAIL_PATTERN)
}

pub fn phone_regex() -> Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    cached(&CELL, PHONE_PATTERN)
}

fn code_regex() -> Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    cached(&CELL, CODE_PATTERN)
}

fn date_regex() -> Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    cached(&CELL, DATE_PATTERN)
}

fn id_regex() -> Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    cached(&CELL, ID_PATTERN)
}

/// Check an `HH:MM` value. `None` when well-formed.
pub fn validate_time_format(value: &str) -> Option<String> {
    parse_time(value)
        .err()
        .map(|_| TIME_FORMAT_MESSAGE.to_string())
}

/// Check a start/end pair: both must be `HH:MM` and end strictly after start.
pub fn validate_time_range(start: &str, end: &str) -> Option<String> {
    let (start, end) = match (parse_time(start), parse_time(end)) {
        (Ok(start), Ok(end)) => (start, end),
        _ => return Some(TIME_FORMAT_MESSAGE.to_string()),
    };
    (end <= start).then(|| TIME_ORDER_MESSAGE.to_string())
}

/// Cancellation reason rule: required only while `status` is `cancelled`.
pub fn cancellation_reason_rule(value: &str, all_values: &FormValues) -> Option<String> {
    let cancelled = all_values.get("status").map(String::as_str)
        == Some(VisitStatus::Cancelled.as_str());
    (cancelled && value.trim().is_empty()).then(|| CANCELLATION_REASON_REQUIRED.to_string())
}

fn time_field_rule(value: &str, _: &FormValues) -> Option<String> {
    if value.trim().is_empty() {
        return None;
    }
    validate_time_format(value)
}

fn end_time_rule(value: &str, all_values: &FormValues) -> Option<String> {
    if value.trim().is_empty() {
        return None;
    }
    let start = all_values.get("start_time").map(String::as_str).unwrap_or("");
    if start.trim().is_empty() {
        return validate_time_format(value);
    }
    // A malformed start time is reported on its own field.
    if validate_time_format(start).is_some() {
        return validate_time_format(value);
    }
    validate_time_range(start, value)
}

fn date_rule(value: &str, _: &FormValues) -> Option<String> {
    if value.trim().is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .err()
        .map(|_| format!("{} is not a calendar date", value))
}

fn status_rule(value: &str, _: &FormValues) -> Option<String> {
    value
        .parse::<VisitStatus>()
        .err()
        .map(|e| e.to_string())
}

/// Rules for the patient form.
pub fn patient_rules() -> ValidationRules {
    let mut rules = ValidationRules::new();
    rules.insert(
        "patient_code".into(),
        ValidationRule::new()
            .required()
            .max_length(20)
            .pattern(code_regex(), "Use letters, digits and hyphens only"),
    );
    rules.insert(
        "name".into(),
        ValidationRule::new().required().min_length(2).max_length(50),
    );
    rules.insert(
        "phone".into(),
        ValidationRule::new().pattern(phone_regex(), "Invalid phone number"),
    );
    rules.insert(
        "email".into(),
        ValidationRule::new().pattern(email_regex(), "Invalid email address"),
    );
    rules.insert("address".into(), ValidationRule::new().max_length(200));
    rules
}

/// Rules for the hygienist form.
pub fn hygienist_rules() -> ValidationRules {
    let mut rules = ValidationRules::new();
    rules.insert(
        "staff_code".into(),
        ValidationRule::new()
            .required()
            .max_length(20)
            .pattern(code_regex(), "Use letters, digits and hyphens only"),
    );
    rules.insert(
        "name".into(),
        ValidationRule::new().required().min_length(2).max_length(50),
    );
    rules.insert("license_number".into(), ValidationRule::new().max_length(30));
    rules.insert(
        "phone".into(),
        ValidationRule::new().pattern(phone_regex(), "Invalid phone number"),
    );
    rules.insert(
        "email".into(),
        ValidationRule::new().pattern(email_regex(), "Invalid email address"),
    );
    rules
}

/// Rules for the visit record form.
pub fn visit_record_rules() -> ValidationRules {
    let mut rules = ValidationRules::new();
    rules.insert(
        "patient_id".into(),
        ValidationRule::new().required().pattern(id_regex(), NUMBER_MESSAGE),
    );
    rules.insert(
        "hygienist_id".into(),
        ValidationRule::new().required().pattern(id_regex(), NUMBER_MESSAGE),
    );
    rules.insert(
        "visit_date".into(),
        ValidationRule::new()
            .required()
            .pattern(date_regex(), "Date must be in YYYY-MM-DD format")
            .custom(date_rule),
    );
    rules.insert("start_time".into(), ValidationRule::new().custom(time_field_rule));
    rules.insert("end_time".into(), ValidationRule::new().custom(end_time_rule));
    rules.insert(
        "status".into(),
        ValidationRule::new().required().custom(status_rule),
    );
    rules.insert(
        "cancellation_reason".into(),
        ValidationRule::new()
            .max_length(200)
            .custom(cancellation_reason_rule),
    );
    rules.insert("notes".into(), ValidationRule::new().max_length(500));
    rules
}
