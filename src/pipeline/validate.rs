//! Type-aware field validation and correction.
//!
//! Dispatch goes through the pattern table in `schema.rs`. Each failing rule
//! appends a distinct error string and applies that rule's confidence
//! penalty; an auto-correction that turns an invalid value into a valid one
//! earns a small bonus. Revalidating an already-valid, error-free field is
//! a no-op.

use std::sync::LazyLock;

use regex::Regex;

use super::schema::{rule_for_field, RuleKind};
use crate::config;

/// Digit run with optional thousands separators and decimal point.
static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(\.\d+)?").unwrap());

/// A stray letter standing in for a decimal separator between digits:
/// OCR commonly misreads '.' as 'o' or 'l'.
static CURRENCY_OCR_FIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)[ol](\d)").unwrap());

/// Accepted date shapes after separator normalization.
static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^\d{1,2}-\d{1,2}-\d{2,4}$").unwrap(),
        Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}$").unwrap(),
        Regex::new(r"^[A-Za-z]+ \d{1,2}, \d{4}$").unwrap(),
        Regex::new(r"^\d{1,2} [A-Za-z]+ \d{4}$").unwrap(),
    ]
});

/// A stray 'o' standing in for a date separator between digits.
static DATE_SEP_FIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d)o(\d)").unwrap());

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Result of running a field's applicable rule: possibly corrected value,
/// adjusted confidence, and any recorded violations.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub value: String,
    pub confidence: f32,
    pub errors: Vec<String>,
}

/// Validate and correct one field value.
///
/// Empty values skip all rules: the gap analysis and merge policy deal with
/// those, not the validator.
pub fn validate_field(field_name: &str, value: &str, confidence: f32) -> ValidationOutcome {
    let trimmed = value.trim();
    let mut outcome = ValidationOutcome {
        value: trimmed.to_string(),
        confidence,
        errors: Vec::new(),
    };

    if trimmed.is_empty() {
        return outcome;
    }

    match rule_for_field(field_name) {
        Some(RuleKind::Currency) => validate_currency(trimmed, &mut outcome),
        Some(RuleKind::Date) => validate_date(trimmed, &mut outcome),
        Some(RuleKind::Email) => validate_email(trimmed, &mut outcome),
        Some(RuleKind::Phone) => validate_phone(trimmed, &mut outcome),
        Some(RuleKind::Name) => outcome.value = title_case(trimmed),
        None => {}
    }

    outcome.confidence = outcome.confidence.clamp(0.0, 1.0);
    outcome
}

/// Overlapping confusions ("1o2o3") need repeated passes; correcting to a
/// fixpoint keeps revalidation a no-op.
fn correct_to_fixpoint(re: &Regex, replacement: &str, input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let next = re.replace_all(&current, replacement).into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

fn validate_currency(value: &str, outcome: &mut ValidationOutcome) {
    let collapsed = WHITESPACE_RUN.replace_all(value, " ").into_owned();
    let corrected = correct_to_fixpoint(&CURRENCY_OCR_FIX, "$1.$2", &collapsed);
    let was_corrected = corrected != collapsed;

    if CURRENCY_RE.is_match(&corrected) {
        if was_corrected {
            outcome.confidence = (outcome.confidence + config::CORRECTION_BONUS).min(1.0);
        }
        outcome.value = corrected;
    } else {
        outcome.errors.push("Invalid amount format".into());
        outcome.confidence *= config::CURRENCY_PENALTY;
        outcome.value = collapsed;
    }
}

fn validate_date(value: &str, outcome: &mut ValidationOutcome) {
    // Canonical separator is '-'.
    let normalized = value.replace(['/', '.'], "-");

    if is_valid_date_shape(&normalized) {
        outcome.value = normalized;
        return;
    }

    let corrected = correct_to_fixpoint(&DATE_SEP_FIX, "$1-$2", &normalized);
    if corrected != normalized && is_valid_date_shape(&corrected) {
        outcome.confidence = (outcome.confidence + config::CORRECTION_BONUS).min(1.0);
        outcome.value = corrected;
    } else {
        outcome.errors.push("Invalid date format".into());
        outcome.confidence *= config::DATE_PENALTY;
        outcome.value = normalized;
    }
}

fn is_valid_date_shape(value: &str) -> bool {
    DATE_PATTERNS.iter().any(|p| p.is_match(value))
}

fn validate_email(value: &str, outcome: &mut ValidationOutcome) {
    if !EMAIL_RE.is_match(value) {
        outcome.errors.push("Invalid email format".into());
        outcome.confidence *= config::EMAIL_PENALTY;
    }
}

fn validate_phone(value: &str, outcome: &mut ValidationOutcome) {
    let digit_count = value.chars().filter(|c| c.is_ascii_digit()).count();
    if !(config::PHONE_MIN_DIGITS..=config::PHONE_MAX_DIGITS).contains(&digit_count) {
        outcome.errors.push("Invalid phone number length".into());
        outcome.confidence *= config::PHONE_PENALTY;
    }
}

/// Title-case token by token: first character uppercased, rest lowercased.
fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut out: String = first.to_uppercase().collect();
                    out.extend(chars.flat_map(|c| c.to_lowercase()));
                    out
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_currency_untouched() {
        let outcome = validate_field("total_amount", "$1,234.56", 0.9);
        assert_eq!(outcome.value, "$1,234.56");
        assert_eq!(outcome.confidence, 0.9);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn currency_without_digits_penalized() {
        let outcome = validate_field("total_amount", "N/A", 0.9);
        assert_eq!(outcome.errors, vec!["Invalid amount format".to_string()]);
        assert!((outcome.confidence - 0.9 * 0.8).abs() < 1e-6);
    }

    #[test]
    fn currency_ocr_confusion_corrected_with_bonus() {
        let outcome = validate_field("subtotal", "1,234o56", 0.9);
        assert_eq!(outcome.value, "1,234.56");
        assert!(outcome.errors.is_empty());
        assert!((outcome.confidence - 0.95).abs() < 1e-6);

        let outcome = validate_field("subtotal", "1,234l56", 0.9);
        assert_eq!(outcome.value, "1,234.56");
    }

    #[test]
    fn currency_whitespace_collapsed() {
        let outcome = validate_field("price", "USD   1,000.00", 0.8);
        assert_eq!(outcome.value, "USD 1,000.00");
    }

    #[test]
    fn date_separators_normalized() {
        let outcome = validate_field("invoice_date", "01/15/2024", 0.85);
        assert_eq!(outcome.value, "01-15-2024");
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.confidence, 0.85);
    }

    #[test]
    fn date_accepts_all_documented_shapes() {
        for value in ["01-15-2024", "2024-01-15", "January 15, 2024", "15 January 2024"] {
            let outcome = validate_field("due_date", value, 0.8);
            assert!(outcome.errors.is_empty(), "{value} should be valid");
        }
    }

    #[test]
    fn date_stray_letter_separator_corrected() {
        let outcome = validate_field("due_date", "01o15o2024", 0.8);
        assert_eq!(outcome.value, "01-15-2024");
        assert!(outcome.errors.is_empty());
        assert!((outcome.confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn garbage_date_penalized() {
        let outcome = validate_field("invoice_date", "sometime soon", 0.8);
        assert_eq!(outcome.errors, vec!["Invalid date format".to_string()]);
        assert!((outcome.confidence - 0.8 * 0.8).abs() < 1e-6);
    }

    #[test]
    fn email_shape_check() {
        let ok = validate_field("email", "billing@acme.example.com", 0.9);
        assert!(ok.errors.is_empty());

        let bad = validate_field("email", "billing_at_acme", 0.9);
        assert_eq!(bad.errors, vec!["Invalid email format".to_string()]);
        assert!((bad.confidence - 0.9 * 0.7).abs() < 1e-6);
    }

    #[test]
    fn phone_digit_count_bounds() {
        assert!(validate_field("phone", "+1 (555) 123-4567", 0.9).errors.is_empty());
        assert!(!validate_field("phone", "12345", 0.9).errors.is_empty());
        assert!(!validate_field("phone", "1234567890123456", 0.9).errors.is_empty());
    }

    #[test]
    fn names_title_cased() {
        let outcome = validate_field("vendor_name", "ACME CORPORATION ltd", 0.9);
        assert_eq!(outcome.value, "Acme Corporation Ltd");
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn unknown_fields_pass_through() {
        let outcome = validate_field("line_items", "  3x widget  ", 0.6);
        assert_eq!(outcome.value, "3x widget");
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.confidence, 0.6);
    }

    #[test]
    fn empty_value_skips_rules() {
        let outcome = validate_field("total_amount", "", 0.4);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.confidence, 0.4);
    }

    #[test]
    fn validation_is_idempotent() {
        for (name, value) in [
            ("total_amount", "1,234o56"),
            ("invoice_date", "01/15/2024"),
            ("vendor_name", "acme corp"),
            ("email", "a@b.co"),
            ("phone", "555-123-4567"),
        ] {
            let first = validate_field(name, value, 0.9);
            let second = validate_field(name, &first.value, first.confidence);
            assert_eq!(second.value, first.value, "{name} value should be stable");
            assert_eq!(
                second.confidence, first.confidence,
                "{name} confidence should be stable"
            );
            assert!(second.errors.is_empty());
        }
    }

    #[test]
    fn bonus_capped_at_one() {
        let outcome = validate_field("total_amount", "99o99", 0.98);
        assert_eq!(outcome.confidence, 1.0);
    }
}
