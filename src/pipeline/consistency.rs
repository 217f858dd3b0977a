//! Cross-field consistency checks run after per-field validation.
//!
//! Arithmetic that doesn't add up flags the total; suspicious date ordering
//! is only logged, since some billing workflows legitimately backdate.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::config;
use crate::models::{DocumentType, ExtractedField};

/// Apply document-level checks, mutating the affected fields in place.
pub fn check_consistency(
    document_type: DocumentType,
    fields: &mut BTreeMap<String, ExtractedField>,
) {
    if document_type == DocumentType::Invoice {
        check_invoice_math(fields);
        check_date_order(fields);
    }
}

/// subtotal + tax must equal total within a cent. Any field that doesn't
/// parse as a number opts the whole check out rather than guessing.
fn check_invoice_math(fields: &mut BTreeMap<String, ExtractedField>) {
    let subtotal = fields.get("subtotal").and_then(|f| parse_numeric(&f.value));
    let tax = fields.get("tax_amount").and_then(|f| parse_numeric(&f.value));
    let total = fields.get("total_amount").and_then(|f| parse_numeric(&f.value));

    let (Some(subtotal), Some(tax), Some(total)) = (subtotal, tax, total) else {
        return;
    };

    let diff = (subtotal + tax - total).abs();
    if diff <= config::MATH_TOLERANCE {
        debug!(subtotal, tax, total, "invoice arithmetic consistent");
        return;
    }

    warn!(subtotal, tax, total, diff, "invoice arithmetic mismatch");
    if let Some(field) = fields.get_mut("total_amount") {
        field
            .validation_errors
            .push("Amounts inconsistent: subtotal + tax does not equal total".into());
        field.set_confidence(field.confidence * config::MATH_MISMATCH_PENALTY);
    }
}

/// A due date earlier than the invoice date is suspicious but not wrong;
/// log it and move on.
fn check_date_order(fields: &BTreeMap<String, ExtractedField>) {
    let invoice_date = fields.get("invoice_date").and_then(|f| parse_date(&f.value));
    let due_date = fields.get("due_date").and_then(|f| parse_date(&f.value));

    if let (Some(invoice_date), Some(due_date)) = (invoice_date, due_date) {
        if due_date < invoice_date {
            warn!(%invoice_date, %due_date, "due date precedes invoice date");
        }
    }
}

/// Strip everything but digits, sign, and decimal point, then parse.
pub fn parse_numeric(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

/// Parse the date shapes the validator accepts, month-first preferred for
/// ambiguous numeric forms.
fn parse_date(value: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 5] = ["%m-%d-%Y", "%d-%m-%Y", "%m-%d-%y", "%Y-%m-%d", "%d %B %Y"];
    let normalized = value.trim().replace(['/', '.'], "-");
    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, format) {
            return Some(date);
        }
    }
    NaiveDate::parse_from_str(value.trim(), "%B %d, %Y").ok()
}
