//! Declarative document schemas and field-name dispatch tables.
//!
//! Field names route to validation rules and criticality by pattern tables
//! rather than scattered substring checks, so adding a rule or a document
//! type is a table edit.

use crate::models::DocumentType;

/// Validation rule categories a field name can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Currency,
    Date,
    Email,
    Phone,
    Name,
}

/// Name-substring patterns, first match wins.
const RULE_TABLE: &[(&[&str], RuleKind)] = &[
    (
        &["amount", "total", "price", "cost", "subtotal"],
        RuleKind::Currency,
    ),
    (&["date", "due"], RuleKind::Date),
    (&["email"], RuleKind::Email),
    (&["phone"], RuleKind::Phone),
    (
        &["name", "vendor", "customer", "merchant"],
        RuleKind::Name,
    ),
];

/// Field names matching these patterns get double weight in the document
/// confidence and the criticality boost during calibration.
const CRITICAL_FIELD_PATTERNS: &[&str] = &["amount", "total", "number", "date", "name"];

/// Resolve the validation rule for a field name, if any applies.
pub fn rule_for_field(field_name: &str) -> Option<RuleKind> {
    let lower = field_name.to_lowercase();
    for (patterns, rule) in RULE_TABLE {
        if patterns.iter().any(|p| lower.contains(p)) {
            return Some(*rule);
        }
    }
    None
}

/// Whether a field name denotes a critical field.
pub fn is_critical_field(field_name: &str) -> bool {
    let lower = field_name.to_lowercase();
    CRITICAL_FIELD_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Expected fields for one document type. The critical subset drives the
/// gap analysis between the general and focused passes.
#[derive(Debug, Clone, Copy)]
pub struct DocumentSchema {
    pub required_fields: &'static [&'static str],
    pub critical_fields: &'static [&'static str],
}

const INVOICE_SCHEMA: DocumentSchema = DocumentSchema {
    required_fields: &[
        "vendor_name",
        "vendor_address",
        "invoice_number",
        "invoice_date",
        "due_date",
        "customer_name",
        "subtotal",
        "tax_amount",
        "total_amount",
        "currency",
    ],
    critical_fields: &["vendor_name", "invoice_number", "total_amount", "invoice_date"],
};

const RECEIPT_SCHEMA: DocumentSchema = DocumentSchema {
    required_fields: &[
        "merchant_name",
        "merchant_address",
        "transaction_date",
        "transaction_id",
        "subtotal",
        "tax_amount",
        "total_amount",
        "payment_method",
    ],
    critical_fields: &["merchant_name", "total_amount", "transaction_date"],
};

const BUSINESS_CARD_SCHEMA: DocumentSchema = DocumentSchema {
    required_fields: &["full_name", "company", "title", "email", "phone", "address"],
    critical_fields: &["full_name", "company"],
};

/// Free-form types carry no built-in expectations; the oracle extracts
/// whatever it sees and the gap analysis finds nothing to chase.
const OPEN_SCHEMA: DocumentSchema = DocumentSchema {
    required_fields: &[],
    critical_fields: &[],
};

pub fn schema_for(document_type: DocumentType) -> DocumentSchema {
    match document_type {
        DocumentType::Invoice => INVOICE_SCHEMA,
        DocumentType::Receipt => RECEIPT_SCHEMA,
        DocumentType::BusinessCard => BUSINESS_CARD_SCHEMA,
        DocumentType::Form | DocumentType::Contract | DocumentType::Custom => OPEN_SCHEMA,
    }
}
