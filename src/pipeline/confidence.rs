//! Confidence calibration and document-level aggregation.
//!
//! Runs last, after validation and consistency checks: mode scaling, then a
//! criticality boost for already-confident key fields, then a flat penalty
//! for any recorded validation error. The cap keeps the pipeline from ever
//! claiming certainty.

use std::collections::BTreeMap;

use tracing::debug;

use super::schema::is_critical_field;
use crate::config;
use crate::models::{ExtractedField, QualityMode};

pub fn mode_factor(mode: QualityMode) -> f32 {
    match mode {
        QualityMode::High => config::MODE_FACTOR_HIGH,
        QualityMode::Balanced => config::MODE_FACTOR_BALANCED,
        QualityMode::Fast => config::MODE_FACTOR_FAST,
    }
}

/// Calibrate one field in place, keeping its level bucket in sync.
pub fn calibrate_field(field_name: &str, field: &mut ExtractedField, mode: QualityMode) {
    let mut confidence = field.confidence * mode_factor(mode);

    if is_critical_field(field_name) && confidence > config::CRITICAL_BOOST_FLOOR {
        confidence = (confidence * config::CRITICAL_BOOST).min(config::CRITICAL_BOOST_CAP);
    }

    if !field.validation_errors.is_empty() {
        confidence *= config::VALIDATION_PENALTY;
    }

    debug!(
        field = field_name,
        before = field.confidence,
        after = confidence,
        "calibrated field confidence"
    );
    field.set_confidence(confidence);
}

/// Weighted mean over the final field set. Critical fields count double;
/// an empty set scores zero.
pub fn document_confidence(fields: &BTreeMap<String, ExtractedField>) -> f32 {
    let mut weighted_sum = 0.0f32;
    let mut weight_total = 0.0f32;
    for (name, field) in fields {
        let weight = if is_critical_field(name) {
            config::CRITICAL_FIELD_WEIGHT
        } else {
            1.0
        };
        weighted_sum += field.confidence * weight;
        weight_total += weight;
    }
    if weight_total == 0.0 {
        0.0
    } else {
        weighted_sum / weight_total
    }
}
