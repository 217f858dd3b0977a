//! Tunable pipeline constants.
//!
//! The calibration multipliers are empirically chosen; they live here as
//! named constants so tuning never means hunting for embedded literals.

/// Crate-level constants
pub const APP_NAME: &str = "docground";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("{APP_NAME}=info")
}

// ── Confidence calibration ──────────────────────────────────

/// Mode scaling: high accuracy mode reports more conservative scores.
pub const MODE_FACTOR_HIGH: f32 = 0.95;
pub const MODE_FACTOR_BALANCED: f32 = 1.0;
pub const MODE_FACTOR_FAST: f32 = 0.90;

/// Criticality boost for well-extracted critical fields.
pub const CRITICAL_BOOST: f32 = 1.05;
/// Boost applies only above this post-scaling score.
pub const CRITICAL_BOOST_FLOOR: f32 = 0.8;
/// Boosted scores cap here; certainty of 1.0 is never output.
pub const CRITICAL_BOOST_CAP: f32 = 0.98;

/// Applied to any field carrying validation errors, after scaling and boost.
pub const VALIDATION_PENALTY: f32 = 0.7;

/// Weight of critical fields in the document-level weighted mean.
pub const CRITICAL_FIELD_WEIGHT: f32 = 2.0;

// ── Field validation ────────────────────────────────────────

/// Per-rule confidence penalties for a failed format check.
pub const CURRENCY_PENALTY: f32 = 0.8;
pub const DATE_PENALTY: f32 = 0.8;
pub const EMAIL_PENALTY: f32 = 0.7;
pub const PHONE_PENALTY: f32 = 0.7;

/// Bonus awarded when an auto-correction turned an invalid value into a
/// valid one. Never awarded for values that were already valid, which keeps
/// revalidation a no-op.
pub const CORRECTION_BONUS: f32 = 0.05;

/// Phone numbers must strip down to this many digits.
pub const PHONE_MIN_DIGITS: usize = 7;
pub const PHONE_MAX_DIGITS: usize = 15;

// ── Cross-field consistency ─────────────────────────────────

/// Rounding tolerance for subtotal + tax = total.
pub const MATH_TOLERANCE: f64 = 0.01;
/// Applied to the implicated field on a consistency mismatch.
pub const MATH_MISMATCH_PENALTY: f32 = 0.8;

// ── Spatial grounding ───────────────────────────────────────

/// Minimum similarity ratio for a fuzzy block match.
pub const FUZZY_MATCH_THRESHOLD: f32 = 0.80;

/// Values longer than this are grounded token-wise; shorter ones by
/// mutual substring.
pub const PARTIAL_LONG_VALUE_LEN: usize = 20;
/// Substring matches below this length are treated as trivial and ignored.
pub const PARTIAL_MIN_SUBSTRING_LEN: usize = 6;

/// How many blocks after a label the contextual strategy scans.
pub const CONTEXT_SCAN_WINDOW: usize = 4;

/// Plausibility bounds for a normalized location.
pub const LOCATION_MAX_WIDTH: f32 = 0.8;
pub const LOCATION_MAX_HEIGHT: f32 = 0.5;
pub const LOCATION_MIN_WIDTH: f32 = 0.01;
pub const LOCATION_MIN_HEIGHT: f32 = 0.005;

/// Minimum legible box: width adapts to value length, height is fixed.
pub const MIN_LEGIBLE_WIDTH: f32 = 0.02;
pub const LEGIBLE_WIDTH_PER_CHAR: f32 = 0.008;
pub const MIN_LEGIBLE_HEIGHT: f32 = 0.015;

// ── Orchestration ───────────────────────────────────────────

/// OCR text handed to the oracle as context is truncated to this many chars.
pub const ORACLE_CONTEXT_CHARS: usize = 2000;

/// Concurrently in-flight sessions admitted during batch processing.
/// Bounds load on the external oracle and OCR engine.
pub const BATCH_ADMISSION_GATE: usize = 3;

/// Oracle confidence when the response omits or mangles the score.
pub const DEFAULT_ORACLE_CONFIDENCE: f32 = 0.5;
