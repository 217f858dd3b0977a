use serde::{Deserialize, Serialize};

use super::enums::ConfidenceLevel;
use crate::config;

/// Which oracle pass proposed a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    General,
    Focused,
    Custom,
}

/// Fractional location of a field on the page. All components in [0, 1]
/// relative to the image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldLocation {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FieldLocation {
    /// Plausibility bounds: inside the page, never near-zero and never
    /// near-full-page. A box failing these is rejected, not emitted.
    pub fn is_plausible(&self) -> bool {
        if !(0.0..=1.0).contains(&self.x) || !(0.0..=1.0).contains(&self.y) {
            return false;
        }
        if self.width > config::LOCATION_MAX_WIDTH || self.height > config::LOCATION_MAX_HEIGHT {
            return false;
        }
        if self.width < config::LOCATION_MIN_WIDTH || self.height < config::LOCATION_MIN_HEIGHT {
            return false;
        }
        true
    }
}

/// A field value proposed by the oracle in one pass, prior to validation
/// and grounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateField {
    pub name: String,
    pub value: String,
    pub confidence: f32,
    pub original_text: Option<String>,
    pub source_pass: PassKind,
}

/// Final per-field output: validated value, calibrated confidence, and the
/// grounded page location when one could be resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedField {
    pub value: String,
    pub confidence: f32,
    pub confidence_level: ConfidenceLevel,
    pub location: Option<FieldLocation>,
    pub original_text: Option<String>,
    pub validation_errors: Vec<String>,
}

impl ExtractedField {
    /// Clamp the score into [0, 1] and keep the level consistent with it.
    pub fn set_confidence(&mut self, confidence: f32) {
        self.confidence = confidence.clamp(0.0, 1.0);
        self.confidence_level = ConfidenceLevel::from_score(self.confidence);
    }
}
