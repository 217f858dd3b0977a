use serde::{Deserialize, Serialize};

/// Confidence level thresholds shared by fields and document scores.
pub mod level_thresholds {
    /// At or above this: HIGH.
    pub const HIGH: f32 = 0.9;

    /// At or above this (but below HIGH): MEDIUM.
    pub const MEDIUM: f32 = 0.7;
}

/// Document categories the extraction schemas know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    Receipt,
    BusinessCard,
    Form,
    Contract,
    Custom,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::Receipt => "receipt",
            DocumentType::BusinessCard => "business_card",
            DocumentType::Form => "form",
            DocumentType::Contract => "contract",
            DocumentType::Custom => "custom",
        }
    }
}

/// Quality/speed trade-off for a session. Fast skips the focused and
/// custom passes; balanced and high run the full chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityMode {
    Fast,
    Balanced,
    High,
}

/// Categorical confidence bucket derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Bucket a score: HIGH iff >= 0.9, MEDIUM iff >= 0.7, else LOW.
    pub fn from_score(confidence: f32) -> Self {
        if confidence >= level_thresholds::HIGH {
            ConfidenceLevel::High
        } else if confidence >= level_thresholds::MEDIUM {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Terminal and in-flight session states visible to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_boundaries() {
        assert_eq!(ConfidenceLevel::from_score(0.0), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.69), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.7), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.89), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.9), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(1.0), ConfidenceLevel::High);
    }

    #[test]
    fn document_type_serializes_snake_case() {
        let json = serde_json::to_string(&DocumentType::BusinessCard).unwrap();
        assert_eq!(json, "\"business_card\"");
    }

    #[test]
    fn quality_mode_round_trips() {
        let mode: QualityMode = serde_json::from_str("\"balanced\"").unwrap();
        assert_eq!(mode, QualityMode::Balanced);
    }
}
