//! docground: field extraction with spatial grounding and multi-pass
//! refinement for scanned documents.
//!
//! The pipeline takes a document image plus two injected collaborators (an
//! OCR engine and an extraction oracle), runs a general oracle pass, fills
//! critical-field gaps with a focused pass, then validates, grounds each
//! value to a page location, cross-checks related fields, and calibrates
//! confidence. See [`pipeline::DocumentExtractor`] for the entry point and
//! [`pipeline::batch`] for bounded-concurrency batch processing.

pub mod config;
pub mod models;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

pub use models::{
    BoundingBox, CandidateField, ConfidenceLevel, DocumentType, ExtractedField, FieldLocation,
    OcrLayout, PassKind, ProcessingStatus, QualityMode, TextBlock,
};
pub use pipeline::{
    process_batch, BatchResult, DocumentExtractor, DocumentResult, ExtractionError,
    ExtractionOracle, ExtractionRequest, GroundingStrategy, OcrEngine,
};

/// Initialize tracing from the environment, falling back to the crate
/// default filter. Call once at process start.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
