//! Multi-pass extraction orchestration.
//!
//! A session runs the oracle once broadly, computes which critical fields
//! the schema still wants, runs a focused pass over the gap, optionally a
//! caller-scoped custom pass, then refines the merged candidates through
//! validation, spatial grounding, consistency checks, and calibration.
//!
//! Collaborator failures degrade, they don't abort: a failed oracle pass
//! contributes nothing, a failed OCR read leaves every location absent.
//! The one fatal condition is an image that does not decode.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::confidence::{calibrate_field, document_confidence};
use super::consistency::check_consistency;
use super::grounding::{locate_field, GroundingStrategy};
use super::merge::{merge_candidates, MergePolicy};
use super::ocr::OcrEngine;
use super::oracle::{CandidateSet, ExtractionOracle, FieldScope};
use super::schema::schema_for;
use super::validate::validate_field;
use super::ExtractionError;
use crate::config;
use crate::models::{
    ConfidenceLevel, DocumentType, ExtractedField, OcrLayout, PassKind, ProcessingStatus,
    QualityMode,
};

/// Where a session currently is in its fixed pass sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    General,
    GapAnalysis,
    Focused,
    Merge,
    Refinement,
    Custom,
    Done,
    Failed,
}

/// What one oracle pass contributed, for diagnostics.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub pass: PassKind,
    pub candidate_count: usize,
    pub error: Option<String>,
}

/// Per-document working state. Created per extraction, discarded after the
/// result is handed back.
#[derive(Debug)]
pub struct ExtractionSession {
    pub id: Uuid,
    pub document_type: DocumentType,
    pub mode: QualityMode,
    pub state: SessionState,
    pub pass_outcomes: Vec<PassOutcome>,
    pub merged: CandidateSet,
    pub fields: BTreeMap<String, ExtractedField>,
    pub provenance: BTreeMap<String, GroundingStrategy>,
}

impl ExtractionSession {
    fn new(document_type: DocumentType, mode: QualityMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_type,
            mode,
            state: SessionState::Init,
            pass_outcomes: Vec::new(),
            merged: CandidateSet::new(),
            fields: BTreeMap::new(),
            provenance: BTreeMap::new(),
        }
    }
}

/// Caller-facing request parameters.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub document_type: DocumentType,
    pub mode: QualityMode,
    /// Extra field names to extract in a dedicated custom pass.
    pub custom_fields: Option<Vec<String>>,
}

impl ExtractionRequest {
    pub fn new(document_type: DocumentType) -> Self {
        Self {
            document_type,
            mode: QualityMode::Balanced,
            custom_fields: None,
        }
    }

    pub fn with_mode(mut self, mode: QualityMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_custom_fields(mut self, fields: Vec<String>) -> Self {
        self.custom_fields = Some(fields);
        self
    }
}

/// Caller-facing outcome. A session that hit the fatal decode path reports
/// `Failed` with a message; everything else completes with whatever fields
/// survived.
#[derive(Debug, Clone)]
pub struct DocumentResult {
    pub id: Uuid,
    pub status: ProcessingStatus,
    pub document_type: DocumentType,
    pub fields: BTreeMap<String, ExtractedField>,
    pub overall_confidence: f32,
    pub error_message: Option<String>,
}

/// Drives the pass sequence against injected collaborators.
pub struct DocumentExtractor {
    oracle: Arc<dyn ExtractionOracle>,
    ocr: Arc<dyn OcrEngine>,
}

impl DocumentExtractor {
    pub fn new(oracle: Arc<dyn ExtractionOracle>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { oracle, ocr }
    }

    /// Run one full extraction session over an image.
    pub async fn extract_document(&self, image: &[u8], request: &ExtractionRequest) -> DocumentResult {
        let session = ExtractionSession::new(request.document_type, request.mode);
        let span = info_span!(
            "extraction_session",
            session_id = %session.id,
            document_type = request.document_type.as_str(),
        );
        self.run_session(session, image, request).instrument(span).await
    }

    async fn run_session(
        &self,
        mut session: ExtractionSession,
        image: &[u8],
        request: &ExtractionRequest,
    ) -> DocumentResult {
        let dimensions = match decode_dimensions(image) {
            Ok(dims) => dims,
            Err(e) => {
                warn!(error = %e, "image failed to decode, session aborted");
                session.state = SessionState::Failed;
                return DocumentResult {
                    id: session.id,
                    status: ProcessingStatus::Failed,
                    document_type: session.document_type,
                    fields: BTreeMap::new(),
                    overall_confidence: 0.0,
                    error_message: Some(e.to_string()),
                };
            }
        };

        let layout = match self.ocr.recognize(image).await {
            Ok(layout) => layout,
            Err(e) => {
                warn!(error = %e, "OCR failed, continuing without spatial grounding");
                OcrLayout::empty(dimensions)
            }
        };
        let context = oracle_context(&layout);

        // GENERAL pass.
        session.state = SessionState::General;
        let general_scope = FieldScope::general(request.document_type, context.clone());
        session.merged = self.run_pass(image, &general_scope, &mut session.pass_outcomes).await;

        // GAP ANALYSIS against the schema's critical fields.
        session.state = SessionState::GapAnalysis;
        let missing = missing_critical_fields(request.document_type, &session.merged);

        if request.mode != QualityMode::Fast {
            if !missing.is_empty() {
                session.state = SessionState::Focused;
                info!(missing = ?missing, "running focused pass over field gap");
                let scope = FieldScope::focused(request.document_type, context.clone(), missing);
                let focused = self.run_pass(image, &scope, &mut session.pass_outcomes).await;

                session.state = SessionState::Merge;
                merge_candidates(&mut session.merged, focused, MergePolicy::OverwriteIfEmpty);
            }

            if let Some(custom_names) = &request.custom_fields {
                session.state = SessionState::Custom;
                let scope =
                    FieldScope::custom(request.document_type, context.clone(), custom_names.clone());
                let custom = self.run_pass(image, &scope, &mut session.pass_outcomes).await;
                merge_candidates(&mut session.merged, custom, MergePolicy::Keep);
            }
        }

        // REFINEMENT: validate, ground, cross-check, calibrate.
        session.state = SessionState::Refinement;
        self.refine(&mut session, &layout);
        session.state = SessionState::Done;

        let overall_confidence = document_confidence(&session.fields);
        info!(
            fields = session.fields.len(),
            overall_confidence, "extraction session complete"
        );

        DocumentResult {
            id: session.id,
            status: ProcessingStatus::Completed,
            document_type: session.document_type,
            fields: session.fields,
            overall_confidence,
            error_message: None,
        }
    }

    /// One oracle invocation. Failures are logged and contribute an empty
    /// set; the pass record keeps the error text.
    async fn run_pass(
        &self,
        image: &[u8],
        scope: &FieldScope,
        outcomes: &mut Vec<PassOutcome>,
    ) -> CandidateSet {
        match self.oracle.extract(image, scope).await {
            Ok(candidates) => {
                info!(pass = ?scope.pass, count = candidates.len(), "oracle pass complete");
                outcomes.push(PassOutcome {
                    pass: scope.pass,
                    candidate_count: candidates.len(),
                    error: None,
                });
                candidates
            }
            Err(e) => {
                warn!(pass = ?scope.pass, error = %e, "oracle pass failed, contributing nothing");
                outcomes.push(PassOutcome {
                    pass: scope.pass,
                    candidate_count: 0,
                    error: Some(e.to_string()),
                });
                CandidateSet::new()
            }
        }
    }

    fn refine(&self, session: &mut ExtractionSession, layout: &OcrLayout) {
        for (name, candidate) in &session.merged {
            let outcome = validate_field(name, &candidate.value, candidate.confidence);

            let location = locate_field(name, &outcome.value, layout).map(|(loc, strategy)| {
                session.provenance.insert(name.clone(), strategy);
                loc
            });

            session.fields.insert(
                name.clone(),
                ExtractedField {
                    value: outcome.value,
                    confidence: outcome.confidence.clamp(0.0, 1.0),
                    confidence_level: ConfidenceLevel::from_score(outcome.confidence),
                    location,
                    original_text: candidate.original_text.clone(),
                    validation_errors: outcome.errors,
                },
            );
        }

        check_consistency(session.document_type, &mut session.fields);

        for (name, field) in session.fields.iter_mut() {
            calibrate_field(name, field, session.mode);
        }
    }
}

/// Critical schema fields the merged set is still missing or holds empty.
fn missing_critical_fields(document_type: DocumentType, merged: &CandidateSet) -> Vec<String> {
    schema_for(document_type)
        .critical_fields
        .iter()
        .filter(|name| {
            merged
                .get(**name)
                .map_or(true, |c| c.value.trim().is_empty())
        })
        .map(|name| name.to_string())
        .collect()
}

fn decode_dimensions(image: &[u8]) -> Result<(u32, u32), ExtractionError> {
    let decoded =
        image::load_from_memory(image).map_err(|e| ExtractionError::ImageDecode(e.to_string()))?;
    Ok((decoded.width(), decoded.height()))
}

fn oracle_context(layout: &OcrLayout) -> String {
    layout
        .full_text
        .chars()
        .take(config::ORACLE_CONTEXT_CHARS)
        .collect()
}
