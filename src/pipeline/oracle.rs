//! Extraction oracle seam: the vision LLM that proposes candidate fields.
//!
//! The oracle is an injected capability behind a trait so the orchestrator
//! stays oracle-agnostic and tests run against a canned mock. The concrete
//! client talks to a local Ollama instance with the document image attached.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::schema::schema_for;
use super::ExtractionError;
use crate::config;
use crate::models::{CandidateField, DocumentType, PassKind};

/// What one pass asks the oracle for: the document type, a truncated OCR
/// text excerpt for context, and an explicit field list for scoped passes.
#[derive(Debug, Clone)]
pub struct FieldScope {
    pub document_type: DocumentType,
    pub context: String,
    pub field_names: Option<Vec<String>>,
    pub pass: PassKind,
}

impl FieldScope {
    pub fn general(document_type: DocumentType, context: String) -> Self {
        Self {
            document_type,
            context,
            field_names: None,
            pass: PassKind::General,
        }
    }

    pub fn focused(document_type: DocumentType, context: String, missing: Vec<String>) -> Self {
        Self {
            document_type,
            context,
            field_names: Some(missing),
            pass: PassKind::Focused,
        }
    }

    pub fn custom(document_type: DocumentType, context: String, names: Vec<String>) -> Self {
        Self {
            document_type,
            context,
            field_names: Some(names),
            pass: PassKind::Custom,
        }
    }
}

/// Candidates keyed by field name, as returned by one oracle pass.
pub type CandidateSet = BTreeMap<String, CandidateField>;

/// The extraction oracle contract. Implementations perform the only
/// suspension points in a session besides OCR.
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    async fn extract(
        &self,
        image: &[u8],
        scope: &FieldScope,
    ) -> Result<CandidateSet, ExtractionError>;
}

const ORACLE_SYSTEM_PROMPT: &str =
    "You are a document field extractor. Respond with valid JSON only: \
     an object mapping each field name to {\"value\", \"confidence\", \"original_text\"}. \
     Extract values exactly as printed, keeping original formatting.";

/// Build the pass prompt from the scope. Scoped passes name their fields
/// explicitly; the general pass lists the document schema.
pub fn build_prompt(scope: &FieldScope) -> String {
    let mut prompt = String::new();

    match (&scope.field_names, scope.pass) {
        (Some(names), PassKind::Focused) => {
            prompt.push_str("Focus on finding these specific fields that were missed:\n");
            prompt.push_str(&names.join(", "));
            prompt.push_str("\n\nLook carefully and extract ONLY these fields.\n");
        }
        (Some(names), _) => {
            prompt.push_str("Extract these specific fields from the document:\n");
            prompt.push_str(&names.join(", "));
            prompt.push('\n');
        }
        (None, _) => {
            prompt.push_str("Analyze this ");
            prompt.push_str(scope.document_type.as_str());
            prompt.push_str(" and extract all visible fields.\n");
            let schema = schema_for(scope.document_type);
            if !schema.required_fields.is_empty() {
                prompt.push_str("Expected fields:\n");
                prompt.push_str(&schema.required_fields.join(", "));
                prompt.push('\n');
            }
        }
    }

    if !scope.context.is_empty() {
        prompt.push_str("\nDOCUMENT TEXT (from OCR):\n");
        prompt.push_str(&scope.context);
        prompt.push('\n');
    }

    prompt
}

/// Parse a raw oracle response into candidates.
///
/// Tolerant by contract: entries without a `value` key are skipped,
/// non-numeric confidence defaults to 0.5, and anything that is not a JSON
/// object surfaces as `ResponseParse` for the orchestrator to recover.
pub fn parse_oracle_response(
    response: &str,
    pass: PassKind,
) -> Result<CandidateSet, ExtractionError> {
    let start = response
        .find('{')
        .ok_or_else(|| ExtractionError::ResponseParse("no JSON object in response".into()))?;
    let end = response
        .rfind('}')
        .ok_or_else(|| ExtractionError::ResponseParse("unterminated JSON object".into()))?;
    if end < start {
        return Err(ExtractionError::ResponseParse(
            "unterminated JSON object".into(),
        ));
    }

    let parsed: serde_json::Value = serde_json::from_str(&response[start..=end])
        .map_err(|e| ExtractionError::ResponseParse(e.to_string()))?;

    let object = parsed
        .as_object()
        .ok_or_else(|| ExtractionError::ResponseParse("response is not a JSON object".into()))?;

    let mut candidates = CandidateSet::new();
    for (name, entry) in object {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        let Some(raw_value) = entry.get("value") else {
            continue;
        };
        let value = match raw_value {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        let confidence = entry
            .get("confidence")
            .and_then(|c| c.as_f64())
            .map(|c| c as f32)
            .unwrap_or(config::DEFAULT_ORACLE_CONFIDENCE)
            .clamp(0.0, 1.0);
        let original_text = entry
            .get("original_text")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string());

        candidates.insert(
            name.clone(),
            CandidateField {
                name: name.clone(),
                value,
                confidence,
                original_text,
                source_pass: pass,
            },
        );
    }

    Ok(candidates)
}

/// Ollama HTTP client for local vision-model extraction.
pub struct OllamaOracle {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaOracle {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        }
    }

    /// Default Ollama instance at localhost:11434 with 5-minute timeout.
    pub fn default_local(model: &str) -> Self {
        Self::new("http://localhost:11434", model, 300)
    }
}

/// Request body for Ollama /api/generate with an attached image.
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    images: Vec<String>,
    stream: bool,
}

/// Response body from Ollama /api/generate.
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[async_trait]
impl ExtractionOracle for OllamaOracle {
    async fn extract(
        &self,
        image: &[u8],
        scope: &FieldScope,
    ) -> Result<CandidateSet, ExtractionError> {
        let url = format!("{}/api/generate", self.base_url);
        let prompt = build_prompt(scope);
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: &prompt,
            system: ORACLE_SYSTEM_PROMPT,
            images: vec![encoded],
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_connect() {
                ExtractionError::OracleConnection(self.base_url.clone())
            } else if e.is_timeout() {
                ExtractionError::OracleCall(format!(
                    "request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                ExtractionError::OracleCall(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::OracleStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::ResponseParse(e.to_string()))?;

        parse_oracle_response(&parsed.response, scope.pass)
    }
}

/// Canned reply for the mock oracle.
#[derive(Debug, Clone)]
pub enum MockReply {
    Json(String),
    Fail(String),
}

/// Mock oracle for testing: replays configured replies per call, in order,
/// with the final reply repeating for any further calls.
pub struct MockOracle {
    replies: Mutex<VecDeque<MockReply>>,
    seen_passes: Mutex<Vec<PassKind>>,
}

impl MockOracle {
    /// Answer every call with the same JSON response.
    pub fn new(response: &str) -> Self {
        Self::with_replies(vec![MockReply::Json(response.to_string())])
    }

    /// Answer calls from a reply queue; the final reply repeats.
    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen_passes: Mutex::new(Vec::new()),
        }
    }

    /// Oracle whose every call fails at the transport level.
    pub fn failing() -> Self {
        Self::with_replies(vec![MockReply::Fail("connection refused".into())])
    }

    /// Which passes have called this oracle, in order.
    pub fn seen_passes(&self) -> Vec<PassKind> {
        self.seen_passes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionOracle for MockOracle {
    async fn extract(
        &self,
        _image: &[u8],
        scope: &FieldScope,
    ) -> Result<CandidateSet, ExtractionError> {
        self.seen_passes.lock().unwrap().push(scope.pass);

        let reply = {
            let mut queue = self.replies.lock().unwrap();
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };

        match reply {
            Some(MockReply::Json(json)) => parse_oracle_response(&json, scope.pass),
            Some(MockReply::Fail(reason)) => Err(ExtractionError::OracleCall(reason)),
            None => Ok(CandidateSet::new()),
        }
    }
}
