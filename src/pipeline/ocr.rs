//! OCR collaborator seam.
//!
//! Text recognition itself is an external concern; the pipeline only
//! depends on this contract. Grounding and gap analysis consume the
//! returned layout as immutable session data.

use async_trait::async_trait;

use super::ExtractionError;
use crate::models::OcrLayout;

/// OCR engine abstraction (allows mocking for tests).
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<OcrLayout, ExtractionError>;
}

/// Engine that serves a pre-materialized layout. Backs tests and callers
/// that already ran recognition elsewhere.
pub struct StaticOcr {
    layout: OcrLayout,
}

impl StaticOcr {
    pub fn new(layout: OcrLayout) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl OcrEngine for StaticOcr {
    async fn recognize(&self, _image: &[u8]) -> Result<OcrLayout, ExtractionError> {
        Ok(self.layout.clone())
    }
}

/// Engine whose every call fails; exercises the degraded no-layout path.
pub struct FailingOcr;

#[async_trait]
impl OcrEngine for FailingOcr {
    async fn recognize(&self, _image: &[u8]) -> Result<OcrLayout, ExtractionError> {
        Err(ExtractionError::OcrFailed("engine unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, TextBlock};

    #[tokio::test]
    async fn static_ocr_serves_layout() {
        let layout = OcrLayout {
            text_blocks: vec![TextBlock {
                text: "Invoice".into(),
                confidence: 0.95,
                bounding_box: BoundingBox::new(10, 10, 110, 30),
                font_size: 14,
                line_number: 0,
            }],
            image_dimensions: (800, 600),
            full_text: "Invoice".into(),
            overall_confidence: 0.95,
        };
        let engine = StaticOcr::new(layout);
        let result = engine.recognize(b"ignored").await.unwrap();
        assert_eq!(result.text_blocks.len(), 1);
        assert_eq!(result.image_dimensions, (800, 600));
    }

    #[tokio::test]
    async fn failing_ocr_errors() {
        let err = FailingOcr.recognize(b"img").await.unwrap_err();
        assert!(matches!(err, ExtractionError::OcrFailed(_)));
    }
}
