use serde::{Deserialize, Serialize};

/// Pixel rectangle in image coordinates, as produced by the OCR collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn center(&self) -> (u32, u32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }
}

/// One OCR-recognized text run with spatial information.
/// Read-only within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    /// OCR confidence in [0, 1].
    pub confidence: f32,
    pub bounding_box: BoundingBox,
    /// Estimated font size in points.
    pub font_size: u32,
    /// Line index in reading order.
    pub line_number: usize,
}

/// Full payload from the OCR collaborator: ordered text blocks, page pixel
/// dimensions, concatenated text, and aggregate recognition confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrLayout {
    pub text_blocks: Vec<TextBlock>,
    pub image_dimensions: (u32, u32),
    pub full_text: String,
    pub overall_confidence: f32,
}

impl OcrLayout {
    /// Layout with no recognized text. Used when the OCR collaborator fails:
    /// the session proceeds and every location resolves to absent.
    pub fn empty(image_dimensions: (u32, u32)) -> Self {
        Self {
            text_blocks: Vec::new(),
            image_dimensions,
            full_text: String::new(),
            overall_confidence: 0.0,
        }
    }
}
