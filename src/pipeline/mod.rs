pub mod batch;
pub mod confidence;
pub mod consistency;
pub mod grounding;
pub mod merge;
pub mod ocr;
pub mod oracle;
pub mod orchestrator;
pub mod schema;
pub mod validate;

pub use batch::*;
pub use confidence::*;
pub use consistency::*;
pub use grounding::*;
pub use merge::*;
pub use ocr::*;
pub use oracle::*;
pub use orchestrator::*;
pub use schema::*;
pub use validate::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Oracle is not reachable at {0}")]
    OracleConnection(String),

    #[error("Oracle call failed: {0}")]
    OracleCall(String),

    #[error("Oracle returned error (status {status}): {body}")]
    OracleStatus { status: u16, body: String },

    #[error("Malformed oracle response: {0}")]
    ResponseParse(String),

    #[error("Cannot decode document image: {0}")]
    ImageDecode(String),

    #[error("OCR recognition failed: {0}")]
    OcrFailed(String),
}
