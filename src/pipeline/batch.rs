//! Bounded-concurrency batch extraction.
//!
//! Each document gets its own session; an admission semaphore caps how many
//! run at once. One document failing never touches its siblings, and the
//! results come back in submission order.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use super::orchestrator::{DocumentExtractor, DocumentResult, ExtractionRequest};
use crate::config;
use crate::models::ProcessingStatus;

#[derive(Debug)]
pub struct BatchResult {
    pub batch_id: Uuid,
    pub results: Vec<DocumentResult>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Process a batch with the default admission gate.
pub async fn process_batch(
    extractor: Arc<DocumentExtractor>,
    images: Vec<Vec<u8>>,
    request: ExtractionRequest,
) -> BatchResult {
    process_batch_with_gate(extractor, images, request, config::BATCH_ADMISSION_GATE).await
}

/// Process a batch admitting at most `gate` concurrent sessions.
pub async fn process_batch_with_gate(
    extractor: Arc<DocumentExtractor>,
    images: Vec<Vec<u8>>,
    request: ExtractionRequest,
    gate: usize,
) -> BatchResult {
    let batch_id = Uuid::new_v4();
    let total = images.len();
    info!(%batch_id, total, gate, "starting batch extraction");

    let semaphore = Arc::new(Semaphore::new(gate.max(1)));
    let mut handles = Vec::with_capacity(total);

    for image in images {
        let extractor = Arc::clone(&extractor);
        let semaphore = Arc::clone(&semaphore);
        let request = request.clone();
        handles.push(tokio::spawn(async move {
            // Holds the permit for the whole session.
            let _permit = semaphore.acquire_owned().await;
            extractor.extract_document(&image, &request).await
        }));
    }

    let mut results = Vec::with_capacity(total);
    for handle in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!(%batch_id, error = %e, "batch worker task failed");
            }
        }
    }

    let succeeded = results
        .iter()
        .filter(|r| r.status == ProcessingStatus::Completed)
        .count();
    let failed = results.len() - succeeded;
    info!(%batch_id, succeeded, failed, "batch extraction complete");

    BatchResult {
        batch_id,
        results,
        succeeded,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentType, OcrLayout};
    use crate::pipeline::ocr::OcrEngine;
    use crate::pipeline::oracle::MockOracle;
    use crate::pipeline::ExtractionError;
    use async_trait::async_trait;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn test_image() -> Vec<u8> {
        let img = RgbImage::new(100, 120);
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    /// OCR stub that tracks how many sessions are inside it at once.
    struct CountingOcr {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CountingOcr {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl OcrEngine for CountingOcr {
        async fn recognize(&self, _image: &[u8]) -> Result<OcrLayout, ExtractionError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(OcrLayout::empty((100, 120)))
        }
    }

    fn extractor(ocr: Arc<dyn OcrEngine>) -> Arc<DocumentExtractor> {
        let oracle = Arc::new(MockOracle::new(
            r#"{"vendor_name": {"value": "Acme Corp", "confidence": 0.9}}"#,
        ));
        Arc::new(DocumentExtractor::new(oracle, ocr))
    }

    #[tokio::test]
    async fn batch_preserves_order_and_counts_failures() {
        let ocr = Arc::new(CountingOcr::new());
        let extractor = extractor(ocr);

        let images = vec![test_image(), b"garbage".to_vec(), test_image()];
        let request = ExtractionRequest::new(DocumentType::Receipt);
        let batch = process_batch(extractor, images, request).await;

        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.succeeded, 2);
        assert_eq!(batch.failed, 1);
        assert_eq!(batch.results[0].status, ProcessingStatus::Completed);
        assert_eq!(batch.results[1].status, ProcessingStatus::Failed);
        assert_eq!(batch.results[2].status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn admission_gate_bounds_concurrency() {
        let ocr = Arc::new(CountingOcr::new());
        let extractor = extractor(ocr.clone());

        let images = (0..8).map(|_| test_image()).collect();
        let request = ExtractionRequest::new(DocumentType::Receipt);
        process_batch_with_gate(extractor, images, request, 2).await;

        assert!(ocr.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() {
        let ocr = Arc::new(CountingOcr::new());
        let extractor = extractor(ocr);

        let request = ExtractionRequest::new(DocumentType::Receipt);
        let batch = process_batch(extractor, Vec::new(), request).await;
        assert!(batch.results.is_empty());
        assert_eq!(batch.succeeded, 0);
        assert_eq!(batch.failed, 0);
    }
}
