use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tillscan_core::Money;
use tracing::{debug, instrument};

use crate::config::ReceiptConfig;
use crate::extract::Extractor;
use crate::lines;
use crate::preprocess;
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::ReceiptResult;

#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("Receipt image not found: {}", path.display())]
    ImageNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode receipt image: {0}")]
    DecodeFailure(#[from] image::ImageError),
    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(#[from] OcrError),
    #[error("OCR failed: merchant={merchant:?}, total={total:?}")]
    FieldNotRecoverable {
        merchant: Option<String>,
        total: Option<Money>,
    },
}

impl ExtractionFailure {
    /// Bad input from the caller (missing or unreadable image).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExtractionFailure::ImageNotFound { .. } | ExtractionFailure::DecodeFailure(_))
    }

    /// Engine-side fault a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractionFailure::OcrUnavailable(_))
    }
}

/// Orchestrates: read → decode → normalize → enhance → OCR → group → extract.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
    config: ReceiptConfig,
    extractor: Extractor,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R) -> Self {
        Self::with_config(recognizer, ReceiptConfig::default())
    }

    pub fn with_config(recognizer: R, config: ReceiptConfig) -> Self {
        let extractor = Extractor::new(&config.merchant);
        Self { recognizer, config, extractor }
    }

    pub fn engine_name(&self) -> &str {
        self.recognizer.engine_name()
    }

    pub fn config(&self) -> &ReceiptConfig {
        &self.config
    }

    /// Process an image file on disk.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn process(&self, path: &Path) -> Result<ReceiptResult, ExtractionFailure> {
        let bytes = std::fs::read(path).map_err(|source| ExtractionFailure::ImageNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        self.process_bytes(&bytes)
    }

    /// Process encoded image bytes (JPEG / PNG / …).
    pub fn process_bytes(&self, data: &[u8]) -> Result<ReceiptResult, ExtractionFailure> {
        let image = image::load_from_memory(data)?;
        self.process_image(image)
    }

    /// Process an already decoded image.
    pub fn process_image(&self, image: DynamicImage) -> Result<ReceiptResult, ExtractionFailure> {
        debug!(width = image.width(), height = image.height(), "decoded receipt");

        // 1. Best-effort cleanup; these never fail.
        let normalized = preprocess::crop_and_deskew(image, &self.config.normalize);
        let enhanced = preprocess::enhance(normalized, &self.config.enhance);

        // 2. OCR.
        let detections = self.recognizer.recognize(&enhanced)?;
        debug!(detections = detections.len(), "ocr complete");

        // 3. Lines, then the two fields independently.
        let lines = lines::group_lines_with_threshold(&detections, self.config.grouping.line_threshold);
        let merchant = self.extractor.merchant(&lines);
        let total = self.extractor.total(&lines);

        match (merchant, total) {
            (Some(merchant_name), Some(total)) => {
                debug!(merchant = %merchant_name, %total, "fields extracted");
                Ok(ReceiptResult {
                    merchant_name,
                    total,
                    engine: self.recognizer.engine_name().to_string(),
                })
            }
            (merchant, total) => Err(ExtractionFailure::FieldNotRecoverable { merchant, total }),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
