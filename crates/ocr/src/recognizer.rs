use image::DynamicImage;
use thiserror::Error;

use crate::types::TextDetection;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image encode error: {0}")]
    ImageEncode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available; build with the `tesseract` feature")]
    NotAvailable,
}

/// Abstraction over an OCR backend.
///
/// Implementations receive the enhanced grayscale image and report every
/// detected text region unfiltered; low-confidence detections are the
/// extractors' concern.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextDetection>, OcrError>;

    /// Identifier reported alongside every extracted receipt.
    fn engine_name(&self) -> &str;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set list of detections. Lets the pipeline be tested
/// without an OCR engine installed.
pub struct MockRecognizer {
    pub detections: Vec<TextDetection>,
}

impl MockRecognizer {
    pub fn new(detections: Vec<TextDetection>) -> Self {
        Self { detections }
    }

    /// One full-width detection per line, 20 px apart, top to bottom.
    pub fn from_lines(lines: &[&str]) -> Self {
        let detections = lines
            .iter()
            .enumerate()
            .map(|(i, text)| TextDetection::from_rect(10.0, 10.0 + 20.0 * i as f32, 200.0, 12.0, *text, 0.9))
            .collect();
        Self { detections }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<TextDetection>, OcrError> {
        Ok(self.detections.clone())
    }

    fn engine_name(&self) -> &str {
        "mock"
    }
}

// ── Tesseract TSV output ──────────────────────────────────────────────────────

/// Word-level detections from Tesseract's TSV dump.
///
/// Columns: level, page, block, paragraph, line, word, left, top, width,
/// height, conf, text. Only word rows (level 5) with a non-negative
/// confidence and non-blank text are kept.
pub fn parse_tesseract_tsv(tsv: &str) -> Vec<TextDetection> {
    tsv.lines()
        .filter_map(|row| {
            let cols: Vec<&str> = row.splitn(12, '\t').collect();
            if cols.len() < 12 || cols[0] != "5" {
                return None;
            }
            let text = cols[11].trim();
            let conf: f32 = cols[10].trim().parse().ok()?;
            if text.is_empty() || conf < 0.0 {
                return None;
            }
            let left: f32 = cols[6].parse().ok()?;
            let top: f32 = cols[7].parse().ok()?;
            let width: f32 = cols[8].parse().ok()?;
            let height: f32 = cols[9].parse().ok()?;
            Some(TextDetection::from_rect(left, top, width, height, text, conf / 100.0))
        })
        .collect()
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{parse_tesseract_tsv, OcrBackend, OcrError};
    use crate::preprocess::encode_as_png;
    use crate::types::TextDetection;
    use image::DynamicImage;
    use leptess::LepTess;
    use std::sync::Mutex;

    /// Holds one initialised engine for the life of the process. Calls are
    /// serialised; run one recognizer per worker for parallel throughput.
    pub struct TesseractRecognizer {
        engine: Mutex<LepTess>,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<&str>, lang: &str) -> Result<Self, OcrError> {
            let engine = LepTess::new(data_path, lang).map_err(|e| OcrError::Engine(e.to_string()))?;
            Ok(Self { engine: Mutex::new(engine) })
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextDetection>, OcrError> {
            let png = encode_as_png(image).map_err(|e| OcrError::ImageEncode(e.to_string()))?;
            let mut engine = self
                .engine
                .lock()
                .map_err(|_| OcrError::Engine("engine lock poisoned".into()))?;
            engine
                .set_image_from_mem(&png)
                .map_err(|e| OcrError::ImageEncode(e.to_string()))?;
            let tsv = engine.get_tsv_text(0).map_err(|e| OcrError::Engine(e.to_string()))?;
            Ok(parse_tesseract_tsv(&tsv))
        }

        fn engine_name(&self) -> &str {
            "tesseract"
        }
    }
}
