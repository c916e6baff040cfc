pub mod batch;
pub mod config;
pub mod extract;
pub mod lines;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod score;
pub mod types;

pub use batch::{BatchError, BatchReport, BatchRunner, ReportEntry};
pub use config::{ConfigError, ReceiptConfig};
pub use extract::Extractor;
pub use lines::{group_lines, group_lines_with_threshold, LINE_THRESHOLD};
pub use pipeline::{ExtractionFailure, ReceiptPipeline};
pub use preprocess::PreprocessError;
pub use recognizer::{parse_tesseract_tsv, MockRecognizer, OcrBackend, OcrError};
pub use score::{ReceiptScorer, ScoreError, ScoreRequest, ScoreResponse};
pub use types::{ReceiptResult, TextDetection, TextLine};

#[cfg(feature = "tesseract")]
pub use recognizer::tesseract_backend::TesseractRecognizer;
