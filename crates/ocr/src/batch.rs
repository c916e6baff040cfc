use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tillscan_core::Money;
use tracing::{debug, error, info};

use crate::pipeline::{ExtractionFailure, ReceiptPipeline};
use crate::recognizer::OcrBackend;
use crate::types::ReceiptResult;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to list {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write report {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Batch worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
    #[error("Batch runner has no workers")]
    NoWorkers,
}

/// Outcome for one file. Failures keep null fields and put the reason in
/// `ocr_engine_used`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportEntry {
    pub merchant_name: Option<String>,
    pub total_amount: Option<Money>,
    pub ocr_engine_used: String,
}

const FAILURE_PREFIX: &str = "error: ";

impl ReportEntry {
    pub fn success(result: ReceiptResult) -> Self {
        Self {
            merchant_name: Some(result.merchant_name),
            total_amount: Some(result.total),
            ocr_engine_used: result.engine,
        }
    }

    pub fn failure(err: &ExtractionFailure) -> Self {
        Self {
            merchant_name: None,
            total_amount: None,
            ocr_engine_used: format!("{FAILURE_PREFIX}{err}"),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.ocr_engine_used.starts_with(FAILURE_PREFIX)
    }
}

/// Filename → outcome, sorted by filename.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct BatchReport {
    entries: BTreeMap<String, ReportEntry>,
}

impl BatchReport {
    pub fn get(&self, filename: &str) -> Option<&ReportEntry> {
        self.entries.get(filename)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ReportEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.entries.values().filter(|e| e.is_failure()).count()
    }

    /// Write the report as pretty-printed JSON.
    pub async fn save(&self, path: &Path) -> Result<(), BatchError> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await.map_err(|source| BatchError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Runs the receipt pipeline over every image in a directory.
///
/// Each worker owns one pipeline (and so one OCR engine). Files are dealt to
/// workers round-robin in filename order and each worker runs on its own
/// blocking thread.
pub struct BatchRunner<R: OcrBackend + 'static> {
    workers: Vec<Arc<ReceiptPipeline<R>>>,
    extensions: Vec<String>,
}

impl<R: OcrBackend + 'static> BatchRunner<R> {
    pub fn new(pipeline: ReceiptPipeline<R>) -> Self {
        Self::with_workers(vec![pipeline])
    }

    /// Image extensions are taken from the first pipeline's config.
    pub fn with_workers(pipelines: Vec<ReceiptPipeline<R>>) -> Self {
        let extensions = pipelines
            .first()
            .map(|p| p.config().batch.extensions.clone())
            .unwrap_or_default();
        Self {
            workers: pipelines.into_iter().map(Arc::new).collect(),
            extensions: Vec::new(),
        }
        .with_extensions(extensions)
    }

    /// Replace the accepted extensions (matched case-insensitively, without the dot).
    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: impl IntoIterator<Item = S>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// Process every image in `dir`. A failing receipt becomes a failure entry;
    /// only listing the directory or losing a worker aborts the run.
    pub async fn run(&self, dir: &Path) -> Result<BatchReport, BatchError> {
        if self.workers.is_empty() {
            return Err(BatchError::NoWorkers);
        }
        let files = self.list_images(dir).await?;
        info!(dir = %dir.display(), files = files.len(), workers = self.workers.len(), "starting batch");

        let mut shards: Vec<Vec<(String, PathBuf)>> = vec![Vec::new(); self.workers.len()];
        for (i, file) in files.into_iter().enumerate() {
            shards[i % self.workers.len()].push(file);
        }

        let mut handles = Vec::new();
        for (pipeline, shard) in self.workers.iter().zip(shards) {
            if shard.is_empty() {
                continue;
            }
            let pipeline = Arc::clone(pipeline);
            handles.push(tokio::task::spawn_blocking(move || {
                shard
                    .into_iter()
                    .map(|(name, path)| {
                        let entry = process_one(&pipeline, &name, &path);
                        (name, entry)
                    })
                    .collect::<Vec<_>>()
            }));
        }

        let mut report = BatchReport::default();
        for handle in handles {
            report.entries.extend(handle.await?);
        }

        info!(files = report.len(), failures = report.failures(), "batch complete");
        Ok(report)
    }

    /// Regular files with an image extension, sorted by filename.
    async fn list_images(&self, dir: &Path) -> Result<Vec<(String, PathBuf)>, BatchError> {
        let read_err = |source: std::io::Error| BatchError::ReadDir { path: dir.to_path_buf(), source };
        let mut entries = tokio::fs::read_dir(dir).await.map_err(read_err)?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let path = entry.path();
            // Follows symlinks, unlike `DirEntry::file_type`.
            let is_file = tokio::fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false);
            if !is_file || !self.is_image(&path) {
                debug!(path = %path.display(), "skipping non-image entry");
                continue;
            }
            files.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
        files.sort();
        Ok(files)
    }
}

fn process_one<R: OcrBackend>(pipeline: &ReceiptPipeline<R>, name: &str, path: &Path) -> ReportEntry {
    match pipeline.process(path) {
        Ok(result) => {
            info!(file = name, merchant = %result.merchant_name, total = %result.total, "receipt processed");
            ReportEntry::success(result)
        }
        Err(e) => {
            error!(file = name, error = %e, "receipt failed");
            ReportEntry::failure(&e)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
