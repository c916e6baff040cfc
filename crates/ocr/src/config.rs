use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tuning knobs for every stage. An empty file gives the stock behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReceiptConfig {
    pub normalize: NormalizeOptions,
    pub enhance: EnhanceOptions,
    pub grouping: GroupingOptions,
    pub merchant: MerchantOptions,
    pub batch: BatchOptions,
}

impl ReceiptConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeOptions {
    /// Pixels kept around the printed area on each side.
    pub crop_margin: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub hough_vote_threshold: u32,
    pub hough_suppression_radius: u32,
    /// Only the first N detected lines contribute to the skew estimate.
    pub max_skew_lines: usize,
    /// Skew at or below this magnitude is left alone.
    pub min_skew_degrees: f32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            crop_margin: 20,
            canny_low: 50.0,
            canny_high: 150.0,
            hough_vote_threshold: 100,
            hough_suppression_radius: 8,
            max_skew_lines: 10,
            min_skew_degrees: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EnhanceOptions {
    /// Median kernel is `2r+1` square.
    pub median_radius: u32,
    /// Closing structuring element is `2r+1` square; 0 is the 1×1 element.
    pub closing_radius: u8,
}

impl Default for EnhanceOptions {
    fn default() -> Self {
        Self { median_radius: 1, closing_radius: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GroupingOptions {
    pub line_threshold: f32,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self { line_threshold: crate::lines::LINE_THRESHOLD }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MerchantOptions {
    pub scan_lines: usize,
    pub min_length: usize,
    pub keywords: Vec<String>,
}

impl Default for MerchantOptions {
    fn default() -> Self {
        Self {
            scan_lines: 5,
            min_length: 3,
            keywords: crate::extract::MERCHANT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BatchOptions {
    pub workers: usize,
    pub extensions: Vec<String>,
    pub report: PathBuf,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            report: PathBuf::from("ocr_results.json"),
        }
    }
}
