//! Image preparation ahead of OCR.
//!
//! Both stages are best-effort: a fault inside a stage is logged and the
//! stage's input is passed through untouched, so a receipt that cannot be
//! cleaned up still reaches the OCR engine.

pub mod enhance;
pub mod normalize;

use image::DynamicImage;
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::warn;

pub use enhance::enhance;
pub use normalize::{correct_skew, crop_and_deskew, estimate_skew, printed_area};

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

pub(crate) fn ensure_non_empty(img: &DynamicImage) -> Result<(), PreprocessError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(PreprocessError::Empty { width: img.width(), height: img.height() });
    }
    Ok(())
}

/// Run `stage` on `image`; on error or panic, hand back `image` unmodified.
pub(crate) fn best_effort<F>(stage: &'static str, image: DynamicImage, f: F) -> DynamicImage
where
    F: FnOnce(&DynamicImage) -> Result<DynamicImage, PreprocessError>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| f(&image))) {
        Ok(Ok(out)) => out,
        Ok(Err(e)) => {
            warn!(stage, error = %e, "preprocessing stage failed; passing image through");
            image
        }
        Err(_) => {
            warn!(stage, "preprocessing stage panicked; passing image through");
            image
        }
    }
}

/// Encode as PNG for engines that take an in-memory file.
pub fn encode_as_png(img: &DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
