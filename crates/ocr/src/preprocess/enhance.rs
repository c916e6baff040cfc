use image::DynamicImage;
use imageproc::contrast::equalize_histogram;
use imageproc::filter::median_filter;
use imageproc::morphology::{grayscale_close, Mask};
use tracing::debug;

use super::{best_effort, ensure_non_empty, PreprocessError};
use crate::config::EnhanceOptions;

/// Equalize, denoise and close small stroke gaps. Output is grayscale with
/// the input's dimensions; on any fault the input is returned as-is.
pub fn enhance(image: DynamicImage, options: &EnhanceOptions) -> DynamicImage {
    best_effort("enhance", image, |img| enhance_gray(img, options))
}

fn enhance_gray(img: &DynamicImage, options: &EnhanceOptions) -> Result<DynamicImage, PreprocessError> {
    ensure_non_empty(img)?;
    let gray = img.to_luma8();

    // Faded thermal print sits in a narrow band; spread it over 0..=255.
    let equalized = equalize_histogram(&gray);
    let denoised = median_filter(&equalized, options.median_radius, options.median_radius);
    let closed = grayscale_close(&denoised, &Mask::square(options.closing_radius));

    debug!(width = closed.width(), height = closed.height(), "enhanced image");
    Ok(DynamicImage::ImageLuma8(closed))
}
