use image::{imageops, DynamicImage, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::edges::canny;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::hough::{detect_lines, LineDetectionOptions};
use imageproc::point::Point;
use imageproc::rect::Rect;
use tracing::debug;

use super::{best_effort, ensure_non_empty, PreprocessError};
use crate::config::NormalizeOptions;

const BACKGROUND: Luma<u8> = Luma([255u8]);

/// Crop to the printed region, then rotate away small-angle skew.
///
/// Never fails: on any internal fault the input comes back unmodified.
pub fn crop_and_deskew(image: DynamicImage, options: &NormalizeOptions) -> DynamicImage {
    best_effort("normalize", image, |img| normalize(img, options))
}

fn normalize(img: &DynamicImage, options: &NormalizeOptions) -> Result<DynamicImage, PreprocessError> {
    ensure_non_empty(img)?;
    let gray = img.to_luma8();
    let (width, height) = gray.dimensions();

    let cropped = match printed_area(&gray, options.crop_margin) {
        Some(area) if area.width() < width || area.height() < height => {
            debug!(
                x = area.left(),
                y = area.top(),
                width = area.width(),
                height = area.height(),
                "cropping to printed area"
            );
            Some(
                imageops::crop_imm(&gray, area.left() as u32, area.top() as u32, area.width(), area.height())
                    .to_image(),
            )
        }
        Some(_) => None,
        None => {
            debug!("no printed area found; keeping full frame");
            None
        }
    };
    let changed = cropped.is_some();
    let gray = cropped.unwrap_or(gray);

    match skew_to_correct(&gray, options) {
        Some(angle) => Ok(DynamicImage::ImageLuma8(rotate(&gray, angle))),
        // Untouched frames keep their original buffer and color type.
        None if !changed => Ok(img.clone()),
        None => Ok(DynamicImage::ImageLuma8(gray)),
    }
}

/// Bounding box of the largest external foreground contour after Otsu
/// binarization, grown by `margin` on each side and clamped to the image.
pub fn printed_area(gray: &GrayImage, margin: u32) -> Option<Rect> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let binary = threshold(gray, otsu_level(gray), ThresholdType::Binary);

    let (min_x, min_y, max_x, max_y) = find_contours::<u32>(&binary)
        .iter()
        .filter(|c| c.parent.is_none() && matches!(c.border_type, BorderType::Outer))
        .filter_map(|c| bounds(&c.points))
        .max_by_key(|&(x0, y0, x1, y1)| u64::from(x1 - x0 + 1) * u64::from(y1 - y0 + 1))?;

    let left = min_x.saturating_sub(margin);
    let top = min_y.saturating_sub(margin);
    let right = max_x.saturating_add(margin).min(width - 1);
    let bottom = max_y.saturating_add(margin).min(height - 1);

    Some(Rect::at(left as i32, top as i32).of_size(right - left + 1, bottom - top + 1))
}

fn bounds(points: &[Point<u32>]) -> Option<(u32, u32, u32, u32)> {
    let first = points.first()?;
    Some(points.iter().fold(
        (first.x, first.y, first.x, first.y),
        |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
    ))
}

/// Median angle in degrees of the dominant straight lines, or `None` when
/// the detector finds no lines.
///
/// Hough reports the angle of each line's normal in `[0, 180)`; angles above
/// 45° are shifted down by 90° so horizontal baselines and vertical edges
/// both land near zero.
pub fn estimate_skew(gray: &GrayImage, options: &NormalizeOptions) -> Option<f32> {
    let edges = canny(gray, options.canny_low, options.canny_high);
    let lines = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold: options.hough_vote_threshold,
            suppression_radius: options.hough_suppression_radius,
        },
    );

    let mut angles: Vec<f32> = lines
        .iter()
        .take(options.max_skew_lines)
        .map(|line| {
            let angle = line.angle_in_degrees as f32;
            if angle > 45.0 { angle - 90.0 } else { angle }
        })
        .collect();
    debug!(lines = lines.len(), used = angles.len(), "hough lines detected");

    median(&mut angles)
}

/// Rotate by the negated skew estimate about the image center. Dimensions
/// are preserved and exposed corners are filled with white.
pub fn correct_skew(gray: GrayImage, options: &NormalizeOptions) -> GrayImage {
    match skew_to_correct(&gray, options) {
        Some(angle) => rotate(&gray, angle),
        None => gray,
    }
}

/// The estimated skew when it exceeds the tolerance.
fn skew_to_correct(gray: &GrayImage, options: &NormalizeOptions) -> Option<f32> {
    let angle = estimate_skew(gray, options)?;
    if angle.abs() > options.min_skew_degrees {
        debug!(angle, "correcting skew");
        Some(angle)
    } else {
        debug!(angle, "skew within tolerance");
        None
    }
}

fn rotate(gray: &GrayImage, angle: f32) -> GrayImage {
    rotate_about_center(gray, (-angle).to_radians(), Interpolation::Bilinear, BACKGROUND)
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
