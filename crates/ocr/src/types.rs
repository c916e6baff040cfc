use serde::{Deserialize, Serialize};
use tillscan_core::Money;

/// One text fragment reported by the OCR engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextDetection {
    /// Polygon vertices `(x, y)` in image coordinates, in engine order.
    pub polygon: Vec<(f32, f32)>,
    pub text: String,
    /// Engine confidence (0.0–1.0).
    pub confidence: f32,
}

impl TextDetection {
    pub fn new(polygon: Vec<(f32, f32)>, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            polygon,
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Axis-aligned rectangle as a 4-vertex polygon, clockwise from top-left.
    pub fn from_rect(left: f32, top: f32, width: f32, height: f32, text: impl Into<String>, confidence: f32) -> Self {
        let polygon = vec![
            (left, top),
            (left + width, top),
            (left + width, top + height),
            (left, top + height),
        ];
        Self::new(polygon, text, confidence)
    }

    /// Mean y of the polygon vertices.
    pub fn vertical_center(&self) -> f32 {
        if self.polygon.is_empty() {
            return 0.0;
        }
        self.polygon.iter().map(|(_, y)| y).sum::<f32>() / self.polygon.len() as f32
    }
}

/// Detections merged onto one printed line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub vertical_position: f32,
}

impl TextLine {
    pub fn new(text: impl Into<String>, vertical_position: f32) -> Self {
        Self { text: text.into(), vertical_position }
    }
}

/// The two recovered receipt fields plus the engine that read them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiptResult {
    pub merchant_name: String,
    pub total: Money,
    pub engine: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_clamps_confidence() {
        let d = TextDetection::new(vec![], "x", 1.5);
        assert_eq!(d.confidence, 1.0);
        let d = TextDetection::new(vec![], "x", -0.1);
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn vertical_center_is_mean_y() {
        let d = TextDetection::from_rect(10.0, 20.0, 50.0, 10.0, "WALMART", 0.9);
        assert_eq!(d.vertical_center(), 25.0);
    }

    #[test]
    fn vertical_center_of_irregular_polygon() {
        let d = TextDetection::new(vec![(0.0, 0.0), (4.0, 3.0), (2.0, 9.0)], "x", 0.5);
        assert_eq!(d.vertical_center(), 4.0);
    }

    #[test]
    fn empty_polygon_centers_at_origin() {
        let d = TextDetection::new(vec![], "x", 0.5);
        assert_eq!(d.vertical_center(), 0.0);
    }
}
