// Detector hand-off types. Boxes are trusted as-is and may run past the image;
// the samplers that read pixels clip to the canvas.

use serde::{Deserialize, Serialize};

const FLOOR_LIMIT: f64 = u32::MAX as f64;

/// Axis-aligned box in pixel units, `(x, y)` being the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// `width / height`. Infinite or NaN for degenerate boxes; callers compare
    /// against bands, so those simply fail every band.
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Integer grid version of the box, every component floored and clamped to
    /// `[-FLOOR_LIMIT, FLOOR_LIMIT]` so sums of two components cannot overflow.
    /// NaN components become 0.
    pub fn floored(&self) -> (i64, i64, i64, i64) {
        let grid = |value: f64| value.floor().clamp(-FLOOR_LIMIT, FLOOR_LIMIT) as i64;
        (grid(self.x), grid(self.y), grid(self.width), grid(self.height))
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x, y, width, height]: [f64; 4]) -> Self {
        Self::new(x, y, width, height)
    }
}

/// One object reported by the external detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedRegion {
    /// Raw detector label, e.g. `"sports ball"`. Never the translated display string.
    pub category: String,
    /// Detector score in [0, 1].
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl DetectedRegion {
    pub fn new(category: impl Into<String>, confidence: f32, bbox: impl Into<BoundingBox>) -> Self {
        Self {
            category: category.into(),
            confidence,
            bbox: bbox.into(),
        }
    }
}
