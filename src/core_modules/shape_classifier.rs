// THEORY:
// The shape classifier is a straight-line rule chain, evaluated in a fixed order
// because earlier rules intentionally override later ones:
//
// 1.  **Subject Selection**: when the detector found anything, the region with the
//     largest box area is "the subject" (first one wins a tie).
// 2.  **Category Shortcuts**: real-world knowledge beats geometry. A detected ball
//     or clock is round no matter how its box was cropped; a phone or laptop is
//     rectangular.
// 3.  **Box Geometry**: a near-square box is ambiguous (square or round?) and is
//     settled by the circularity sampler. A clearly elongated box is a rectangle.
//     A box between those bands decides nothing.
// 4.  **Whole-Image Fallback**: with no detections, or an undecided subject, the
//     frame's own aspect ratio decides between Square and Rectangle.
//
// Every comparison is on raw detector labels, never on translated display text.

use crate::core_modules::circularity::circularity::circularity;
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::region::DetectedRegion;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Detector labels whose objects are round in the real world.
pub const ROUND_CATEGORIES: [&str; 6] = ["sports ball", "orange", "apple", "clock", "frisbee", "donut"];
/// Detector labels whose objects are rectangular in the real world.
pub const RECTANGULAR_CATEGORIES: [&str; 6] = ["cell phone", "remote", "book", "keyboard", "laptop", "tv"];

const SQUARE_BOX_MIN: f64 = 0.85;
const SQUARE_BOX_MAX: f64 = 1.15;
const WIDE_BOX_MIN: f64 = 1.5;
const TALL_BOX_MAX: f64 = 0.67;
const CIRCLE_CIRCULARITY: f64 = 0.8;
const SQUARE_IMAGE_MIN: f64 = 0.9;
const SQUARE_IMAGE_MAX: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeResult {
    Circle,
    Square,
    Rectangle,
}

impl fmt::Display for ShapeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShapeResult::Circle => "Circle",
            ShapeResult::Square => "Square",
            ShapeResult::Rectangle => "Rectangle",
        })
    }
}

/// The region with the largest box area; the earliest one on ties.
pub fn largest_region(regions: &[DetectedRegion]) -> Option<&DetectedRegion> {
    regions.iter().fold(None, |largest: Option<&DetectedRegion>, region| match largest {
        Some(current) if region.bbox.area() > current.bbox.area() => Some(region),
        Some(current) => Some(current),
        None => Some(region),
    })
}

/// Shape of the subject region, or `None` when its geometry is inconclusive.
fn classify_subject(subject: &DetectedRegion, buffer: &PixelBuffer) -> Option<ShapeResult> {
    let category = subject.category.as_str();
    if ROUND_CATEGORIES.contains(&category) {
        return Some(ShapeResult::Circle);
    }
    if RECTANGULAR_CATEGORIES.contains(&category) {
        return Some(ShapeResult::Rectangle);
    }

    let aspect_ratio = subject.bbox.aspect_ratio();
    if (SQUARE_BOX_MIN..=SQUARE_BOX_MAX).contains(&aspect_ratio) {
        let roundness = circularity(buffer, &subject.bbox);
        debug!(category, aspect_ratio, roundness, "near-square subject");
        return Some(if roundness > CIRCLE_CIRCULARITY {
            ShapeResult::Circle
        } else {
            ShapeResult::Square
        });
    }
    if aspect_ratio > WIDE_BOX_MIN || aspect_ratio < TALL_BOX_MAX {
        return Some(ShapeResult::Rectangle);
    }

    debug!(category, aspect_ratio, "subject geometry inconclusive");
    None
}

/// Classifies the dominant shape of an image.
///
/// `width` and `height` are the image dimensions used by the whole-image fallback;
/// `buffer` is only read for the circularity check.
pub fn classify_shape(regions: &[DetectedRegion], width: u32, height: u32, buffer: &PixelBuffer) -> ShapeResult {
    if let Some(shape) = largest_region(regions).and_then(|subject| classify_subject(subject, buffer)) {
        return shape;
    }

    let image_ratio = width as f64 / height as f64;
    if (SQUARE_IMAGE_MIN..=SQUARE_IMAGE_MAX).contains(&image_ratio) {
        ShapeResult::Square
    } else {
        ShapeResult::Rectangle
    }
}
