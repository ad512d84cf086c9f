// Draws detector boxes and their caption tabs ("Pelota 87%") onto the analysed
// image. Drawing clips to the canvas, so boxes spilling past an edge show partially.

use crate::core_modules::labels::LabelTable;
use crate::core_modules::region::DetectedRegion;
use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{Blend, draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::sync::LazyLock;
use tracing::warn;

pub const STROKE_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const STROKE_WIDTH: i64 = 3;
pub const TAB_HEIGHT: i64 = 25;
/// Stroke green at 90% opacity.
const TAB_COLOR: Rgba<u8> = Rgba([0, 255, 0, 230]);
const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
const TEXT_SCALE: f32 = 16.0;
const TAB_PADDING: i64 = 10;
const TEXT_INSET_X: i64 = 5;
const TEXT_INSET_Y: i64 = 3;
/// Edges further off the canvas than this are pulled in to it. They stay invisible.
const OFF_CANVAS_MARGIN: i64 = 16;

static CAPTION_FONT: LazyLock<Option<FontArc>> = LazyLock::new(|| {
    FontArc::try_from_slice(include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf"))
        .map_err(|err| warn!(%err, "caption font unavailable, tabs drawn without text"))
        .ok()
});

/// Caption shown on a region's tab, e.g. `"Pelota 87%"`.
pub fn caption(region: &DetectedRegion, labels: &LabelTable) -> String {
    format!(
        "{} {:.0}%",
        labels.translate(&region.category),
        region.confidence * 100.0
    )
}

/// Intersects the half-open span `[x0, x1) x [y0, y1)` with the canvas.
fn visible_rect(image: &RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64) -> Option<Rect> {
    let (x0, y0) = (x0.max(0), y0.max(0));
    let (x1, y1) = (x1.min(image.width() as i64), y1.min(image.height() as i64));
    (x1 > x0 && y1 > y0).then(|| Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0) as u32, (y1 - y0) as u32))
}

/// Strokes a box outline `STROKE_WIDTH` pixels wide, centred on the box edges.
fn stroke_box(image: &mut RgbaImage, x: i64, y: i64, width: i64, height: i64) {
    let pull = |value: i64, extent: u32| value.clamp(-OFF_CANVAS_MARGIN, extent as i64 + OFF_CANVAS_MARGIN);
    let (left, right) = (pull(x, image.width()), pull(x + width, image.width()));
    let (top, bottom) = (pull(y, image.height()), pull(y + height, image.height()));

    let half = STROKE_WIDTH / 2;
    for offset in -half..=half {
        let rect_width = right - left + 1 + 2 * offset;
        let rect_height = bottom - top + 1 + 2 * offset;
        if rect_width <= 0 || rect_height <= 0 {
            continue;
        }
        let rect = Rect::at((left - offset) as i32, (top - offset) as i32).of_size(rect_width as u32, rect_height as u32);
        draw_hollow_rect_mut(image, rect, STROKE_COLOR);
    }
}

/// Blends the caption tab above `(x, y)` and writes the caption into it.
fn draw_caption(image: &mut RgbaImage, x: i64, y: i64, text: &str) {
    let font = CAPTION_FONT.as_ref();
    let scale = PxScale::from(TEXT_SCALE);
    let text_width = font.map_or(0, |font| text_size(scale, font, text).0 as i64);

    let Some(tab) = visible_rect(image, x, y - TAB_HEIGHT, x + text_width + TAB_PADDING, y) else {
        return;
    };

    let mut canvas = Blend(std::mem::take(image));
    draw_filled_rect_mut(&mut canvas, tab, TAB_COLOR);
    *image = canvas.0;

    // a visible tab bounds x and y to the canvas neighbourhood
    if let Some(font) = font {
        let (text_x, text_y) = (x + TEXT_INSET_X, y - TAB_HEIGHT + TEXT_INSET_Y);
        draw_text_mut(image, TEXT_COLOR, text_x as i32, text_y as i32, scale, font, text);
    }
}

/// Draws every region onto `image` in order.
pub fn annotate(image: &mut RgbaImage, regions: &[DetectedRegion], labels: &LabelTable) {
    for region in regions {
        let (x, y, width, height) = region.bbox.floored();
        stroke_box(image, x, y, width, height);
        draw_caption(image, x, y, &caption(region, labels));
    }
}
