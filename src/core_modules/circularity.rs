// THEORY:
// The circularity sampler is a cheap roundness proxy, not contour analysis. It
// walks a sparse grid (every 3rd pixel on both axes) over a bounding box, keeps
// the points bright enough to count as "foreground", and reports what fraction of
// them lies inside the box's inscribed circle.
//
// A round object photographed on a dark background fills the inscribed disk and
// leaves the corners empty, so the ratio approaches 1.0. A square object fills
// the corners too, so the ratio drops to roughly pi/4.
//
// Key properties:
// 1.  **Stateless Utility**: one box in, one ratio out, no memory between calls.
// 2.  **Clamped Sampling**: boxes may extend past the image; grid points that fall
//     outside the buffer are skipped while the grid keeps its phase relative to
//     the box origin.
// 3.  **Empty Is Not An Error**: a box with no foreground reports 0.0.

pub mod circularity {
    use crate::core_modules::pixel_buffer::PixelBuffer;
    use crate::core_modules::region::BoundingBox;
    use tracing::trace;

    /// Grid step, in pixels, on both axes.
    pub const GRID_STRIDE: i64 = 3;
    /// Mean-channel brightness a point must exceed to count as foreground.
    pub const FOREGROUND_BRIGHTNESS: f64 = 50.0;

    /// First grid coordinate `>= 0` on the lattice `start + k * GRID_STRIDE`.
    fn first_in_bounds(start: i64) -> i64 {
        if start >= 0 {
            start
        } else {
            start + ((-start + GRID_STRIDE - 1) / GRID_STRIDE) * GRID_STRIDE
        }
    }

    /// Fraction of foreground grid points inside the inscribed circle of `bbox`,
    /// in [0, 1].
    pub fn circularity(buffer: &PixelBuffer, bbox: &BoundingBox) -> f64 {
        let (box_x, box_y, box_width, box_height) = bbox.floored();

        let center_x = box_x as f64 + box_width as f64 / 2.0;
        let center_y = box_y as f64 + box_height as f64 / 2.0;
        let radius = box_width.min(box_height) as f64 / 2.0;

        let x_end = (box_x + box_width).min(buffer.width() as i64);
        let y_end = (box_y + box_height).min(buffer.height() as i64);

        let mut inside = 0u64;
        let mut total = 0u64;

        let mut y = first_in_bounds(box_y);
        while y < y_end {
            let mut x = first_in_bounds(box_x);
            while x < x_end {
                if let Some(pixel) = buffer.pixel_at(x, y) {
                    if pixel.mean_brightness() > FOREGROUND_BRIGHTNESS {
                        total += 1;
                        let distance = (x as f64 - center_x).hypot(y as f64 - center_y);
                        if distance <= radius {
                            inside += 1;
                        }
                    }
                }
                x += GRID_STRIDE;
            }
            y += GRID_STRIDE;
        }

        trace!(inside, total, "circularity samples");

        if total == 0 {
            0.0
        } else {
            inside as f64 / total as f64
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::circularity::*;
    use crate::core_modules::pixel_buffer::PixelBuffer;
    use crate::core_modules::region::BoundingBox;

    /// `size` x `size` black canvas with a white disk of `radius` around `(cx, cy)`.
    pub(crate) fn disk_canvas(size: u32, cx: f64, cy: f64, radius: f64) -> Vec<u8> {
        let mut data = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let inside = (x as f64 - cx).hypot(y as f64 - cy) <= radius;
                let v = if inside { 255 } else { 0 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        data
    }

    /// `size` x `size` black canvas with a white filled rectangle.
    pub(crate) fn rect_canvas(size: u32, x0: u32, y0: u32, width: u32, height: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let inside = x >= x0 && x < x0 + width && y >= y0 && y < y0 + height;
                let v = if inside { 255 } else { 0 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        data
    }

    #[test]
    fn filled_disk_is_fully_circular() {
        let data = disk_canvas(50, 25.0, 25.0, 15.0);
        let buffer = PixelBuffer::new(50, 50, &data).unwrap();
        let ratio = circularity(&buffer, &BoundingBox::new(10.0, 10.0, 30.0, 30.0));
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn filled_square_is_about_pi_over_four() {
        let data = rect_canvas(50, 10, 10, 30, 30);
        let buffer = PixelBuffer::new(50, 50, &data).unwrap();
        let ratio = circularity(&buffer, &BoundingBox::new(10.0, 10.0, 30.0, 30.0));
        // 79 of the 100 grid points fall inside the inscribed circle
        assert!((ratio - 0.79).abs() < 1e-12, "ratio was {ratio}");
        assert!(ratio <= 0.8);
    }

    #[test]
    fn dark_box_reports_zero() {
        let data = vec![0u8; 20 * 20 * 4];
        let buffer = PixelBuffer::new(20, 20, &data).unwrap();
        assert_eq!(circularity(&buffer, &BoundingBox::new(0.0, 0.0, 20.0, 20.0)), 0.0);
    }

    #[test]
    fn box_entirely_outside_reports_zero() {
        let data = vec![255u8; 10 * 10 * 4];
        let buffer = PixelBuffer::new(10, 10, &data).unwrap();
        assert_eq!(circularity(&buffer, &BoundingBox::new(50.0, 50.0, 10.0, 10.0)), 0.0);
        assert_eq!(circularity(&buffer, &BoundingBox::new(-40.0, -40.0, 10.0, 10.0)), 0.0);
    }

    #[test]
    fn oversized_box_is_clamped() {
        let data = vec![255u8; 12 * 12 * 4];
        let buffer = PixelBuffer::new(12, 12, &data).unwrap();
        let ratio = circularity(&buffer, &BoundingBox::new(-30.0, -30.0, 100.0, 100.0));
        // every visible point is foreground and well within the huge circle
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn negative_origin_keeps_grid_phase() {
        // only (1, 1) is bright; a box starting at -2 samples -2, 1, 4, ...
        let mut data = vec![0u8; 6 * 6 * 4];
        let offset = (6 + 1) * 4;
        data[offset..offset + 4].copy_from_slice(&[255, 255, 255, 255]);
        let buffer = PixelBuffer::new(6, 6, &data).unwrap();
        let ratio = circularity(&buffer, &BoundingBox::new(-2.0, -2.0, 6.0, 6.0));
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn degenerate_box_reports_zero() {
        let data = vec![255u8; 8 * 8 * 4];
        let buffer = PixelBuffer::new(8, 8, &data).unwrap();
        assert_eq!(circularity(&buffer, &BoundingBox::new(2.0, 2.0, 0.0, 5.0)), 0.0);
    }

    #[test]
    fn astronomically_large_boxes_report_zero() {
        let data = vec![255u8; 16 * 16 * 4];
        let buffer = PixelBuffer::new(16, 16, &data).unwrap();
        assert_eq!(circularity(&buffer, &BoundingBox::new(1e19, 0.0, 1e19, 1e19)), 0.0);
        assert_eq!(circularity(&buffer, &BoundingBox::new(-1e19, -1e19, 1e19, 1e19)), 0.0);
        assert_eq!(circularity(&buffer, &BoundingBox::new(f64::NEG_INFINITY, 0.0, 8.0, 8.0)), 0.0);
    }
}
