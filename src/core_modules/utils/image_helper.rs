// Decoding, resizing and encoding glue around the `image` crate. The analyzers
// only ever see a `PixelBuffer`; everything codec-shaped stays in here.

pub mod image_helper {
    use crate::error::{Result, VisionError};
    use image::codecs::jpeg::JpegEncoder;
    use image::imageops::FilterType;
    use image::{DynamicImage, ImageEncoder, RgbaImage};
    use std::path::Path;
    use tracing::debug;

    /// Decodes any format the `image` crate recognises into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
        let image = image::load_from_memory(bytes)?;
        Ok(image.to_rgba8())
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
        let image = image::open(path.as_ref())?;
        Ok(image.to_rgba8())
    }

    /// Target size so that neither side exceeds `max_dimension`, aspect preserved,
    /// sides floored. Images already small enough keep their size.
    pub fn fitted_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
        if width <= max_dimension && height <= max_dimension {
            return (width, height);
        }
        let scale = max_dimension as f64 / width.max(height) as f64;
        (
            ((width as f64 * scale).floor() as u32).max(1),
            ((height as f64 * scale).floor() as u32).max(1),
        )
    }

    /// Downscales `image` to fit within `max_dimension`. Never upscales.
    pub fn fit_within(image: RgbaImage, max_dimension: u32) -> Result<RgbaImage> {
        if max_dimension == 0 {
            return Err(VisionError::InvalidDimensions(max_dimension, max_dimension));
        }
        let (width, height) = image.dimensions();
        let (target_width, target_height) = fitted_dimensions(width, height, max_dimension);
        if (target_width, target_height) == (width, height) {
            return Ok(image);
        }
        debug!(width, height, target_width, target_height, "downscaling input");
        Ok(image::imageops::resize(&image, target_width, target_height, FilterType::Triangle))
    }

    /// Encodes to baseline JPEG. Alpha is dropped.
    pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
        let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
        encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ExtendedColorType::Rgb8)?;
        Ok(bytes)
    }

    pub fn save<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::image_helper::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn fitted_dimensions_keep_aspect() {
        assert_eq!(fitted_dimensions(1280, 720, 640), (640, 360));
        assert_eq!(fitted_dimensions(720, 1280, 640), (360, 640));
        assert_eq!(fitted_dimensions(1000, 10, 640), (640, 6));
        assert_eq!(fitted_dimensions(640, 640, 640), (640, 640));
        assert_eq!(fitted_dimensions(5000, 1, 640), (640, 1));
    }

    #[test]
    fn small_images_are_untouched() {
        let image = RgbaImage::from_pixel(30, 20, Rgba([9, 8, 7, 255]));
        let fitted = fit_within(image.clone(), 640).unwrap();
        assert_eq!(fitted, image);
    }

    #[test]
    fn large_images_are_downscaled() {
        let image = RgbaImage::from_pixel(800, 400, Rgba([200, 10, 10, 255]));
        let fitted = fit_within(image, 640).unwrap();
        assert_eq!(fitted.dimensions(), (640, 320));
        assert_eq!(fitted.get_pixel(100, 100), &Rgba([200, 10, 10, 255]));
    }

    #[test]
    fn zero_max_dimension_is_rejected() {
        let image = RgbaImage::new(4, 4);
        assert!(fit_within(image, 0).is_err());
    }

    #[test]
    fn jpeg_round_trip_decodes() {
        let image = RgbaImage::from_pixel(16, 8, Rgba([0, 0, 255, 255]));
        let bytes = encode_jpeg(&image, 90).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (16, 8));
    }

    #[test]
    fn open_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encoded.jpg");
        let image = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        save(&path, &encode_jpeg(&image, 95).unwrap()).unwrap();
        assert_eq!(open(&path).unwrap().dimensions(), (10, 10));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(decode(b"definitely not an image").is_err());
    }
}
