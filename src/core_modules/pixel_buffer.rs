// Borrowed, row-major RGBA view. Length is checked once at construction.

use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};
use crate::error::{Result, VisionError};
use image::RgbaImage;

#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> PixelBuffer<'a> {
    /// Wraps `data` as a `width` x `height` RGBA8 buffer.
    ///
    /// Fails with `InvalidBuffer` when the slice length is not `width * height * 4`.
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(CHANNELS))
            .unwrap_or(usize::MAX);

        if data.len() != expected {
            return Err(VisionError::InvalidBuffer {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Borrows a decoded `image` buffer. Its layout already satisfies the invariant.
    pub fn from_rgba_image(image: &'a RgbaImage) -> Result<Self> {
        Self::new(image.width(), image.height(), image.as_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len() / CHANNELS
    }

    /// Pixel at flat (row-major) index. Panics if out of range.
    #[inline]
    pub fn pixel(&self, index: usize) -> Pixel {
        let offset = index * CHANNELS;
        Pixel::from_rgba(&self.data[offset..offset + CHANNELS])
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer.
    #[inline]
    pub fn pixel_at(&self, x: i64, y: i64) -> Option<Pixel> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(self.pixel(y as usize * self.width as usize + x as usize))
    }

    /// Every `stride`-th pixel in row-major order, starting with pixel 0.
    pub fn sampled(&self, stride: usize) -> impl Iterator<Item = Pixel> + 'a {
        self.data
            .chunks_exact(CHANNELS)
            .step_by(stride.max(1))
            .map(Pixel::from_rgba)
    }
}
