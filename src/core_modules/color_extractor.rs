// THEORY:
// The `color_extractor` answers "what color is this picture?" with a single,
// human-readable name. It works in three passes over a sparse sample of the
// image:
//
// 1.  **Histogram**: every 10th pixel that survives the alpha gate is quantized
//     into a coarse 8x8x8 RGB cube (bins 32 wide per channel). Bins are packed
//     into one integer key and counted in an insertion-ordered map, so ties are
//     broken by whichever bin the scan met first.
// 2.  **Refinement**: the winning bin is only a lower corner of a cube. A second
//     pass over the same samples averages every pixel within 40 of that corner on
//     all three channels, recovering the actual shade (a flat image comes back
//     exactly, with no quantization drift).
// 3.  **Naming**: the refined RGB goes through HSV. Low-saturation colors are
//     split into White/Gray/Black by value; everything else is named by the hue
//     band it falls in. The band table covers the full circle, so every RGB
//     triple has exactly one name.
//
// The function is pure and allocation-light: a handful of map entries, no image
// copies.

use crate::core_modules::pixel::pixel::{Channel, Pixel};
use crate::core_modules::pixel_buffer::PixelBuffer;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Only one pixel in `SAMPLE_STRIDE` is looked at.
pub const SAMPLE_STRIDE: usize = 10;
/// Width of a histogram bin on each channel.
pub const BIN_WIDTH: Channel = 32;
/// Max per-channel distance from the winning bin for a pixel to join the average.
pub const REFINE_TOLERANCE: i16 = 40;
/// Fallback when nothing survives the alpha gate.
pub const NEUTRAL_GRAY: (Channel, Channel, Channel) = (128, 128, 128);

const ACHROMATIC_SATURATION: f64 = 0.15;
const WHITE_VALUE: f64 = 0.85;
const BLACK_VALUE: f64 = 0.25;

/// Human color names produced by the HSV classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorName {
    White,
    Black,
    Gray,
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Pink,
}

impl ColorName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorName::White => "White",
            ColorName::Black => "Black",
            ColorName::Gray => "Gray",
            ColorName::Red => "Red",
            ColorName::Orange => "Orange",
            ColorName::Yellow => "Yellow",
            ColorName::Green => "Green",
            ColorName::Cyan => "Cyan",
            ColorName::Blue => "Blue",
            ColorName::Purple => "Purple",
            ColorName::Pink => "Pink",
        }
    }

    /// True for White, Gray and Black.
    pub fn is_achromatic(&self) -> bool {
        matches!(self, ColorName::White | ColorName::Gray | ColorName::Black)
    }
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The dominant color of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorResult {
    pub rgb: (Channel, Channel, Channel),
    /// `#rrggbb`, lowercase.
    pub hex: String,
    pub name: ColorName,
}

impl ColorResult {
    pub fn from_rgb(red: Channel, green: Channel, blue: Channel) -> Self {
        Self {
            rgb: (red, green, blue),
            hex: to_hex(red, green, blue),
            name: name_color(red, green, blue),
        }
    }

    /// CSS-style `rgb(r, g, b)` string.
    pub fn css(&self) -> String {
        let (red, green, blue) = self.rgb;
        format!("rgb({}, {}, {})", red, green, blue)
    }
}

pub fn to_hex(red: Channel, green: Channel, blue: Channel) -> String {
    format!("#{:02x}{:02x}{:02x}", red, green, blue)
}

#[inline]
fn quantize(channel: Channel) -> Channel {
    (channel / BIN_WIDTH) * BIN_WIDTH
}

#[inline]
fn pack_bin(pixel: &Pixel) -> u32 {
    (quantize(pixel.red) as u32) << 16 | (quantize(pixel.green) as u32) << 8 | quantize(pixel.blue) as u32
}

#[inline]
fn unpack_bin(key: u32) -> (Channel, Channel, Channel) {
    ((key >> 16) as Channel, (key >> 8) as Channel, key as Channel)
}

/// Finds and names the dominant color of `buffer`.
///
/// Never fails: an image with no opaque samples yields neutral gray.
pub fn extract_dominant_color(buffer: &PixelBuffer) -> ColorResult {
    // --- 1. Histogram ---
    let mut histogram: IndexMap<u32, u32> = IndexMap::new();
    for pixel in buffer.sampled(SAMPLE_STRIDE).filter(Pixel::is_opaque) {
        *histogram.entry(pack_bin(&pixel)).or_insert(0) += 1;
    }

    let mut dominant = NEUTRAL_GRAY;
    let mut best_count = 0;
    for (&key, &count) in &histogram {
        // strictly greater: the earliest bin keeps a tie
        if count > best_count {
            best_count = count;
            dominant = unpack_bin(key);
        }
    }
    trace!(
        bins = histogram.len(),
        count = best_count,
        ?dominant,
        "histogram winner"
    );

    // --- 2. Refinement ---
    let (bin_red, bin_green, bin_blue) = dominant;
    let near = |channel: Channel, center: Channel| (channel as i16 - center as i16).abs() < REFINE_TOLERANCE;

    let (mut sum_red, mut sum_green, mut sum_blue, mut count) = (0u64, 0u64, 0u64, 0u64);
    for pixel in buffer.sampled(SAMPLE_STRIDE).filter(Pixel::is_opaque) {
        if near(pixel.red, bin_red) && near(pixel.green, bin_green) && near(pixel.blue, bin_blue) {
            sum_red += pixel.red as u64;
            sum_green += pixel.green as u64;
            sum_blue += pixel.blue as u64;
            count += 1;
        }
    }

    let average = |sum: u64, fallback: Channel| -> Channel {
        if count == 0 {
            fallback
        } else {
            (sum as f64 / count as f64).round() as Channel
        }
    };

    // --- 3. Naming ---
    ColorResult::from_rgb(
        average(sum_red, bin_red),
        average(sum_green, bin_green),
        average(sum_blue, bin_blue),
    )
}

/// Names an RGB color by its HSV coordinates.
pub fn name_color(red: Channel, green: Channel, blue: Channel) -> ColorName {
    let pixel = Pixel::from((red, green, blue));
    let saturation = pixel.saturation_hsv();
    let value = pixel.value_hsv();

    if saturation < ACHROMATIC_SATURATION {
        return if value > WHITE_VALUE {
            ColorName::White
        } else if value < BLACK_VALUE {
            ColorName::Black
        } else {
            ColorName::Gray
        };
    }

    // Bands are matched on the hue rounded to a whole degree, [0, 360].
    match pixel.hue().round() as u16 {
        0..15 => ColorName::Red,
        15..45 => ColorName::Orange,
        45..75 => ColorName::Yellow,
        75..150 => ColorName::Green,
        150..210 => ColorName::Cyan,
        210..270 => ColorName::Blue,
        270..330 => ColorName::Purple,
        330..345 => ColorName::Pink,
        _ => ColorName::Red,
    }
}
