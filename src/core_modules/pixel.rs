// THEORY (single-pixel heuristics):
// One RGBA sample plus what can be computed from it alone: the alpha gate,
// mean brightness, and HSV hue/saturation/value on the 0..255 scale.

pub mod pixel {
    pub type Channel = u8;
    pub type Hue = f64;
    pub type Saturation = f64;
    pub type Value = f64;
    pub type Brightness = f64;

    pub const CHANNELS: usize = 4;

    /// Alpha values below this are treated as transparent background.
    pub const OPAQUE_ALPHA_THRESHOLD: Channel = 128;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        /// Builds a pixel from the first four bytes of an RGBA slice.
        #[inline]
        pub fn from_rgba(bytes: &[u8]) -> Self {
            Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
        }

        pub fn rgb(&self) -> (Channel, Channel, Channel) {
            (self.red, self.green, self.blue)
        }

        /// True when the pixel survives the background alpha gate.
        #[inline]
        pub fn is_opaque(&self) -> bool {
            self.alpha >= OPAQUE_ALPHA_THRESHOLD
        }

        /// Unweighted mean of R, G and B on the 0..255 scale.
        ///
        /// Deliberately not Rec. 601: foreground detection only needs a cheap,
        /// symmetric brightness proxy.
        #[inline]
        pub fn mean_brightness(&self) -> Brightness {
            (self.red as f64 + self.green as f64 + self.blue as f64) / 3.0
        }

        fn max_channel(&self) -> f64 {
            self.red.max(self.green).max(self.blue) as f64
        }

        fn min_channel(&self) -> f64 {
            self.red.min(self.green).min(self.blue) as f64
        }

        /// Hue angle in degrees [0, 360), unrounded.
        ///
        /// Zero for achromatic pixels. When several channels tie for the
        /// maximum, red wins over green and green over blue.
        pub fn hue(&self) -> Hue {
            let maximum_channel = self.max_channel();
            let chroma = maximum_channel - self.min_channel();
            if chroma == 0.0 {
                return 0.0;
            }

            let (red, green, blue) = (self.red as f64, self.green as f64, self.blue as f64);
            let sector = if maximum_channel == red {
                ((green - blue) / chroma).rem_euclid(6.0)
            } else if maximum_channel == green {
                (blue - red) / chroma + 2.0
            } else {
                (red - green) / chroma + 4.0
            };

            let mut hue_degrees = sector * 60.0;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            hue_degrees
        }

        /// Saturation (HSV): chroma / max, zero for black.
        pub fn saturation_hsv(&self) -> Saturation {
            let maximum_channel = self.max_channel();
            if maximum_channel == 0.0 {
                return 0.0;
            }
            (maximum_channel - self.min_channel()) / maximum_channel
        }

        /// Value (HSV): max channel normalized to 0..1.
        pub fn value_hsv(&self) -> Value {
            self.max_channel() / 255.0
        }
    }

    impl From<(Channel, Channel, Channel)> for Pixel {
        fn from((red, green, blue): (Channel, Channel, Channel)) -> Self {
            Pixel::new(red, green, blue, Channel::MAX)
        }
    }
}
