// THEORY (Single-Color Heuristics):
// The `Color` module is the most fundamental unit of the color engine. A `Color`
// is an immutable RGB triple: the value produced by clustering, the value stored
// in palette entries, and the value handed back to callers. Everything here is a
// 1-dimensional heuristic: a metric computed from one color alone, with no
// knowledge of a region, a palette, or another color. Comparisons between colors
// (weighted distances) live in the namer.
//
// Heuristic families:
// - Brightness:  intensity (plain channel mean, used for light/dark adjectives)
// - Spread:      max−min channel difference, used to detect near-neutral grays
// - Hue space:   HSV conversion and its inverse. The lighting correction works on
//                the HSV value channel only, so the round trip must preserve hue
//                and saturation up to byte rounding.
//
// Channel order is always R, G, B. Regions stored as BGR are reordered before a
// `Color` is ever constructed.

pub mod color {
    pub type Channel = u8;
    pub type Intensity = f64;
    pub type Spread = u8;
    pub type Hue = f32;
    pub type Saturation = f32;

    /// An RGB color. Immutable value type.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Color {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Color {
        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Self { red, green, blue }
        }

        /// Builds a color from floating-point channels: rounds, then saturates into 0..=255.
        pub fn from_f64_saturating(red: f64, green: f64, blue: f64) -> Self {
            Self {
                red: saturate_channel(red),
                green: saturate_channel(green),
                blue: saturate_channel(blue),
            }
        }

        pub fn channels(&self) -> [Channel; 3] {
            [self.red, self.green, self.blue]
        }

        pub fn as_tuple(&self) -> (Channel, Channel, Channel) {
            (self.red, self.green, self.blue)
        }

        pub fn max_channel(&self) -> Channel {
            self.red.max(self.green.max(self.blue))
        }

        pub fn min_channel(&self) -> Channel {
            self.red.min(self.green.min(self.blue))
        }

        /// Mean of the three channels.
        pub fn intensity(&self) -> Intensity {
            (self.red as f64 + self.green as f64 + self.blue as f64) / 3.0
        }

        /// max − min over the channels. Small spread means the color is close to gray.
        pub fn spread(&self) -> Spread {
            self.max_channel() - self.min_channel()
        }

        /// Converts to HSV. Hue is in degrees [0, 360), saturation in [0, 1], value is
        /// the max channel on the byte scale.
        pub fn to_hsv(&self) -> Hsv {
            let red = self.red as f32 / 255.0;
            let green = self.green as f32 / 255.0;
            let blue = self.blue as f32 / 255.0;

            let maximum_channel = red.max(green.max(blue));
            let minimum_channel = red.min(green.min(blue));
            let chroma = maximum_channel - minimum_channel;

            let hue = if chroma <= 1e-6 {
                0.0
            } else {
                let (base_difference, sector_offset) = if maximum_channel == red {
                    (green - blue, 0.0)
                } else if maximum_channel == green {
                    (blue - red, 2.0)
                } else {
                    (red - green, 4.0)
                };
                let mut hue_degrees = (base_difference / chroma + sector_offset) * 60.0;
                if hue_degrees < 0.0 {
                    hue_degrees += 360.0;
                }
                hue_degrees
            };

            let saturation = if maximum_channel <= 0.0 {
                0.0
            } else {
                chroma / maximum_channel
            };

            Hsv {
                hue,
                saturation,
                value: self.max_channel(),
            }
        }
    }

    impl From<(Channel, Channel, Channel)> for Color {
        fn from((red, green, blue): (Channel, Channel, Channel)) -> Self {
            Self::new(red, green, blue)
        }
    }

    impl From<[Channel; 3]> for Color {
        fn from([red, green, blue]: [Channel; 3]) -> Self {
            Self::new(red, green, blue)
        }
    }

    impl From<image::Rgb<u8>> for Color {
        fn from(pixel: image::Rgb<u8>) -> Self {
            Self::new(pixel[0], pixel[1], pixel[2])
        }
    }

    impl std::fmt::Display for Color {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "({}, {}, {})", self.red, self.green, self.blue)
        }
    }

    /// A color in hue/saturation/value space.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Hsv {
        /// Angle on the color wheel in degrees [0, 360).
        pub hue: Hue,
        /// Chroma relative to value, [0, 1].
        pub saturation: Saturation,
        /// Brightness on the byte scale (the max RGB channel).
        pub value: Channel,
    }

    impl Hsv {
        /// Same hue and saturation, different value.
        pub fn with_value(&self, value: Channel) -> Self {
            Self { value, ..*self }
        }

        pub fn to_color(&self) -> Color {
            let value = self.value as f32 / 255.0;
            let chroma = value * self.saturation.clamp(0.0, 1.0);
            let sector = self.hue.rem_euclid(360.0) / 60.0;
            let secondary = chroma * (1.0 - ((sector % 2.0) - 1.0).abs());
            let offset = value - chroma;

            let (red, green, blue) = match sector as u32 {
                0 => (chroma, secondary, 0.0),
                1 => (secondary, chroma, 0.0),
                2 => (0.0, chroma, secondary),
                3 => (0.0, secondary, chroma),
                4 => (secondary, 0.0, chroma),
                _ => (chroma, 0.0, secondary),
            };

            Color::from_f64_saturating(
                ((red + offset) * 255.0) as f64,
                ((green + offset) * 255.0) as f64,
                ((blue + offset) * 255.0) as f64,
            )
        }
    }

    /// Rounds and clamps a channel value into 0..=255. NaN maps to 0.
    pub fn saturate_channel(value: f64) -> Channel {
        if value.is_nan() {
            return 0;
        }
        value.round().clamp(0.0, 255.0) as Channel
    }
}
