//! Color value types: 24-bit hex colors and 4-bit terminal registers.

use crate::error::ColorError;
use std::fmt;

/// Number of physical color registers in a 4-bit terminal palette.
pub const REGISTER_COUNT: u8 = 16;

/// Base names of the 8 normal registers; bright registers are `light_` variants.
const FOUR_BIT_NAMES: [&str; 8] = [
    "black", "red", "green", "yellow", "blue", "magenta", "cyan", "white",
];

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// A validated 24-bit RGB color.
///
/// Stored normalized as lowercase `#rrggbb`; equality and hashing use the
/// normalized form, so `Color::parse("FF0000")` equals `Color::parse("#ff0000")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color {
    hex: String,
}

impl Color {
    /// Parse a 6-hex-digit code with an optional leading `#`.
    pub fn parse(code: &str) -> Result<Self, ColorError> {
        let digits = code.strip_prefix('#').unwrap_or(code);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHex(code.to_string()));
        }
        Ok(Self {
            hex: format!("#{}", digits.to_ascii_lowercase()),
        })
    }

    /// Normalized hex representation, always `#rrggbb`.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Byte value per channel, taken from the hex digit pairs in order.
    pub fn rgb(&self) -> (u8, u8, u8) {
        let digits = &self.hex[1..];
        let channel = |i: usize| u8::from_str_radix(&digits[2 * i..2 * i + 2], 16).unwrap_or(0);
        (channel(0), channel(1), channel(2))
    }

    /// Per-channel value scaled to `accuracy` as `floor(channel / 256 * accuracy)`.
    ///
    /// The divisor is 256, not 255: a full channel never reaches `accuracy`
    /// exactly (255 at accuracy 1000 yields 996). The hardware color-set call
    /// expects exactly this scaling, so it must not be "corrected".
    pub fn scaled_rgb(&self, accuracy: u32) -> (u32, u32, u32) {
        let (r, g, b) = self.rgb();
        let scale = |channel: u8| (u32::from(channel) * accuracy) / 256;
        (scale(r), scale(g), scale(b))
    }

    /// Channels on the 0–1000 scale used by `tput initc`.
    pub fn large_percentage(&self) -> (u32, u32, u32) {
        self.scaled_rgb(1000)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

// ---------------------------------------------------------------------------
// ColorIdentifier
// ---------------------------------------------------------------------------

/// One of the 16 4-bit terminal color registers.
///
/// Ordered, compared and hashed by index. Displays as its X resource name
/// (`color0` .. `color15`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorIdentifier {
    index: u8,
}

impl ColorIdentifier {
    /// Construct from a register index in [0, 16).
    pub fn from_index(index: u8) -> Result<Self, ColorError> {
        if index >= REGISTER_COUNT {
            return Err(ColorError::InvalidIdentifier(index));
        }
        Ok(Self { index })
    }

    /// All 16 identifiers in index order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..REGISTER_COUNT).map(|index| Self { index })
    }

    pub fn index(self) -> u8 {
        self.index
    }

    /// X resource name component, `color<N>`.
    pub fn resource_name(self) -> String {
        format!("color{}", self.index)
    }

    /// Human-readable 4-bit name: `black` .. `white`, `light_black` .. `light_white`.
    pub fn four_bit_name(self) -> String {
        let base = FOUR_BIT_NAMES[usize::from(self.index % 8)];
        if self.index < 8 {
            base.to_string()
        } else {
            format!("light_{base}")
        }
    }

    /// ANSI escape-sequence index token.
    ///
    /// Returned as a string because bright registers use a compound
    /// bold-prefixed token: `"30+N"` for 0–7 and `"1;30+N"` for 8–15
    /// (index 3 is `"33"`, index 11 is `"1;41"`).
    pub fn escape_sequence_index(self) -> String {
        let code = 30 + u32::from(self.index);
        if self.index < 8 {
            code.to_string()
        } else {
            format!("1;{code}")
        }
    }
}

impl fmt::Display for ColorIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "color{}", self.index)
    }
}
