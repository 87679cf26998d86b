//! Color types shared by every layer
//!
//! Channels are `u8`, so a color can never leave the 0..=255 range.

pub use smart_leds::hsv::hsv2rgb;

pub type Rgb = smart_leds::RGB8;
pub type Hsv = smart_leds::hsv::Hsv;

/// All channels off
pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

/// Color used by the boot self-test flash
pub const BOOT_BLUE: Rgb = Rgb { r: 0, g: 0, b: 255 };

/// Scale an 8-bit value by a factor (0-255 = 0.0-1.0)
///
/// Uses integer math for efficiency on embedded systems.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub fn scale8(value: u8, scale: u8) -> u8 {
    ((u16::from(value) * u16::from(scale)) >> 8) as u8
}

/// Scale every channel of a color by the same factor
#[inline]
pub fn scale_color(color: Rgb, scale: u8) -> Rgb {
    if scale == u8::MAX {
        return color;
    }
    Rgb {
        r: scale8(color.r, scale),
        g: scale8(color.g, scale),
        b: scale8(color.b, scale),
    }
}
