//! Hue wheel color sequence
//!
//! Walks the hue circle in fixed steps at full saturation and a fixed
//! brightness ceiling. The walk is deterministic: the same start hue and the
//! same number of calls always give the same colors.

use crate::color::{Hsv, Rgb, hsv2rgb};

pub const DEFAULT_HUE_STEP: u8 = 5;
pub const DEFAULT_SATURATION: u8 = 255;
pub const DEFAULT_BRIGHTNESS_CEILING: u8 = 200;

/// Deterministic rainbow walk used by the producer
#[derive(Debug, Clone)]
pub struct HueSequence {
    /// Hue of the last generated color
    hue: u8,
    /// Hue advance per call, wraps modulo 256
    step: u8,
    /// Saturation (0-255)
    saturation: u8,
    /// Value (0-255), the brightest any channel can get
    value: u8,
}

impl Default for HueSequence {
    fn default() -> Self {
        Self {
            hue: 0,
            step: DEFAULT_HUE_STEP,
            saturation: DEFAULT_SATURATION,
            value: DEFAULT_BRIGHTNESS_CEILING,
        }
    }
}

impl HueSequence {
    /// Create a sequence with custom parameters
    pub const fn new(step: u8, saturation: u8, value: u8) -> Self {
        Self {
            hue: 0,
            step,
            saturation,
            value,
        }
    }

    /// Set the hue the walk starts from
    #[must_use]
    pub const fn with_start_hue(mut self, hue: u8) -> Self {
        self.hue = hue;
        self
    }

    /// Hue of the last generated color
    pub const fn hue(&self) -> u8 {
        self.hue
    }

    /// Advance the hue and return the color for it
    pub fn next(&mut self) -> Rgb {
        self.hue = self.hue.wrapping_add(self.step);
        hsv2rgb(Hsv {
            hue: self.hue,
            sat: self.saturation,
            val: self.value,
        })
    }
}
