//! A [`Value`] is a named block of interdependent channels, written together
//! to one texture in one pass.

use crate::error::PlanError;

/// A single simulation value: a channel count in `[1, channels_max]`.
///
/// Values are ordered; that order fixes the shader macro names
/// (`texture_0`, `channels_0`, ...) even after [`crate::packer::pack`]
/// reorders storage.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Value {
    pub channels: u8,
}

impl Value {
    pub fn new(channels: u8) -> Self {
        Self { channels }
    }

    pub fn validate(&self, value_index: usize, channels_max: u8) -> Result<(), PlanError> {
        if self.channels == 0 || self.channels > channels_max {
            return Err(PlanError::InvalidValue {
                value_index,
                channels: self.channels,
                channels_max,
            });
        }
        Ok(())
    }
}

/// GLSL swizzle for the `channels`-wide slice of a texel starting at
/// `offset` (the value's channel offset within its texture).
///
/// Assumes exactly four channels labelled r,g,b,a; supporting more than
/// four would require widening both this table and the `channels_max`
/// invariant.
pub fn swizzle(offset: u8, channels: u8) -> &'static str {
    const LANES: [&str; 4] = ["r", "g", "b", "a"];
    debug_assert!(offset as usize + channels as usize <= 4);
    match (offset, channels) {
        (0, 1) => "r",
        (1, 1) => "g",
        (2, 1) => "b",
        (3, 1) => "a",
        (0, 2) => "rg",
        (1, 2) => "gb",
        (2, 2) => "ba",
        (0, 3) => "rgb",
        (1, 3) => "gba",
        (0, 4) => "rgba",
        _ => {
            let _ = LANES;
            panic!("unsupported swizzle offset={offset} channels={channels}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_in_range_channels() {
        assert!(Value::new(1).validate(0, 4).is_ok());
        assert!(Value::new(4).validate(0, 4).is_ok());
    }

    #[test]
    fn validate_rejects_zero_and_over_max() {
        assert_eq!(
            Value::new(0).validate(2, 4),
            Err(PlanError::InvalidValue {
                value_index: 2,
                channels: 0,
                channels_max: 4
            })
        );
        assert_eq!(
            Value::new(5).validate(3, 4),
            Err(PlanError::InvalidValue {
                value_index: 3,
                channels: 5,
                channels_max: 4
            })
        );
    }

    #[test]
    fn swizzle_table_matches_offsets() {
        assert_eq!(swizzle(0, 1), "r");
        assert_eq!(swizzle(1, 1), "g");
        assert_eq!(swizzle(0, 2), "rg");
        assert_eq!(swizzle(0, 4), "rgba");
    }
}
