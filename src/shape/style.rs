//! Stroke and fill styling for canvas shapes.

use crate::color_utils::{DEFAULT_COLOR, parse_hex};

/// Fill alpha applied to label colors.
pub const DEFAULT_FILL_ALPHA: f32 = 0.3;

/// Stroke width in view pixels.
pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;

fn default_rgb() -> [u8; 3] {
    parse_hex(DEFAULT_COLOR).unwrap_or([0xf4, 0x7b, 0x90])
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeStyle {
    pub stroke: [u8; 3],
    pub fill: [u8; 3],
    /// 0.0 (transparent) to 1.0 (opaque).
    pub fill_alpha: f32,
    pub stroke_width: f32,
}

impl ShapeStyle {
    /// Style derived from a `#rrggbb` label color. Invalid colors use the default.
    pub fn from_hex(color: &str, fill_alpha: f32) -> Self {
        let rgb = parse_hex(color).unwrap_or_else(default_rgb);
        Self {
            stroke: rgb,
            fill: rgb,
            fill_alpha: fill_alpha.clamp(0.0, 1.0),
            stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }

    /// Fill as RGBA in 0.0-1.0.
    pub fn fill_rgba(&self) -> [f32; 4] {
        [
            self.fill[0] as f32 / 255.0,
            self.fill[1] as f32 / 255.0,
            self.fill[2] as f32 / 255.0,
            self.fill_alpha,
        ]
    }
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self::from_hex(DEFAULT_COLOR, DEFAULT_FILL_ALPHA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        let style = ShapeStyle::from_hex("#ff0000", 0.3);
        assert_eq!(style.fill, [255, 0, 0]);
        assert_eq!(style.fill_rgba(), [1.0, 0.0, 0.0, 0.3]);
    }

    #[test]
    fn test_invalid_color_uses_default() {
        let style = ShapeStyle::from_hex("bogus", 2.0);
        assert_eq!(style.fill, [0xf4, 0x7b, 0x90]);
        assert_eq!(style.fill_alpha, 1.0);
    }
}
