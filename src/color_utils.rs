//! Color helpers for labels and shape styling.
//!
//! Colors are stored as `#rrggbb` strings in the data model and converted to
//! RGB triples for styling.

/// Color used when a label has no valid color.
pub const DEFAULT_COLOR: &str = "#f47b90";

/// Parse a `#rrggbb` (or `rrggbb`) hex string.
pub fn parse_hex(color: &str) -> Option<[u8; 3]> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Format an RGB triple as a lowercase `#rrggbb` string.
pub fn to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Normalize a color string, falling back to `DEFAULT_COLOR` when it is invalid.
pub fn normalize_hex(color: &str) -> String {
    match parse_hex(color) {
        Some(rgb) => to_hex(rgb),
        None => {
            log::warn!("Invalid color '{}', using {}", color, DEFAULT_COLOR);
            DEFAULT_COLOR.to_string()
        }
    }
}

/// Convert HSV to RGB.
///
/// # Arguments
/// * `h` - Hue in degrees (0-360)
/// * `s` - Saturation (0.0-1.0)
/// * `v` - Value/brightness (0.0-1.0)
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (r + m, g + m, b + m)
}

/// Distinct label color for the n-th label (golden-angle hue stepping).
pub fn palette_color(index: usize) -> String {
    let hue = (index as f32 * 137.508) % 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.55, 0.95);
    to_hex([
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#f47b90"), Some([0xf4, 0x7b, 0x90]));
        assert_eq!(parse_hex("00FF10"), Some([0, 255, 16]));
        assert_eq!(parse_hex("#fff"), None);
        assert_eq!(parse_hex("#gg0000"), None);
    }

    #[test]
    fn test_normalize_hex_falls_back() {
        assert_eq!(normalize_hex("#ABCDEF"), "#abcdef");
        assert_eq!(normalize_hex("red"), DEFAULT_COLOR);
    }

    #[test]
    fn test_hsv_to_rgb_primaries() {
        let (r, g, b) = hsv_to_rgb(0.0, 1.0, 1.0);
        assert!((r - 1.0).abs() < 0.01 && g.abs() < 0.01 && b.abs() < 0.01);
        let (r, g, b) = hsv_to_rgb(240.0, 1.0, 1.0);
        assert!(r.abs() < 0.01 && g.abs() < 0.01 && (b - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_palette_colors_differ() {
        assert_ne!(palette_color(0), palette_color(1));
        assert!(parse_hex(&palette_color(7)).is_some());
    }
}
