//! Hex colors and the lightness clamp used to keep remote colors readable.

use std::fmt;

/// Shown when a lookup succeeded but carried no usable color.
pub const PLACEHOLDER_COLOR: &str = "#666666";

/// Lightness floor (percent) for readable colors on a dark background.
pub const READABLE_MIN_LIGHTNESS: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Hue in degrees `[0, 360)`, saturation and lightness in percent `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Rgb {
    /// Parses `rrggbb` with or without a leading `#`.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_hex(self) -> String {
        self.to_string()
    }

    pub fn to_hsl(self) -> Hsl {
        let r = f64::from(self.r) / 255.0;
        let g = f64::from(self.g) / 255.0;
        let b = f64::from(self.b) / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let l = (max + min) / 2.0;

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };

        let s = if delta == 0.0 {
            0.0
        } else {
            delta / (1.0 - (2.0 * l - 1.0).abs())
        };

        Hsl {
            h,
            s: s * 100.0,
            l: l * 100.0,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Hsl {
    pub fn to_rgb(self) -> Rgb {
        let s = (self.s / 100.0).clamp(0.0, 1.0);
        let l = (self.l / 100.0).clamp(0.0, 1.0);
        let h = self.h.rem_euclid(360.0);

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = l - c / 2.0;

        let (r, g, b) = match h {
            h if h < 60.0 => (c, x, 0.0),
            h if h < 120.0 => (x, c, 0.0),
            h if h < 180.0 => (0.0, c, x),
            h if h < 240.0 => (0.0, x, c),
            h if h < 300.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgb {
            r: to_byte(r),
            g: to_byte(g),
            b: to_byte(b),
        }
    }

    /// Raises lightness to `floor`; hue and saturation are untouched.
    pub fn with_min_lightness(self, floor: f64) -> Self {
        Self {
            l: self.l.max(floor),
            ..self
        }
    }
}

/// Turns a remote `rrggbb` value into `#rrggbb`, or `None` if it is unset or
/// malformed.
pub fn normalize_hex(value: Option<&str>) -> Option<String> {
    value.and_then(Rgb::parse_hex).map(Rgb::to_hex)
}

/// Clamps a color's lightness to [`READABLE_MIN_LIGHTNESS`]. Colors already
/// light enough are returned as they are. Not invertible.
pub fn readable(color: Rgb) -> Rgb {
    let hsl = color.to_hsl();
    if hsl.l >= READABLE_MIN_LIGHTNESS {
        return color;
    }
    hsl.with_min_lightness(READABLE_MIN_LIGHTNESS).to_rgb()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1.0
    }

    #[test]
    fn parses_with_and_without_hash() {
        let expected = Rgb { r: 0xff, g: 0x00, b: 0x7f };
        assert_eq!(Rgb::parse_hex("ff007f"), Some(expected));
        assert_eq!(Rgb::parse_hex("#FF007F"), Some(expected));
        assert_eq!(Rgb::parse_hex("#ff00"), None);
        assert_eq!(Rgb::parse_hex("zzzzzz"), None);
        assert_eq!(Rgb::parse_hex("null"), None);
    }

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(Rgb { r: 1, g: 2, b: 3 }.to_hex(), "#010203");
    }

    #[test]
    fn normalize_degrades_missing_and_malformed() {
        assert_eq!(normalize_hex(Some("FF0000")).as_deref(), Some("#ff0000"));
        assert_eq!(normalize_hex(Some("")), None);
        assert_eq!(normalize_hex(None), None);
    }

    #[test]
    fn rgb_to_hsl_primaries() {
        let red = Rgb::parse_hex("ff0000").unwrap().to_hsl();
        assert_eq!((red.h, red.s, red.l), (0.0, 100.0, 50.0));

        let green = Rgb::parse_hex("00ff00").unwrap().to_hsl();
        assert_eq!((green.h, green.s, green.l), (120.0, 100.0, 50.0));

        let grey = Rgb::parse_hex("666666").unwrap().to_hsl();
        assert_eq!((grey.h, grey.s), (0.0, 0.0));
        assert!(close(grey.l, 40.0));
    }

    #[test]
    fn min_lightness_only_raises() {
        let dark = Hsl { h: 210.0, s: 40.0, l: 25.0 };
        assert_eq!(dark.with_min_lightness(70.0), Hsl { h: 210.0, s: 40.0, l: 70.0 });

        let light = Hsl { h: 210.0, s: 40.0, l: 85.0 };
        assert_eq!(light.with_min_lightness(70.0), light);
    }

    #[test]
    fn readable_raises_dark_colors() {
        let adjusted = readable(Rgb::parse_hex("ff0000").unwrap());
        assert_eq!(adjusted.to_hex(), "#ff6666");

        let hsl = adjusted.to_hsl();
        assert!(close(hsl.h, 0.0));
        assert!(close(hsl.s, 100.0));
        assert!(close(hsl.l, 70.0));
    }

    #[test]
    fn readable_keeps_hue_and_saturation() {
        for hex in ["1f3a93", "0b6623", "4b0082", "8b4513", "2f4f4f"] {
            let before = Rgb::parse_hex(hex).unwrap().to_hsl();
            let after = readable(Rgb::parse_hex(hex).unwrap()).to_hsl();

            assert!(close(before.h, after.h), "{hex}: hue {} -> {}", before.h, after.h);
            assert!(close(before.s, after.s), "{hex}: sat {} -> {}", before.s, after.s);
            assert!(after.l >= READABLE_MIN_LIGHTNESS - 0.5, "{hex}: lightness {}", after.l);
        }
    }

    #[test]
    fn readable_leaves_light_colors_alone() {
        let light = Rgb::parse_hex("ffcccc").unwrap();
        assert_eq!(readable(light), light);
    }
}
