//! Color parsing and mixing
//!
//! Channels are mixed in linear light: squared, interpolated, then square
//! rooted, which avoids the dark band a straight sRGB blend shows between
//! saturated colors. Alpha is mixed linearly.

use regex::Regex;
use std::sync::OnceLock;

/// A color in sRGB channels (0-255) with alpha (0-1)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

static FUNCTIONAL_COLOR: OnceLock<Regex> = OnceLock::new();

fn functional_color() -> &'static Regex {
    FUNCTIONAL_COLOR.get_or_init(|| {
        Regex::new(r"(?i)^\s*(rgba?|hsla?)\(\s*([^,\s/]+)[,\s]+([^,\s/]+)[,\s]+([^,\s/)]+)\s*(?:[,/]\s*([^\s)]+)\s*)?\)\s*$")
            .expect("Invalid color regex")
    })
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        red: 0.0,
        green: 0.0,
        blue: 0.0,
        alpha: 0.0,
    };

    pub fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()`,
    /// `hsl()` or `hsla()`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex(hex);
        }

        let captures = functional_color().captures(text)?;
        let kind = captures.get(1)?.as_str().to_ascii_lowercase();
        let first = parse_channel(captures.get(2)?.as_str())?;
        let second = parse_channel(captures.get(3)?.as_str())?;
        let third = parse_channel(captures.get(4)?.as_str())?;
        let alpha = match captures.get(5) {
            Some(alpha) => parse_alpha(alpha.as_str())?,
            None => 1.0,
        };

        if kind.starts_with("hsl") {
            Some(hsla_to_rgba(first, second, third, alpha))
        } else {
            Some(Rgba::new(
                first.clamp(0.0, 255.0),
                second.clamp(0.0, 255.0),
                third.clamp(0.0, 255.0),
                alpha,
            ))
        }
    }

    /// Serialize as `rgba(r, g, b, a)` with whole-number channels
    pub fn to_css(&self) -> String {
        format!(
            "rgba({}, {}, {}, {})",
            self.red.clamp(0.0, 255.0).round(),
            self.green.clamp(0.0, 255.0).round(),
            self.blue.clamp(0.0, 255.0).round(),
            super::sanitize(self.alpha.clamp(0.0, 1.0))
        )
    }
}

/// Whether `text` is a single color
pub fn is_color(text: &str) -> bool {
    Rgba::parse(text).is_some()
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let expand = |c: &str| u8::from_str_radix(&c.repeat(2), 16).ok();
    let pair = |c: &str| u8::from_str_radix(c, 16).ok();

    let (r, g, b, a) = match hex.len() {
        3 => (expand(&hex[0..1])?, expand(&hex[1..2])?, expand(&hex[2..3])?, 255),
        4 => (
            expand(&hex[0..1])?,
            expand(&hex[1..2])?,
            expand(&hex[2..3])?,
            expand(&hex[3..4])?,
        ),
        6 => (pair(&hex[0..2])?, pair(&hex[2..4])?, pair(&hex[4..6])?, 255),
        8 => (
            pair(&hex[0..2])?,
            pair(&hex[2..4])?,
            pair(&hex[4..6])?,
            pair(&hex[6..8])?,
        ),
        _ => return None,
    };

    Some(Rgba::new(r as f64, g as f64, b as f64, a as f64 / 255.0))
}

fn parse_channel(text: &str) -> Option<f64> {
    text.trim_end_matches('%').parse::<f64>().ok()
}

fn parse_alpha(text: &str) -> Option<f64> {
    let alpha = match text.strip_suffix('%') {
        Some(percent) => percent.parse::<f64>().ok()? / 100.0,
        None => text.parse::<f64>().ok()?,
    };
    Some(alpha.clamp(0.0, 1.0))
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 0.5 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

/// Convert hue (degrees), saturation and lightness (percent) to RGBA
pub fn hsla_to_rgba(hue: f64, saturation: f64, lightness: f64, alpha: f64) -> Rgba {
    let hue = hue / 360.0;
    let saturation = saturation / 100.0;
    let lightness = lightness / 100.0;

    let (r, g, b) = if saturation == 0.0 {
        (lightness, lightness, lightness)
    } else {
        let q = if lightness < 0.5 {
            lightness * (1.0 + saturation)
        } else {
            lightness + saturation - lightness * saturation
        };
        let p = 2.0 * lightness - q;
        (
            hue_to_rgb(p, q, hue + 1.0 / 3.0),
            hue_to_rgb(p, q, hue),
            hue_to_rgb(p, q, hue - 1.0 / 3.0),
        )
    };

    Rgba::new(
        (r * 255.0).round(),
        (g * 255.0).round(),
        (b * 255.0).round(),
        alpha,
    )
}

fn mix_linear_channel(from: f64, to: f64, p: f64) -> f64 {
    let from_sq = from * from;
    let value = p * (to * to - from_sq) + from_sq;
    value.max(0.0).sqrt()
}

/// Blend two colors at progress `p`
pub fn mix_rgba(from: &Rgba, to: &Rgba, p: f64) -> Rgba {
    Rgba {
        red: mix_linear_channel(from.red, to.red, p),
        green: mix_linear_channel(from.green, to.green, p),
        blue: mix_linear_channel(from.blue, to.blue, p),
        alpha: super::mix_number(from.alpha, to.alpha, p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Rgba::parse("#f00"), Some(Rgba::new(255.0, 0.0, 0.0, 1.0)));
        assert_eq!(Rgba::parse("#00ff0080").map(|c| c.green), Some(255.0));
        assert!((Rgba::parse("#00ff0080").unwrap().alpha - 128.0 / 255.0).abs() < 1e-9);
        assert_eq!(Rgba::parse("#12345"), None);
        assert_eq!(Rgba::parse("#ggg"), None);
    }

    #[test]
    fn test_parse_functional_forms() {
        assert_eq!(
            Rgba::parse("rgba(10, 20, 30, 0.5)"),
            Some(Rgba::new(10.0, 20.0, 30.0, 0.5))
        );
        assert_eq!(
            Rgba::parse("rgb(10 20 30 / 50%)"),
            Some(Rgba::new(10.0, 20.0, 30.0, 0.5))
        );
        assert_eq!(
            Rgba::parse("hsl(120, 100%, 50%)"),
            Some(Rgba::new(0.0, 255.0, 0.0, 1.0))
        );
        assert_eq!(Rgba::parse("translateX(10px)"), None);
    }

    #[test]
    fn test_linear_light_midpoint() {
        let red = Rgba::new(255.0, 0.0, 0.0, 1.0);
        let blue = Rgba::new(0.0, 0.0, 255.0, 0.0);
        let mid = mix_rgba(&red, &blue, 0.5);

        // sqrt(255² / 2) rather than 127.5
        assert!((mid.red - 180.312).abs() < 0.01);
        assert_eq!(mid.alpha, 0.5);
        assert_eq!(mid.to_css(), "rgba(180, 0, 180, 0.5)");
    }
}
