//! Pure value parsers for raw attribute strings.
//!
//! Every parser is `fn(&str) -> Result<T, ValueError>`: attribute processors
//! call them and `?` the error into an [`LmlErrorKind::ParseValue`](crate::LmlErrorKind).

use std::fmt;

// ── ValueError ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("`{0}` is not a number")]
    Number(String),
    #[error("`{0}` is not a non-negative integer")]
    Integer(String),
    #[error("`{0}` is not a boolean (expected true or false)")]
    Bool(String),
    #[error("`{0}` is not a color (expected #rrggbb, #rrggbbaa or a color name)")]
    Color(String),
    #[error("`{0}` is not an alignment")]
    Align(String),
    #[error("value must not be empty")]
    Empty,
}

// ── Scalars ───────────────────────────────────────────────────────────────

pub fn parse_f32(raw: &str) -> Result<f32, ValueError> {
    let s = raw.trim();
    match s.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ValueError::Number(raw.to_string())),
    }
}

pub fn parse_usize(raw: &str) -> Result<usize, ValueError> {
    raw.trim().parse::<usize>().map_err(|_| ValueError::Integer(raw.to_string()))
}

pub fn parse_bool(raw: &str) -> Result<bool, ValueError> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if s.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ValueError::Bool(raw.to_string()))
    }
}

/// Non-empty, trimmed string.
pub fn parse_name(raw: &str) -> Result<String, ValueError> {
    let s = raw.trim();
    if s.is_empty() { Err(ValueError::Empty) } else { Ok(s.to_string()) }
}

/// Splits a separated list (`"a;b;c"`), trimming items. An empty string is an
/// empty list.
pub fn split_list(raw: &str, separator: char) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(separator).map(|item| item.trim().to_string()).collect()
}

// ── Color ─────────────────────────────────────────────────────────────────

/// Straight-alpha RGBA color with components in `[0, 1]`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const CLEAR: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from straight sRGB bytes (`0`–`255`).
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    /// Back to bytes, rounding to nearest.
    pub fn to_srgb_u8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_srgb_u8();
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

/// `#rrggbb`, `#rrggbbaa` or one of a few color names.
pub fn parse_color(raw: &str) -> Result<Color, ValueError> {
    let s = raw.trim();
    let err = || ValueError::Color(raw.to_string());

    if let Some(hex) = s.strip_prefix('#') {
        if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let a = if hex.len() == 8 { byte(6)? } else { 255 };
        return Ok(Color::from_srgb_u8(byte(0)?, byte(2)?, byte(4)?, a));
    }

    let named = match s.to_ascii_lowercase().as_str() {
        "white" => Color::WHITE,
        "black" => Color::BLACK,
        "clear" | "transparent" => Color::CLEAR,
        "red" => Color::rgba(1.0, 0.0, 0.0, 1.0),
        "green" => Color::rgba(0.0, 1.0, 0.0, 1.0),
        "blue" => Color::rgba(0.0, 0.0, 1.0, 1.0),
        "yellow" => Color::rgba(1.0, 1.0, 0.0, 1.0),
        "gray" | "grey" => Color::rgba(0.5, 0.5, 0.5, 1.0),
        _ => return Err(err()),
    };
    Ok(named)
}

// ── Align ─────────────────────────────────────────────────────────────────

/// Nine-way alignment inside an allotted area.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Accepts `center`, `top`, `topLeft`, `top-left`, `top_left`, ... (case-insensitive).
pub fn parse_align(raw: &str) -> Result<Align, ValueError> {
    let key: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect();
    Ok(match key.as_str() {
        "center" => Align::Center,
        "top" => Align::Top,
        "bottom" => Align::Bottom,
        "left" => Align::Left,
        "right" => Align::Right,
        "topleft" => Align::TopLeft,
        "topright" => Align::TopRight,
        "bottomleft" => Align::BottomLeft,
        "bottomright" => Align::BottomRight,
        _ => return Err(ValueError::Align(raw.to_string())),
    })
}

// ── Edges ─────────────────────────────────────────────────────────────────

/// Insets on all four sides.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    #[inline]
    pub fn all(v: f32) -> Self {
        Self { top: v, right: v, bottom: v, left: v }
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(parse_f32(" 2.5 "), Ok(2.5));
        assert_eq!(parse_f32("-4"), Ok(-4.0));
        assert!(parse_f32("wide").is_err());
        assert!(parse_f32("NaN").is_err());
        assert_eq!(parse_usize("3"), Ok(3));
        assert!(parse_usize("-1").is_err());
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool("TRUE"), Ok(true));
        assert_eq!(parse_bool("false"), Ok(false));
        assert_eq!(parse_bool("yes"), Err(ValueError::Bool("yes".into())));
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("#ff000080").unwrap().to_srgb_u8(), [255, 0, 0, 128]);
        assert_eq!(parse_color("#00ff00").unwrap().to_srgb_u8(), [0, 255, 0, 255]);
        assert_eq!(parse_color("White"), Ok(Color::WHITE));
        assert!(parse_color("#xyz").is_err());
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("mauve").is_err());
        assert_eq!(parse_color("#102030ff").unwrap().to_string(), "#102030ff");
    }

    #[test]
    fn alignment_spellings() {
        assert_eq!(parse_align("topLeft"), Ok(Align::TopLeft));
        assert_eq!(parse_align("bottom-right"), Ok(Align::BottomRight));
        assert_eq!(parse_align("CENTER"), Ok(Align::Center));
        assert!(parse_align("middle").is_err());
    }

    #[test]
    fn lists() {
        assert_eq!(split_list("a; b ;c", ';'), ["a", "b", "c"]);
        assert!(split_list("  ", ';').is_empty());
        assert_eq!(split_list("one", ','), ["one"]);
    }
}
