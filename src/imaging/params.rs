//! Parameter types for decode, encode and transform operations.
//!
//! ## Types
//!
//! - [`ImageFormat`]: The four supported containers (JPEG, PNG, GIF, WebP).
//! - [`Quality`]: Encoding quality on a 0–100 scale. Mapped per format.
//! - [`Color`]: Opaque RGB color, parsed from `#rrggbb`.
//! - [`EncodeOptions`]: Target format, quality and JPEG background for one encode.

use super::calculations::png_compression_level;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Container formats the codec can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [Self::Jpeg, Self::Png, Self::Gif, Self::WebP];

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }

    /// Infer a format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }

    /// Map a format detected by the `image` crate onto the supported set.
    pub fn from_detected(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }

    pub(crate) fn as_image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Gif => image::ImageFormat::Gif,
            Self::WebP => image::ImageFormat::WebP,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::WebP => "WebP",
        };
        f.write_str(name)
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    /// Accepts format names, extensions and MIME types.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let name = normalized.strip_prefix("image/").unwrap_or(&normalized);
        match name {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            "webp" => Ok(Self::WebP),
            other => Err(format!("unsupported image format: {other}")),
        }
    }
}

/// Quality setting for encoding, nominally 0 (worst) to 100 (best).
///
/// The raw value is kept as given; each format decides how to map it.
/// JPEG clamps into the encoder's 1–100 range, PNG converts it to a
/// compression level, GIF and (lossless) WebP ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(pub i32);

impl Quality {
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn jpeg(self) -> u8 {
        self.0.clamp(1, 100) as u8
    }

    pub fn png_compression_level(self) -> u8 {
        png_compression_level(self.0)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// An opaque RGB color.
///
/// Parses from `#rrggbb`, `rrggbb` or the `#rgb` shorthand and serializes
/// back to lowercase `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub fn channels(self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    /// True when every channel of `pixel` is within `tolerance` of this color.
    ///
    /// Channels are compared independently, not by Euclidean distance.
    #[inline]
    pub fn matches(self, pixel: [u8; 3], tolerance: u8) -> bool {
        self.red.abs_diff(pixel[0]) <= tolerance
            && self.green.abs_diff(pixel[1]) <= tolerance
            && self.blue.abs_diff(pixel[2]) <= tolerance
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return Err(format!("invalid color: {s}"));
        }
        let expanded = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => hex.to_string(),
            _ => return Err(format!("invalid color: {s} (expected #rrggbb)")),
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| format!("invalid color: {s}"))
        };
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Parameters for a single encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    /// Target format. `None` lets the codec pick its preferred default.
    pub format: Option<ImageFormat>,
    pub quality: Quality,
    /// Background the JPEG path flattens transparency onto.
    pub background: Color,
}

impl EncodeOptions {
    pub fn with_format(format: ImageFormat) -> Self {
        Self {
            format: Some(format),
            ..Self::default()
        }
    }
}
