//! Declarative transform steps.
//!
//! An [`Operation`] names one [`Bitmap`] transform with its arguments. A
//! pipeline is an ordered slice of operations applied to one bitmap; the
//! batch runner reads it from the `[[pipeline]]` tables of the config file
//! and each single-shot CLI command builds a one-step pipeline.
//!
//! ```toml
//! [[pipeline]]
//! op = "trim"
//! color = "#ffffff"
//! tolerance = 8
//!
//! [[pipeline]]
//! op = "crop"
//! width = 400
//! height = 500
//! ```

use crate::imaging::{Bitmap, Color, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Proportional fit into a bounding box.
    Resize {
        max_width: u32,
        max_height: u32,
        #[serde(default)]
        allow_enlarge: bool,
    },
    /// Fill-resize then center-crop to exact dimensions.
    Crop { width: u32, height: u32 },
    /// Strip uniform margins.
    Trim {
        #[serde(default)]
        color: Color,
        #[serde(default)]
        tolerance: u8,
    },
    /// Replace pixels near `reference`; no replacement means transparent.
    Recolor {
        reference: Color,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replacement: Option<Color>,
        #[serde(default)]
        tolerance: u8,
    },
    /// Composite onto an opaque background.
    Flatten {
        #[serde(default)]
        background: Color,
    },
}

impl Operation {
    pub fn apply(&self, bitmap: &mut Bitmap) -> Result<()> {
        match *self {
            Self::Resize {
                max_width,
                max_height,
                allow_enlarge,
            } => bitmap.resize(max_width, max_height, allow_enlarge),
            Self::Crop { width, height } => bitmap.crop(width, height),
            Self::Trim { color, tolerance } => bitmap.trim_borders(color, tolerance),
            Self::Recolor {
                reference,
                replacement,
                tolerance,
            } => {
                bitmap.recolor_near(reference, replacement, tolerance);
                Ok(())
            }
            Self::Flatten { background } => {
                *bitmap = bitmap.flatten(background);
                Ok(())
            }
        }
    }

    /// Dimensions this step requires to be non-zero, for config validation.
    pub(crate) fn requested_dimensions(&self) -> Option<(u32, u32)> {
        match *self {
            Self::Resize {
                max_width,
                max_height,
                ..
            } => Some((max_width, max_height)),
            Self::Crop { width, height } => Some((width, height)),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resize {
                max_width,
                max_height,
                allow_enlarge,
            } => {
                write!(f, "resize {max_width}x{max_height}")?;
                if *allow_enlarge {
                    f.write_str(" (enlarge)")?;
                }
                Ok(())
            }
            Self::Crop { width, height } => write!(f, "crop {width}x{height}"),
            Self::Trim { color, tolerance } => write!(f, "trim {color} ±{tolerance}"),
            Self::Recolor {
                reference,
                replacement,
                tolerance,
            } => match replacement {
                Some(new) => write!(f, "recolor {reference} ±{tolerance} → {new}"),
                None => write!(f, "recolor {reference} ±{tolerance} → transparent"),
            },
            Self::Flatten { background } => write!(f, "flatten onto {background}"),
        }
    }
}

/// Apply every operation in order, stopping at the first failure.
pub fn apply_all(operations: &[Operation], bitmap: &mut Bitmap) -> Result<()> {
    operations.iter().try_for_each(|op| op.apply(bitmap))
}
