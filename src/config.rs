//! Configuration module.
//!
//! Handles loading, validating, and merging `rasterkit.toml`. Stock defaults
//! are overridden by whatever the user file specifies; nothing is global or
//! mutable, the resolved [`Config`] is passed explicitly to whoever needs it.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [encode]
//! # format = "webp"        # Output format; omitted = webp when available, else jpeg
//! quality = 90              # 0 = worst, 100 = best (PNG: mapped to compression level)
//! background = "#ffffff"    # Background for JPEG output and flatten
//!
//! [capabilities]
//! webp = true               # false treats WebP as unavailable
//!
//! [trim]
//! color = "#ffffff"         # Border color stripped by `trim`
//! tolerance = 0             # Per-channel tolerance
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [[pipeline]]              # Steps applied by `rasterkit batch`
//! op = "resize"
//! max_width = 800
//! max_height = 800
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [encode]
//! format = "png"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Capabilities, Codec, Color, EncodeOptions, ImageFormat, Quality};
use crate::pipeline::Operation;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `rasterkit.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Output format, quality and background.
    pub encode: EncodeConfig,
    /// Optional codec switches.
    pub capabilities: CapabilitiesConfig,
    /// Defaults for the `trim` command.
    pub trim: TrimConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Steps applied to every image by the batch runner.
    pub pipeline: Vec<Operation>,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=100).contains(&self.encode.quality.value()) {
            return Err(ConfigError::Validation(
                "encode.quality must be 0-100".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        for (index, op) in self.pipeline.iter().enumerate() {
            if let Some((w, h)) = op.requested_dimensions()
                && (w == 0 || h == 0)
            {
                return Err(ConfigError::Validation(format!(
                    "pipeline[{index}] ({op}): dimensions must be non-zero"
                )));
            }
        }
        Ok(())
    }

    /// Codec with the detected capabilities, narrowed by `[capabilities]`.
    pub fn codec(&self) -> Codec {
        let detected = Capabilities::detect();
        Codec::new(Capabilities {
            webp: detected.webp && self.capabilities.webp,
        })
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            format: self.encode.format,
            quality: self.encode.quality,
            background: self.encode.background,
        }
    }
}

/// Encoding settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeConfig {
    /// Output format. When absent, WebP if available, else JPEG.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
    /// Encoding quality (0 = worst, 100 = best).
    pub quality: Quality,
    /// Background color JPEG output and `flatten` composite onto.
    pub background: Color,
}

/// Codec switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CapabilitiesConfig {
    /// Allow WebP when the build supports it.
    pub webp: bool,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self { webp: true }
    }
}

/// Border trimming defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrimConfig {
    /// Border color to strip.
    pub color: Color,
    /// Per-channel tolerance (0 = exact match).
    pub tolerance: u8,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Config::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a user
///   `[[pipeline]]` replaces the (empty) default pipeline as a whole.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `rasterkit.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# rasterkit configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encode]
# Output format: "jpeg", "png", "gif" or "webp".
# Omit to use WebP when the build supports it, JPEG otherwise.
# format = "webp"

# Quality, 0 = worst, 100 = best.
# JPEG uses it directly; PNG maps it to compression effort (100 -> 0, 0 -> 9).
# GIF and WebP (lossless) ignore it.
quality = 90

# Background that transparency is flattened onto for JPEG output
# and for the flatten step.
background = "#ffffff"

# ---------------------------------------------------------------------------
# Codecs
# ---------------------------------------------------------------------------
[capabilities]
# Set to false to treat WebP as unavailable even when compiled in.
webp = true

# ---------------------------------------------------------------------------
# Border trimming
# ---------------------------------------------------------------------------
[trim]
# Border color removed by `rasterkit trim`.
color = "#ffffff"

# Per-channel tolerance; 0 means an exact match.
tolerance = 0

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers for `rasterkit batch`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Batch pipeline
# ---------------------------------------------------------------------------
# Steps applied in order to every image by `rasterkit batch`.
# Available ops:
#   resize   max_width, max_height, allow_enlarge = false
#   crop     width, height
#   trim     color = "#ffffff", tolerance = 0
#   recolor  reference, replacement (omit for transparent), tolerance = 0
#   flatten  background = "#ffffff"
#
# [[pipeline]]
# op = "resize"
# max_width = 1600
# max_height = 1600
#
# [[pipeline]]
# op = "crop"
# width = 400
# height = 500
"##
}
