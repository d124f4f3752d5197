//! # rasterkit
//!
//! Decode, transform and re-encode raster images.
//!
//! # Architecture: Decode → Transform → Encode
//!
//! Every use of the crate follows the same three steps:
//!
//! ```text
//! 1. Decode     path | bytes | base64   →  Bitmap          (format sniffed from content)
//! 2. Transform  Bitmap                  →  Bitmap          (resize, crop, trim, recolor, flatten)
//! 3. Encode     Bitmap                  →  bytes | file | temp file | base64
//! ```
//!
//! A [`imaging::Bitmap`] has exactly one owner. Transforms take `&mut self`
//! and swap the pixel buffer only once the new one is complete, so a failed
//! transform leaves the caller holding the untouched input. There is no
//! shared state between calls.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Bitmap type, codec (decode/encode/base64/temp files), transforms, dimension math |
//! | [`pipeline`] | [`pipeline::Operation`], one transform step as data, parsed from config |
//! | [`config`] | `rasterkit.toml` loading, merging onto stock defaults, validation |
//! | [`batch`] | Parallel directory run: discover → decode → pipeline → encode, with progress events |
//! | [`output`] | CLI output formatting: pure `format_*` functions plus `print_*` wrappers |
//!
//! # Design Decisions
//!
//! ## Content Sniffing, Never Extensions
//!
//! Decoding looks only at the leading bytes (`image::guess_format`). A PNG
//! named `photo.jpg` decodes as PNG; a text file named `photo.png` fails with
//! [`imaging::ImagingError::InvalidImageData`]. Extensions are only consulted
//! when choosing an *output* format for a path the caller named.
//!
//! ## Two Color Models
//!
//! Bitmaps are either RGB or RGBA. Every decoded image is normalized into one
//! of the two depending on whether the source carried alpha, so transforms
//! have exactly two pixel layouts to handle and partial transparency survives
//! any chain of operations until the caller flattens it or encodes to JPEG.
//!
//! ## WebP as a Capability
//!
//! WebP support is detected from the `image` crate at first use and can be
//! switched off in config. With it off, WebP input fails with
//! [`imaging::ImagingError::MissingCapability`] and the default output format
//! falls back to JPEG. WebP output is lossless, so quality does not apply.
//!
//! ## Pure-Rust Imaging
//!
//! All codecs and resampling come from the `image` crate. The binary has no
//! system dependencies.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod output;
pub mod pipeline;
