//! Image processing: decode, transform, encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::guess_format` + `image::load_from_memory_with_format` |
//! | **Resize** | proportional fit, Lanczos3 |
//! | **Crop** | fill-resize + centered `crop_imm` |
//! | **Trim / recolor / flatten** | direct pixel scans |
//! | **Encode** | `image` JPEG/PNG/GIF/WebP encoders, `base64`, `tempfile` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Formats, quality, colors, encode options
//! - **Bitmap**: The owned RGB/RGBA pixel buffer
//! - **Transform**: Resize, crop, trim, recolor, flatten on a [`Bitmap`]
//! - **Codec**: [`Codec`] decode/encode bound to detected [`Capabilities`]
//!
//! A typical pipeline:
//!
//! ```no_run
//! use rasterkit::imaging::{Codec, EncodeOptions, ImageFormat};
//! # fn main() -> Result<(), rasterkit::imaging::ImagingError> {
//! let codec = Codec::default();
//! let mut bitmap = codec.decode_file("upload.png".as_ref())?;
//! bitmap.resize(800, 800, false)?;
//! let encoded = codec.encode(&bitmap, &EncodeOptions::with_format(ImageFormat::Jpeg))?;
//! # let _ = encoded;
//! # Ok(())
//! # }
//! ```

mod bitmap;
pub mod calculations;
pub mod codec;
mod error;
mod params;
mod transform;

pub use bitmap::{Bitmap, ColorModel};
pub use codec::{Capabilities, Codec, Encoded, encode_to_base64};
pub use error::{ImagingError, Result};
pub use params::{Color, EncodeOptions, ImageFormat, Quality};
