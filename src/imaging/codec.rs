//! Decoding into and encoding out of [`Bitmap`]s.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format detection | `image::guess_format` (content signature, never the extension) |
//! | Decode (JPEG, PNG, GIF, WebP) | `image::load_from_memory_with_format` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (flattened onto a background) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (quality → compression level) |
//! | Encode → GIF | `image::codecs::gif::GifEncoder` |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Base64 / data URI | `base64` standard engine |
//! | Temp files | `tempfile::Builder` |

use super::bitmap::Bitmap;
use super::error::{ImagingError, Result};
use super::params::{EncodeOptions, ImageFormat};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;
use tempfile::TempPath;
use tracing::{debug, instrument};

/// Optional codecs available in this build.
///
/// JPEG, PNG and GIF are always compiled in. WebP is detected from the
/// `image` crate at first use and can be switched off by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub webp: bool,
}

static DETECTED: LazyLock<Capabilities> = LazyLock::new(|| {
    let webp = image::ImageFormat::WebP;
    Capabilities {
        webp: webp.reading_enabled() && webp.writing_enabled(),
    }
});

impl Capabilities {
    /// Capabilities of the compiled-in `image` codecs.
    pub fn detect() -> Self {
        *DETECTED
    }

    pub fn without_webp() -> Self {
        Self { webp: false }
    }

    pub fn supports(self, format: ImageFormat) -> bool {
        match format {
            ImageFormat::WebP => self.webp,
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif => true,
        }
    }

    /// Format used when the caller does not pick one: WebP if available, else JPEG.
    pub fn default_format(self) -> ImageFormat {
        if self.webp {
            ImageFormat::WebP
        } else {
            ImageFormat::Jpeg
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}

/// Encoded image bytes together with the format they were written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl Encoded {
    /// `data:<mime>;base64,<payload>` for embedding in HTML or JSON.
    pub fn data_uri(&self) -> String {
        encode_to_base64(&self.bytes, Some(self.format.mime()))
    }
}

/// Base64-encode `bytes`, as a data URI when `mime` is given.
pub fn encode_to_base64(bytes: &[u8], mime: Option<&str>) -> String {
    let payload = STANDARD.encode(bytes);
    match mime {
        Some(mime) => format!("data:{mime};base64,{payload}"),
        None => payload,
    }
}

/// Standard alphabet, accepting payloads with or without `=` padding.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Return the base64 payload of `text`, dropping a `data:<mime>;base64,` prefix.
fn base64_payload(text: &str) -> Result<&str> {
    let text = text.trim();
    let Some(uri) = text.strip_prefix("data:") else {
        return Ok(text);
    };
    uri.split_once(";base64,")
        .map(|(_, payload)| payload)
        .ok_or_else(|| ImagingError::InvalidImageData("data URI is not base64-encoded".into()))
}

/// Decoder/encoder bound to a set of [`Capabilities`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    capabilities: Capabilities,
}

impl Codec {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Identify the container from its content signature.
    pub fn detect_format(&self, bytes: &[u8]) -> Result<ImageFormat> {
        let detected = image::guess_format(bytes).map_err(|_| {
            ImagingError::InvalidImageData("no recognizable image signature".into())
        })?;
        let format = ImageFormat::from_detected(detected)
            .ok_or_else(|| ImagingError::UnsupportedFormat(format!("{detected:?}")))?;
        if !self.capabilities.supports(format) {
            return Err(ImagingError::MissingCapability(format));
        }
        Ok(format)
    }

    /// Decode an in-memory image.
    #[instrument(level = "debug", skip_all, fields(len = bytes.len()))]
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<Bitmap> {
        let format = self.detect_format(bytes)?;
        let image = image::load_from_memory_with_format(bytes, format.as_image_format())
            .map_err(|e| {
                ImagingError::InvalidImageData(format!("failed to decode {format}: {e}"))
            })?;
        let bitmap = Bitmap::from_dynamic(image)?;
        debug!(
            %format,
            width = bitmap.width(),
            height = bitmap.height(),
            model = bitmap.color_model().name(),
            "decoded"
        );
        Ok(bitmap)
    }

    /// Read and decode an image file.
    pub fn decode_file(&self, path: &Path) -> Result<Bitmap> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ImagingError::FileNotFound(path.to_path_buf()),
            _ => ImagingError::FileNotReadable {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        self.decode_bytes(&bytes)
    }

    /// Decode base64 text, with or without a `data:<mime>;base64,` prefix.
    ///
    /// The declared MIME type is ignored; the payload's signature decides.
    pub fn decode_base64(&self, text: &str) -> Result<Bitmap> {
        let payload: String = base64_payload(text)?
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = LENIENT_STANDARD
            .decode(payload)
            .map_err(|e| ImagingError::InvalidImageData(format!("invalid base64: {e}")))?;
        self.decode_bytes(&bytes)
    }

    /// Resolve the requested output format against the available codecs.
    pub fn resolve_format(&self, requested: Option<ImageFormat>) -> Result<ImageFormat> {
        let format = requested.unwrap_or_else(|| self.capabilities.default_format());
        if !self.capabilities.supports(format) {
            return Err(ImagingError::UnsupportedFormat(format!(
                "{format} encoding is not available"
            )));
        }
        Ok(format)
    }

    /// Encode `bitmap` into memory. The bitmap itself is never modified.
    #[instrument(level = "debug", skip_all, fields(format = ?options.format))]
    pub fn encode(&self, bitmap: &Bitmap, options: &EncodeOptions) -> Result<Encoded> {
        let format = self.resolve_format(options.format)?;
        let (width, height) = bitmap.dimensions();
        let mut bytes = Vec::new();

        let written = match format {
            ImageFormat::Jpeg => {
                let flat = bitmap.flatten(options.background);
                JpegEncoder::new_with_quality(&mut bytes, options.quality.jpeg()).write_image(
                    flat.as_raw(),
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )
            }
            ImageFormat::Png => {
                let compression = match options.quality.png_compression_level() {
                    0 => CompressionType::Uncompressed,
                    level => CompressionType::Level(level),
                };
                PngEncoder::new_with_quality(&mut bytes, compression, PngFilter::Adaptive)
                    .write_image(
                        bitmap.as_raw(),
                        width,
                        height,
                        bitmap.extended_color_type(),
                    )
            }
            ImageFormat::Gif => {
                let rgba = bitmap.to_rgba8();
                let mut encoder = GifEncoder::new(&mut bytes);
                encoder.encode(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
            }
            ImageFormat::WebP => WebPEncoder::new_lossless(&mut bytes).encode(
                bitmap.as_raw(),
                width,
                height,
                bitmap.extended_color_type(),
            ),
        };
        written
            .map_err(|e| ImagingError::EncodingFailure(format!("{format} encode failed: {e}")))?;

        if bytes.is_empty() {
            return Err(ImagingError::EncodingFailure(format!(
                "{format} encoder produced no output"
            )));
        }
        debug!(%format, len = bytes.len(), "encoded");
        Ok(Encoded { format, bytes })
    }

    /// Encode and write to `path`.
    ///
    /// Without an explicit format the file extension decides, falling back
    /// to [`Capabilities::default_format`]. Returns the format written.
    pub fn encode_to_file(
        &self,
        bitmap: &Bitmap,
        path: &Path,
        options: &EncodeOptions,
    ) -> Result<ImageFormat> {
        let options = EncodeOptions {
            format: options.format.or_else(|| ImageFormat::from_path(path)),
            ..*options
        };
        let encoded = self.encode(bitmap, &options)?;
        std::fs::write(path, &encoded.bytes).map_err(|e| ImagingError::WriteFailure {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(encoded.format)
    }

    /// Encode into a new file in the process temp directory.
    ///
    /// The file carries the output format's extension. It is deleted when the
    /// returned [`TempPath`] is dropped unless the caller calls `keep()`.
    pub fn encode_to_temp_file(&self, bitmap: &Bitmap, options: &EncodeOptions) -> Result<TempPath> {
        let format = self.resolve_format(options.format)?;
        let encoded = self.encode(
            bitmap,
            &EncodeOptions {
                format: Some(format),
                ..*options
            },
        )?;

        let write_failure = |source| ImagingError::WriteFailure {
            path: std::env::temp_dir(),
            source,
        };
        let mut file = tempfile::Builder::new()
            .prefix("rasterkit-")
            .suffix(&format!(".{}", format.extension()))
            .tempfile()
            .map_err(write_failure)?;
        file.write_all(&encoded.bytes).map_err(write_failure)?;
        Ok(file.into_temp_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{Color, ColorModel, Quality};
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn opaque(width: u32, height: u32) -> Bitmap {
        Bitmap::from_rgb(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
        .unwrap()
    }

    fn translucent(width: u32, height: u32) -> Bitmap {
        Bitmap::from_rgba(RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([10, 200, 10, 255])
            }
        }))
        .unwrap()
    }

    fn all_formats() -> Codec {
        Codec::new(Capabilities { webp: true })
    }

    #[test]
    fn detected_capabilities_include_webp() {
        assert!(Capabilities::detect().webp);
        assert_eq!(Capabilities::detect().default_format(), ImageFormat::WebP);
    }

    #[test]
    fn default_format_falls_back_to_jpeg() {
        assert_eq!(Capabilities::without_webp().default_format(), ImageFormat::Jpeg);
    }

    #[test]
    fn round_trip_keeps_dimensions_in_every_format() {
        let codec = all_formats();
        let bitmap = opaque(37, 21);
        for format in ImageFormat::ALL {
            let encoded = codec
                .encode(&bitmap, &EncodeOptions::with_format(format))
                .unwrap();
            assert_eq!(encoded.format, format);
            assert_eq!(codec.detect_format(&encoded.bytes).unwrap(), format);
            let decoded = codec.decode_bytes(&encoded.bytes).unwrap();
            assert_eq!(decoded.dimensions(), (37, 21), "{format}");
        }
    }

    #[test]
    fn png_and_webp_preserve_alpha() {
        let codec = all_formats();
        let bitmap = translucent(8, 4);
        for format in [ImageFormat::Png, ImageFormat::WebP] {
            let encoded = codec
                .encode(&bitmap, &EncodeOptions::with_format(format))
                .unwrap();
            let decoded = codec.decode_bytes(&encoded.bytes).unwrap();
            assert_eq!(decoded.color_model(), ColorModel::Rgba, "{format}");
            assert_eq!(decoded.pixel(0, 0).unwrap()[3], 0, "{format}");
            assert_eq!(decoded.pixel(7, 0), Some([10, 200, 10, 255]), "{format}");
        }
    }

    #[test]
    fn gif_keeps_binary_transparency() {
        let codec = all_formats();
        let png = codec
            .encode(&translucent(8, 4), &EncodeOptions::with_format(ImageFormat::Png))
            .unwrap();
        let from_png = codec.decode_bytes(&png.bytes).unwrap();

        let gif = codec
            .encode(&from_png, &EncodeOptions::with_format(ImageFormat::Gif))
            .unwrap();
        let decoded = codec.decode_bytes(&gif.bytes).unwrap();
        assert_eq!(decoded.color_model(), ColorModel::Rgba);
        assert_eq!(decoded.pixel(0, 0).unwrap()[3], 0);
        assert_eq!(decoded.pixel(3, 3).unwrap()[3], 0);
        assert_eq!(decoded.pixel(7, 0), Some([10, 200, 10, 255]));
    }

    #[test]
    fn jpeg_flattens_onto_background_without_touching_source() {
        let codec = all_formats();
        let bitmap = translucent(32, 16);
        let options = EncodeOptions {
            format: Some(ImageFormat::Jpeg),
            quality: Quality::new(100),
            background: Color::rgb(255, 0, 0),
        };

        let encoded = codec.encode(&bitmap, &options).unwrap();
        let decoded = codec.decode_bytes(&encoded.bytes).unwrap();

        assert_eq!(decoded.color_model(), ColorModel::Rgb);
        let [r, g, b, _] = decoded.pixel(4, 8).unwrap();
        assert!(r > 200 && g < 60 && b < 60, "expected red, got {r},{g},{b}");
        assert!(bitmap.has_alpha());
    }

    #[test]
    fn png_quality_changes_compression() {
        let codec = all_formats();
        let bitmap = opaque(128, 128);
        let encode = |quality| {
            let options = EncodeOptions {
                format: Some(ImageFormat::Png),
                quality: Quality::new(quality),
                ..EncodeOptions::default()
            };
            codec.encode(&bitmap, &options).unwrap().bytes.len()
        };
        // Quality 100 → level 0 (stored), quality 0 → level 9
        assert!(encode(100) > encode(0));
    }

    #[test]
    fn omitted_format_prefers_webp() {
        let encoded = all_formats()
            .encode(&opaque(4, 4), &EncodeOptions::default())
            .unwrap();
        assert_eq!(encoded.format, ImageFormat::WebP);

        let encoded = Codec::new(Capabilities::without_webp())
            .encode(&opaque(4, 4), &EncodeOptions::default())
            .unwrap();
        assert_eq!(encoded.format, ImageFormat::Jpeg);
    }

    #[test]
    fn webp_without_capability_is_unsupported() {
        let codec = Codec::new(Capabilities::without_webp());
        let result = codec.encode(&opaque(4, 4), &EncodeOptions::with_format(ImageFormat::WebP));
        assert!(matches!(result, Err(ImagingError::UnsupportedFormat(_))));
    }

    #[test]
    fn decoding_webp_without_capability_is_missing_capability() {
        let webp = all_formats()
            .encode(&opaque(4, 4), &EncodeOptions::with_format(ImageFormat::WebP))
            .unwrap();
        let result = Codec::new(Capabilities::without_webp()).decode_bytes(&webp.bytes);
        assert!(matches!(
            result,
            Err(ImagingError::MissingCapability(ImageFormat::WebP))
        ));
    }

    #[test]
    fn decode_garbage_is_invalid_image_data() {
        let result = all_formats().decode_bytes(b"definitely not an image");
        assert!(matches!(result, Err(ImagingError::InvalidImageData(_))));
    }

    #[test]
    fn decode_truncated_png_is_invalid_image_data() {
        let encoded = all_formats()
            .encode(&opaque(32, 32), &EncodeOptions::with_format(ImageFormat::Png))
            .unwrap();
        let result = all_formats().decode_bytes(&encoded.bytes[..40]);
        assert!(matches!(result, Err(ImagingError::InvalidImageData(_))));
    }

    #[test]
    fn decode_bmp_signature_is_unsupported() {
        let mut bmp = b"BM".to_vec();
        bmp.extend_from_slice(&[0; 60]);
        let result = all_formats().decode_bytes(&bmp);
        assert!(matches!(result, Err(ImagingError::UnsupportedFormat(_))));
    }

    #[test]
    fn decode_ignores_misleading_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("actually-png.jpg");
        let codec = all_formats();
        codec
            .encode_to_file(&translucent(6, 6), &path, &EncodeOptions::with_format(ImageFormat::Png))
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(codec.detect_format(&bytes).unwrap(), ImageFormat::Png);
        assert!(codec.decode_file(&path).unwrap().has_alpha());
    }

    #[test]
    fn decode_file_missing_is_file_not_found() {
        let result = all_formats().decode_file(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(ImagingError::FileNotFound(_))));
    }

    #[test]
    fn decode_file_directory_is_not_readable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = all_formats().decode_file(tmp.path());
        assert!(matches!(result, Err(ImagingError::FileNotReadable { .. })));
    }

    #[test]
    fn decode_file_text_is_invalid_image_data() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.png");
        std::fs::write(&path, "hello").unwrap();
        let result = all_formats().decode_file(&path);
        assert!(matches!(result, Err(ImagingError::InvalidImageData(_))));
    }

    #[test]
    fn base64_round_trip_with_and_without_data_uri() {
        let codec = all_formats();
        let encoded = codec
            .encode(&opaque(9, 5), &EncodeOptions::with_format(ImageFormat::Png))
            .unwrap();

        let uri = encoded.data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(codec.decode_base64(&uri).unwrap().dimensions(), (9, 5));

        let bare = encode_to_base64(&encoded.bytes, None);
        assert!(!bare.starts_with("data:"));
        assert_eq!(codec.decode_base64(&bare).unwrap().dimensions(), (9, 5));
    }

    #[test]
    fn base64_accepts_missing_padding() {
        let codec = all_formats();
        for width in [9, 10, 11] {
            let encoded = codec
                .encode(&opaque(width, 5), &EncodeOptions::with_format(ImageFormat::Png))
                .unwrap();
            let padded = encode_to_base64(&encoded.bytes, Some("image/png"));
            let unpadded = padded.trim_end_matches('=');
            assert_eq!(codec.decode_base64(unpadded).unwrap().dimensions(), (width, 5));
            assert_eq!(codec.decode_base64(&padded).unwrap().dimensions(), (width, 5));
        }

        // "aGk" is "hi" without its "=": it decodes, then fails signature sniffing.
        match codec.decode_base64("aGk") {
            Err(ImagingError::InvalidImageData(msg)) => {
                assert!(!msg.contains("invalid base64"), "{msg}")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn base64_tolerates_line_breaks() {
        let codec = all_formats();
        let encoded = codec
            .encode(&opaque(3, 3), &EncodeOptions::with_format(ImageFormat::Gif))
            .unwrap();
        let bare = encode_to_base64(&encoded.bytes, None);
        let wrapped: String = bare
            .as_bytes()
            .chunks(16)
            .map(|c| format!("{}\n", std::str::from_utf8(c).unwrap()))
            .collect();
        assert_eq!(codec.decode_base64(&wrapped).unwrap().dimensions(), (3, 3));
    }

    #[test]
    fn base64_non_image_payload_is_invalid() {
        let codec = all_formats();
        let text = encode_to_base64(b"just some text", Some("image/png"));
        assert!(matches!(
            codec.decode_base64(&text),
            Err(ImagingError::InvalidImageData(_))
        ));
        assert!(matches!(
            codec.decode_base64("data:image/png;base64,@@@"),
            Err(ImagingError::InvalidImageData(_))
        ));
        assert!(matches!(
            codec.decode_base64("data:image/png,rawdata"),
            Err(ImagingError::InvalidImageData(_))
        ));
    }

    #[test]
    fn encode_to_file_infers_format_from_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.gif");
        let format = all_formats()
            .encode_to_file(&opaque(10, 10), &path, &EncodeOptions::default())
            .unwrap();
        assert_eq!(format, ImageFormat::Gif);
        assert!(std::fs::read(&path).unwrap().starts_with(b"GIF8"));
    }

    #[test]
    fn encode_to_file_missing_directory_is_write_failure() {
        let result = all_formats().encode_to_file(
            &opaque(4, 4),
            Path::new("/nonexistent/dir/out.png"),
            &EncodeOptions::default(),
        );
        assert!(matches!(result, Err(ImagingError::WriteFailure { .. })));
    }

    #[test]
    fn encode_to_temp_file_is_removed_on_drop() {
        let codec = all_formats();
        let temp = codec
            .encode_to_temp_file(&opaque(5, 5), &EncodeOptions::with_format(ImageFormat::Png))
            .unwrap();
        let path = temp.to_path_buf();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
        assert_eq!(codec.decode_file(&path).unwrap().dimensions(), (5, 5));

        drop(temp);
        assert!(!path.exists());
    }
}
