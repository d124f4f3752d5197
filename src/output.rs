//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Single-image commands
//!
//! ```text
//! hero.webp (WebP, 800x533)
//!     resize 800x800
//!     flatten onto #ffffff
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 hero.png → out/hero.webp (800x533)
//! 002 press/broken.png
//!     Failed: invalid image data: ...
//!
//! Processed 1 image, 1 failed
//! ```
//!
//! ## Info
//!
//! Pretty-printed JSON, see [`ImageInfo`].
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchSummary};
use crate::imaging::{Bitmap, ImageFormat};
use crate::pipeline::Operation;
use serde::Serialize;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `path` relative to `root` when it lives under it, as display text.
fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

// ============================================================================
// Single-image commands
// ============================================================================

/// Format the result of writing one image: output path, format and size,
/// then each applied step indented underneath.
pub fn format_written(
    output: &Path,
    format: ImageFormat,
    dimensions: (u32, u32),
    steps: &[Operation],
) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}, {}x{})",
        output.display(),
        format,
        dimensions.0,
        dimensions.1
    )];
    lines.extend(steps.iter().map(|op| format!("{}{}", indent(1), op)));
    lines
}

pub fn print_written(
    output: &Path,
    format: ImageFormat,
    dimensions: (u32, u32),
    steps: &[Operation],
) {
    for line in format_written(output, format, dimensions, steps) {
        println!("{}", line);
    }
}

/// Summary of a decoded image, printed as JSON by `rasterkit info`.
#[derive(Debug, Serialize)]
pub struct ImageInfo {
    pub path: String,
    pub format: ImageFormat,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
    pub color_model: &'static str,
    pub has_alpha: bool,
    pub bytes: u64,
}

impl ImageInfo {
    pub fn new(path: &Path, format: ImageFormat, bitmap: &Bitmap, bytes: u64) -> Self {
        Self {
            path: path.display().to_string(),
            format,
            mime: format.mime(),
            width: bitmap.width(),
            height: bitmap.height(),
            color_model: bitmap.color_model().name(),
            has_alpha: bitmap.has_alpha(),
            bytes,
        }
    }
}

pub fn format_info(info: &ImageInfo) -> serde_json::Result<String> {
    serde_json::to_string_pretty(info)
}

pub fn print_info(info: &ImageInfo) -> serde_json::Result<()> {
    println!("{}", format_info(info)?);
    Ok(())
}

// ============================================================================
// Batch
// ============================================================================

/// Format a single batch event as display lines.
///
/// `index` is the 1-based completion order. Sources are shown relative to
/// `input_root`; failures carry the error as an indented context line.
pub fn format_batch_event(index: usize, event: &BatchEvent, input_root: &Path) -> Vec<String> {
    match event {
        BatchEvent::Processed {
            source,
            output,
            width,
            height,
        } => vec![format!(
            "{} {} → {} ({}x{})",
            format_index(index),
            relative_display(source, input_root),
            output.display(),
            width,
            height
        )],
        BatchEvent::Failed { source, error } => vec![
            format!(
                "{} {}",
                format_index(index),
                relative_display(source, input_root)
            ),
            format!("{}Failed: {}", indent(1), error),
        ],
    }
}

pub fn format_batch_summary(summary: &BatchSummary) -> String {
    if summary.total() == 0 {
        return "No images found".to_string();
    }
    let mut line = format!("Processed {}", plural(summary.processed, "image"));
    if summary.failed > 0 {
        line.push_str(&format!(", {} failed", summary.failed));
    }
    line
}

pub fn print_batch_summary(summary: &BatchSummary) {
    println!();
    println!("{}", format_batch_summary(summary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Color;
    use image::{Rgba, RgbaImage};
    use std::path::PathBuf;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_single_digit() {
        assert_eq!(format_index(1), "001");
    }

    #[test]
    fn format_index_triple_digit() {
        assert_eq!(format_index(123), "123");
    }

    #[test]
    fn format_index_overflow_is_not_truncated() {
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn relative_display_outside_root_keeps_path() {
        assert_eq!(
            relative_display(Path::new("/elsewhere/a.png"), Path::new("/in")),
            "/elsewhere/a.png"
        );
    }

    // =========================================================================
    // Single-image output
    // =========================================================================

    #[test]
    fn format_written_lists_steps() {
        let steps = [
            Operation::Resize {
                max_width: 800,
                max_height: 800,
                allow_enlarge: false,
            },
            Operation::Flatten {
                background: Color::WHITE,
            },
        ];
        let lines = format_written(Path::new("hero.webp"), ImageFormat::WebP, (800, 533), &steps);
        assert_eq!(
            lines,
            vec![
                "hero.webp (WebP, 800x533)",
                "    resize 800x800",
                "    flatten onto #ffffff",
            ]
        );
    }

    #[test]
    fn format_written_without_steps() {
        let lines = format_written(Path::new("a.png"), ImageFormat::Png, (1, 2), &[]);
        assert_eq!(lines, vec!["a.png (PNG, 1x2)"]);
    }

    #[test]
    fn format_info_is_json() {
        let bitmap = Bitmap::from_rgba(RgbaImage::from_pixel(3, 2, Rgba([0, 0, 0, 0]))).unwrap();
        let info = ImageInfo::new(Path::new("x.png"), ImageFormat::Png, &bitmap, 42);
        let json: serde_json::Value = serde_json::from_str(&format_info(&info).unwrap()).unwrap();
        assert_eq!(json["format"], "png");
        assert_eq!(json["mime"], "image/png");
        assert_eq!(json["width"], 3);
        assert_eq!(json["height"], 2);
        assert_eq!(json["color_model"], bitmap.color_model().name());
        assert_eq!(json["has_alpha"], true);
        assert_eq!(json["bytes"], 42);
    }

    // =========================================================================
    // Batch output
    // =========================================================================

    #[test]
    fn format_batch_event_processed() {
        let event = BatchEvent::Processed {
            source: PathBuf::from("/in/press/logo.gif"),
            output: PathBuf::from("/out/press/logo.webp"),
            width: 64,
            height: 32,
        };
        let lines = format_batch_event(7, &event, Path::new("/in"));
        assert_eq!(lines, vec!["007 press/logo.gif → /out/press/logo.webp (64x32)"]);
    }

    #[test]
    fn format_batch_event_failed() {
        let event = BatchEvent::Failed {
            source: PathBuf::from("/in/broken.png"),
            error: "invalid image data: truncated".to_string(),
        };
        let lines = format_batch_event(2, &event, Path::new("/in"));
        assert_eq!(
            lines,
            vec!["002 broken.png", "    Failed: invalid image data: truncated"]
        );
    }

    #[test]
    fn format_batch_summary_variants() {
        assert_eq!(
            format_batch_summary(&BatchSummary::default()),
            "No images found"
        );
        assert_eq!(
            format_batch_summary(&BatchSummary {
                processed: 1,
                failed: 0
            }),
            "Processed 1 image"
        );
        assert_eq!(
            format_batch_summary(&BatchSummary {
                processed: 3,
                failed: 2
            }),
            "Processed 3 images, 2 failed"
        );
    }
}
