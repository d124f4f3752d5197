//! Batch processing: apply the configured pipeline to a directory tree.
//!
//! ```text
//! input/                      output/
//! ├── hero.png          →     ├── hero.webp
//! └── press/                  └── press/
//!     ├── logo.gif      →         ├── logo.webp
//!     └── notes.txt               (skipped: not an image)
//! ```
//!
//! Every image is decoded, run through [`Config::pipeline`] and encoded with
//! [`Config::encode_options`] into the mirrored relative path under the output
//! directory. The extension is replaced by the output format's, so
//! `logo.png` and `logo.gif` would share an output; the later one in path
//! order is reported as failed instead of overwriting the first.
//!
//! ## Parallel Processing
//!
//! Images are processed in parallel on the global rayon pool. A bitmap lives
//! entirely on the worker that decoded it; only the [`BatchEvent`] for each
//! result crosses threads. One failing image never aborts the batch.

use crate::config::Config;
use crate::imaging::{Codec, EncodeOptions, ImageFormat, ImagingError};
use crate::pipeline;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Imaging error: {0}")]
    Imaging(#[from] ImagingError),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Output {} collides with {}", output.display(), other.display())]
    OutputCollision { output: PathBuf, other: PathBuf },
}

/// Progress reported for each image as soon as it finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Processed {
        source: PathBuf,
        output: PathBuf,
        width: u32,
        height: u32,
    },
    Failed {
        source: PathBuf,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.processed + self.failed
    }
}

/// Recursively collect image files under `root`, sorted by path.
///
/// Files are selected by extension (`jpg`, `jpeg`, `png`, `gif`, `webp`,
/// case-insensitive). Content is sniffed later, at decode time.
pub fn discover_images(root: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !root.is_dir() {
        return Err(BatchError::NotADirectory(root.to_path_buf()));
    }
    let mut images = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && ImageFormat::from_path(entry.path()).is_some() {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

/// Where `source` (found under `input_root`) is written under `output_root`.
pub fn output_path(
    source: &Path,
    input_root: &Path,
    output_root: &Path,
    format: ImageFormat,
) -> PathBuf {
    let relative = source.strip_prefix(input_root).unwrap_or(source);
    output_root
        .join(relative)
        .with_extension(format.extension())
}

/// Run the configured pipeline over every image under `input_dir`.
///
/// Events are sent on `events` as each image completes, in completion order.
/// The returned summary counts successes and failures.
pub fn run(
    input_dir: &Path,
    output_dir: &Path,
    config: &Config,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    let sources = discover_images(input_dir)?;
    let codec = config.codec();
    let options = EncodeOptions {
        format: Some(codec.resolve_format(config.encode.format)?),
        ..config.encode_options()
    };
    fs::create_dir_all(output_dir)?;
    info!(
        images = sources.len(),
        steps = config.pipeline.len(),
        "batch started"
    );

    let format = options
        .format
        .unwrap_or_else(|| codec.capabilities().default_format());
    let jobs = plan_outputs(&sources, input_dir, output_dir, format);

    let results: Vec<bool> = jobs
        .into_par_iter()
        .map(|(source, target)| {
            let result = target.and_then(|output| {
                process_one(&codec, config, &options, &source, output)
            });
            let event = match result {
                Ok((output, (width, height))) => BatchEvent::Processed {
                    source,
                    output,
                    width,
                    height,
                },
                Err(e) => {
                    warn!(source = %source.display(), error = %e, "image failed");
                    BatchEvent::Failed {
                        error: e.to_string(),
                        source,
                    }
                }
            };
            let ok = matches!(event, BatchEvent::Processed { .. });
            if let Some(tx) = &events {
                // Receiver gone only means nobody is listening.
                tx.send(event).ok();
            }
            ok
        })
        .collect();

    let processed = results.iter().filter(|ok| **ok).count();
    let summary = BatchSummary {
        processed,
        failed: results.len() - processed,
    };
    info!(
        processed = summary.processed,
        failed = summary.failed,
        "batch finished"
    );
    Ok(summary)
}

/// Pair every source with its output path.
///
/// Sources that differ only by extension map to the same output. The first
/// in path order keeps it; the rest get [`BatchError::OutputCollision`].
fn plan_outputs(
    sources: &[PathBuf],
    input_root: &Path,
    output_root: &Path,
    format: ImageFormat,
) -> Vec<(PathBuf, Result<PathBuf, BatchError>)> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    sources
        .iter()
        .map(|source| {
            let output = output_path(source, input_root, output_root, format);
            let target = match claimed.get(&output) {
                Some(other) => Err(BatchError::OutputCollision {
                    output,
                    other: other.to_path_buf(),
                }),
                None => {
                    claimed.insert(output.clone(), source);
                    Ok(output)
                }
            };
            (source.clone(), target)
        })
        .collect()
}

fn process_one(
    codec: &Codec,
    config: &Config,
    options: &EncodeOptions,
    source: &Path,
    output: PathBuf,
) -> Result<(PathBuf, (u32, u32)), BatchError> {
    let mut bitmap = codec.decode_file(source)?;
    pipeline::apply_all(&config.pipeline, &mut bitmap)?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    codec.encode_to_file(&bitmap, &output, options)?;
    debug!(source = %source.display(), output = %output.display(), "image written");
    Ok((output, bitmap.dimensions()))
}
