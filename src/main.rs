use clap::{Parser, Subcommand};
use rasterkit::config::{self, Config};
use rasterkit::imaging::{Color, EncodeOptions, ImageFormat, Quality, encode_to_base64};
use rasterkit::pipeline::{self, Operation};
use rasterkit::{batch, output};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Encoding flags shared by every command that writes an image.
#[derive(clap::Args, Clone)]
struct EncodeArgs {
    /// Output format (jpeg, png, gif, webp). Defaults to the output extension,
    /// then the config file, then webp/jpeg.
    #[arg(long)]
    format: Option<ImageFormat>,

    /// Quality 0-100 (PNG: mapped to compression effort)
    #[arg(long)]
    quality: Option<i32>,
}

impl EncodeArgs {
    fn options(&self, config: &Config, output: Option<&Path>) -> EncodeOptions {
        let base = config.encode_options();
        EncodeOptions {
            format: self
                .format
                .or_else(|| output.and_then(ImageFormat::from_path))
                .or(base.format),
            quality: self.quality.map(Quality::new).unwrap_or(base.quality),
            ..base
        }
    }
}

/// Input and optional output for single-image commands.
#[derive(clap::Args, Clone)]
struct FileArgs {
    /// Image to read (format detected from content)
    input: PathBuf,

    /// Where to write the result. Omitted = a new file in the temp directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    encode: EncodeArgs,
}

#[derive(Parser)]
#[command(name = "rasterkit")]
#[command(about = "Decode, transform and re-encode raster images")]
#[command(long_about = "\
Decode, transform and re-encode raster images

Reads JPEG, PNG, GIF and WebP (format sniffed from content, never the
extension), applies one transform, and writes JPEG, PNG, GIF or WebP.

  rasterkit resize photo.png 800 800 -o small.jpg
  rasterkit crop photo.png 256 256 -o avatar.webp
  rasterkit trim scan.png --tolerance 8
  rasterkit batch uploads/ public/

Logging goes to stderr and is controlled with RUST_LOG (default: warn).

Run 'rasterkit gen-config' to generate a documented rasterkit.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "rasterkit.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print format, dimensions and color model as JSON
    Info {
        input: PathBuf,
    },
    /// Re-encode without transforming
    Convert(FileArgs),
    /// Fit inside a bounding box, keeping the aspect ratio
    Resize {
        #[command(flatten)]
        file: FileArgs,
        max_width: u32,
        max_height: u32,
        /// Allow upscaling images smaller than the box
        #[arg(long)]
        enlarge: bool,
    },
    /// Resize to cover then center-crop to exact dimensions
    Crop {
        #[command(flatten)]
        file: FileArgs,
        width: u32,
        height: u32,
    },
    /// Strip uniform borders
    Trim {
        #[command(flatten)]
        file: FileArgs,
        /// Border color (default from [trim] config)
        #[arg(long)]
        color: Option<Color>,
        /// Per-channel tolerance (default from [trim] config)
        #[arg(long)]
        tolerance: Option<u8>,
    },
    /// Replace pixels close to a reference color
    Recolor {
        #[command(flatten)]
        file: FileArgs,
        /// Color to replace
        #[arg(long)]
        reference: Color,
        /// Replacement color; omitted = fully transparent
        #[arg(long)]
        replacement: Option<Color>,
        /// Per-channel tolerance
        #[arg(long, default_value_t = 0)]
        tolerance: u8,
    },
    /// Composite transparency onto a solid background
    Flatten {
        #[command(flatten)]
        file: FileArgs,
        /// Background color (default from [encode] config)
        #[arg(long)]
        background: Option<Color>,
    },
    /// Print an image file as base64, or decode base64 text back into an image
    Base64 {
        input: PathBuf,
        /// Prefix the output with a data:<mime>;base64, header
        #[arg(long)]
        data_uri: bool,
        /// Treat INPUT as base64 text and write the decoded image here
        #[arg(long, value_name = "OUTPUT")]
        decode: Option<PathBuf>,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// Apply the [[pipeline]] steps from the config to every image in a tree
    Batch {
        input: PathBuf,
        output: PathBuf,
    },
    /// Print a stock rasterkit.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();

    // gen-config must work even when the existing config is broken.
    let config = match cli.command {
        Command::GenConfig => Config::default(),
        _ => config::load_config(&cli.config)?,
    };

    match cli.command {
        Command::Info { input } => {
            let codec = config.codec();
            let bytes = std::fs::read(&input)?;
            let format = codec.detect_format(&bytes)?;
            let bitmap = codec.decode_bytes(&bytes)?;
            let info = output::ImageInfo::new(&input, format, &bitmap, bytes.len() as u64);
            output::print_info(&info)?;
        }
        Command::Convert(file) => {
            transform_file(&config, &file, &[])?;
        }
        Command::Resize {
            file,
            max_width,
            max_height,
            enlarge,
        } => {
            let step = Operation::Resize {
                max_width,
                max_height,
                allow_enlarge: enlarge,
            };
            transform_file(&config, &file, &[step])?;
        }
        Command::Crop {
            file,
            width,
            height,
        } => {
            transform_file(&config, &file, &[Operation::Crop { width, height }])?;
        }
        Command::Trim {
            file,
            color,
            tolerance,
        } => {
            let step = Operation::Trim {
                color: color.unwrap_or(config.trim.color),
                tolerance: tolerance.unwrap_or(config.trim.tolerance),
            };
            transform_file(&config, &file, &[step])?;
        }
        Command::Recolor {
            file,
            reference,
            replacement,
            tolerance,
        } => {
            let step = Operation::Recolor {
                reference,
                replacement,
                tolerance,
            };
            transform_file(&config, &file, &[step])?;
        }
        Command::Flatten { file, background } => {
            let step = Operation::Flatten {
                background: background.unwrap_or(config.encode.background),
            };
            transform_file(&config, &file, &[step])?;
        }
        Command::Base64 {
            input,
            data_uri,
            decode,
            encode,
        } => {
            let codec = config.codec();
            match decode {
                Some(target) => {
                    let text = std::fs::read_to_string(&input)?;
                    let bitmap = codec.decode_base64(&text)?;
                    let options = encode.options(&config, Some(&target));
                    let format = codec.encode_to_file(&bitmap, &target, &options)?;
                    output::print_written(&target, format, bitmap.dimensions(), &[]);
                }
                None => {
                    let bytes = std::fs::read(&input)?;
                    let mime = if data_uri {
                        Some(codec.detect_format(&bytes)?.mime())
                    } else {
                        None
                    };
                    println!("{}", encode_to_base64(&bytes, mime));
                }
            }
        }
        Command::Batch {
            input,
            output: output_dir,
        } => {
            init_thread_pool(&config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let input_root = input.clone();
            let printer = std::thread::spawn(move || {
                for (index, event) in rx.into_iter().enumerate() {
                    for line in output::format_batch_event(index + 1, &event, &input_root) {
                        println!("{}", line);
                    }
                }
            });
            let summary = batch::run(&input, &output_dir, &config, Some(tx))?;
            printer.join().ok();
            output::print_batch_summary(&summary);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Decode `file.input`, apply `steps`, and write the result.
fn transform_file(
    config: &Config,
    file: &FileArgs,
    steps: &[Operation],
) -> Result<(), Box<dyn Error>> {
    let codec = config.codec();
    let mut bitmap = codec.decode_file(&file.input)?;
    pipeline::apply_all(steps, &mut bitmap)?;

    let options = file.encode.options(config, file.output.as_deref());
    let (written, format) = match &file.output {
        Some(path) => (path.clone(), codec.encode_to_file(&bitmap, path, &options)?),
        None => {
            let format = codec.resolve_format(options.format)?;
            let temp = codec.encode_to_temp_file(&bitmap, &options)?;
            (temp.keep()?, format)
        }
    };
    output::print_written(&written, format, bitmap.dimensions(), steps);
    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the `warn` default.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. The user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
