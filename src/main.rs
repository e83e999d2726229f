use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use watermark_batch::config::{self, WatermarkConfig};
use watermark_batch::{describe, output, process};

#[derive(Parser)]
#[command(name = "watermark")]
#[command(about = "Stamp a text watermark onto every image in a folder")]
#[command(long_about = "\
Stamp a text watermark onto every image in a folder

Recognized files (case-insensitive): jpg jpeg png webp tif tiff bmp.
Each output keeps its source format and name, with a suffix before the
extension (photo.jpg -> photo_wm.jpg). JPEG outputs keep the source's EXIF
and ICC profile.

Placement is either one anchored watermark (--position, --margin) or a
repeated grid covering the whole image (--tile and the --tile-* flags).

Settings are layered: stock defaults, then --config FILE, then flags.
Run 'watermark gen-config' to print a documented config file.")]
#[command(version)]
struct Cli {
    /// Increase log detail (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watermark every recognized image in a folder
    Apply(ApplyArgs),
    /// List file name, size and dimensions of each image in a folder
    Describe {
        /// Folder to describe (top level only)
        #[arg(short, long)]
        input: PathBuf,
        /// One JSON object per line instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

/// Flags for `apply`. Every setting is optional and overrides the config
/// file only when given.
#[derive(Args, Debug)]
struct ApplyArgs {
    /// Input folder
    #[arg(short, long)]
    input: PathBuf,
    /// Output folder (created if missing)
    #[arg(short, long)]
    output: PathBuf,
    /// Watermark text; newlines start extra lines
    #[arg(short, long)]
    text: String,
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// center, top-left, top-right, bottom-left, bottom-right, top, bottom, left, right
    #[arg(long, visible_alias = "pos")]
    position: Option<String>,
    /// Distance from the edges in pixels
    #[arg(long, allow_negative_numbers = true)]
    margin: Option<i64>,
    /// Text color: hex (#RRGGBB) or CSS name
    #[arg(long)]
    color: Option<String>,
    /// 0.0-1.0 fraction or 0-100 percent, clamped
    #[arg(long, allow_negative_numbers = true)]
    opacity: Option<f64>,
    /// Fixed font size in pixels (wins over --rel-size)
    #[arg(long)]
    font_size: Option<u32>,
    /// Text width as a fraction of the image width
    #[arg(long, allow_negative_numbers = true)]
    rel_size: Option<f64>,
    /// TrueType/OpenType font file
    #[arg(long)]
    font_path: Option<PathBuf>,
    /// Outline width in pixels
    #[arg(long)]
    stroke_width: Option<u32>,
    /// Outline color
    #[arg(long)]
    stroke_color: Option<String>,

    /// JPEG quality 1-100
    #[arg(long)]
    quality: Option<u32>,
    /// Inserted before the output file extension
    #[arg(long)]
    suffix: Option<String>,
    /// Include subfolders
    #[arg(long)]
    recursive: bool,
    /// Mirror the input folder structure in the output folder
    #[arg(long)]
    keep_tree: bool,

    /// Repeat the watermark across the whole image
    #[arg(long)]
    tile: bool,
    /// Gap between tiles on both axes
    #[arg(long, allow_negative_numbers = true)]
    tile_spacing: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    tile_spacing_x: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    tile_spacing_y: Option<i64>,
    /// Grid shift in pixels
    #[arg(long, allow_negative_numbers = true)]
    tile_offset_x: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    tile_offset_y: Option<i64>,
    /// Tile rotation in degrees, counter-clockwise
    #[arg(long, allow_negative_numbers = true)]
    tile_angle: Option<f64>,
    /// Opacity of the tiled layer (defaults to --opacity)
    #[arg(long, allow_negative_numbers = true)]
    tile_opacity: Option<f64>,
}

impl ApplyArgs {
    /// Layer the flags that were given over `config`.
    fn apply_to(&self, config: &mut WatermarkConfig) {
        let text = &mut config.text;
        if let Some(color) = &self.color {
            text.color = color.clone();
        }
        if let Some(opacity) = self.opacity {
            text.opacity = opacity;
        }
        if let Some(size) = self.font_size {
            text.font_size = Some(size);
        }
        if let Some(rel) = self.rel_size {
            text.rel_size = Some(rel);
            // A relative size on the command line beats a fixed size from the file
            if self.font_size.is_none() {
                text.font_size = None;
            }
        }
        if let Some(path) = &self.font_path {
            text.font_path = Some(path.clone());
        }
        if let Some(width) = self.stroke_width {
            text.stroke_width = width;
        }
        if let Some(color) = &self.stroke_color {
            text.stroke_color = color.clone();
        }

        if let Some(position) = &self.position {
            config.placement.position = position.clone();
        }
        if let Some(margin) = self.margin {
            config.placement.margin = margin;
        }

        let out = &mut config.output;
        if let Some(quality) = self.quality {
            out.quality = quality;
        }
        if let Some(suffix) = &self.suffix {
            out.suffix = suffix.clone();
        }
        out.recursive |= self.recursive;
        out.keep_tree |= self.keep_tree;

        let tile = &mut config.tile;
        tile.enabled |= self.tile;
        if let Some(spacing) = self.tile_spacing {
            tile.spacing = spacing;
            tile.spacing_x = None;
            tile.spacing_y = None;
        }
        if let Some(x) = self.tile_spacing_x {
            tile.spacing_x = Some(x);
        }
        if let Some(y) = self.tile_spacing_y {
            tile.spacing_y = Some(y);
        }
        if let Some(x) = self.tile_offset_x {
            tile.offset_x = x;
        }
        if let Some(y) = self.tile_offset_y {
            tile.offset_y = y;
        }
        if let Some(angle) = self.tile_angle {
            tile.angle = angle;
        }
        if let Some(opacity) = self.tile_opacity {
            tile.opacity = Some(opacity);
        }
    }

    fn into_request(self) -> Result<process::ApplyRequest, config::ConfigError> {
        let mut config = config::load_config(self.config.as_deref())?;
        self.apply_to(&mut config);
        Ok(process::ApplyRequest {
            input: self.input,
            output: self.output,
            text: self.text,
            config,
        })
    }
}

/// Send diagnostics to stderr. Level follows `-v` unless `RUST_LOG` is set.
fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Apply(args) => {
            let request = args.into_request()?;
            process::run(&request)?;
        }
        Command::Describe { input, json } => {
            let descriptions = describe::describe_dir(&input)?;
            output::print_descriptions(&descriptions, json)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[error] {e}");
            ExitCode::FAILURE
        }
    }
}
