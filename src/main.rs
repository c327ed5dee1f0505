use clap::{Parser, Subcommand};
use reframe::config::{self, ManipulationConfig};
use reframe::imaging::calculations::{plan_resize, resize_target};
use reframe::imaging::{
    Dimension, FlipAxis, Focus, ImageSource, Mark, Orientation, Overlay, Position, ROTATE_CW,
    Text, Watermark,
};
use reframe::pipeline::{self, Step};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reframe")]
#[command(about = "Resize, crop, rotate and watermark images")]
#[command(long_about = "\
Resize, crop, rotate and watermark images

Every command reads one source and writes one output in the source's
format. Sources may be a file path, an http(s) URL or a data: URL.

Resizing is cover-fit: the image is scaled until it covers the target and
the overflow is cropped away around the configured focus.

  focus:        CENTER NORTH NORTHEAST EAST SOUTHEAST SOUTH SOUTHWEST WEST NORTHWEST
  orientation:  AUTO LANDSCAPE PORTRAIT SQUARE
  position:     AUTO CENTER MIDDLE MIDDLE_MIDDLE MIDDLE_TOP MIDDLE_BOTTOM MIDDLE_LEFT
                MIDDLE_RIGHT TOP_LEFT TOP_RIGHT BOTTOM_LEFT BOTTOM_RIGHT

Run 'reframe gen-config' to generate a documented reframe.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Backend override (raster, fast, netpbm)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Encoder quality override (0-100)
    #[arg(long, global = true)]
    quality: Option<u32>,

    /// Log computed geometry
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Source and destination shared by every image command.
#[derive(clap::Args, Clone)]
struct IoArgs {
    /// Source image: path, http(s) URL or data: URL
    input: String,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Cover-fit to an exact size, cropping around the focus
    Resize {
        #[command(flatten)]
        io: IoArgs,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Crop anchor (overrides config)
        #[arg(long)]
        focus: Option<Focus>,
        /// Orientation (overrides config)
        #[arg(long)]
        orientation: Option<Orientation>,
    },
    /// Scale proportionally by a percentage
    Scale {
        #[command(flatten)]
        io: IoArgs,
        #[arg(long)]
        percent: u32,
    },
    /// Rotate clockwise; negative degrees rotate counter-clockwise
    Rotate {
        #[command(flatten)]
        io: IoArgs,
        #[arg(long, default_value_t = ROTATE_CW, allow_hyphen_values = true)]
        degrees: i32,
    },
    /// Mirror horizontally, vertically or both
    Flip {
        #[command(flatten)]
        io: IoArgs,
        /// horizontal|vertical|both, or 1|2|3
        #[arg(long, value_parser = parse_flip_axis, default_value = "horizontal")]
        axis: FlipAxis,
    },
    /// Draw text or composite an overlay image
    Watermark {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        mark: MarkArgs,
    },
    /// Print the resize plan for a source and target size without touching pixels
    Plan {
        /// Source size, WxH
        #[arg(long, value_parser = parse_size)]
        source: (u32, u32),
        /// Target size, WxH
        #[arg(long, value_parser = parse_size)]
        target: (u32, u32),
        #[arg(long)]
        focus: Option<Focus>,
        #[arg(long)]
        orientation: Option<Orientation>,
    },
    /// Print a stock reframe.toml with all options documented
    GenConfig,
}

#[derive(clap::Args, Clone)]
struct MarkArgs {
    /// Text to draw (requires --font)
    #[arg(
        long,
        requires = "font",
        conflicts_with = "overlay",
        required_unless_present = "overlay"
    )]
    text: Option<String>,
    /// TrueType/OpenType font file
    #[arg(long)]
    font: Option<PathBuf>,
    /// Overlay image to composite
    #[arg(long)]
    overlay: Option<PathBuf>,
    /// Text preset: signature (25px, centered) or copyright (8px, bottom left)
    #[arg(long, value_parser = ["signature", "copyright"], requires = "text")]
    preset: Option<String>,
    #[arg(long, default_value_t = Position::Auto)]
    position: Position,
    #[arg(long)]
    padding: Option<i32>,
    /// Font size in pixels
    #[arg(long)]
    size: Option<u32>,
    /// Font color, hex (ffffff or #ffffff)
    #[arg(long)]
    color: Option<String>,
    /// Text angle in degrees
    #[arg(long, allow_hyphen_values = true)]
    angle: Option<f32>,
    /// Overlay scale in percent; fitted to half the image when omitted
    #[arg(long)]
    scale: Option<u32>,
}

impl MarkArgs {
    fn into_watermark(self) -> Watermark {
        let mut watermark = match self.text {
            Some(string) => {
                let font = self.font.unwrap_or_default();
                match self.preset.as_deref() {
                    Some("signature") => Watermark::signature(font, &string),
                    Some("copyright") => Watermark::copyright(font, &string),
                    _ => Watermark::text(Text::new(font, &string)),
                }
            }
            None => {
                let mut overlay = Overlay::new(self.overlay.unwrap_or_default());
                if let Some(scale) = self.scale {
                    overlay = overlay.with_scale(scale);
                }
                Watermark::overlay(overlay)
            }
        };

        if let Mark::Text(text) = &mut watermark.mark {
            let mut styled = text.clone();
            if let Some(size) = self.size {
                styled = styled.with_size(size);
            }
            if let Some(color) = &self.color {
                styled = styled.with_color(color);
            }
            if let Some(angle) = self.angle {
                styled = styled.with_angle(angle);
            }
            *text = styled;
        }
        if self.position != Position::Auto {
            watermark = watermark.with_position(self.position);
        }
        if let Some(padding) = self.padding {
            watermark = watermark.with_padding(padding);
        }
        watermark
    }
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let w = w.trim().parse().map_err(|_| format!("bad width in '{s}'"))?;
    let h = h.trim().parse().map_err(|_| format!("bad height in '{s}'"))?;
    Ok((w, h))
}

fn parse_flip_axis(s: &str) -> Result<FlipAxis, String> {
    if let Ok(n) = s.parse::<u8>() {
        return FlipAxis::try_from(n).map_err(|n| format!("flip axis must be 1, 2 or 3, got {n}"));
    }
    match s.to_ascii_lowercase().as_str() {
        "horizontal" | "h" => Ok(FlipAxis::Horizontal),
        "vertical" | "v" => Ok(FlipAxis::Vertical),
        "both" => Ok(FlipAxis::Both),
        _ => Err(format!("unknown flip axis '{s}'")),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let load = |path: &Path| -> Result<ManipulationConfig, config::ConfigError> {
        let mut config = config::load_config(path)?;
        if let Some(backend) = &cli.backend {
            config.backend = backend.clone();
        }
        if let Some(quality) = cli.quality {
            config.quality = quality;
        }
        config.validate()?;
        Ok(config)
    };

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Plan {
            source,
            target,
            focus,
            orientation,
        } => {
            let config = load(&cli.config)?;
            print_plan(
                &config,
                source,
                target,
                focus.unwrap_or(config.focus),
                orientation.unwrap_or(config.orientation),
            );
        }
        Command::Resize {
            io,
            width,
            height,
            focus,
            orientation,
        } => {
            let mut config = load(&cli.config)?;
            config.focus = focus.unwrap_or(config.focus);
            config.orientation = orientation.unwrap_or(config.orientation);
            run(&config, io, Step::Resize { width, height })?;
        }
        Command::Scale { io, percent } => {
            run(&load(&cli.config)?, io, Step::Scale { percent })?;
        }
        Command::Rotate { io, degrees } => {
            run(&load(&cli.config)?, io, Step::Rotate { degrees })?;
        }
        Command::Flip { io, axis } => {
            run(&load(&cli.config)?, io, Step::Flip { axis })?;
        }
        Command::Watermark { io, mark } => {
            run(&load(&cli.config)?, io, Step::Watermark(mark.into_watermark()))?;
        }
    }

    Ok(())
}

fn run(config: &ManipulationConfig, io: IoArgs, step: Step) -> Result<(), pipeline::PipelineError> {
    let done = pipeline::process_file(
        config,
        ImageSource::parse(&io.input),
        &io.output,
        std::slice::from_ref(&step),
    )?;
    println!(
        "{} → {} ({}x{}, {})",
        io.input,
        io.output.display(),
        done.file.width(),
        done.file.height(),
        done.outcome
    );
    Ok(())
}

fn print_plan(
    config: &ManipulationConfig,
    source: (u32, u32),
    target: (u32, u32),
    focus: Focus,
    orientation: Orientation,
) {
    let source = Dimension::new(source.0, source.1)
        .with_maintain_aspect_ratio(config.maintain_aspect_ratio);
    let target = resize_target(&source, target.0, target.1, orientation, focus);
    let plan = plan_resize(&source, &target);

    println!("source  {source}");
    println!(
        "target  {target} ({}, {})",
        target.orientation(),
        target.focus()
    );
    let whole = if plan.reframes(source.width(), source.height()) {
        ""
    } else {
        " (whole image)"
    };
    println!("window  {}{whole}", plan.window);
    println!(
        "scale   {}x{} ({:?})",
        plan.scale_width, plan.scale_height, plan.filter
    );
    println!("crop    {}", plan.crop);
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "reframe=debug" } else { "reframe=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}
