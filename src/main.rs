use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use image::Rgb;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use frame_sweep::{
    config::Config,
    fixture::{write_fixture, FixtureSpec},
    pipeline::{self, RotationJob, RunSummary},
    transform::{ContrastCurve, RotationScaler, RotationVariant, DEFAULT_FINAL_ANGLE},
    SweepError,
};

#[derive(Parser)]
#[command(
    name = "frame-sweep",
    version,
    about = "Apply contrast and rotation sweeps across a video clip",
    long_about = "Frame-Sweep reads a video one frame at a time, applies a transform whose strength follows the clip's progress, and writes the result with the first encoder ffmpeg can provide."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Grayscale contrast stretch following a curve over the clip
    Contrast {
        /// Input video
        #[arg(short, long)]
        input: PathBuf,

        /// Output video (extension follows the encoder used)
        #[arg(short, long)]
        output: PathBuf,

        /// Contrast curves (linear, sine; anything else leaves frames unchanged)
        #[arg(short, long = "mode", num_args = 1.., default_values = ["linear", "sine"])]
        modes: Vec<String>,
    },

    /// Gradual rotation, plain and/or scaled to keep the frame visible
    Rotate {
        /// Input video
        #[arg(short, long)]
        input: PathBuf,

        /// Output for the plain rotation
        #[arg(long)]
        normal: Option<PathBuf>,

        /// Output for the shrink-to-fit rotation
        #[arg(long)]
        scaled: Option<PathBuf>,

        /// Angle reached on the last frame, in degrees
        #[arg(long, default_value_t = DEFAULT_FINAL_ANGLE, allow_hyphen_values = true)]
        final_angle: f64,

        /// Rotation center as X,Y (defaults to the frame center)
        #[arg(long, value_parser = parse_center)]
        center: Option<(f64, f64)>,

        /// Generate the synthetic clip at the input path if it does not exist
        #[arg(long)]
        fixture_if_missing: bool,
    },

    /// Write the synthetic test clip
    Fixture {
        /// Output video
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value_t = 640)]
        width: u32,

        #[arg(long, default_value_t = 480)]
        height: u32,

        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination TOML file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Frame-Sweep v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli) {
        match e.downcast_ref::<SweepError>() {
            Some(sweep) => error!("{}", sweep.user_message()),
            None => error!("{:#}", e),
        }
        return Err(e);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    if let Command::InitConfig { path } = &cli.command {
        Config::default().save_to_file(path)?;
        info!("Default configuration written to {:?}", path);
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Contrast { input, output, modes } => {
            let several = modes.len() > 1;
            for mode in &modes {
                let curve = ContrastCurve::from_name(mode);
                let target = if several {
                    output_for_mode(&output, mode)
                } else {
                    output.clone()
                };
                info!("Processing video with '{}' contrast mode...", mode);
                let summary = pipeline::contrast_video(&input, &target, curve, &config)?;
                report_shortfall(&summary);
            }
        }

        Command::Rotate {
            input,
            normal,
            scaled,
            final_angle,
            center,
            fixture_if_missing,
        } => {
            // The fixture may land under a fallback extension
            let input = if fixture_if_missing && !input.exists() {
                info!("Input {:?} not found, creating test video", input);
                write_fixture(&input, &FixtureSpec::default(), &config)?.path
            } else {
                input
            };

            let steps = config.run.progress_report_steps;
            match (normal, scaled) {
                (Some(normal), Some(scaled)) => {
                    let mut job = RotationJob::new(final_angle).with_report_steps(steps);
                    if let Some(center) = center {
                        job = job.with_center(center);
                    }
                    let summary = pipeline::rotate_video(&input, &normal, &scaled, &job, &config)?;
                    report_shortfall(&summary);
                }
                (Some(output), None) => {
                    let variant = RotationVariant::Normal;
                    rotate_single(&input, &output, final_angle, center, variant, &config)?
                }
                (None, Some(output)) => {
                    let variant = RotationVariant::Scaled;
                    rotate_single(&input, &output, final_angle, center, variant, &config)?
                }
                (None, None) => bail!("rotate needs at least one of --normal or --scaled"),
            }
        }

        Command::Fixture {
            output,
            width,
            height,
            fps,
            seconds,
        } => {
            let clip = FixtureSpec::from_seconds(width, height, fps, seconds);
            write_fixture(&output, &clip, &config)?;
        }

        Command::InitConfig { .. } => {}
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Config::from_file(path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    config.validate()?;
    Ok(config)
}

fn rotate_single(
    input: &Path,
    output: &Path,
    final_angle: f64,
    center: Option<(f64, f64)>,
    variant: RotationVariant,
    config: &Config,
) -> Result<()> {
    let mut scaler = RotationScaler::new(final_angle, variant);
    if let Some(center) = center {
        scaler = scaler.with_center(center);
    }
    let summary = pipeline::transform_video::<Rgb<u8>, _>(input, output, scaler, config)?;
    info!("{} rotation output saved to: {}", variant, summary.output.path.display());
    report_shortfall(&summary);
    Ok(())
}

fn report_shortfall<O>(summary: &RunSummary<O>) {
    if let Some(shortfall) = summary.premature_end() {
        warn!("{}", shortfall);
    }
}

/// `out.mp4` + `sine` -> `out_sine.mp4`
fn output_for_mode(output: &Path, mode: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!("{}_{}.{}", stem, mode, ext.to_string_lossy()),
        None => format!("{}_{}", stem, mode),
    };
    output.with_file_name(name)
}

fn parse_center(value: &str) -> std::result::Result<(f64, f64), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", value))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{}': {}", s.trim(), e))
    };
    Ok((parse(x)?, parse(y)?))
}
