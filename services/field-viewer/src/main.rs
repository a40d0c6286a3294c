//! field-viewer
//!
//! Renders a wind field (and optionally a scalar field) over a headless
//! viewport and writes one PNG per animation frame.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use field_viewer::{run, RenderJob, RenderMode, ViewerConfig};

#[derive(Parser, Debug)]
#[command(name = "field-viewer")]
#[command(about = "Render animated wind particle frames from grid records")]
struct Args {
    /// U-component grid record (JSON)
    #[arg(long)]
    u: PathBuf,

    /// V-component grid record (JSON)
    #[arg(long)]
    v: PathBuf,

    /// Scalar grid record (JSON) painted under the particles
    #[arg(long)]
    scalar: Option<PathBuf>,

    /// Palette parameter of the scalar field
    #[arg(long, default_value = "WIND")]
    parameter: String,

    /// Viewport width in CSS pixels (overrides the config file)
    #[arg(long)]
    width: Option<u32>,

    /// Viewport height in CSS pixels (overrides the config file)
    #[arg(long)]
    height: Option<u32>,

    /// Number of frames to write (overrides the config file)
    #[arg(long)]
    frames: Option<usize>,

    /// Output directory for the PNG frames
    #[arg(short, long, default_value = "frames", env = "FIELD_VIEWER_OUTPUT")]
    output: PathBuf,

    /// Particle renderer
    #[arg(long, value_enum, default_value = "canvas")]
    mode: RenderMode,

    /// Seed for reproducible particles
    #[arg(long)]
    seed: Option<u64>,

    /// Viewer config file
    #[arg(long, default_value = "config/viewer.yaml", env = "FIELD_VIEWER_CONFIG")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let mut config = ViewerConfig::load(&args.config)?;
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(frames) = args.frames {
        config.frames = frames;
    }
    config.validate()?;

    info!(
        width = config.width,
        height = config.height,
        frames = config.frames,
        mode = ?args.mode,
        "starting field viewer"
    );

    let job = RenderJob {
        u_path: args.u,
        v_path: args.v,
        scalar_path: args.scalar,
        parameter: args.parameter,
        output_dir: args.output,
        mode: args.mode,
        seed: args.seed,
    };
    run(&job, &config)?;
    Ok(())
}
