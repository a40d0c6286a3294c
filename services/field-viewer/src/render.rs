//! Headless frame loops for the canvas and GPU paths.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use field_common::{GeoGrid, GridRecord, ManualScheduler, MapView, ViewportEvents};
use field_renderer::png::{create_png, pixmap_to_png};
use field_renderer::{ranges_domain, PaletteConfig, ScalarRenderer};
use field_sampler::GridSampler;
use gpu_particles::{GpuContext, GpuWindOverlay, ScalarTexture, WindTexture, WIND_PARAMETER};
use tiny_skia::Pixmap;
use tracing::{debug, info};
use wind_particles::{WindAnimator, WindAnimatorOptions};

use crate::config::ViewerConfig;

/// Which animator draws the particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderMode {
    Canvas,
    Gpu,
}

/// Inputs of one render run.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub u_path: PathBuf,
    pub v_path: PathBuf,
    pub scalar_path: Option<PathBuf>,
    pub parameter: String,
    pub output_dir: PathBuf,
    pub mode: RenderMode,
    pub seed: Option<u64>,
}

/// Grids of a job, loaded from JSON records.
pub struct Fields {
    pub wind: Arc<GridSampler>,
    pub scalar: Option<Arc<GridSampler>>,
}

impl Fields {
    pub fn load(job: &RenderJob) -> Result<Self> {
        let u = GridRecord::from_file(&job.u_path)
            .with_context(|| format!("Failed to read u record {:?}", job.u_path))?;
        let v = GridRecord::from_file(&job.v_path)
            .with_context(|| format!("Failed to read v record {:?}", job.v_path))?;
        let wind = GeoGrid::vector_from_records(&u, &v).context("Invalid wind records")?;

        let scalar = match &job.scalar_path {
            Some(path) => {
                let record = GridRecord::from_file(path)
                    .with_context(|| format!("Failed to read scalar record {:?}", path))?;
                let grid = GeoGrid::scalar_from_record(&record).context("Invalid scalar record")?;
                Some(Arc::new(GridSampler::build(Arc::new(grid))))
            }
            None => None,
        };

        Ok(Self {
            wind: Arc::new(GridSampler::build(Arc::new(wind))),
            scalar,
        })
    }
}

pub fn load_palettes(config: &ViewerConfig) -> Result<PaletteConfig> {
    let palettes = match &config.palettes {
        Some(path) => PaletteConfig::from_file(path)
            .with_context(|| format!("Failed to load palettes from {}", path))?,
        None => PaletteConfig::builtin().context("Built-in palettes are invalid")?,
    };
    palettes.validate().context("Invalid palette configuration")?;
    Ok(palettes)
}

fn frame_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame-{:04}.png", index))
}

fn viewport_for(fields: &Fields, config: &ViewerConfig, events: &ViewportEvents) -> MapView {
    MapView::fit(&fields.wind.grid().bounding_box(), (config.width, config.height))
        .with_pixel_ratio(config.pixel_ratio)
        .with_events(events.clone())
}

/// Render every frame of `job` and return the written paths.
pub fn run(job: &RenderJob, config: &ViewerConfig) -> Result<Vec<PathBuf>> {
    let fields = Fields::load(job)?;
    let palettes = load_palettes(config)?;
    std::fs::create_dir_all(&job.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", job.output_dir))?;

    let frames = match job.mode {
        RenderMode::Canvas => render_canvas(job, config, &fields, &palettes)?,
        RenderMode::Gpu => render_gpu(job, config, &fields, &palettes)?,
    };

    let mut written = Vec::with_capacity(frames.len());
    for (index, png) in frames.into_iter().enumerate() {
        let path = frame_path(&job.output_dir, index);
        std::fs::write(&path, png).with_context(|| format!("Failed to write {:?}", path))?;
        written.push(path);
    }

    info!(
        frames = written.len(),
        output = %job.output_dir.display(),
        mode = ?job.mode,
        "render complete"
    );
    Ok(written)
}

/// Scalar layer plus the canvas particle animator, one PNG per frame.
pub fn render_canvas(
    job: &RenderJob,
    config: &ViewerConfig,
    fields: &Fields,
    palettes: &PaletteConfig,
) -> Result<Vec<Vec<u8>>> {
    let events = ViewportEvents::new();
    let view = viewport_for(fields, config, &events);
    let mut scheduler = ManualScheduler::new();

    let mut scalar_layer = match &fields.scalar {
        Some(sampler) => {
            let scale = palettes
                .color_scale(&job.parameter)
                .with_context(|| format!("No color scale for {}", job.parameter))?;
            Some(ScalarRenderer::new(sampler.clone(), scale, config.scalar))
        }
        None => None,
    };

    let options = config
        .animator
        .clone()
        .unwrap_or_else(|| WindAnimatorOptions::for_grid(fields.wind.grid().header()));
    let interval = options.frame_interval_ms;
    let mut animator = WindAnimator::new(fields.wind.clone(), options)?;
    if let Some(seed) = job.seed {
        animator = animator.with_seed(seed);
    }
    animator.start(&view, &events, &mut scheduler);

    let device_w = ((config.width as f64 * config.pixel_ratio).round() as u32).max(1);
    let device_h = ((config.height as f64 * config.pixel_ratio).round() as u32).max(1);

    let mut frames = Vec::with_capacity(config.frames);
    for index in 0..config.frames {
        scheduler.take_pending();
        let now_ms = (index + 1) as f64 * interval;
        let mut target =
            Pixmap::new(device_w, device_h).context("Failed to allocate frame pixmap")?;

        if let Some(layer) = scalar_layer.as_mut() {
            layer.draw_frame(&view, &mut target.as_mut());
        }
        if animator.on_frame(now_ms, &view, &mut scheduler) {
            animator.draw_frame(&view, &mut target.as_mut());
        }

        frames.push(pixmap_to_png(&target)?);
        debug!(frame = index, "canvas frame rendered");
    }

    animator.stop(&mut scheduler);
    Ok(frames)
}

/// GPU overlay frames, each the size of the projected wind extent.
pub fn render_gpu(
    job: &RenderJob,
    config: &ViewerConfig,
    fields: &Fields,
    palettes: &PaletteConfig,
) -> Result<Vec<Vec<u8>>> {
    let ctx = Arc::new(GpuContext::new_blocking().context("GPU mode needs a usable adapter")?);

    let wind = WindTexture::from_sampler(&fields.wind)?;
    let scalar = match &fields.scalar {
        Some(sampler) => {
            let domain = palettes.ranges(&job.parameter).and_then(ranges_domain);
            Some(ScalarTexture::from_sampler(sampler, domain)?)
        }
        None => None,
    };
    let parameter = if scalar.is_some() {
        job.parameter.as_str()
    } else {
        WIND_PARAMETER
    };

    let events = ViewportEvents::new();
    let view = viewport_for(fields, config, &events);
    let mut scheduler = ManualScheduler::new();

    let extent = fields.wind.grid().bounding_box();
    let mut overlay =
        GpuWindOverlay::new(ctx, extent, &wind, scalar.as_ref(), parameter, palettes)?;
    overlay.gl_mut().set_options(config.gpu);
    if let Some(seed) = job.seed {
        overlay.gl_mut().reseed(seed);
    }
    overlay.start(&view, &events, &mut scheduler);

    let mut frames = Vec::with_capacity(config.frames);
    for index in 0..config.frames {
        scheduler.take_pending();
        overlay.on_frame(&view, &mut scheduler);

        let (width, height) = overlay.gl().size();
        let pixels = overlay.read_frame()?;
        frames.push(create_png(&pixels, width as usize, height as usize)?);
        debug!(frame = index, width, height, "GPU frame rendered");
    }

    overlay.destroy(&mut scheduler);
    Ok(frames)
}
