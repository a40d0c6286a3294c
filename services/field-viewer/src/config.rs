//! Viewer configuration loaded from YAML.

use std::path::Path;

use anyhow::{Context, Result};
use field_renderer::ScalarRenderOptions;
use gpu_particles::WindGlOptions;
use serde::{Deserialize, Serialize};
use wind_particles::WindAnimatorOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Viewport width in CSS pixels.
    pub width: u32,
    /// Viewport height in CSS pixels.
    pub height: u32,
    /// Device pixels per CSS pixel.
    pub pixel_ratio: f64,
    /// Number of frames written.
    pub frames: usize,
    /// Palette file; the built-in palettes when unset.
    pub palettes: Option<String>,
    pub scalar: ScalarRenderOptions,
    /// Canvas animator tuning; derived from the wind grid when unset.
    pub animator: Option<WindAnimatorOptions>,
    pub gpu: WindGlOptions,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            pixel_ratio: 1.0,
            frames: 30,
            palettes: None,
            scalar: ScalarRenderOptions::default(),
            animator: None,
            gpu: WindGlOptions::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ViewerConfig =
            serde_yaml::from_str(yaml).context("Failed to parse viewer config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "viewer config not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read viewer config from {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid viewer config {:?}", path))
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!("render size must be non-zero, got {}x{}", self.width, self.height);
        }
        if !(self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0) {
            anyhow::bail!("pixel_ratio must be positive, got {}", self.pixel_ratio);
        }
        if self.scalar.step == 0 {
            anyhow::bail!("scalar.step must be at least 1");
        }
        Ok(())
    }
}
