//! Per-parameter palette configuration.
//!
//! Palettes are stepped value ranges (`{min, max, color}`) keyed by the
//! dashboard parameter code (`WIND`, `TEMP`, `PM2.5`, ...). A `null` bound
//! is open-ended. The workspace ships `config/palettes.json`, which is
//! also compiled in as the built-in configuration.

use std::collections::BTreeMap;
use std::path::Path;

use field_common::{FieldError, FieldResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::color_scale::{ColorScale, Rgb};

const BUILTIN_PALETTES: &str = include_str!("../../../config/palettes.json");

/// Palette configuration loaded from JSON
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaletteConfig {
    pub version: String,
    pub parameters: BTreeMap<String, ParameterPalette>,
}

/// Palette of one parameter
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParameterPalette {
    #[serde(default)]
    pub unit: String,
    /// Decimal places for displayed values.
    #[serde(default)]
    pub precision: usize,
    /// Decimal places for legend labels.
    #[serde(default)]
    pub label_precision: usize,
    pub ranges: Vec<PaletteRange>,
}

/// One stepped range. `None` bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PaletteRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub color: Rgb,
}

impl PaletteRange {
    pub fn lower(&self) -> f64 {
        self.min.unwrap_or(f64::NEG_INFINITY)
    }

    pub fn upper(&self) -> f64 {
        self.max.unwrap_or(f64::INFINITY)
    }

    /// Half-open membership: `min <= value < max`.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower() && value < self.upper()
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }
}

impl ParameterPalette {
    /// Color-scale breakpoints: the lower bound and color of every range
    /// with a finite lower bound.
    pub fn segments(&self) -> Vec<(f64, Rgb)> {
        self.ranges
            .iter()
            .filter_map(|r| r.min.map(|min| (min, r.color)))
            .collect()
    }

    pub fn color_scale(&self) -> FieldResult<ColorScale> {
        ColorScale::new(self.segments())
    }
}

impl PaletteConfig {
    /// Load palette configuration from JSON string
    pub fn from_json(json_str: &str) -> FieldResult<Self> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load palette configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> FieldResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The palettes compiled into the crate.
    pub fn builtin() -> FieldResult<Self> {
        Self::from_json(BUILTIN_PALETTES)
    }

    pub fn get(&self, parameter: &str) -> Option<&ParameterPalette> {
        let palette = self.parameters.get(parameter);
        if palette.is_none() {
            warn!(parameter, "no palette configured for parameter");
        }
        palette
    }

    pub fn ranges(&self, parameter: &str) -> Option<&[PaletteRange]> {
        self.get(parameter).map(|p| p.ranges.as_slice())
    }

    pub fn segments(&self, parameter: &str) -> Option<Vec<(f64, Rgb)>> {
        self.get(parameter).map(ParameterPalette::segments)
    }

    pub fn color_scale(&self, parameter: &str) -> FieldResult<ColorScale> {
        self.get(parameter)
            .ok_or_else(|| {
                FieldError::invalid_palette(format!("unknown parameter '{}'", parameter))
            })?
            .color_scale()
    }

    /// Every palette must have ranges with `min < max` whose lower bounds
    /// ascend.
    pub fn validate(&self) -> FieldResult<()> {
        for (name, palette) in &self.parameters {
            if palette.ranges.is_empty() {
                return Err(FieldError::invalid_palette(format!(
                    "parameter '{}' has no ranges",
                    name
                )));
            }
            for range in &palette.ranges {
                if range.lower() >= range.upper() {
                    return Err(FieldError::invalid_palette(format!(
                        "parameter '{}' has an empty range [{:?}, {:?})",
                        name, range.min, range.max
                    )));
                }
            }
            if let Some(pair) = palette
                .ranges
                .windows(2)
                .find(|w| w[1].lower() < w[0].lower())
            {
                return Err(FieldError::invalid_palette(format!(
                    "parameter '{}' ranges are not ascending: {:?} follows {:?}",
                    name, pair[1].min, pair[0].min
                )));
            }
        }
        Ok(())
    }
}
