//! Georeferenced grid snapshots.
//!
//! A [`GeoGrid`] is one time-step of a scalar field (temperature, PM2.5, ...)
//! or a vector field (wind u/v) laid out on an axis-aligned lattice. Grids
//! are validated once at construction and never mutated afterwards, so they
//! can be shared behind an `Arc` by every consumer of the same time-step.

use serde::{Deserialize, Serialize};

use crate::{BoundingBox, FieldError, FieldResult};

/// Lattice definition of a grid.
///
/// Row `j` sits at `lat_origin + j * lat_step`, column `i` at
/// `lon_origin + i * lon_step`. A negative `lat_step` means rows run
/// north to south, which is the common ordering for model output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridHeader {
    pub lon_origin: f64,
    pub lat_origin: f64,
    pub lon_step: f64,
    pub lat_step: f64,
    pub width: usize,
    pub height: usize,
}

impl GridHeader {
    pub fn new(
        lon_origin: f64,
        lat_origin: f64,
        lon_step: f64,
        lat_step: f64,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            lon_origin,
            lat_origin,
            lon_step,
            lat_step,
            width,
            height,
        }
    }

    pub fn validate(&self) -> FieldResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FieldError::invalid_grid(format!(
                "grid dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.lon_step.is_finite() || self.lon_step == 0.0 {
            return Err(FieldError::invalid_grid(format!(
                "lon_step must be finite and non-zero, got {}",
                self.lon_step
            )));
        }
        if !self.lat_step.is_finite() || self.lat_step == 0.0 {
            return Err(FieldError::invalid_grid(format!(
                "lat_step must be finite and non-zero, got {}",
                self.lat_step
            )));
        }
        if !self.lon_origin.is_finite() || !self.lat_origin.is_finite() {
            return Err(FieldError::invalid_grid("grid origin must be finite"));
        }
        Ok(())
    }

    /// Total number of lattice cells.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Row-major index of cell (i, j).
    pub fn flat_index(&self, i: usize, j: usize) -> usize {
        j * self.width + i
    }

    /// Coordinates of lattice vertex (i, j).
    pub fn coord_of(&self, i: usize, j: usize) -> [f64; 2] {
        [
            self.lon_origin + i as f64 * self.lon_step,
            self.lat_origin + j as f64 * self.lat_step,
        ]
    }

    /// Extent covered by the lattice vertices.
    pub fn bbox(&self) -> BoundingBox {
        let [x0, y0] = self.coord_of(0, 0);
        let [x1, y1] = self.coord_of(self.width - 1, self.height - 1);
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

/// Header as it appears in the dashboard's JSON grid records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub lo1: f64,
    pub la1: f64,
    pub dx: f64,
    pub dy: f64,
    pub nx: usize,
    pub ny: usize,
}

impl From<RecordHeader> for GridHeader {
    fn from(h: RecordHeader) -> Self {
        GridHeader::new(h.lo1, h.la1, h.dx, h.dy, h.nx, h.ny)
    }
}

/// One component record: `{"header": {...}, "data": [1.0, null, ...]}`.
///
/// The header is optional at the serde level so that a record without one
/// is reported as [`FieldError::InvalidGrid`] rather than a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridRecord {
    #[serde(default)]
    pub header: Option<RecordHeader>,
    #[serde(default)]
    pub data: Vec<Option<f32>>,
}

impl GridRecord {
    pub fn from_json(json: &str) -> FieldResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> FieldResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn require_header(&self, what: &str) -> FieldResult<GridHeader> {
        self.header
            .map(GridHeader::from)
            .ok_or_else(|| FieldError::invalid_grid(format!("{} record has no header", what)))
    }
}

/// Cell values of a grid. `None` marks a missing sample.
#[derive(Debug, Clone, PartialEq)]
pub enum GridValues {
    Scalar(Vec<Option<f32>>),
    Vector(Vec<Option<[f32; 2]>>),
}

impl GridValues {
    pub fn len(&self) -> usize {
        match self {
            GridValues::Scalar(v) => v.len(),
            GridValues::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable snapshot of one field time-step.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoGrid {
    header: GridHeader,
    values: GridValues,
}

impl GeoGrid {
    /// Build a scalar grid. Non-finite values are stored as missing.
    pub fn scalar(header: GridHeader, values: Vec<Option<f32>>) -> FieldResult<Self> {
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        Self::validated(header, GridValues::Scalar(values))
    }

    /// Build a scalar grid from a dense buffer where NaN marks missing cells.
    pub fn scalar_dense(header: GridHeader, values: &[f32]) -> FieldResult<Self> {
        Self::scalar(header, values.iter().map(|&v| Some(v)).collect())
    }

    /// Build a vector grid of (u, v) pairs. A pair with a non-finite
    /// component is stored as missing.
    pub fn vector(header: GridHeader, values: Vec<Option<[f32; 2]>>) -> FieldResult<Self> {
        let values = values
            .into_iter()
            .map(|v| v.filter(|[u, v]| u.is_finite() && v.is_finite()))
            .collect();
        Self::validated(header, GridValues::Vector(values))
    }

    /// Build a vector grid from separate u and v buffers.
    pub fn vector_dense(header: GridHeader, u: &[f32], v: &[f32]) -> FieldResult<Self> {
        if u.len() != v.len() {
            return Err(FieldError::invalid_grid(format!(
                "u and v buffers differ in length: {} vs {}",
                u.len(),
                v.len()
            )));
        }
        Self::vector(
            header,
            u.iter().zip(v).map(|(&u, &v)| Some([u, v])).collect(),
        )
    }

    pub fn scalar_from_record(record: &GridRecord) -> FieldResult<Self> {
        let header = record.require_header("scalar")?;
        Self::scalar(header, record.data.clone())
    }

    /// Combine u and v component records into one vector grid.
    ///
    /// The u header defines the lattice; the v record must have the same
    /// dimensions. A cell is missing when either component is missing.
    pub fn vector_from_records(u: &GridRecord, v: &GridRecord) -> FieldResult<Self> {
        let header = u.require_header("u")?;
        let v_header = v.require_header("v")?;
        if header.width != v_header.width || header.height != v_header.height {
            return Err(FieldError::invalid_grid(format!(
                "u grid is {}x{} but v grid is {}x{}",
                header.width, header.height, v_header.width, v_header.height
            )));
        }
        if u.data.len() != v.data.len() {
            return Err(FieldError::invalid_grid(format!(
                "u and v data differ in length: {} vs {}",
                u.data.len(),
                v.data.len()
            )));
        }

        let values = u
            .data
            .iter()
            .zip(&v.data)
            .map(|(u, v)| match (u, v) {
                (Some(u), Some(v)) => Some([*u, *v]),
                _ => None,
            })
            .collect();
        Self::vector(header, values)
    }

    fn validated(header: GridHeader, values: GridValues) -> FieldResult<Self> {
        header.validate()?;
        if values.len() != header.len() {
            return Err(FieldError::invalid_grid(format!(
                "expected {} values for a {}x{} grid, got {}",
                header.len(),
                header.width,
                header.height,
                values.len()
            )));
        }
        Ok(Self { header, values })
    }

    pub fn header(&self) -> &GridHeader {
        &self.header
    }

    pub fn values(&self) -> &GridValues {
        &self.values
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.values, GridValues::Vector(_))
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.header.bbox()
    }

    /// Scalar cell value, `None` if missing, out of range or not a scalar grid.
    pub fn scalar_cell(&self, i: usize, j: usize) -> Option<f32> {
        if i >= self.header.width || j >= self.header.height {
            return None;
        }
        match &self.values {
            GridValues::Scalar(v) => v[self.header.flat_index(i, j)],
            GridValues::Vector(_) => None,
        }
    }

    /// Vector cell value, `None` if missing, out of range or not a vector grid.
    pub fn vector_cell(&self, i: usize, j: usize) -> Option<[f32; 2]> {
        if i >= self.header.width || j >= self.header.height {
            return None;
        }
        match &self.values {
            GridValues::Vector(v) => v[self.header.flat_index(i, j)],
            GridValues::Scalar(_) => None,
        }
    }
}
