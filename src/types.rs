use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Real-valued band data type
pub type BandValue = f32;

/// 2D band data array (row x column)
pub type BandData = Array2<BandValue>;

/// Per-pixel no-data sentinel.
///
/// Undefined arithmetic (zero NDVI denominator, non-positive emissivity)
/// marks the affected pixel with this value instead of failing the run.
/// NaN propagates through subsequent band math, and the compositor
/// excludes flagged pixels from the mean.
pub const NO_DATA: BandValue = BandValue::NAN;

/// Check whether a pixel value carries the no-data marker.
#[inline]
pub fn is_no_data(value: BandValue) -> bool {
    value.is_nan()
}

/// Coordinate system enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// Geographic coordinates (latitude, longitude)
    Geographic,
    /// Projected coordinates (e.g., UTM)
    Projected { epsg: u32 },
}

impl std::fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinateSystem::Geographic => write!(f, "EPSG:4326"),
            CoordinateSystem::Projected { epsg } => write!(f, "EPSG:{}", epsg),
        }
    }
}

/// Geospatial bounding box in the raster's coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Axis-aligned intersection test against another box.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Width and height; zero or negative extents denote a degenerate box.
    pub fn extent(&self) -> (f64, f64) {
        (self.max_x - self.min_x, self.max_y - self.min_y)
    }

    pub fn is_degenerate(&self) -> bool {
        let (w, h) = self.extent();
        w <= 0.0 || h <= 0.0
    }

    /// Convert to a `geo` rectangle for polygon operations.
    pub fn to_rect(&self) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::Coord {
                x: self.min_x,
                y: self.min_y,
            },
            geo::Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
    }
}

/// Acquisition metadata attached to every raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    /// Spatial bounds in `crs` units
    pub bounds: BoundingBox,
    pub crs: CoordinateSystem,
    /// Pixel resolution (x, y) in `crs` units
    pub resolution: (f64, f64),
    /// Acquisition timestamp
    pub acquired: DateTime<Utc>,
    /// Scalar scene attributes, e.g. CLOUD_COVER
    pub attributes: HashMap<String, f64>,
}

impl RasterMetadata {
    /// Look up a scalar scene attribute by name.
    pub fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).copied()
    }
}

/// A single multi-band image.
///
/// Bands form an ordered mapping from name to a 2D array; all bands in one
/// raster share an identical shape. Rasters are immutable once built: every
/// transform in the pipeline produces a new `Raster` (or a raster with bands
/// appended) rather than mutating in place.
#[derive(Debug, Clone)]
pub struct Raster {
    bands: Vec<(String, BandData)>,
    pub metadata: RasterMetadata,
}

impl Raster {
    /// Create an empty raster carrying only metadata.
    pub fn new(metadata: RasterMetadata) -> Self {
        Self {
            bands: Vec::new(),
            metadata,
        }
    }

    /// Band array shape shared by all bands, if any band is present.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.bands.first().map(|(_, data)| data.dim())
    }

    /// Ordered band names.
    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Access a band by name.
    pub fn band(&self, name: &str) -> Option<&BandData> {
        self.bands
            .iter()
            .find(|(band_name, _)| band_name == name)
            .map(|(_, data)| data)
    }

    /// Access a band by name, failing with `MissingBand` when absent.
    pub fn require_band(&self, name: &str) -> HabitatResult<&BandData> {
        self.band(name)
            .ok_or_else(|| HabitatError::MissingBand(name.to_string()))
    }

    /// Iterate over `(name, data)` pairs in band order.
    pub fn iter_bands(&self) -> impl Iterator<Item = (&str, &BandData)> {
        self.bands
            .iter()
            .map(|(name, data)| (name.as_str(), data))
    }

    /// Insert a band, replacing an existing band of the same name in place
    /// or appending a new one. Fails when the shape differs from the bands
    /// already present.
    pub fn set_band(&mut self, name: &str, data: BandData) -> HabitatResult<()> {
        if let Some(expected) = self.shape() {
            if data.dim() != expected {
                return Err(HabitatError::ShapeMismatch {
                    expected,
                    found: data.dim(),
                });
            }
        }
        match self
            .bands
            .iter_mut()
            .find(|(band_name, _)| band_name == name)
        {
            Some((_, slot)) => *slot = data,
            None => self.bands.push((name.to_string(), data)),
        }
        Ok(())
    }

    /// Builder-style variant of [`set_band`](Self::set_band).
    pub fn with_band(mut self, name: &str, data: BandData) -> HabitatResult<Self> {
        self.set_band(name, data)?;
        Ok(self)
    }

    /// Produce a new raster by applying `f` to every band, preserving band
    /// order and metadata.
    pub fn map_bands<F>(&self, mut f: F) -> Raster
    where
        F: FnMut(&str, &BandData) -> BandData,
    {
        Raster {
            bands: self
                .bands
                .iter()
                .map(|(name, data)| (name.clone(), f(name, data)))
                .collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Produce a new raster containing only the named bands, in the given
    /// order. Metadata is carried over unchanged.
    pub fn select(&self, names: &[&str]) -> HabitatResult<Raster> {
        let mut selected = Raster::new(self.metadata.clone());
        for name in names {
            let data = self.require_band(name)?.clone();
            selected.set_band(name, data)?;
        }
        Ok(selected)
    }
}

/// Ordered sequence of rasters; insertion order is acquisition order.
#[derive(Debug, Clone, Default)]
pub struct RasterCollection {
    rasters: Vec<Raster>,
}

impl RasterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, raster: Raster) {
        self.rasters.push(raster);
    }

    pub fn len(&self) -> usize {
        self.rasters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rasters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Raster> {
        self.rasters.iter()
    }

    pub fn as_slice(&self) -> &[Raster] {
        &self.rasters
    }

    pub fn first(&self) -> Option<&Raster> {
        self.rasters.first()
    }
}

impl From<Vec<Raster>> for RasterCollection {
    fn from(rasters: Vec<Raster>) -> Self {
        Self { rasters }
    }
}

impl FromIterator<Raster> for RasterCollection {
    fn from_iter<I: IntoIterator<Item = Raster>>(iter: I) -> Self {
        Self {
            rasters: iter.into_iter().collect(),
        }
    }
}

/// Error types for habitat pipeline processing
#[derive(Debug, thiserror::Error)]
pub enum HabitatError {
    #[error("empty collection: filtering produced zero acquisitions")]
    EmptyCollection,

    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("missing band: {0}")]
    MissingBand(String),

    #[error("processing error: {0}")]
    Processing(String),
}

/// Result type for habitat pipeline operations
pub type HabitatResult<T> = Result<T, HabitatError>;
