//! External interface boundaries: raster sourcing, AOI provisioning, and
//! product export. The core pipeline treats all three as opaque
//! collaborators; implementations live outside this crate.

use crate::types::{CoordinateSystem, HabitatResult, Raster, RasterCollection};
use geo::Polygon;
use serde::{Deserialize, Serialize};

/// Export settings shared by every output product of a run. The target CRS
/// and pixel resolution are fixed for the whole product set, so they are
/// configured once here rather than per export call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Destination folder handed to the exporter
    pub folder: String,
    pub crs: CoordinateSystem,
    /// Output pixel resolution in CRS units
    pub scale: f64,
    /// Maximum-pixel-count ceiling accepted by the exporter
    pub max_pixels: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            folder: "habitat".to_string(),
            crs: CoordinateSystem::Projected { epsg: 28351 },
            scale: 30.0,
            max_pixels: 10_000_000_000_000,
        }
    }
}

impl ExportSettings {
    /// Per-product export parameters under these shared settings.
    pub fn params(&self, name: &str) -> ExportParams {
        ExportParams {
            name: name.to_string(),
            folder: self.folder.clone(),
            crs: self.crs,
            scale: self.scale,
            max_pixels: self.max_pixels,
        }
    }
}

/// Parameters accompanying one exported raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportParams {
    pub name: String,
    pub folder: String,
    pub crs: CoordinateSystem,
    pub scale: f64,
    pub max_pixels: u64,
}

/// Supplies a raster collection for a source identifier (e.g. an imagery
/// archive path or catalog id), including per-acquisition metadata.
pub trait RasterSource {
    fn load_collection(&self, source_id: &str) -> HabitatResult<RasterCollection>;
}

/// Supplies the area-of-interest polygon used for filtering and clipping.
pub trait BoundaryProvider {
    fn area_of_interest(&self) -> HabitatResult<Polygon<f64>>;
}

/// Persists a finished raster. The pipeline only emits a raster plus
/// export parameters; how persistence happens is not its concern.
pub trait Exporter {
    fn export(&self, raster: &Raster, params: &ExportParams) -> HabitatResult<()>;
}
