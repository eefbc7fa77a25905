//! habmap: A Fast, Modular Habitat-Mapping Raster Pipeline
//!
//! This library computes derived environmental indicators (vegetation index
//! and emissivity-corrected land-surface temperature) from time series of
//! multi-band satellite imagery, composites them over time, and restricts
//! output to an area of interest — reproducible habitat-mapping layers at a
//! fixed spatial resolution.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    is_no_data, BandData, BandValue, BoundingBox, CoordinateSystem, HabitatError,
    HabitatResult, Raster, RasterCollection, RasterMetadata, NO_DATA,
};

pub use crate::core::{
    clip_to_boundary, mask_by_class, AttributeFilter, CalibrationConfig, CollectionFilter,
    ComparisonOp, DerivedBandCalculator, DerivedBandConfig, HabitatPipeline, PipelineConfig,
    Product, RadiometricNormalizer, TemporalCompositor, TimeRange,
};

pub use io::{BoundaryProvider, Exporter, ExportParams, ExportSettings, RasterSource};
