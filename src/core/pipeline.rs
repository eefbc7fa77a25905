use crate::core::composite::TemporalCompositor;
use crate::core::derive::{DerivedBandCalculator, DerivedBandConfig};
use crate::core::filter::{AttributeFilter, CollectionFilter, ComparisonOp, TimeRange};
use crate::core::mask::{clip_to_boundary, mask_by_class};
use crate::core::normalize::{CalibrationConfig, RadiometricNormalizer};
use crate::io::{ExportParams, ExportSettings};
use crate::types::{BandValue, BoundingBox, HabitatResult, Raster, RasterCollection};
use geo::Polygon;
use serde::{Deserialize, Serialize};

/// The five output products of a habitat-mapping run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Product {
    Dem,
    LandCover,
    VegetationIndex,
    SurfaceTemperature,
    BuiltUp,
}

impl Product {
    pub const ALL: [Product; 5] = [
        Product::Dem,
        Product::LandCover,
        Product::VegetationIndex,
        Product::SurfaceTemperature,
        Product::BuiltUp,
    ];

    /// Output name handed to the exporter.
    pub fn export_name(&self) -> &'static str {
        match self {
            Product::Dem => "DEM_30m",
            Product::LandCover => "ESA_Landcover_30m",
            Product::VegetationIndex => "NDVI_Landsat8_30m",
            Product::SurfaceTemperature => "LST_Landsat8_30m",
            Product::BuiltUp => "builtup_30m",
        }
    }

    /// Export parameters for this product under the shared settings; the
    /// target CRS and resolution are invariant across all five products.
    pub fn export_params(&self, settings: &ExportSettings) -> ExportParams {
        settings.params(self.export_name())
    }
}

/// Land-cover class extraction settings. Defaults follow the ESA WorldCover
/// scheme, where the classification band is named `Map` and built-up areas
/// carry class value 50.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandCoverConfig {
    pub class_band: String,
    pub built_up_class: BandValue,
}

impl Default for LandCoverConfig {
    fn default() -> Self {
        Self {
            class_band: "Map".to_string(),
            built_up_class: 50.0,
        }
    }
}

/// Immutable configuration for a full pipeline run: sensor calibration,
/// derived-band constants, collection filtering, land-cover extraction,
/// and shared export settings. All formula and export constants live here,
/// never inline in the processing code.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub calibration: CalibrationConfig,
    pub derived: DerivedBandConfig,
    pub time_range: TimeRange,
    pub aoi_bounds: BoundingBox,
    pub scene_filter: AttributeFilter,
    pub land_cover: LandCoverConfig,
    pub export: ExportSettings,
}

impl PipelineConfig {
    /// Standard configuration: Landsat 8 calibration and derived-band
    /// constants, scenes limited to cloud cover below one percent.
    pub fn new(time_range: TimeRange, aoi_bounds: BoundingBox) -> Self {
        Self {
            calibration: CalibrationConfig::default(),
            derived: DerivedBandConfig::default(),
            time_range,
            aoi_bounds,
            scene_filter: AttributeFilter::new("CLOUD_COVER", ComparisonOp::Lt, 1.0),
            land_cover: LandCoverConfig::default(),
            export: ExportSettings::default(),
        }
    }
}

/// End-to-end habitat-mapping pipeline.
///
/// Sequences the core stages over an imagery collection: filter by time,
/// AOI, and cloud cover; per scene, normalize radiometry and append the
/// NDVI and LST bands; composite the processed scenes into a per-pixel
/// temporal mean; clip the result to the AOI boundary. Per-scene
/// processing is data-parallel; the compositor is the only
/// synchronization point.
pub struct HabitatPipeline {
    config: PipelineConfig,
    filter: CollectionFilter,
}

impl HabitatPipeline {
    /// Create a pipeline; fails when the configured AOI bounds are
    /// degenerate.
    pub fn new(config: PipelineConfig) -> HabitatResult<Self> {
        let filter = CollectionFilter::new(
            config.time_range,
            config.aoi_bounds,
            config.scene_filter.clone(),
        )?;
        Ok(Self { config, filter })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline, producing the clipped temporal composite
    /// with all source and derived bands.
    pub fn run(
        &self,
        collection: &RasterCollection,
        boundary: &Polygon<f64>,
    ) -> HabitatResult<Raster> {
        log::info!("Starting habitat pipeline over {} acquisitions", collection.len());

        let filtered = self.filter.apply(collection);
        let processed = self.process_scenes(&filtered)?;

        let composite = TemporalCompositor::composite(&processed)?;
        let clipped = clip_to_boundary(&composite, boundary);

        log::info!(
            "Pipeline complete: {} bands over {:?} pixels",
            clipped.band_count(),
            clipped.shape()
        );
        Ok(clipped)
    }

    /// Normalize and derive bands for every filtered scene. Scenes are
    /// independent, so this stage is a parallel map when the `parallel`
    /// feature is enabled.
    fn process_scenes(&self, filtered: &RasterCollection) -> HabitatResult<RasterCollection> {
        let normalizer = RadiometricNormalizer::new(self.config.calibration.clone());
        let calculator = DerivedBandCalculator::new(self.config.derived.clone());

        #[cfg(feature = "parallel")]
        let processed: HabitatResult<Vec<Raster>> = {
            use rayon::prelude::*;
            filtered
                .as_slice()
                .par_iter()
                .map(|scene| Self::process_scene(&normalizer, &calculator, scene))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let processed: HabitatResult<Vec<Raster>> = filtered
            .iter()
            .map(|scene| Self::process_scene(&normalizer, &calculator, scene))
            .collect();

        Ok(processed?.into())
    }

    fn process_scene(
        normalizer: &RadiometricNormalizer,
        calculator: &DerivedBandCalculator,
        scene: &Raster,
    ) -> HabitatResult<Raster> {
        let normalized = normalizer.normalize(scene);
        calculator.add_derived_bands(&normalized)
    }

    /// Single-band vegetation-index product from a pipeline composite.
    pub fn vegetation_index(&self, composite: &Raster) -> HabitatResult<Raster> {
        composite.select(&[&self.config.derived.ndvi_band])
    }

    /// Single-band surface-temperature product from a pipeline composite.
    pub fn surface_temperature(&self, composite: &Raster) -> HabitatResult<Raster> {
        composite.select(&[&self.config.derived.lst_band])
    }

    /// Built-up extraction from a land-cover classification raster.
    pub fn built_up(&self, land_cover: &Raster) -> HabitatResult<Raster> {
        mask_by_class(
            land_cover,
            &self.config.land_cover.class_band,
            self.config.land_cover.built_up_class,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        is_no_data, CoordinateSystem, HabitatError, RasterMetadata,
    };
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use geo::Rect;
    use ndarray::Array2;
    use std::collections::HashMap;

    fn scene(month: u32, cloud_cover: f64, red_dn: f32, nir_dn: f32, thermal_dn: f32) -> Raster {
        let mut attributes = HashMap::new();
        attributes.insert("CLOUD_COVER".to_string(), cloud_cover);
        Raster::new(RasterMetadata {
            bounds: BoundingBox::new(0.0, 120.0, 0.0, 120.0),
            crs: CoordinateSystem::Projected { epsg: 28351 },
            resolution: (30.0, 30.0),
            acquired: Utc.with_ymd_and_hms(2023, month, 10, 0, 0, 0).unwrap(),
            attributes,
        })
        .with_band("SR_B4", Array2::from_elem((4, 4), red_dn))
        .unwrap()
        .with_band("SR_B5", Array2::from_elem((4, 4), nir_dn))
        .unwrap()
        .with_band("ST_B10", Array2::from_elem((4, 4), thermal_dn))
        .unwrap()
    }

    fn aoi_polygon() -> Polygon<f64> {
        Rect::new(
            geo::Coord { x: 0.0, y: 0.0 },
            geo::Coord { x: 120.0, y: 120.0 },
        )
        .to_polygon()
    }

    fn pipeline() -> HabitatPipeline {
        let time_range = TimeRange::new(
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let bounds = BoundingBox::new(0.0, 120.0, 0.0, 120.0);
        HabitatPipeline::new(PipelineConfig::new(time_range, bounds)).unwrap()
    }

    #[test]
    fn test_run_produces_derived_bands() {
        let collection: RasterCollection = vec![
            scene(3, 0.2, 10_000.0, 25_000.0, 44_000.0),
            scene(6, 0.5, 11_000.0, 26_000.0, 44_500.0),
            scene(9, 40.0, 9_000.0, 24_000.0, 43_000.0), // too cloudy, dropped
        ]
        .into();

        let composite = pipeline().run(&collection, &aoi_polygon()).unwrap();

        assert_eq!(
            composite.band_names(),
            vec!["SR_B4", "SR_B5", "ST_B10", "NDVI", "LST"]
        );

        // NDVI of the two retained scenes:
        //   scene 1: red 0.075, nir 0.4875 -> 0.73333
        //   scene 2: red 0.1025, nir 0.515 -> 0.66802
        let ndvi = composite.band("NDVI").unwrap()[[2, 2]];
        assert_relative_eq!(ndvi, (0.733_33 + 0.668_02) / 2.0, epsilon = 1e-3);

        // Surface temperature lands in a physically sensible range
        let lst = composite.band("LST").unwrap()[[2, 2]];
        assert!(lst > 20.0 && lst < 35.0, "lst = {}", lst);
    }

    #[test]
    fn test_run_with_no_matching_scene_is_empty_collection_error() {
        let collection: RasterCollection =
            vec![scene(3, 80.0, 10_000.0, 25_000.0, 44_000.0)].into();

        let result = pipeline().run(&collection, &aoi_polygon());
        assert!(matches!(result, Err(HabitatError::EmptyCollection)));
    }

    #[test]
    fn test_run_clips_to_boundary() {
        let collection: RasterCollection =
            vec![scene(3, 0.2, 10_000.0, 25_000.0, 44_000.0)].into();

        // Boundary covering only the left half of the scene
        let half: Polygon<f64> = Rect::new(
            geo::Coord { x: 0.0, y: 0.0 },
            geo::Coord { x: 60.0, y: 120.0 },
        )
        .to_polygon();

        let composite = pipeline().run(&collection, &half).unwrap();
        let ndvi = composite.band("NDVI").unwrap();

        assert!(!is_no_data(ndvi[[0, 0]]));
        assert!(is_no_data(ndvi[[0, 3]]));
    }

    #[test]
    fn test_product_selection() {
        let collection: RasterCollection =
            vec![scene(3, 0.2, 10_000.0, 25_000.0, 44_000.0)].into();
        let p = pipeline();
        let composite = p.run(&collection, &aoi_polygon()).unwrap();

        let ndvi = p.vegetation_index(&composite).unwrap();
        assert_eq!(ndvi.band_names(), vec!["NDVI"]);

        let lst = p.surface_temperature(&composite).unwrap();
        assert_eq!(lst.band_names(), vec!["LST"]);
    }

    #[test]
    fn test_built_up_extraction() {
        let mut classes = Array2::from_elem((4, 4), 10.0);
        classes[[1, 1]] = 50.0;
        let land_cover = Raster::new(RasterMetadata {
            bounds: BoundingBox::new(0.0, 120.0, 0.0, 120.0),
            crs: CoordinateSystem::Projected { epsg: 28351 },
            resolution: (30.0, 30.0),
            acquired: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            attributes: HashMap::new(),
        })
        .with_band("Map", classes)
        .unwrap();

        let built_up = pipeline().built_up(&land_cover).unwrap();
        let band = built_up.band("Map").unwrap();
        assert_eq!(band[[1, 1]], 50.0);
        assert!(is_no_data(band[[0, 0]]));
    }

    #[test]
    fn test_product_export_names_and_shared_settings() {
        let settings = ExportSettings::default();
        let names: Vec<&str> = Product::ALL.iter().map(|p| p.export_name()).collect();
        assert_eq!(
            names,
            vec![
                "DEM_30m",
                "ESA_Landcover_30m",
                "NDVI_Landsat8_30m",
                "LST_Landsat8_30m",
                "builtup_30m"
            ]
        );

        // CRS and resolution are invariant across every product
        for product in Product::ALL {
            let params = product.export_params(&settings);
            assert_eq!(params.crs, CoordinateSystem::Projected { epsg: 28351 });
            assert_eq!(params.scale, 30.0);
            assert_eq!(params.max_pixels, 10_000_000_000_000);
        }
    }
}
