use crate::types::{
    is_no_data, BandData, HabitatError, HabitatResult, Raster, RasterCollection, NO_DATA,
};
use ndarray::Array2;

/// Temporal compositor reducing a processed collection into a single
/// representative raster via the per-pixel arithmetic mean.
///
/// Only bands present in every member raster are composited. A pixel
/// marked no-data in one image is excluded from the mean at that pixel;
/// if every image is no-data there, the output pixel is no-data.
/// Accumulation is left-to-right in f64 so the result is reproducible
/// across platforms.
pub struct TemporalCompositor;

impl TemporalCompositor {
    /// Compute the per-pixel mean across the collection, band by band.
    ///
    /// Fails with `EmptyCollection` for an empty input and `ShapeMismatch`
    /// when a member raster disagrees on shape, CRS, or resolution; either
    /// indicates an upstream filtering or source bug.
    pub fn composite(collection: &RasterCollection) -> HabitatResult<Raster> {
        let first = collection.first().ok_or(HabitatError::EmptyCollection)?;
        let shape = first.shape().ok_or_else(|| {
            HabitatError::Processing("cannot composite rasters without bands".to_string())
        })?;

        Self::check_grid_consistency(collection, first, shape)?;
        let common_bands = Self::common_bands(collection, first);

        log::info!(
            "Compositing {} acquisitions over {} shared bands",
            collection.len(),
            common_bands.len()
        );

        let mut composite = Raster::new(first.metadata.clone());
        composite.metadata.attributes.clear();

        for band_name in &common_bands {
            let mean = Self::mean_band(collection, band_name, shape);
            composite.set_band(band_name, mean)?;
        }

        Ok(composite)
    }

    fn check_grid_consistency(
        collection: &RasterCollection,
        first: &Raster,
        shape: (usize, usize),
    ) -> HabitatResult<()> {
        for raster in collection.iter() {
            let found = raster.shape().unwrap_or((0, 0));
            if found != shape {
                return Err(HabitatError::ShapeMismatch {
                    expected: shape,
                    found,
                });
            }
            if raster.metadata.crs != first.metadata.crs
                || raster.metadata.resolution != first.metadata.resolution
            {
                return Err(HabitatError::Processing(format!(
                    "grid mismatch: {} @ {:?} vs {} @ {:?}",
                    raster.metadata.crs,
                    raster.metadata.resolution,
                    first.metadata.crs,
                    first.metadata.resolution
                )));
            }
        }
        Ok(())
    }

    /// Bands present in every member, in first-member order.
    fn common_bands(collection: &RasterCollection, first: &Raster) -> Vec<String> {
        first
            .band_names()
            .into_iter()
            .filter(|name| collection.iter().all(|raster| raster.band(name).is_some()))
            .map(|name| name.to_string())
            .collect()
    }

    fn mean_band(
        collection: &RasterCollection,
        band_name: &str,
        shape: (usize, usize),
    ) -> BandData {
        let mut sum = Array2::<f64>::zeros(shape);
        let mut count = Array2::<u32>::zeros(shape);

        // Left-to-right accumulation keeps floating-point rounding
        // deterministic for a given input order
        for raster in collection.iter() {
            let Some(band) = raster.band(band_name) else {
                continue;
            };
            for ((i, j), &value) in band.indexed_iter() {
                if !is_no_data(value) {
                    sum[[i, j]] += value as f64;
                    count[[i, j]] += 1;
                }
            }
        }

        Array2::from_shape_fn(shape, |(i, j)| {
            let n = count[[i, j]];
            if n == 0 {
                NO_DATA
            } else {
                (sum[[i, j]] / n as f64) as f32
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        is_no_data, BoundingBox, CoordinateSystem, RasterMetadata,
    };
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use ndarray::{array, Array2};
    use std::collections::HashMap;

    fn metadata(epsg: u32) -> RasterMetadata {
        RasterMetadata {
            bounds: BoundingBox::new(0.0, 60.0, 0.0, 60.0),
            crs: CoordinateSystem::Projected { epsg },
            resolution: (30.0, 30.0),
            acquired: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
            attributes: HashMap::new(),
        }
    }

    fn raster(ndvi: BandData) -> Raster {
        Raster::new(metadata(28351))
            .with_band("NDVI", ndvi)
            .unwrap()
    }

    #[test]
    fn test_empty_collection_is_rejected() {
        let result = TemporalCompositor::composite(&RasterCollection::new());
        assert!(matches!(result, Err(HabitatError::EmptyCollection)));
    }

    #[test]
    fn test_singleton_composite_returns_bands_unchanged() {
        let data = array![[0.1_f32, 0.2], [0.3, 0.4]];
        let collection: RasterCollection = vec![raster(data.clone())].into();

        let composite = TemporalCompositor::composite(&collection).unwrap();
        let band = composite.band("NDVI").unwrap();
        for (&a, &b) in band.iter().zip(data.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_identical_members_average_to_input() {
        let data = array![[0.25_f32, 0.5], [0.75, 1.0]];
        let collection: RasterCollection = vec![
            raster(data.clone()),
            raster(data.clone()),
            raster(data.clone()),
        ]
        .into();

        let composite = TemporalCompositor::composite(&collection).unwrap();
        let band = composite.band("NDVI").unwrap();
        for (&a, &b) in band.iter().zip(data.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_mean_across_members() {
        let collection: RasterCollection = vec![
            raster(array![[0.0_f32, 0.2], [0.4, 0.8]]),
            raster(array![[0.2_f32, 0.4], [0.6, 0.2]]),
        ]
        .into();

        let composite = TemporalCompositor::composite(&collection).unwrap();
        let band = composite.band("NDVI").unwrap();
        assert_relative_eq!(band[[0, 0]], 0.1, epsilon = 1e-6);
        assert_relative_eq!(band[[0, 1]], 0.3, epsilon = 1e-6);
        assert_relative_eq!(band[[1, 0]], 0.5, epsilon = 1e-6);
        assert_relative_eq!(band[[1, 1]], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_no_data_excluded_from_mean() {
        let collection: RasterCollection = vec![
            raster(array![[f32::NAN, 0.2], [f32::NAN, 0.4]]),
            raster(array![[0.6_f32, 0.4], [f32::NAN, 0.8]]),
        ]
        .into();

        let composite = TemporalCompositor::composite(&collection).unwrap();
        let band = composite.band("NDVI").unwrap();

        // Only the second image contributes at [0, 0]
        assert_relative_eq!(band[[0, 0]], 0.6, epsilon = 1e-6);
        // Both contribute at [0, 1]
        assert_relative_eq!(band[[0, 1]], 0.3, epsilon = 1e-6);
        // All members no-data: output no-data
        assert!(is_no_data(band[[1, 0]]));
        assert_relative_eq!(band[[1, 1]], 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_only_shared_bands_composited() {
        let a = raster(array![[0.1_f32, 0.1], [0.1, 0.1]])
            .with_band("LST", Array2::from_elem((2, 2), 30.0))
            .unwrap();
        let b = raster(array![[0.3_f32, 0.3], [0.3, 0.3]]);
        let collection: RasterCollection = vec![a, b].into();

        let composite = TemporalCompositor::composite(&collection).unwrap();
        assert_eq!(composite.band_names(), vec!["NDVI"]);
        assert!(composite.band("LST").is_none());
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let a = raster(Array2::from_elem((2, 2), 0.1));
        let b = raster(Array2::from_elem((3, 3), 0.1));
        let collection: RasterCollection = vec![a, b].into();

        assert!(matches!(
            TemporalCompositor::composite(&collection),
            Err(HabitatError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_crs_mismatch_is_fatal() {
        let a = raster(Array2::from_elem((2, 2), 0.1));
        let mut b = raster(Array2::from_elem((2, 2), 0.1));
        b.metadata.crs = CoordinateSystem::Projected { epsg: 32755 };
        let collection: RasterCollection = vec![a, b].into();

        assert!(TemporalCompositor::composite(&collection).is_err());
    }

    #[test]
    fn test_composite_metadata_from_first_member() {
        let mut a = raster(Array2::from_elem((2, 2), 0.1));
        a.metadata
            .attributes
            .insert("CLOUD_COVER".to_string(), 0.3);
        let collection: RasterCollection = vec![a].into();

        let composite = TemporalCompositor::composite(&collection).unwrap();
        assert_eq!(
            composite.metadata.acquired,
            Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
        );
        // Scene attributes do not survive compositing
        assert!(composite.metadata.attributes.is_empty());
    }
}
