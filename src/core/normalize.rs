use crate::types::{BandValue, Raster};
use serde::{Deserialize, Serialize};

/// Fixed affine rescaling applied to one band group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactors {
    pub scale: BandValue,
    pub offset: BandValue,
}

impl ScaleFactors {
    pub fn apply(&self, value: BandValue) -> BandValue {
        value * self.scale + self.offset
    }

    /// Inverse affine transform, recovering raw sensor values.
    pub fn invert(&self, value: BandValue) -> BandValue {
        (value - self.offset) / self.scale
    }
}

/// Sensor calibration constants for converting raw digital numbers into
/// physical units. Defaults match Landsat 8 Collection 2 Level-2 products:
/// surface-reflectance bands to reflectance, thermal bands to
/// brightness temperature in Kelvin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Band-name prefix identifying reflectance-bearing optical bands
    pub optical_prefix: String,
    /// Band-name prefix identifying brightness-temperature thermal bands
    pub thermal_prefix: String,
    pub optical: ScaleFactors,
    pub thermal: ScaleFactors,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            optical_prefix: "SR_B".to_string(),
            thermal_prefix: "ST_B".to_string(),
            optical: ScaleFactors {
                scale: 0.000_027_5,
                offset: -0.2,
            },
            thermal: ScaleFactors {
                scale: 0.003_418_02,
                offset: 149.0,
            },
        }
    }
}

/// Band grouping derived from the band name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandGroup {
    Optical,
    Thermal,
    Passthrough,
}

impl CalibrationConfig {
    pub fn classify(&self, band_name: &str) -> BandGroup {
        if band_name.starts_with(&self.optical_prefix) {
            BandGroup::Optical
        } else if band_name.starts_with(&self.thermal_prefix) {
            BandGroup::Thermal
        } else {
            BandGroup::Passthrough
        }
    }
}

/// Radiometric normalizer applying fixed per-band-group affine transforms.
///
/// Output band names equal input band names (in-place replacement
/// semantics). Values are not clamped: negative reflectance or
/// out-of-physical-range temperatures pass through, and downstream
/// components must tolerate them. No-data pixels stay no-data.
pub struct RadiometricNormalizer {
    config: CalibrationConfig,
}

impl RadiometricNormalizer {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Rescale every optical and thermal band of `raster` into physical
    /// units, passing all other bands through unchanged.
    pub fn normalize(&self, raster: &Raster) -> Raster {
        log::debug!(
            "Normalizing {} bands acquired {}",
            raster.band_count(),
            raster.metadata.acquired
        );

        raster.map_bands(|name, data| match self.config.classify(name) {
            BandGroup::Optical => {
                let factors = self.config.optical;
                data.mapv(|v| factors.apply(v))
            }
            BandGroup::Thermal => {
                let factors = self.config.thermal;
                data.mapv(|v| factors.apply(v))
            }
            BandGroup::Passthrough => data.clone(),
        })
    }

    /// Parallel variant rescaling bands with rayon
    #[cfg(feature = "parallel")]
    pub fn normalize_parallel(&self, raster: &Raster) -> Raster {
        use ndarray::Zip;

        log::debug!(
            "Normalizing {} bands in parallel, acquired {}",
            raster.band_count(),
            raster.metadata.acquired
        );

        raster.map_bands(|name, data| match self.config.classify(name) {
            BandGroup::Optical => {
                let factors = self.config.optical;
                Zip::from(data).par_map_collect(|&v| factors.apply(v))
            }
            BandGroup::Thermal => {
                let factors = self.config.thermal;
                Zip::from(data).par_map_collect(|&v| factors.apply(v))
            }
            BandGroup::Passthrough => data.clone(),
        })
    }
}
