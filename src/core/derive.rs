use crate::types::{BandValue, HabitatResult, Raster, NO_DATA};
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Band names and empirical constants for the derived-band formulas.
///
/// Defaults follow Landsat 8 Collection 2 Level-2 band naming (NIR = SR_B5,
/// red = SR_B4, thermal = ST_B10) and the usual single-channel LST
/// parameterization: NDVI endpoints for bare soil and full vegetation,
/// the emissivity ramp, and the Planck-law constants of the thermal band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedBandConfig {
    pub nir_band: String,
    pub red_band: String,
    pub thermal_band: String,
    /// Output name of the vegetation index band
    pub ndvi_band: String,
    /// Output name of the surface-temperature band
    pub lst_band: String,
    /// NDVI of bare soil (fractional vegetation endpoint)
    pub ndvi_soil: BandValue,
    /// NDVI of full vegetation cover
    pub ndvi_vegetation: BandValue,
    pub emissivity_scale: BandValue,
    pub emissivity_offset: BandValue,
    /// Effective thermal wavelength term of the LST correction
    pub thermal_wavelength: BandValue,
    /// Second radiation constant term of the LST correction
    pub radiation_constant: BandValue,
    /// Kelvin-to-Celsius offset applied to the final temperature
    pub kelvin_offset: BandValue,
}

impl Default for DerivedBandConfig {
    fn default() -> Self {
        Self {
            nir_band: "SR_B5".to_string(),
            red_band: "SR_B4".to_string(),
            thermal_band: "ST_B10".to_string(),
            ndvi_band: "NDVI".to_string(),
            lst_band: "LST".to_string(),
            ndvi_soil: 0.2,
            ndvi_vegetation: 0.86,
            emissivity_scale: 0.004,
            emissivity_offset: 0.986,
            thermal_wavelength: 0.001_15,
            radiation_constant: 1.438,
            kelvin_offset: 273.15,
        }
    }
}

/// Derived-band calculator computing the vegetation index and the
/// emissivity-corrected land-surface temperature from normalized bands.
///
/// Both derived bands are appended to the raster; input bands are retained
/// unchanged. The LST formula reads the NDVI band, so
/// [`add_ndvi`](Self::add_ndvi) must run first (or use
/// [`add_derived_bands`](Self::add_derived_bands)).
pub struct DerivedBandCalculator {
    config: DerivedBandConfig,
}

impl DerivedBandCalculator {
    pub fn new(config: DerivedBandConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DerivedBandConfig {
        &self.config
    }

    /// Append both derived bands in sequence: NDVI, then LST.
    pub fn add_derived_bands(&self, raster: &Raster) -> HabitatResult<Raster> {
        let with_ndvi = self.add_ndvi(raster)?;
        self.add_lst(&with_ndvi)
    }

    /// Append the normalized-difference vegetation index computed from the
    /// NIR and red reflectance bands. A zero denominator marks the pixel
    /// no-data rather than failing the run.
    pub fn add_ndvi(&self, raster: &Raster) -> HabitatResult<Raster> {
        let nir = raster.require_band(&self.config.nir_band)?;
        let red = raster.require_band(&self.config.red_band)?;

        log::debug!(
            "Computing {} from {}/{}",
            self.config.ndvi_band,
            self.config.nir_band,
            self.config.red_band
        );

        let ndvi = Zip::from(nir).and(red).map_collect(|&n, &r| {
            let sum = n + r;
            if sum == 0.0 {
                NO_DATA
            } else {
                (n - r) / sum
            }
        });

        raster.clone().with_band(&self.config.ndvi_band, ndvi)
    }

    /// Append the land-surface temperature in Celsius, derived from the
    /// thermal brightness temperature and the NDVI-based emissivity
    /// estimate. Non-positive emissivity marks the pixel no-data.
    pub fn add_lst(&self, raster: &Raster) -> HabitatResult<Raster> {
        let tb = raster.require_band(&self.config.thermal_band)?;
        let ndvi = raster.require_band(&self.config.ndvi_band)?;

        log::debug!(
            "Computing {} from {}/{}",
            self.config.lst_band,
            self.config.thermal_band,
            self.config.ndvi_band
        );

        let lst = Zip::from(tb)
            .and(ndvi)
            .map_collect(|&tb, &ndvi| self.lst_pixel(tb, ndvi));

        raster.clone().with_band(&self.config.lst_band, lst)
    }

    /// Fractional vegetation cover from NDVI.
    ///
    /// Deliberately unclamped: NDVI outside the [soil, vegetation] interval
    /// yields pv outside [0, 1], matching the established formulation.
    pub fn fractional_vegetation(&self, ndvi: BandValue) -> BandValue {
        let scaled = (ndvi - self.config.ndvi_soil)
            / (self.config.ndvi_vegetation - self.config.ndvi_soil);
        scaled * scaled
    }

    /// Surface emissivity from fractional vegetation cover.
    pub fn emissivity(&self, pv: BandValue) -> BandValue {
        pv * self.config.emissivity_scale + self.config.emissivity_offset
    }

    fn lst_pixel(&self, tb: BandValue, ndvi: BandValue) -> BandValue {
        let epsilon = self.emissivity(self.fractional_vegetation(ndvi));
        if epsilon <= 0.0 {
            // ln is undefined here; surface as no-data, never as an error
            return NO_DATA;
        }
        let correction =
            self.config.thermal_wavelength * (tb / self.config.radiation_constant);
        tb / (1.0 + correction * epsilon.ln()) - self.config.kelvin_offset
    }
}
