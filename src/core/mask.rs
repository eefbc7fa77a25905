use crate::types::{BandValue, HabitatResult, Raster, NO_DATA};
use geo::{Contains, Point, Polygon};
use ndarray::{Array2, Zip};

/// Retain only pixels where `band` equals `class_value`, marking every
/// other pixel no-data in all bands. Used to extract a single land-cover
/// class (e.g. built-up areas) from a classification raster.
pub fn mask_by_class(
    raster: &Raster,
    band: &str,
    class_value: BandValue,
) -> HabitatResult<Raster> {
    let class_band = raster.require_band(band)?;
    let keep = class_band.mapv(|v| v == class_value);

    let retained = keep.iter().filter(|&&k| k).count();
    log::debug!(
        "Class mask {} == {}: {} of {} pixels retained",
        band,
        class_value,
        retained,
        keep.len()
    );

    Ok(apply_mask(raster, &keep))
}

/// Restrict all bands to pixels whose centers fall inside `boundary`,
/// marking exterior pixels no-data. Pixel centers are derived from the
/// raster bounds and resolution, row 0 at the top edge.
pub fn clip_to_boundary(raster: &Raster, boundary: &Polygon<f64>) -> Raster {
    let Some((rows, cols)) = raster.shape() else {
        return raster.clone();
    };

    let bounds = raster.metadata.bounds;
    let (res_x, res_y) = raster.metadata.resolution;

    let keep = Array2::from_shape_fn((rows, cols), |(i, j)| {
        let x = bounds.min_x + (j as f64 + 0.5) * res_x;
        let y = bounds.max_y - (i as f64 + 0.5) * res_y;
        boundary.contains(&Point::new(x, y))
    });

    let retained = keep.iter().filter(|&&k| k).count();
    log::debug!(
        "Boundary clip: {} of {} pixels inside AOI",
        retained,
        rows * cols
    );

    apply_mask(raster, &keep)
}

fn apply_mask(raster: &Raster, keep: &Array2<bool>) -> Raster {
    raster.map_bands(|_, data| {
        Zip::from(data)
            .and(keep)
            .map_collect(|&value, &inside| if inside { value } else { NO_DATA })
    })
}
