use crate::types::{
    BoundingBox, HabitatError, HabitatResult, Raster, RasterCollection,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed-open acquisition time interval: `start <= t < end`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a time range; fails when `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> HabitatResult<Self> {
        if start > end {
            return Err(HabitatError::Processing(format!(
                "invalid time range: {} > {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

/// Comparison operators for scalar attribute predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl ComparisonOp {
    fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOp::Lt => value < threshold,
            ComparisonOp::Le => value <= threshold,
            ComparisonOp::Gt => value > threshold,
            ComparisonOp::Ge => value >= threshold,
            ComparisonOp::Eq => value == threshold,
        }
    }
}

/// Scalar metadata predicate, e.g. `CLOUD_COVER < 1.0`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub name: String,
    pub op: ComparisonOp,
    pub threshold: f64,
}

impl AttributeFilter {
    pub fn new(name: &str, op: ComparisonOp, threshold: f64) -> Self {
        Self {
            name: name.to_string(),
            op,
            threshold,
        }
    }

    /// Evaluate the predicate against a raster's scene attributes.
    ///
    /// A raster that does not carry the attribute at all is not retained.
    pub fn matches(&self, raster: &Raster) -> bool {
        match raster.metadata.attribute(&self.name) {
            Some(value) => self.op.compare(value, self.threshold),
            None => {
                log::warn!(
                    "Raster acquired {} has no attribute '{}'; dropping from collection",
                    raster.metadata.acquired,
                    self.name
                );
                false
            }
        }
    }
}

/// Collection filter combining acquisition time, spatial intersection with
/// the area of interest, and a scalar attribute predicate. A raster is
/// retained iff all three sub-conditions hold.
#[derive(Debug, Clone)]
pub struct CollectionFilter {
    time_range: TimeRange,
    aoi_bounds: BoundingBox,
    attribute: AttributeFilter,
}

impl CollectionFilter {
    /// Create a filter; fails when the AOI box is degenerate.
    pub fn new(
        time_range: TimeRange,
        aoi_bounds: BoundingBox,
        attribute: AttributeFilter,
    ) -> HabitatResult<Self> {
        if aoi_bounds.is_degenerate() {
            return Err(HabitatError::Processing(format!(
                "degenerate AOI bounds: {:?}",
                aoi_bounds
            )));
        }
        Ok(Self {
            time_range,
            aoi_bounds,
            attribute,
        })
    }

    /// Select the sub-sequence of acquisitions matching every condition,
    /// preserving the original order. An empty result is valid; the
    /// compositor is responsible for rejecting it.
    pub fn apply(&self, collection: &RasterCollection) -> RasterCollection {
        log::info!(
            "Filtering {} acquisitions: [{}, {}), {} {:?} {}",
            collection.len(),
            self.time_range.start,
            self.time_range.end,
            self.attribute.name,
            self.attribute.op,
            self.attribute.threshold
        );

        let filtered: RasterCollection = collection
            .iter()
            .filter(|raster| self.retains(raster))
            .cloned()
            .collect();

        log::info!(
            "Filter retained {} of {} acquisitions",
            filtered.len(),
            collection.len()
        );

        filtered
    }

    fn retains(&self, raster: &Raster) -> bool {
        self.time_range.contains(raster.metadata.acquired)
            && raster.metadata.bounds.intersects(&self.aoi_bounds)
            && self.attribute.matches(raster)
    }
}
