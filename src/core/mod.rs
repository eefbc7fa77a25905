//! Core habitat-mapping processing modules

pub mod composite;
pub mod derive;
pub mod filter;
pub mod mask;
pub mod normalize;
pub mod pipeline;

// Re-export main types
pub use composite::TemporalCompositor;
pub use derive::{DerivedBandCalculator, DerivedBandConfig};
pub use filter::{AttributeFilter, CollectionFilter, ComparisonOp, TimeRange};
pub use mask::{clip_to_boundary, mask_by_class};
pub use normalize::{BandGroup, CalibrationConfig, RadiometricNormalizer, ScaleFactors};
pub use pipeline::{HabitatPipeline, LandCoverConfig, PipelineConfig, Product};
