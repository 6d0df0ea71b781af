//! Core land-cover analysis modules

pub mod assemble;
pub mod mosaic;
pub mod pipeline;
pub mod remap;
pub mod zonal;

// Re-export main types
pub use assemble::{assemble_breakdown, AreaBreakdown, ClassArea};
pub use mosaic::{MosaicSelector, MosaicSurface, SUPPORTED_YEARS};
pub use pipeline::{AnalysisResult, ClippedLandCover, LandCoverPipeline, Selection};
pub use remap::{CodeMap, RemappedSurface};
pub use zonal::{
    area_hectares, AggregationParams, ClippedSurface, ZonalAggregator, ZonalCounts,
};
