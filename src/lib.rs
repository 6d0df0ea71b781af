//! landzone: A Fast, Modular Land-Cover Zonal Statistics Engine
//!
//! This library turns a multi-year global land-cover classification time
//! series and an administrative boundary dataset into per-jurisdiction
//! area summaries: select the raster tiles of a year, mosaic them, remap
//! the raw classifier codes onto the canonical class legend, clip to the
//! jurisdiction polygon and reduce the result to exact per-class areas.
//!
//! ```no_run
//! use landzone::{BoundarySource, LandCoverPipeline, RasterTileCollection, Selection};
//!
//! # fn main() -> landzone::LandResult<()> {
//! let boundaries = BoundarySource::from_geojson("...")?;
//! let tiles = RasterTileCollection::default();
//! let pipeline = LandCoverPipeline::new(&boundaries, &tiles);
//! let result = pipeline.analyze(&Selection::new("Kenya", "Nairobi", 2020), None)?;
//! for (name, hectares) in result.breakdown.rows() {
//!     println!("{}: {} ha", name, hectares);
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod io;
pub mod legend;
pub mod types;

// Re-export main types and functions for easier access
pub use core::{
    area_hectares, assemble_breakdown, AggregationParams, AnalysisResult, AreaBreakdown,
    ClassArea, ClippedLandCover, ClippedSurface, CodeMap, LandCoverPipeline, MosaicSelector,
    MosaicSurface, RemappedSurface, Selection, ZonalAggregator, ZonalCounts, SUPPORTED_YEARS,
};
pub use io::{BoundaryFeature, BoundarySource, RasterTile, RasterTileCollection};
pub use legend::{ClassLegend, LegendEntry, Rgb};
pub use types::{
    BoundingBox, CancelToken, CategoricalSurface, ClassCode, GridGeometry, GridSurface,
    Jurisdiction, LandError, LandResult, PixelWindow, NODATA, UNMAPPED_CLASS,
};
