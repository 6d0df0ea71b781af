//! Reference data sources: administrative boundaries and raster tiles

pub mod boundary;
pub mod tiles;

pub use boundary::{BoundaryFeature, BoundarySource};
pub use tiles::{RasterTile, RasterTileCollection};
