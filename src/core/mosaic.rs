//! Year-scoped raster mosaic assembly.
//!
//! All tiles whose acquisition falls in the requested calendar year are
//! combined into one virtual surface covering their union extent. Where
//! tiles overlap, the later tile in collection order overwrites earlier
//! ones pixel-for-pixel; cells no tile covers read as [`NODATA`].
//! The mosaic is never materialized whole: blocks are painted on demand.

use crate::io::tiles::{RasterTile, RasterTileCollection};
use crate::types::{
    check_window, CategoricalSurface, ClassBlock, GridGeometry, LandError, LandResult,
    PixelWindow, NODATA,
};
use ndarray::{s, Array2};
use std::ops::RangeInclusive;

/// Years covered by the land-cover time series
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 2017..=2022;

/// Relative tolerance for pixel-size agreement between tiles
const SCALE_TOLERANCE: f64 = 1e-9;

/// Selects and assembles the tile mosaic for a requested year
#[derive(Debug, Clone, Copy)]
pub struct MosaicSelector<'a> {
    collection: &'a RasterTileCollection,
}

impl<'a> MosaicSelector<'a> {
    pub fn new(collection: &'a RasterTileCollection) -> Self {
        Self { collection }
    }

    /// Build the mosaic surface for `year`.
    ///
    /// A year outside [`SUPPORTED_YEARS`] is a usage error and is never
    /// clamped; an in-range year with no matching tiles fails with
    /// [`LandError::NoTilesForYear`].
    pub fn select_mosaic(&self, year: i32) -> LandResult<MosaicSurface<'a>> {
        if !SUPPORTED_YEARS.contains(&year) {
            return Err(LandError::YearOutOfRange {
                year,
                min: *SUPPORTED_YEARS.start(),
                max: *SUPPORTED_YEARS.end(),
            });
        }

        let tiles = self.collection.tiles_for_year(year);
        if tiles.is_empty() {
            return Err(LandError::NoTilesForYear(year));
        }

        let pixel_size = tiles[0].geometry.pixel_size;
        for tile in &tiles {
            if (tile.geometry.pixel_size - pixel_size).abs() > SCALE_TOLERANCE * pixel_size {
                return Err(LandError::GridMismatch(format!(
                    "tile pixel sizes differ: {} vs {}",
                    tile.geometry.pixel_size, pixel_size
                )));
            }
        }

        let mut bbox = tiles[0].geometry.bounding_box();
        for tile in &tiles[1..] {
            let other = tile.geometry.bounding_box();
            bbox.min_x = bbox.min_x.min(other.min_x);
            bbox.min_y = bbox.min_y.min(other.min_y);
            bbox.max_x = bbox.max_x.max(other.max_x);
            bbox.max_y = bbox.max_y.max(other.max_y);
        }

        let width = (((bbox.max_x - bbox.min_x) / pixel_size) - SCALE_TOLERANCE).ceil() as usize;
        let height = (((bbox.max_y - bbox.min_y) / pixel_size) - SCALE_TOLERANCE).ceil() as usize;
        let grid = GridGeometry::new(bbox.min_x, bbox.max_y, pixel_size, width, height);

        let placements = tiles
            .into_iter()
            .map(|tile| TilePlacement {
                row_off: ((grid.top_left_y - tile.geometry.top_left_y) / pixel_size).round() as i64,
                col_off: ((tile.geometry.top_left_x - grid.top_left_x) / pixel_size).round() as i64,
                tile,
            })
            .collect::<Vec<_>>();

        log::info!(
            "Mosaic for year {}: {} tiles on a {}x{} grid at {}m",
            year,
            placements.len(),
            width,
            height,
            pixel_size
        );

        Ok(MosaicSurface { grid, placements })
    }
}

/// A source tile positioned on the mosaic grid
#[derive(Debug, Clone, Copy)]
struct TilePlacement<'a> {
    tile: &'a RasterTile,
    row_off: i64,
    col_off: i64,
}

/// Virtual mosaic over the tiles of one year.
///
/// Holds references into the externally-owned tile collection; no pixel
/// data is copied until a block is read.
#[derive(Debug, Clone)]
pub struct MosaicSurface<'a> {
    grid: GridGeometry,
    placements: Vec<TilePlacement<'a>>,
}

impl MosaicSurface<'_> {
    pub fn tile_count(&self) -> usize {
        self.placements.len()
    }
}

impl CategoricalSurface for MosaicSurface<'_> {
    fn geometry(&self) -> &GridGeometry {
        &self.grid
    }

    fn read_block(&self, window: &PixelWindow) -> LandResult<ClassBlock> {
        check_window(&self.grid, window)?;

        let mut out = Array2::from_elem((window.rows, window.cols), NODATA);
        let win_r0 = window.row_off as i64;
        let win_r1 = win_r0 + window.rows as i64;
        let win_c0 = window.col_off as i64;
        let win_c1 = win_c0 + window.cols as i64;

        // paint in collection order; later tiles overwrite earlier ones
        for placement in &self.placements {
            let (tile_rows, tile_cols) = placement.tile.data.dim();
            let r0 = win_r0.max(placement.row_off);
            let r1 = win_r1.min(placement.row_off + tile_rows as i64);
            let c0 = win_c0.max(placement.col_off);
            let c1 = win_c1.min(placement.col_off + tile_cols as i64);
            if r0 >= r1 || c0 >= c1 {
                continue;
            }

            let src = placement.tile.data.slice(s![
                (r0 - placement.row_off) as usize..(r1 - placement.row_off) as usize,
                (c0 - placement.col_off) as usize..(c1 - placement.col_off) as usize
            ]);
            out.slice_mut(s![
                (r0 - win_r0) as usize..(r1 - win_r0) as usize,
                (c0 - win_c0) as usize..(c1 - win_c0) as usize
            ])
            .assign(&src);
        }

        Ok(out)
    }
}
