/*!
 * Jurisdiction clipping and zonal area aggregation.
 *
 * This is the computational core of the pipeline: restrict a categorical
 * surface to the pixels inside an administrative polygon, then reduce the
 * clipped surface to exact per-class pixel counts.
 *
 * Design points:
 * - The inside/outside rule is pixel-center-inside: a pixel belongs to the
 *   jurisdiction iff its center point lies inside the polygon. Partial
 *   boundary pixels are counted whole or not at all.
 * - The reduction streams the surface in row blocks and accumulates one
 *   histogram per block, merged at the end. A country-sized jurisdiction
 *   never has to fit in memory at once.
 * - Counts are exact integers; areas are a single multiplication away and
 *   therefore deterministic for fixed inputs.
 */

use crate::types::{
    check_window, BoundingBox, CancelToken, CategoricalSurface, ClassBlock, ClassCode,
    GridGeometry, Jurisdiction, LandError, LandResult, PixelWindow, NODATA, UNMAPPED_CLASS,
};
use geo::{Contains, MultiPolygon, Point};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Zonal aggregation parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AggregationParams {
    /// Nominal pixel edge length in meters used for area conversion
    pub pixel_scale_m: f64,
    /// Safety ceiling on the number of pixels a single aggregation may scan
    pub max_pixels: u64,
    /// Rows per streamed block
    pub block_rows: usize,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self {
            pixel_scale_m: 30.0,
            max_pixels: 10_000_000_000_000, // 1e13, a ceiling rather than a real limit
            block_rows: 512,
        }
    }
}

/// Convert an exact pixel count to hectares at the given pixel scale
pub fn area_hectares(pixels: u64, pixel_scale_m: f64) -> f64 {
    pixels as f64 * pixel_scale_m * pixel_scale_m / 10_000.0
}

/// Exact per-value pixel counts of a clipped surface.
///
/// [`NODATA`] pixels (outside the jurisdiction or uncovered by any tile)
/// are tracked but excluded from every class total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonalCounts {
    histogram: Box<[u64; 256]>,
}

impl ZonalCounts {
    pub fn empty() -> Self {
        Self { histogram: Box::new([0u64; 256]) }
    }

    fn add(&mut self, code: ClassCode) {
        self.histogram[code as usize] += 1;
    }

    fn merge(&mut self, other: &ZonalCounts) {
        for (acc, n) in self.histogram.iter_mut().zip(other.histogram.iter()) {
            *acc += n;
        }
    }

    /// Pixels carrying canonical id `id`
    pub fn count_of(&self, id: ClassCode) -> u64 {
        self.histogram[id as usize]
    }

    /// Pixels whose raw code had no canonical mapping
    pub fn unmapped_pixels(&self) -> u64 {
        self.histogram[UNMAPPED_CLASS as usize]
    }

    /// Pixels masked out of the aggregation
    pub fn nodata_pixels(&self) -> u64 {
        self.histogram[NODATA as usize]
    }

    /// All counted (inside-jurisdiction) pixels, the unmapped sentinel
    /// included
    pub fn inside_pixels(&self) -> u64 {
        self.histogram
            .iter()
            .enumerate()
            .filter(|(code, _)| *code != NODATA as usize)
            .map(|(_, n)| n)
            .sum()
    }
}

impl Default for ZonalCounts {
    fn default() -> Self {
        Self::empty()
    }
}

/// Lazy clip of a categorical surface to a jurisdiction polygon.
///
/// The clipped grid is the intersection of the source grid with the
/// jurisdiction bounding box; within it, pixels whose center falls outside
/// the polygon read as [`NODATA`]. An empty intersection yields a 0x0 grid,
/// which downstream aggregation treats as a benign all-zero result.
#[derive(Debug)]
pub struct ClippedSurface<S> {
    inner: S,
    grid: GridGeometry,
    inner_row_off: usize,
    inner_col_off: usize,
    boundary: MultiPolygon<f64>,
    boundary_bbox: Option<BoundingBox>,
}

impl<S: CategoricalSurface> ClippedSurface<S> {
    pub fn new(inner: S, jurisdiction: &Jurisdiction) -> Self {
        let boundary_bbox = jurisdiction.bounding_box();
        let window = boundary_bbox.and_then(|bbox| inner.geometry().window_for_bbox(&bbox));

        let (grid, inner_row_off, inner_col_off) = match window {
            Some(window) => (inner.geometry().subgrid(&window), window.row_off, window.col_off),
            None => {
                let source = inner.geometry();
                log::debug!(
                    "Jurisdiction {}/{} does not intersect the raster extent",
                    jurisdiction.country,
                    jurisdiction.admin1
                );
                (GridGeometry::new(source.top_left_x, source.top_left_y, source.pixel_size, 0, 0), 0, 0)
            }
        };

        Self {
            inner,
            grid,
            inner_row_off,
            inner_col_off,
            boundary: jurisdiction.geometry.clone(),
            boundary_bbox,
        }
    }

    /// Mask every pixel of `block` whose center is outside the boundary
    fn mask_block(&self, window: &PixelWindow, block: &mut ClassBlock) {
        let bbox = match self.boundary_bbox {
            Some(bbox) => bbox,
            None => {
                block.fill(NODATA);
                return;
            }
        };

        for row in 0..window.rows {
            for col in 0..window.cols {
                let (x, y) = self.grid.pixel_center(window.row_off + row, window.col_off + col);
                let inside = bbox.contains_point(x, y) && self.boundary.contains(&Point::new(x, y));
                if !inside {
                    block[[row, col]] = NODATA;
                }
            }
        }
    }
}

impl<S: CategoricalSurface> CategoricalSurface for ClippedSurface<S> {
    fn geometry(&self) -> &GridGeometry {
        &self.grid
    }

    fn read_block(&self, window: &PixelWindow) -> LandResult<ClassBlock> {
        check_window(&self.grid, window)?;
        let inner_window = PixelWindow {
            row_off: self.inner_row_off + window.row_off,
            col_off: self.inner_col_off + window.col_off,
            rows: window.rows,
            cols: window.cols,
        };
        let mut block = self.inner.read_block(&inner_window)?;
        self.mask_block(window, &mut block);
        Ok(block)
    }
}

/// Streaming zonal reduction over a clipped categorical surface
#[derive(Debug, Clone, Copy, Default)]
pub struct ZonalAggregator {
    params: AggregationParams,
}

impl ZonalAggregator {
    pub fn new(params: AggregationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AggregationParams {
        &self.params
    }

    /// Clip `surface` to the jurisdiction and count pixels per class.
    ///
    /// Returns both the clipped surface (for rendering/export collaborators)
    /// and the exact counts.
    pub fn clip_and_count<S: CategoricalSurface>(
        &self,
        surface: S,
        jurisdiction: &Jurisdiction,
        cancel: Option<&CancelToken>,
    ) -> LandResult<(ClippedSurface<S>, ZonalCounts)> {
        let clipped = ClippedSurface::new(surface, jurisdiction);
        let counts = self.aggregate(&clipped, cancel)?;
        if counts.inside_pixels() == 0 {
            log::warn!(
                "No pixels inside jurisdiction {}/{}; reporting zero areas",
                jurisdiction.country,
                jurisdiction.admin1
            );
        }
        Ok((clipped, counts))
    }

    /// Reduce a surface to per-value pixel counts, block by block.
    ///
    /// The pixel budget is checked against the scan window before any block
    /// is read. The cancellation token is polled once per block.
    pub fn aggregate<S: CategoricalSurface>(
        &self,
        surface: &S,
        cancel: Option<&CancelToken>,
    ) -> LandResult<ZonalCounts> {
        let window = surface.geometry().full_window();
        let requested = window.num_pixels();
        if requested > self.params.max_pixels {
            return Err(LandError::PixelBudgetExceeded {
                requested,
                budget: self.params.max_pixels,
            });
        }
        if requested == 0 {
            return Ok(ZonalCounts::empty());
        }

        let blocks = window.split_rows(self.params.block_rows);
        log::info!(
            "Aggregating {} pixels in {} blocks using {} threads",
            requested,
            blocks.len(),
            rayon::current_num_threads()
        );

        let partials: LandResult<Vec<ZonalCounts>> = blocks
            .par_iter()
            .map(|block| {
                if cancel.map(|token| token.is_cancelled()).unwrap_or(false) {
                    return Err(LandError::Cancelled);
                }
                let data = surface.read_block(block)?;
                let mut counts = ZonalCounts::empty();
                for &code in data.iter() {
                    counts.add(code);
                }
                Ok(counts)
            })
            .collect();

        let partials = partials?;
        let mut total = ZonalCounts::empty();
        for partial in &partials {
            total.merge(partial);
        }

        log::debug!(
            "Aggregation complete: {} pixels inside, {} unmapped, {} nodata",
            total.inside_pixels(),
            total.unmapped_pixels(),
            total.nodata_pixels()
        );
        Ok(total)
    }
}
