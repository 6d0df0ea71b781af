use geo::{BoundingRect, MultiPolygon, Rect};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Categorical pixel value: a raw classifier code or a canonical class id
pub type ClassCode = u8;

/// Sentinel canonical id for raw codes the code map does not define
pub const UNMAPPED_CLASS: ClassCode = 0;

/// Nodata value: outside the jurisdiction, or not covered by any tile
pub const NODATA: ClassCode = 255;

/// 2D categorical raster block (rows x cols)
pub type ClassBlock = Array2<ClassCode>;

/// Geospatial bounding box in map units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Intersection of two boxes, or `None` if they are disjoint
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x);
        let max_y = self.max_y.min(other.max_y);
        if min_x < max_x && min_y < max_y {
            Some(BoundingBox { min_x, min_y, max_x, max_y })
        } else {
            None
        }
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        BoundingBox {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        }
    }
}

/// North-up raster grid geometry with square pixels.
///
/// `top_left_x`/`top_left_y` anchor the outer corner of pixel (0, 0);
/// x grows with columns, y shrinks with rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub top_left_x: f64,
    pub top_left_y: f64,
    /// Pixel edge length in map units (meters for the land-cover grids)
    pub pixel_size: f64,
    pub width: usize,
    pub height: usize,
}

impl GridGeometry {
    pub fn new(top_left_x: f64, top_left_y: f64, pixel_size: f64, width: usize, height: usize) -> Self {
        Self { top_left_x, top_left_y, pixel_size, width, height }
    }

    /// Map coordinates of the center of pixel (row, col)
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        let x = self.top_left_x + (col as f64 + 0.5) * self.pixel_size;
        let y = self.top_left_y - (row as f64 + 0.5) * self.pixel_size;
        (x, y)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            min_x: self.top_left_x,
            min_y: self.top_left_y - self.height as f64 * self.pixel_size,
            max_x: self.top_left_x + self.width as f64 * self.pixel_size,
            max_y: self.top_left_y,
        }
    }

    pub fn num_pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Smallest pixel window covering `bbox`, clamped to the grid extent.
    ///
    /// Returns `None` when the box and the grid do not overlap.
    pub fn window_for_bbox(&self, bbox: &BoundingBox) -> Option<PixelWindow> {
        let clipped = self.bounding_box().intersection(bbox)?;

        let col_start = ((clipped.min_x - self.top_left_x) / self.pixel_size).floor().max(0.0) as usize;
        let col_end = (((clipped.max_x - self.top_left_x) / self.pixel_size).ceil() as usize).min(self.width);
        let row_start = ((self.top_left_y - clipped.max_y) / self.pixel_size).floor().max(0.0) as usize;
        let row_end = (((self.top_left_y - clipped.min_y) / self.pixel_size).ceil() as usize).min(self.height);

        if col_start >= col_end || row_start >= row_end {
            return None;
        }

        Some(PixelWindow {
            row_off: row_start,
            col_off: col_start,
            rows: row_end - row_start,
            cols: col_end - col_start,
        })
    }

    /// Sub-grid geometry covering `window`
    pub fn subgrid(&self, window: &PixelWindow) -> GridGeometry {
        GridGeometry {
            top_left_x: self.top_left_x + window.col_off as f64 * self.pixel_size,
            top_left_y: self.top_left_y - window.row_off as f64 * self.pixel_size,
            pixel_size: self.pixel_size,
            width: window.cols,
            height: window.rows,
        }
    }

    /// Full-extent window for this grid
    pub fn full_window(&self) -> PixelWindow {
        PixelWindow { row_off: 0, col_off: 0, rows: self.height, cols: self.width }
    }
}

/// Rectangular sub-region of a raster grid, in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelWindow {
    pub row_off: usize,
    pub col_off: usize,
    pub rows: usize,
    pub cols: usize,
}

impl PixelWindow {
    pub fn num_pixels(&self) -> u64 {
        self.rows as u64 * self.cols as u64
    }

    /// Split into horizontal bands of at most `block_rows` rows each
    pub fn split_rows(&self, block_rows: usize) -> Vec<PixelWindow> {
        let step = block_rows.max(1);
        (0..self.rows)
            .step_by(step)
            .map(|r| PixelWindow {
                row_off: self.row_off + r,
                col_off: self.col_off,
                rows: step.min(self.rows - r),
                cols: self.cols,
            })
            .collect()
    }
}

/// Read-only categorical raster surface, streamed block by block.
///
/// Surfaces are cheap views: mosaics, remaps and clips all implement this
/// trait lazily, so a country-sized raster is never materialized whole.
pub trait CategoricalSurface: Send + Sync {
    /// Grid geometry of the full surface
    fn geometry(&self) -> &GridGeometry;

    /// Materialize the pixels of `window` (must lie within the grid extent)
    fn read_block(&self, window: &PixelWindow) -> LandResult<ClassBlock>;

    /// Materialize the whole surface. Intended for small rasters and tests.
    fn read_full(&self) -> LandResult<ClassBlock> {
        self.read_block(&self.geometry().full_window())
    }
}

/// In-memory categorical surface backed by a single array
#[derive(Debug, Clone)]
pub struct GridSurface {
    geometry: GridGeometry,
    data: ClassBlock,
}

impl GridSurface {
    pub fn new(geometry: GridGeometry, data: ClassBlock) -> LandResult<Self> {
        let (rows, cols) = data.dim();
        if rows != geometry.height || cols != geometry.width {
            return Err(LandError::GridMismatch(format!(
                "array is {}x{} but grid geometry is {}x{}",
                rows, cols, geometry.height, geometry.width
            )));
        }
        Ok(Self { geometry, data })
    }
}

impl CategoricalSurface for GridSurface {
    fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    fn read_block(&self, window: &PixelWindow) -> LandResult<ClassBlock> {
        check_window(&self.geometry, window)?;
        let view = self.data.slice(ndarray::s![
            window.row_off..window.row_off + window.rows,
            window.col_off..window.col_off + window.cols
        ]);
        Ok(view.to_owned())
    }
}

/// Validate that `window` lies inside `grid`
pub(crate) fn check_window(grid: &GridGeometry, window: &PixelWindow) -> LandResult<()> {
    if window.row_off + window.rows > grid.height || window.col_off + window.cols > grid.width {
        return Err(LandError::GridMismatch(format!(
            "window {:?} exceeds grid extent {}x{}",
            window, grid.height, grid.width
        )));
    }
    Ok(())
}

/// Administrative polygon used to clip and scope the analysis
#[derive(Debug, Clone)]
pub struct Jurisdiction {
    pub country: String,
    pub admin1: String,
    pub geometry: MultiPolygon<f64>,
}

impl Jurisdiction {
    /// Bounding box of the boundary geometry, or `None` if it is empty
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.geometry.bounding_rect().map(BoundingBox::from)
    }
}

/// Cooperative cancellation flag shared between a caller and an in-flight
/// analysis. Checked between raster blocks, so cancellation latency is at
/// most one block of work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Error types for land-cover analysis
#[derive(Debug, thiserror::Error)]
pub enum LandError {
    #[error("selection is incomplete: {0}")]
    EmptySelection(String),

    #[error("no boundary found for country '{country}', admin1 '{admin1}'")]
    BoundaryNotFound { country: String, admin1: String },

    #[error("boundary lookup for country '{country}', admin1 '{admin1}' matched {matches} features")]
    AmbiguousBoundary {
        country: String,
        admin1: String,
        matches: usize,
    },

    #[error("year {year} is outside the supported range {min}..={max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("no raster tiles found for year {0}")]
    NoTilesForYear(i32),

    #[error("raster grids are incompatible: {0}")]
    GridMismatch(String),

    #[error("invalid class legend: {0}")]
    InvalidLegend(String),

    #[error("invalid code map: {0}")]
    InvalidCodeMap(String),

    #[error("aggregation window of {requested} pixels exceeds the budget of {budget}")]
    PixelBudgetExceeded { requested: u64, budget: u64 },

    #[error("analysis cancelled")]
    Cancelled,

    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for land-cover operations
pub type LandResult<T> = Result<T, LandError>;
