//! Multi-year categorical raster tile collection.
//!
//! The land-cover time series is distributed as spatial tiles, one
//! acquisition timestamp per tile, several tiles per year. The collection
//! keeps its tiles in insertion order; that order is the deterministic
//! tie-break when overlapping tiles of the same year are mosaicked.

use crate::types::{ClassBlock, GridGeometry};
use chrono::{DateTime, Datelike, Utc};

/// One categorical raster tile with its acquisition timestamp
#[derive(Debug, Clone)]
pub struct RasterTile {
    pub acquired: DateTime<Utc>,
    pub geometry: GridGeometry,
    pub data: ClassBlock,
}

impl RasterTile {
    pub fn new(acquired: DateTime<Utc>, geometry: GridGeometry, data: ClassBlock) -> Self {
        Self { acquired, geometry, data }
    }

    /// Calendar year of the acquisition timestamp
    pub fn year(&self) -> i32 {
        self.acquired.year()
    }
}

/// Ordered, read-only collection of raster tiles spanning multiple years
#[derive(Debug, Clone, Default)]
pub struct RasterTileCollection {
    tiles: Vec<RasterTile>,
}

impl RasterTileCollection {
    pub fn new(tiles: Vec<RasterTile>) -> Self {
        Self { tiles }
    }

    pub fn push(&mut self, tile: RasterTile) {
        self.tiles.push(tile);
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RasterTile> {
        self.tiles.iter()
    }

    /// Tiles acquired in calendar year `year`, in collection order
    pub fn tiles_for_year(&self, year: i32) -> Vec<&RasterTile> {
        self.tiles.iter().filter(|t| t.year() == year).collect()
    }

    /// Inclusive (first, last) year covered by the collection
    pub fn year_span(&self) -> Option<(i32, i32)> {
        let first = self.tiles.iter().map(|t| t.year()).min()?;
        let last = self.tiles.iter().map(|t| t.year()).max()?;
        Some((first, last))
    }
}

/// GeoTIFF-backed tile loading. Requires the system GDAL library.
#[cfg(feature = "gdal")]
pub mod geotiff {
    use super::*;
    use crate::types::{LandError, LandResult};
    use chrono::TimeZone;
    use gdal::Dataset;
    use ndarray::Array2;
    use std::path::Path;

    /// Read one single-band categorical GeoTIFF as a tile acquired in `year`.
    ///
    /// The raster must be north-up with square pixels; band values above
    /// `u8::MAX` are clamped to [`NODATA`].
    pub fn load_tile<P: AsRef<Path>>(path: P, year: i32) -> LandResult<RasterTile> {
        let path = path.as_ref();
        let dataset = Dataset::open(path)?;
        let transform = dataset.geo_transform()?;

        if transform[2] != 0.0 || transform[4] != 0.0 {
            return Err(LandError::GridMismatch(format!(
                "{}: rotated rasters are not supported",
                path.display()
            )));
        }
        if (transform[1] + transform[5]).abs() > 1e-9 * transform[1].abs() {
            return Err(LandError::GridMismatch(format!(
                "{}: pixels are not square ({} x {})",
                path.display(),
                transform[1],
                transform[5]
            )));
        }

        let (width, height) = dataset.raster_size();
        let band = dataset.rasterband(1)?;
        let buffer = band.read_as::<u8>((0, 0), (width, height), (width, height), None)?;
        let data = Array2::from_shape_vec((height, width), buffer.data)
            .map_err(|e| LandError::GridMismatch(format!("{}: {}", path.display(), e)))?;

        let geometry = GridGeometry::new(transform[0], transform[3], transform[1], width, height);
        let acquired = Utc
            .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| LandError::Geometry(format!("invalid acquisition year {}", year)))?;

        log::info!(
            "Loaded tile {} ({}x{} pixels at {}m, year {})",
            path.display(),
            width,
            height,
            geometry.pixel_size,
            year
        );
        Ok(RasterTile::new(acquired, geometry, data))
    }

    /// Load a collection from `(path, year)` pairs, preserving order
    pub fn load_collection<P: AsRef<Path>>(sources: &[(P, i32)]) -> LandResult<RasterTileCollection> {
        let mut collection = RasterTileCollection::default();
        for (path, year) in sources {
            collection.push(load_tile(path, *year)?);
        }
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ndarray::Array2;

    fn tile(year: i32, value: u8) -> RasterTile {
        RasterTile::new(
            Utc.with_ymd_and_hms(year, 6, 15, 0, 0, 0).single().unwrap(),
            GridGeometry::new(0.0, 60.0, 30.0, 2, 2),
            Array2::from_elem((2, 2), value),
        )
    }

    #[test]
    fn test_year_from_timestamp() {
        assert_eq!(tile(2019, 1).year(), 2019);
    }

    #[test]
    fn test_tiles_for_year_preserves_order() {
        let collection = RasterTileCollection::new(vec![tile(2019, 1), tile(2020, 2), tile(2019, 3)]);
        let matched = collection.tiles_for_year(2019);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].data[[0, 0]], 1);
        assert_eq!(matched[1].data[[0, 0]], 3);
        assert!(collection.tiles_for_year(2021).is_empty());
    }

    #[test]
    fn test_year_span() {
        let collection = RasterTileCollection::new(vec![tile(2020, 1), tile(2017, 2), tile(2022, 3)]);
        assert_eq!(collection.year_span(), Some((2017, 2022)));
        assert_eq!(RasterTileCollection::default().year_span(), None);
    }
}
