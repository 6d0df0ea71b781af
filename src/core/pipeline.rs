//! End-to-end analysis pipeline.
//!
//! One invocation turns an immutable `(country, admin1, year)` selection
//! into an immutable result: the per-class area breakdown plus the clipped,
//! remapped raster. Boundary resolution and mosaic selection have no data
//! dependency and run in parallel; remap, clip and aggregation form a
//! sequential chain over the streamed surface.
//!
//! Invocations share nothing but the read-only reference datasets, so any
//! number may run concurrently. A caller that issues a new selection while
//! an older one is in flight should cancel the old token and discard its
//! result instead of racing both onto a display.

use crate::core::assemble::{assemble_breakdown, AreaBreakdown};
use crate::core::mosaic::{MosaicSelector, MosaicSurface};
use crate::core::remap::{CodeMap, RemappedSurface};
use crate::core::zonal::{AggregationParams, ClippedSurface, ZonalAggregator};
use crate::io::boundary::BoundarySource;
use crate::io::tiles::RasterTileCollection;
use crate::legend::ClassLegend;
use crate::types::{CancelToken, Jurisdiction, LandError, LandResult};
use serde::{Deserialize, Serialize};

/// Immutable request: which jurisdiction, which year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub country: String,
    pub admin1: String,
    pub year: i32,
}

impl Selection {
    pub fn new(country: impl Into<String>, admin1: impl Into<String>, year: i32) -> Self {
        Self { country: country.into(), admin1: admin1.into(), year }
    }
}

/// The clipped, remapped land-cover raster handed to rendering/export
/// collaborators. Blocks are produced on demand; nothing is materialized
/// until a collaborator reads.
pub type ClippedLandCover<'a> = ClippedSurface<RemappedSurface<MosaicSurface<'a>>>;

/// Immutable result of one analysis invocation
pub struct AnalysisResult<'a> {
    pub selection: Selection,
    pub jurisdiction: Jurisdiction,
    pub breakdown: AreaBreakdown,
    pub raster: ClippedLandCover<'a>,
}

/// Land-cover analysis pipeline over a pair of read-only reference
/// datasets: an administrative boundary source and a multi-year raster
/// tile collection.
pub struct LandCoverPipeline<'a> {
    boundaries: &'a BoundarySource,
    tiles: &'a RasterTileCollection,
    legend: ClassLegend,
    code_map: CodeMap,
    aggregator: ZonalAggregator,
}

impl<'a> LandCoverPipeline<'a> {
    /// Pipeline with the standard legend, code map and aggregation defaults
    pub fn new(boundaries: &'a BoundarySource, tiles: &'a RasterTileCollection) -> Self {
        Self {
            boundaries,
            tiles,
            legend: ClassLegend::standard(),
            code_map: CodeMap::standard(),
            aggregator: ZonalAggregator::default(),
        }
    }

    pub fn with_params(mut self, params: AggregationParams) -> Self {
        self.aggregator = ZonalAggregator::new(params);
        self
    }

    pub fn legend(&self) -> &ClassLegend {
        &self.legend
    }

    /// Run the full selection -> mosaic -> remap -> clip -> aggregate
    /// pipeline for one selection.
    pub fn analyze(
        &self,
        selection: &Selection,
        cancel: Option<&CancelToken>,
    ) -> LandResult<AnalysisResult<'a>> {
        if selection.country.is_empty() || selection.admin1.is_empty() {
            return Err(LandError::EmptySelection(
                "country and admin1 names must be non-empty".to_string(),
            ));
        }

        log::info!(
            "Analyzing {}/{} for year {}",
            selection.country,
            selection.admin1,
            selection.year
        );

        // boundary resolution and mosaic selection are independent
        let selector = MosaicSelector::new(self.tiles);
        let (jurisdiction, mosaic) = rayon::join(
            || self.boundaries.resolve(&selection.country, &selection.admin1),
            || selector.select_mosaic(selection.year),
        );
        let jurisdiction = jurisdiction?;
        let mosaic = mosaic?;

        let remapped = RemappedSurface::new(mosaic, self.code_map.clone());
        let (raster, counts) = self
            .aggregator
            .clip_and_count(remapped, &jurisdiction, cancel)?;
        let breakdown = assemble_breakdown(&self.legend, &counts, self.aggregator.params());

        log::info!(
            "Analysis of {}/{} complete: {} pixels, {:.2} ha",
            selection.country,
            selection.admin1,
            breakdown.total_pixels,
            breakdown.total_hectares()
        );

        Ok(AnalysisResult {
            selection: selection.clone(),
            jurisdiction,
            breakdown,
            raster,
        })
    }
}
