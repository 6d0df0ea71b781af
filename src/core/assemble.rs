//! Packaging of zonal counts into the per-class area breakdown.

use crate::core::zonal::{area_hectares, AggregationParams, ZonalCounts};
use crate::legend::ClassLegend;
use crate::types::ClassCode;
use serde::{Deserialize, Serialize};

/// Area total for one canonical class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassArea {
    pub class_id: ClassCode,
    pub class_name: String,
    pub pixel_count: u64,
    pub area_hectares: f64,
}

/// Per-class area summary of one analysis.
///
/// Always carries exactly one entry per legend class, in legend order,
/// zero-filled for absent classes. Pixels whose raw code had no canonical
/// mapping are totalled separately instead of being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaBreakdown {
    pub classes: Vec<ClassArea>,
    pub unmapped_pixels: u64,
    pub unmapped_hectares: f64,
    /// All pixels inside the jurisdiction, the unmapped sentinel included
    pub total_pixels: u64,
    pub pixel_scale_m: f64,
}

impl AreaBreakdown {
    /// `(class name, hectares)` rows in legend order, for tabular export
    pub fn rows(&self) -> Vec<(&str, f64)> {
        self.classes
            .iter()
            .map(|c| (c.class_name.as_str(), c.area_hectares))
            .collect()
    }

    /// Sum of all class areas plus the unmapped remainder, in hectares
    pub fn total_hectares(&self) -> f64 {
        area_hectares(self.total_pixels, self.pixel_scale_m)
    }
}

/// Order the per-class counts by the legend and convert them to areas
pub fn assemble_breakdown(
    legend: &ClassLegend,
    counts: &ZonalCounts,
    params: &AggregationParams,
) -> AreaBreakdown {
    let classes: Vec<ClassArea> = legend
        .entries()
        .iter()
        .map(|entry| {
            let pixel_count = counts.count_of(entry.id);
            ClassArea {
                class_id: entry.id,
                class_name: entry.name.clone(),
                pixel_count,
                area_hectares: area_hectares(pixel_count, params.pixel_scale_m),
            }
        })
        .collect();

    AreaBreakdown {
        classes,
        unmapped_pixels: counts.unmapped_pixels(),
        unmapped_hectares: area_hectares(counts.unmapped_pixels(), params.pixel_scale_m),
        total_pixels: counts.inside_pixels(),
        pixel_scale_m: params.pixel_scale_m,
    }
}
