//! Administrative boundary source and jurisdiction resolution.
//!
//! Boundary data follows the GAUL level-1 shape: one feature per
//! state/province, keyed by the `ADM0_NAME` (country) and `ADM1_NAME`
//! (admin-1) attributes, with polygon or multipolygon geometry.

use crate::types::{Jurisdiction, LandError, LandResult};
use geo::{Geometry, MultiPolygon};
use geojson::GeoJson;

/// Attribute names of the level-1 administrative boundary schema
const COUNTRY_ATTR: &str = "ADM0_NAME";
const ADMIN1_ATTR: &str = "ADM1_NAME";

/// One administrative boundary feature
#[derive(Debug, Clone)]
pub struct BoundaryFeature {
    pub country: String,
    pub admin1: String,
    pub geometry: MultiPolygon<f64>,
}

/// In-memory collection of level-1 administrative boundary features.
///
/// The source is read-only reference data; resolution never mutates it and
/// concurrent lookups are safe.
#[derive(Debug, Clone, Default)]
pub struct BoundarySource {
    features: Vec<BoundaryFeature>,
}

impl BoundarySource {
    pub fn new(features: Vec<BoundaryFeature>) -> Self {
        Self { features }
    }

    /// Load boundary features from a GeoJSON FeatureCollection string.
    ///
    /// Features missing the name attributes or carrying non-polygonal
    /// geometry are rejected rather than skipped, so a malformed source
    /// cannot silently shrink the resolution index.
    pub fn from_geojson(text: &str) -> LandResult<Self> {
        let parsed: GeoJson = text
            .parse()
            .map_err(|e| LandError::Geometry(format!("GeoJSON parse failed: {}", e)))?;

        let collection = match parsed {
            GeoJson::FeatureCollection(fc) => fc,
            _ => {
                return Err(LandError::Geometry(
                    "boundary source must be a FeatureCollection".to_string(),
                ))
            }
        };

        let mut features = Vec::with_capacity(collection.features.len());
        for (idx, feature) in collection.features.into_iter().enumerate() {
            let properties = feature
                .properties
                .ok_or_else(|| LandError::Geometry(format!("feature {} has no properties", idx)))?;
            let country = properties
                .get(COUNTRY_ATTR)
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    LandError::Geometry(format!("feature {} is missing {}", idx, COUNTRY_ATTR))
                })?
                .to_string();
            let admin1 = properties
                .get(ADMIN1_ATTR)
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    LandError::Geometry(format!("feature {} is missing {}", idx, ADMIN1_ATTR))
                })?
                .to_string();

            let geometry = feature
                .geometry
                .ok_or_else(|| LandError::Geometry(format!("feature {} has no geometry", idx)))?;
            let geometry: Geometry<f64> = geometry
                .try_into()
                .map_err(|e| LandError::Geometry(format!("feature {}: {}", idx, e)))?;
            let geometry = match geometry {
                Geometry::Polygon(polygon) => MultiPolygon(vec![polygon]),
                Geometry::MultiPolygon(multi) => multi,
                _ => {
                    return Err(LandError::Geometry(format!(
                        "feature {} ({}/{}) has non-polygonal geometry",
                        idx, country, admin1
                    )))
                }
            };

            features.push(BoundaryFeature { country, admin1, geometry });
        }

        log::info!("Loaded {} boundary features", features.len());
        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Distinct country names, sorted. Drives the country selector of UI
    /// collaborators.
    pub fn countries(&self) -> Vec<String> {
        let mut names: Vec<String> = self.features.iter().map(|f| f.country.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Distinct admin-1 names within `country`, sorted
    pub fn admin1_names(&self, country: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .features
            .iter()
            .filter(|f| f.country == country)
            .map(|f| f.admin1.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Resolve the jurisdiction polygon for a (country, admin-1) pair.
    ///
    /// Exactly one feature must match: zero matches and multiple matches
    /// are both surfaced as errors, never silently resolved.
    pub fn resolve(&self, country: &str, admin1: &str) -> LandResult<Jurisdiction> {
        if country.is_empty() || admin1.is_empty() {
            return Err(LandError::EmptySelection(
                "country and admin1 names must be non-empty".to_string(),
            ));
        }

        let matches: Vec<&BoundaryFeature> = self
            .features
            .iter()
            .filter(|f| f.country == country && f.admin1 == admin1)
            .collect();

        match matches.len() {
            0 => Err(LandError::BoundaryNotFound {
                country: country.to_string(),
                admin1: admin1.to_string(),
            }),
            1 => {
                log::debug!("Resolved boundary for {}/{}", country, admin1);
                Ok(Jurisdiction {
                    country: country.to_string(),
                    admin1: admin1.to_string(),
                    geometry: matches[0].geometry.clone(),
                })
            }
            n => Err(LandError::AmbiguousBoundary {
                country: country.to_string(),
                admin1: admin1.to_string(),
                matches: n,
            }),
        }
    }
}
