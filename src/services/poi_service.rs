//! POI candidate generation, verification and enrichment.
//!
//! Candidates come from the content provider as bare title/address pairs.
//! Verification geocodes each one and keeps only candidates that resolve to a
//! specific place. Enrichment fills in place ids, canonical addresses, GPS
//! coordinates and photos; a POI that cannot be enriched is kept in degraded
//! form rather than dropped, since it already passed verification.

use std::sync::Arc;

use crate::models::tour::Poi;
use crate::services::providers::{
    ContentError, ContentProvider, GeocodeResult, PlacesProvider,
};

/// Geocode location_type values precise enough to count as a real place.
const ACCEPTED_LOCATION_TYPES: [&str; 2] = ["ROOFTOP", "RANGE_INTERPOLATED"];

/// Geocode result types that indicate a concrete establishment or address
/// rather than an area.
const ACCEPTED_RESULT_TYPES: [&str; 4] = [
    "street_address",
    "premise",
    "establishment",
    "point_of_interest",
];

pub struct PoiService {
    content: Arc<dyn ContentProvider>,
    places: Arc<dyn PlacesProvider>,
}

impl PoiService {
    pub fn new(content: Arc<dyn ContentProvider>, places: Arc<dyn PlacesProvider>) -> Self {
        Self { content, places }
    }

    /// Candidate POIs for the given origin and constraints. Provider errors
    /// propagate; there is nothing to fall back on at this stage.
    pub async fn generate_candidates(
        &self,
        address: &str,
        time_constraint: &str,
        distance_constraint: &str,
        preferences: &str,
    ) -> Result<Vec<Poi>, ContentError> {
        self.content
            .generate_pois(address, time_constraint, distance_constraint, preferences)
            .await
    }

    /// Geocode-verify candidates, keeping only those whose address resolves
    /// to a specific place. The address is geocoded on its own, without the
    /// title, so a well-known name cannot rescue a bogus address. Failures
    /// are per-candidate: a geocode error drops that candidate and the rest
    /// continue.
    pub async fn verify_candidates(&self, candidates: Vec<Poi>) -> Vec<Poi> {
        let mut verified = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if candidate.poi_title.trim().is_empty() || candidate.address.trim().is_empty() {
                log::warn!("Dropping candidate with empty title or address");
                continue;
            }

            match self.places.geocode(&candidate.address).await {
                Ok(results) => {
                    if first_result_is_specific(&results) {
                        verified.push(candidate);
                    } else {
                        log::info!("Dropping unverifiable candidate '{}'", candidate.poi_title);
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Geocoding failed for candidate '{}', dropping it: {}",
                        candidate.poi_title,
                        e
                    );
                }
            }
        }

        verified
    }

    /// Enrich each POI with place details. Lookup misses and errors degrade
    /// the individual POI instead of failing the batch.
    pub async fn enrich_pois(&self, pois: Vec<Poi>) -> Vec<Poi> {
        let mut enriched = Vec::with_capacity(pois.len());
        for poi in pois {
            enriched.push(self.enrich_poi(poi).await);
        }
        enriched
    }

    async fn enrich_poi(&self, mut poi: Poi) -> Poi {
        let query = format!("{}, {}", poi.poi_title, poi.address);
        match self.places.find_place(&query).await {
            Ok(Some(details)) => {
                if let Some(formatted_address) = details.formatted_address {
                    poi.address = formatted_address;
                }
                poi.google_place_id = Some(details.place_id);
                poi.google_maps_name = Some(details.name);
                poi.gps_location = details.location;
                poi.google_place_img_url = details.photo_url;
            }
            Ok(None) => {
                log::info!("No place details found for '{}', keeping degraded", poi.poi_title);
                degrade(&mut poi);
            }
            Err(e) => {
                log::warn!(
                    "Place lookup failed for '{}', keeping degraded: {}",
                    poi.poi_title,
                    e
                );
                degrade(&mut poi);
            }
        }
        poi
    }
}

/// Degraded enrichment: the POI keeps its verified address and title, with an
/// empty place id marking that no details were resolved.
fn degrade(poi: &mut Poi) {
    poi.google_place_id = Some(String::new());
    poi.google_maps_name = Some(poi.poi_title.clone());
    poi.gps_location = None;
    poi.google_place_img_url = None;
}

/// Verification trusts the provider's ranking: only the first (best) hit is
/// examined. A vague top result rejects the candidate even when a more
/// specific alternative follows further down.
pub fn first_result_is_specific(results: &[GeocodeResult]) -> bool {
    results.first().map(is_specific_place).unwrap_or(false)
}

/// A geocode result counts as a specific place when it is not a partial
/// match, its precision is rooftop or range-interpolated, and at least one of
/// its types names a concrete establishment or address.
pub fn is_specific_place(result: &GeocodeResult) -> bool {
    if result.partial_match {
        return false;
    }
    if !ACCEPTED_LOCATION_TYPES.contains(&result.location_type.as_str()) {
        return false;
    }
    result
        .types
        .iter()
        .any(|t| ACCEPTED_RESULT_TYPES.contains(&t.as_str()))
}
