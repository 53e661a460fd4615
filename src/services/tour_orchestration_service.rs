//! Tour Orchestration Service
//!
//! Drives a tour transaction from guardrail validation through the background
//! pipeline to a terminal status. The pipeline runs as a supervised task:
//! stage errors and panics both land the tour in `failed` with a reason, and
//! polling clients always see a consistent status.
//!
//! ## Pipeline stages
//! 1. `geocoding` - resolve the user address (best effort, recorded at creation)
//! 2. `generating_pois` - candidate POIs from the content provider
//! 3. `filtering_pois` - geocode verification of every candidate
//! 4. `generating_tour` - ordering with constraint feedback, enrichment, narrative
//! 5. `completed` / `failed`

use std::error::Error;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::tour::{GeoLocation, Poi, Tour, TourConstraints, TourStatus};
use crate::services::poi_service::PoiService;
use crate::services::providers::{ContentProvider, PlacesProvider, PoiRanking, RouteMetrics};
use crate::services::tour_service::TourService;

/// Ordering attempts before the last plan is accepted as-is.
const MAX_ORDERING_ATTEMPTS: u32 = 4;

/// Constraint checks allow a 10% overshoot; walking estimates are noisy.
const CONSTRAINT_TOLERANCE: f64 = 1.1;

const STORY_PLACEHOLDER: &str = "Enjoy this stop of your tour.";

type PipelineError = Box<dyn Error + Send + Sync>;

pub struct TourOrchestrationService {
    poi_service: Arc<PoiService>,
    tour_service: Arc<TourService>,
    content: Arc<dyn ContentProvider>,
    places: Arc<dyn PlacesProvider>,
}

impl TourOrchestrationService {
    pub fn new(
        poi_service: Arc<PoiService>,
        tour_service: Arc<TourService>,
        content: Arc<dyn ContentProvider>,
        places: Arc<dyn PlacesProvider>,
    ) -> Self {
        Self {
            poi_service,
            tour_service,
            content,
            places,
        }
    }

    /// Guardrail-validate the request and create the tour record. Returns the
    /// transaction id and the verdict; the caller decides whether to start
    /// the pipeline.
    pub async fn validate_and_create(
        &self,
        user_address: &str,
        constraints: TourConstraints,
    ) -> Result<(Uuid, bool), PipelineError> {
        let valid = self
            .content
            .validate_request(
                user_address,
                &constraints.max_time,
                &constraints.distance,
                &constraints.custom,
            )
            .await?;

        // Geocoding the origin is best effort here; the record is created
        // either way and an unresolvable address surfaces later as a
        // pipeline failure.
        let user_location = if valid {
            self.resolve_origin(user_address).await
        } else {
            None
        };

        let status = if valid {
            TourStatus::Valid
        } else {
            TourStatus::Invalid
        };

        let tour = self
            .tour_service
            .create_tour(user_address.to_string(), user_location, constraints, status)
            .await?;

        Ok((tour.id, valid))
    }

    async fn resolve_origin(&self, user_address: &str) -> Option<GeoLocation> {
        match self.places.geocode(user_address).await {
            Ok(results) => results.into_iter().next().map(|r| r.location),
            Err(e) => {
                log::warn!("Could not geocode origin '{}': {}", user_address, e);
                None
            }
        }
    }

    /// Run the pipeline for a created tour as a supervised background task.
    /// A panic inside the pipeline is caught via the join handle and recorded
    /// as a failure like any other error.
    pub fn spawn_pipeline(self: &Arc<Self>, id: Uuid) {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let inner = Arc::clone(&orchestrator);
            let handle = tokio::spawn(async move { inner.run_pipeline(id).await });
            if let Err(join_error) = handle.await {
                log::error!("Pipeline task for tour {} panicked: {}", id, join_error);
                let reason = format!("pipeline task panicked: {}", join_error);
                if let Err(e) = orchestrator.tour_service.mark_failed(id, reason).await {
                    log::error!("Could not record panic for tour {}: {}", id, e);
                }
            }
        });
    }

    async fn run_pipeline(&self, id: Uuid) {
        if let Err(e) = self.execute_pipeline(id).await {
            log::error!("Pipeline for tour {} failed: {}", id, e);
            if let Err(store_err) = self.tour_service.mark_failed(id, e.to_string()).await {
                log::error!("Could not record failure for tour {}: {}", id, store_err);
            }
        }
    }

    async fn execute_pipeline(&self, id: Uuid) -> Result<(), PipelineError> {
        let tour = self
            .tour_service
            .get_tour(id)
            .await?
            .ok_or_else(|| format!("tour {} not found", id))?;

        self.tour_service
            .update_status(id, TourStatus::Geocoding)
            .await?;
        // The origin is usually resolved at creation; re-resolve here when it
        // wasn't so the record carries coordinates whenever the provider can
        // produce them.
        if tour.user_location.is_none() {
            if let Some(location) = self.resolve_origin(&tour.user_address).await {
                self.tour_service.set_user_location(id, location).await?;
            }
        }

        self.tour_service
            .update_status(id, TourStatus::GeneratingPois)
            .await?;
        let candidates = self
            .poi_service
            .generate_candidates(
                &tour.user_address,
                &tour.constraints.max_time,
                &tour.constraints.distance,
                &tour.constraints.custom,
            )
            .await?;
        log::info!("Tour {}: {} candidate POIs", id, candidates.len());

        self.tour_service
            .update_status(id, TourStatus::FilteringPois)
            .await?;
        let verified = self.poi_service.verify_candidates(candidates).await;
        self.tour_service
            .update_filtered_pois(id, verified.clone())
            .await?;
        if verified.is_empty() {
            return Err("No POIs could be verified in the specified area".into());
        }
        log::info!("Tour {}: {} POIs verified", id, verified.len());

        self.tour_service
            .update_status(id, TourStatus::GeneratingTour)
            .await?;

        let ordered = self.order_pois_with_retry(&tour, verified).await?;
        let mut enriched = self.poi_service.enrich_pois(ordered).await;

        // Narrative content is decoration: failures downgrade it, never the tour.
        match self.content.generate_introduction(&enriched, &tour.theme).await {
            Ok(introduction) => {
                self.tour_service.set_introduction(id, introduction).await?;
            }
            Err(e) => log::warn!("Tour {}: introduction generation failed: {}", id, e),
        }

        match self.content.generate_stories(&enriched, &tour.theme).await {
            Ok(stories) => {
                for (i, poi) in enriched.iter_mut().enumerate() {
                    poi.story = Some(
                        stories
                            .get(i)
                            .cloned()
                            .unwrap_or_else(|| STORY_PLACEHOLDER.to_string()),
                    );
                }
            }
            Err(e) => log::warn!("Tour {}: story generation failed: {}", id, e),
        }

        self.tour_service.finalize_tour(id, enriched).await?;
        Ok(())
    }

    /// Ordering loop: ask the provider for a round-trip plan, check it against
    /// the parsed constraints via real walking metrics, and feed violations
    /// back for another attempt. After [`MAX_ORDERING_ATTEMPTS`] the last plan
    /// is accepted as-is; a partially over-budget tour beats no tour.
    async fn order_pois_with_retry(
        &self,
        tour: &Tour,
        pois: Vec<Poi>,
    ) -> Result<Vec<Poi>, PipelineError> {
        let mut feedback: Option<String> = None;
        let mut last_plan = identity_order(pois.clone());

        for attempt in 1..=MAX_ORDERING_ATTEMPTS {
            let ordered = match self
                .content
                .order_pois(
                    &pois,
                    &tour.user_address,
                    &tour.constraints.max_time,
                    &tour.constraints.distance,
                    &tour.theme,
                    feedback.as_deref(),
                )
                .await
            {
                Ok(rankings) => apply_ordering(&pois, &rankings),
                Err(e) => {
                    log::warn!(
                        "Tour {}: ordering attempt {} failed, using input order: {}",
                        tour.id,
                        attempt,
                        e
                    );
                    identity_order(pois.clone())
                }
            };

            let waypoints: Vec<String> = ordered
                .iter()
                .map(|poi| format!("{}, {}", poi.poi_title, poi.address))
                .collect();
            let metrics = match self
                .places
                .route_metrics(&tour.user_address, &waypoints)
                .await
            {
                Ok(metrics) => metrics,
                Err(e) => {
                    log::warn!("Tour {}: route metrics unavailable: {}", tour.id, e);
                    RouteMetrics::unreachable()
                }
            };

            if within_constraints(&metrics, tour.max_distance_km, tour.max_duration_minutes) {
                log::info!(
                    "Tour {}: plan accepted on attempt {} ({:.2} km, {:.0} min)",
                    tour.id,
                    attempt,
                    metrics.total_distance_km,
                    metrics.total_duration_minutes
                );
                return Ok(ordered);
            }

            feedback = Some(format!(
                "The previous plan was too long. Actual distance: {:.2} km (limit: {} km). \
                 Actual duration: {:.0} min (limit: {} min). \
                 Reduce the number of stops or choose closer ones.",
                metrics.total_distance_km,
                tour.max_distance_km,
                metrics.total_duration_minutes,
                tour.max_duration_minutes
            ));
            log::info!(
                "Tour {}: attempt {} over budget ({:.2} km, {:.0} min)",
                tour.id,
                attempt,
                metrics.total_distance_km,
                metrics.total_duration_minutes
            );
            last_plan = ordered;
        }

        log::warn!(
            "Tour {}: accepting over-budget plan after {} attempts",
            tour.id,
            MAX_ORDERING_ATTEMPTS
        );
        Ok(last_plan)
    }
}

fn within_constraints(metrics: &RouteMetrics, max_distance_km: f64, max_duration_minutes: i64) -> bool {
    metrics.total_distance_km <= max_distance_km * CONSTRAINT_TOLERANCE
        && metrics.total_duration_minutes <= max_duration_minutes as f64 * CONSTRAINT_TOLERANCE
}

/// Map rankings back onto the input POIs by 1-based original index, sort by
/// the requested order and renumber contiguously from 1. Rankings pointing
/// outside the list are dropped; an empty mapping falls back to input order.
fn apply_ordering(pois: &[Poi], rankings: &[PoiRanking]) -> Vec<Poi> {
    let mut planned: Vec<(u32, Poi)> = rankings
        .iter()
        .filter_map(|ranking| {
            let poi = pois.get(ranking.original_index.checked_sub(1)?)?;
            let mut poi = poi.clone();
            poi.story_keywords = ranking.story_keywords.clone();
            Some((ranking.order, poi))
        })
        .collect();

    if planned.is_empty() {
        return identity_order(pois.to_vec());
    }

    planned.sort_by_key(|(order, _)| *order);
    planned
        .into_iter()
        .enumerate()
        .map(|(i, (_, mut poi))| {
            poi.order = Some(i as u32 + 1);
            poi
        })
        .collect()
}

/// The fallback plan: input order, ranks 1..N.
fn identity_order(mut pois: Vec<Poi>) -> Vec<Poi> {
    for (i, poi) in pois.iter_mut().enumerate() {
        poi.order = Some(i as u32 + 1);
    }
    pois
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(titles: &[&str]) -> Vec<Poi> {
        titles
            .iter()
            .map(|t| Poi::candidate(*t, format!("{} address", t)))
            .collect()
    }

    #[test]
    fn ordering_renumbers_contiguously() {
        let pois = candidates(&["a", "b", "c"]);
        let rankings = vec![
            PoiRanking {
                original_index: 3,
                order: 5,
                story_keywords: Some("harbor".to_string()),
            },
            PoiRanking {
                original_index: 1,
                order: 2,
                story_keywords: None,
            },
        ];

        let ordered = apply_ordering(&pois, &rankings);
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].poi_title, "a");
        assert_eq!(ordered[0].order, Some(1));
        assert_eq!(ordered[1].poi_title, "c");
        assert_eq!(ordered[1].order, Some(2));
        assert_eq!(ordered[1].story_keywords.as_deref(), Some("harbor"));
    }

    #[test]
    fn out_of_range_indices_are_dropped() {
        let pois = candidates(&["a", "b"]);
        let rankings = vec![
            PoiRanking {
                original_index: 0,
                order: 1,
                story_keywords: None,
            },
            PoiRanking {
                original_index: 9,
                order: 2,
                story_keywords: None,
            },
            PoiRanking {
                original_index: 2,
                order: 3,
                story_keywords: None,
            },
        ];

        let ordered = apply_ordering(&pois, &rankings);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].poi_title, "b");
        assert_eq!(ordered[0].order, Some(1));
    }

    #[test]
    fn empty_mapping_falls_back_to_input_order() {
        let pois = candidates(&["a", "b"]);
        let ordered = apply_ordering(&pois, &[]);
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].poi_title, "a");
        assert_eq!(ordered[0].order, Some(1));
        assert_eq!(ordered[1].order, Some(2));
    }

    #[test]
    fn constraint_check_allows_ten_percent_overshoot() {
        let metrics = RouteMetrics {
            total_distance_km: 5.4,
            total_duration_minutes: 130.0,
        };
        assert!(within_constraints(&metrics, 5.0, 120));

        let metrics = RouteMetrics {
            total_distance_km: 5.6,
            total_duration_minutes: 100.0,
        };
        assert!(!within_constraints(&metrics, 5.0, 120));

        assert!(!within_constraints(&RouteMetrics::unreachable(), 5.0, 120));
        assert!(within_constraints(&RouteMetrics::zero(), 5.0, 120));
    }
}
