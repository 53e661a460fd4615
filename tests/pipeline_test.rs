mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{wait_for_terminal, ScriptedContent, ScriptedPlaces};
use walking_tour_api::db::memory::MemoryTourStore;
use walking_tour_api::models::tour::{TourConstraints, TourStatus};
use walking_tour_api::services::providers::{PoiRanking, RouteMetrics};
use walking_tour_api::AppState;

const ORIGIN: &str = "Chinatown Point, Singapore";

fn constraints() -> TourConstraints {
    TourConstraints {
        max_time: "2 hours".to_string(),
        distance: "5 km".to_string(),
        custom: "heritage shophouses".to_string(),
    }
}

fn build_state(content: Arc<ScriptedContent>, places: Arc<ScriptedPlaces>) -> AppState {
    AppState::new(Arc::new(MemoryTourStore::new()), content, places)
}

async fn run_to_terminal(state: &AppState) -> walking_tour_api::models::tour::Tour {
    let (id, valid) = state
        .orchestrator
        .validate_and_create(ORIGIN, constraints())
        .await
        .unwrap();
    assert!(valid);
    state.orchestrator.spawn_pipeline(id);
    wait_for_terminal(&state.tour_service, id).await
}

#[tokio::test]
async fn happy_path_completes_with_ordered_enriched_pois() {
    let content = Arc::new(ScriptedContent::new(
        true,
        &["Thian Hock Keng", "Maxwell Food Centre", "Ann Siang Hill"],
    ));
    // Visit the third candidate first; ranks come back sparse on purpose.
    content.push_ordering(Some(vec![
        PoiRanking {
            original_index: 3,
            order: 2,
            story_keywords: Some("hill, merchants".to_string()),
        },
        PoiRanking {
            original_index: 1,
            order: 5,
            story_keywords: Some("temple, hokkien".to_string()),
        },
        PoiRanking {
            original_index: 2,
            order: 9,
            story_keywords: Some("hawker, lunch".to_string()),
        },
    ]));
    let places = Arc::new(ScriptedPlaces::verifying_everything());
    let state = build_state(Arc::clone(&content), Arc::clone(&places));

    let tour = run_to_terminal(&state).await;

    assert_eq!(tour.status_code, TourStatus::Completed);
    assert_eq!(tour.filtered_candidate_poi_list.len(), 3);
    assert_eq!(tour.pois.len(), 3);

    // Verification geocodes the bare address, never a title-prefixed query.
    let queries = places.geocode_queries.lock().unwrap();
    assert!(queries.iter().any(|q| q == "Thian Hock Keng Street 1"));
    assert!(!queries.iter().any(|q| q.starts_with("Thian Hock Keng,")));
    drop(queries);

    // Requested order 2, 5, 9 is renumbered to a contiguous 1, 2, 3.
    let titles: Vec<&str> = tour.pois.iter().map(|p| p.poi_title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Ann Siang Hill", "Thian Hock Keng", "Maxwell Food Centre"]
    );
    for (i, poi) in tour.pois.iter().enumerate() {
        assert_eq!(poi.order, Some(i as u32 + 1));
        assert!(poi.story_keywords.is_some());
        assert!(poi.story.is_some());
        assert!(poi.google_place_id.as_deref().is_some_and(|id| !id.is_empty()));
        assert!(poi.gps_location.is_some());
    }

    assert!(tour.introduction.as_deref().unwrap().contains("heritage"));
    assert!(tour.error_message.is_none());
    assert_eq!(content.order_call_count(), 1);
}

#[tokio::test]
async fn zero_verified_pois_fails_the_tour() {
    let content = Arc::new(ScriptedContent::new(
        true,
        &["Somewhere Vague", "Nowhere In Particular"],
    ));
    let mut places = ScriptedPlaces::verifying_everything();
    places.unverifiable = HashSet::from([
        "Somewhere Vague".to_string(),
        "Nowhere In Particular".to_string(),
    ]);
    let state = build_state(content, Arc::new(places));

    let tour = run_to_terminal(&state).await;

    assert_eq!(tour.status_code, TourStatus::Failed);
    assert!(tour
        .error_message
        .as_deref()
        .unwrap()
        .contains("No POIs could be verified"));
    assert!(tour.pois.is_empty());
}

#[tokio::test]
async fn verification_is_idempotent_and_order_preserving() {
    let content = Arc::new(ScriptedContent::new(true, &[]));
    let mut places = ScriptedPlaces::verifying_everything();
    places.unverifiable = HashSet::from(["Somewhere Vague".to_string()]);
    let state = build_state(content, Arc::new(places));

    let candidates: Vec<walking_tour_api::models::tour::Poi> = [
        "Thian Hock Keng",
        "Somewhere Vague",
        "Maxwell Food Centre",
        "Ann Siang Hill",
    ]
    .iter()
    .map(|t| walking_tour_api::models::tour::Poi::candidate(*t, format!("{} Street 1", t)))
    .collect();

    let first_pass = state.poi_service.verify_candidates(candidates).await;
    let titles: Vec<&str> = first_pass.iter().map(|p| p.poi_title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Thian Hock Keng", "Maxwell Food Centre", "Ann Siang Hill"]
    );

    let second_pass = state.poi_service.verify_candidates(first_pass.clone()).await;
    assert_eq!(second_pass, first_pass);
}

#[tokio::test]
async fn over_budget_plan_is_accepted_after_max_attempts() {
    let content = Arc::new(ScriptedContent::new(
        true,
        &["Thian Hock Keng", "Maxwell Food Centre"],
    ));
    let mut places = ScriptedPlaces::verifying_everything();
    // Every measured plan is well over the 5 km / 120 min limits.
    places.default_metrics = Some(RouteMetrics {
        total_distance_km: 12.0,
        total_duration_minutes: 300.0,
    });
    let state = build_state(Arc::clone(&content), Arc::new(places));

    let tour = run_to_terminal(&state).await;

    // Best effort: the last plan is kept rather than failing the tour.
    assert_eq!(tour.status_code, TourStatus::Completed);
    assert_eq!(tour.pois.len(), 2);
    assert_eq!(content.order_call_count(), 4);

    let feedback = content.feedback_seen.lock().unwrap();
    assert!(feedback[0].is_none());
    for entry in feedback.iter().skip(1) {
        let text = entry.as_deref().unwrap();
        assert!(text.contains("too long"));
        assert!(text.contains("12.00 km"));
    }
}

#[tokio::test]
async fn feedback_retry_succeeds_once_the_plan_fits() {
    let content = Arc::new(ScriptedContent::new(
        true,
        &["Thian Hock Keng", "Maxwell Food Centre", "Ann Siang Hill"],
    ));
    let places = ScriptedPlaces::verifying_everything();
    // First measurement violates the limits, second one fits.
    places.metrics.lock().unwrap().push_back(RouteMetrics {
        total_distance_km: 9.0,
        total_duration_minutes: 200.0,
    });
    let state = build_state(Arc::clone(&content), Arc::new(places));

    let tour = run_to_terminal(&state).await;

    assert_eq!(tour.status_code, TourStatus::Completed);
    assert_eq!(content.order_call_count(), 2);
    let feedback = content.feedback_seen.lock().unwrap();
    assert!(feedback[0].is_none());
    assert!(feedback[1].as_deref().unwrap().contains("9.00 km"));
}

#[tokio::test]
async fn metrics_just_inside_tolerance_pass_first_attempt() {
    let content = Arc::new(ScriptedContent::new(true, &["Thian Hock Keng"]));
    let mut places = ScriptedPlaces::verifying_everything();
    // 10% over both limits is still acceptable.
    places.default_metrics = Some(RouteMetrics {
        total_distance_km: 5.5,
        total_duration_minutes: 132.0,
    });
    let state = build_state(Arc::clone(&content), Arc::new(places));

    let tour = run_to_terminal(&state).await;

    assert_eq!(tour.status_code, TourStatus::Completed);
    assert_eq!(content.order_call_count(), 1);
}

#[tokio::test]
async fn directions_outage_still_completes_best_effort() {
    let content = Arc::new(ScriptedContent::new(
        true,
        &["Thian Hock Keng", "Maxwell Food Centre"],
    ));
    let mut places = ScriptedPlaces::verifying_everything();
    places.default_metrics = None;
    let state = build_state(Arc::clone(&content), Arc::new(places));

    let tour = run_to_terminal(&state).await;

    assert_eq!(tour.status_code, TourStatus::Completed);
    assert_eq!(content.order_call_count(), 4);
    assert_eq!(tour.pois.len(), 2);
}

#[tokio::test]
async fn ordering_errors_fall_back_to_input_order() {
    let content = Arc::new(ScriptedContent::new(
        true,
        &["Thian Hock Keng", "Maxwell Food Centre", "Ann Siang Hill"],
    ));
    content.push_ordering(None);
    let places = Arc::new(ScriptedPlaces::verifying_everything());
    let state = build_state(Arc::clone(&content), places);

    let tour = run_to_terminal(&state).await;

    assert_eq!(tour.status_code, TourStatus::Completed);
    let titles: Vec<&str> = tour.pois.iter().map(|p| p.poi_title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Thian Hock Keng", "Maxwell Food Centre", "Ann Siang Hill"]
    );
    assert_eq!(tour.pois[0].order, Some(1));
    assert_eq!(tour.pois[2].order, Some(3));
}

#[tokio::test]
async fn enrichment_misses_keep_pois_in_degraded_form() {
    let content = Arc::new(ScriptedContent::new(
        true,
        &["Thian Hock Keng", "Maxwell Food Centre"],
    ));
    let mut places = ScriptedPlaces::verifying_everything();
    places.find_place_hits = false;
    let state = build_state(content, Arc::new(places));

    let tour = run_to_terminal(&state).await;

    assert_eq!(tour.status_code, TourStatus::Completed);
    assert_eq!(tour.pois.len(), 2);
    for poi in &tour.pois {
        assert_eq!(poi.google_place_id.as_deref(), Some(""));
        assert_eq!(poi.google_maps_name.as_deref(), Some(poi.poi_title.as_str()));
        assert!(poi.gps_location.is_none());
        assert!(poi.google_place_img_url.is_none());
        assert!(poi.address.ends_with("Street 1"));
    }
}

#[tokio::test]
async fn narrative_failures_do_not_fail_the_tour() {
    let mut content = ScriptedContent::new(true, &["Thian Hock Keng"]);
    content.fail_introduction = true;
    content.fail_stories = true;
    let places = Arc::new(ScriptedPlaces::verifying_everything());
    let state = build_state(Arc::new(content), places);

    let tour = run_to_terminal(&state).await;

    assert_eq!(tour.status_code, TourStatus::Completed);
    assert!(tour.introduction.is_none());
    assert!(tour.pois[0].story.is_none());
}

#[tokio::test]
async fn geocoding_stage_backfills_a_missing_origin_location() {
    let content = Arc::new(ScriptedContent::new(true, &["Thian Hock Keng"]));
    let places = Arc::new(ScriptedPlaces::verifying_everything());
    let state = build_state(content, places);

    // A tour created without coordinates, as when the origin geocode missed
    // at submission time.
    let created = state
        .tour_service
        .create_tour(ORIGIN.to_string(), None, constraints(), TourStatus::Valid)
        .await
        .unwrap();
    assert!(created.user_location.is_none());

    state.orchestrator.spawn_pipeline(created.id);
    let tour = wait_for_terminal(&state.tour_service, created.id).await;

    assert_eq!(tour.status_code, TourStatus::Completed);
    assert!(tour.user_location.is_some());
}

#[tokio::test]
async fn rejected_guardrail_creates_an_invalid_tour() {
    let content = Arc::new(ScriptedContent::new(false, &[]));
    let places = Arc::new(ScriptedPlaces::verifying_everything());
    let state = build_state(content, places);

    let (id, valid) = state
        .orchestrator
        .validate_and_create(ORIGIN, constraints())
        .await
        .unwrap();

    assert!(!valid);
    let tour = state.tour_service.get_tour(id).await.unwrap().unwrap();
    assert_eq!(tour.status_code, TourStatus::Invalid);
    assert!(tour.user_location.is_none());
}
