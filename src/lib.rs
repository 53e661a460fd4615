pub mod db;
pub mod helpers;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use services::poi_service::PoiService;
use services::providers::{ContentProvider, PlacesProvider};
use services::tour_orchestration_service::TourOrchestrationService;
use services::tour_service::TourService;

/// Shared application state: every handler reaches the providers and the
/// store through these injected handles, so tests wire in an in-memory store
/// and scripted providers with no further changes.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TourOrchestrationService>,
    pub tour_service: Arc<TourService>,
    pub poi_service: Arc<PoiService>,
    pub content: Arc<dyn ContentProvider>,
    pub places: Arc<dyn PlacesProvider>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn db::TourStore>,
        content: Arc<dyn ContentProvider>,
        places: Arc<dyn PlacesProvider>,
    ) -> Self {
        let poi_service = Arc::new(PoiService::new(Arc::clone(&content), Arc::clone(&places)));
        let tour_service = Arc::new(TourService::new(store));
        let orchestrator = Arc::new(TourOrchestrationService::new(
            Arc::clone(&poi_service),
            Arc::clone(&tour_service),
            Arc::clone(&content),
            Arc::clone(&places),
        ));

        Self {
            orchestrator,
            tour_service,
            poi_service,
            content,
            places,
        }
    }
}
