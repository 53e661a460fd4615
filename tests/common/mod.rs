//! Scripted provider doubles shared by the integration tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use walking_tour_api::models::tour::{GeoLocation, Poi, Tour};
use walking_tour_api::services::providers::{
    ContentError, ContentProvider, GeocodeResult, PlaceDetails, PlacesError, PlacesProvider,
    PoiRanking, RouteMetrics,
};
use walking_tour_api::services::tour_service::TourService;

/// Content provider that replays scripted answers. Ordering responses are
/// popped from a queue; when the queue is empty it falls back to an identity
/// ranking over the input.
pub struct ScriptedContent {
    pub verdict: bool,
    pub candidates: Vec<Poi>,
    pub orderings: Mutex<VecDeque<Option<Vec<PoiRanking>>>>,
    pub order_calls: AtomicUsize,
    pub feedback_seen: Mutex<Vec<Option<String>>>,
    pub fail_introduction: bool,
    pub fail_stories: bool,
}

impl ScriptedContent {
    pub fn new(verdict: bool, candidate_titles: &[&str]) -> Self {
        Self {
            verdict,
            candidates: candidate_titles
                .iter()
                .map(|t| Poi::candidate(*t, format!("{} Street 1", t)))
                .collect(),
            orderings: Mutex::new(VecDeque::new()),
            order_calls: AtomicUsize::new(0),
            feedback_seen: Mutex::new(Vec::new()),
            fail_introduction: false,
            fail_stories: false,
        }
    }

    pub fn push_ordering(&self, ordering: Option<Vec<PoiRanking>>) {
        self.orderings.lock().unwrap().push_back(ordering);
    }

    pub fn order_call_count(&self) -> usize {
        self.order_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentProvider for ScriptedContent {
    async fn validate_request(
        &self,
        _user_address: &str,
        _max_time: &str,
        _distance: &str,
        _custom_message: &str,
    ) -> Result<bool, ContentError> {
        Ok(self.verdict)
    }

    async fn generate_themes(
        &self,
        _address: &str,
    ) -> Result<HashMap<String, String>, ContentError> {
        let mut themes = HashMap::new();
        themes.insert(
            "🏛️ Heritage Walk".to_string(),
            "Landmarks and stories of the old town".to_string(),
        );
        themes.insert(
            "🍜 Street Food Trail".to_string(),
            "Hawker classics within walking distance".to_string(),
        );
        Ok(themes)
    }

    async fn generate_pois(
        &self,
        _address: &str,
        _time_constraint: &str,
        _distance_constraint: &str,
        _preferences: &str,
    ) -> Result<Vec<Poi>, ContentError> {
        Ok(self.candidates.clone())
    }

    async fn order_pois(
        &self,
        pois: &[Poi],
        _origin: &str,
        _max_time: &str,
        _distance: &str,
        _theme: &str,
        feedback: Option<&str>,
    ) -> Result<Vec<PoiRanking>, ContentError> {
        self.order_calls.fetch_add(1, Ordering::SeqCst);
        self.feedback_seen
            .lock()
            .unwrap()
            .push(feedback.map(|f| f.to_string()));

        match self.orderings.lock().unwrap().pop_front() {
            Some(Some(rankings)) => Ok(rankings),
            Some(None) => Err(ContentError::Response("scripted ordering error".into())),
            None => Ok(pois
                .iter()
                .enumerate()
                .map(|(i, _)| PoiRanking {
                    original_index: i + 1,
                    order: i as u32 + 1,
                    story_keywords: Some("scripted".to_string()),
                })
                .collect()),
        }
    }

    async fn generate_introduction(
        &self,
        _pois: &[Poi],
        theme: &str,
    ) -> Result<String, ContentError> {
        if self.fail_introduction {
            return Err(ContentError::Response("scripted introduction error".into()));
        }
        Ok(format!("Welcome to your {} tour!", theme))
    }

    async fn generate_stories(
        &self,
        pois: &[Poi],
        _theme: &str,
    ) -> Result<Vec<String>, ContentError> {
        if self.fail_stories {
            return Err(ContentError::Response("scripted stories error".into()));
        }
        Ok(pois
            .iter()
            .map(|poi| format!("The story of {}.", poi.poi_title))
            .collect())
    }
}

/// Places provider with scripted geocoding, enrichment and route metrics.
pub struct ScriptedPlaces {
    /// Address fragments whose geocode comes back as a non-specific match.
    pub unverifiable: HashSet<String>,
    pub find_place_hits: bool,
    pub metrics: Mutex<VecDeque<RouteMetrics>>,
    /// Used when the metrics queue is empty; `None` makes directions fail.
    pub default_metrics: Option<RouteMetrics>,
    pub geocode_queries: Mutex<Vec<String>>,
}

impl ScriptedPlaces {
    pub fn verifying_everything() -> Self {
        Self {
            unverifiable: HashSet::new(),
            find_place_hits: true,
            metrics: Mutex::new(VecDeque::new()),
            default_metrics: Some(RouteMetrics {
                total_distance_km: 3.0,
                total_duration_minutes: 90.0,
            }),
            geocode_queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PlacesProvider for ScriptedPlaces {
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, PlacesError> {
        self.geocode_queries
            .lock()
            .unwrap()
            .push(address.to_string());
        let vague = self
            .unverifiable
            .iter()
            .any(|fragment| address.contains(fragment.as_str()));

        Ok(vec![GeocodeResult {
            formatted_address: format!("{} (geocoded)", address),
            location: GeoLocation {
                lat: 1.3521,
                lng: 103.8198,
            },
            location_type: if vague { "APPROXIMATE" } else { "ROOFTOP" }.to_string(),
            partial_match: vague,
            types: if vague {
                vec!["locality".to_string()]
            } else {
                vec![
                    "establishment".to_string(),
                    "point_of_interest".to_string(),
                ]
            },
        }])
    }

    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<String, PlacesError> {
        Ok(format!(
            "Resolved address near ({}, {})",
            latitude, longitude
        ))
    }

    async fn find_place(&self, query: &str) -> Result<Option<PlaceDetails>, PlacesError> {
        if !self.find_place_hits {
            return Ok(None);
        }
        Ok(Some(PlaceDetails {
            place_id: format!("place-{}", query.len()),
            name: query.split(',').next().unwrap_or(query).to_string(),
            formatted_address: Some(format!("{} (canonical)", query)),
            location: Some(GeoLocation {
                lat: 1.29,
                lng: 103.85,
            }),
            photo_url: Some("https://example.com/photo.jpg".to_string()),
        }))
    }

    async fn route_metrics(
        &self,
        _origin: &str,
        _waypoints: &[String],
    ) -> Result<RouteMetrics, PlacesError> {
        if let Some(metrics) = self.metrics.lock().unwrap().pop_front() {
            return Ok(metrics);
        }
        match self.default_metrics {
            Some(metrics) => Ok(metrics),
            None => Err(PlacesError::Response("scripted directions error".into())),
        }
    }
}

/// Poll the store until the tour reaches a terminal status.
pub async fn wait_for_terminal(tour_service: &TourService, id: Uuid) -> Tour {
    for _ in 0..200 {
        let tour = tour_service
            .get_tour(id)
            .await
            .expect("store should be reachable")
            .expect("tour should exist");
        if tour.status_code.is_terminal() {
            return tour;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("tour {} never reached a terminal status", id);
}
