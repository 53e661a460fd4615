//! Seams to the two external providers.
//!
//! The orchestration pipeline only ever talks to these traits; the real
//! implementations (`GeminiService`, `MapsService`) are injected at startup
//! and swapped for scripted mocks in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use crate::models::tour::{GeoLocation, Poi};

#[derive(Debug)]
pub enum ContentError {
    MissingApiKey,
    Http(reqwest::Error),
    Response(String),
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentError::MissingApiKey => write!(f, "GEMINI_API_KEY not set"),
            ContentError::Http(err) => write!(f, "HTTP error: {}", err),
            ContentError::Response(msg) => write!(f, "Response error: {}", msg),
        }
    }
}

impl Error for ContentError {}

impl From<reqwest::Error> for ContentError {
    fn from(err: reqwest::Error) -> Self {
        ContentError::Http(err)
    }
}

#[derive(Debug)]
pub enum PlacesError {
    MissingApiKey,
    Http(reqwest::Error),
    Response(String),
}

impl fmt::Display for PlacesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacesError::MissingApiKey => write!(f, "GOOGLE_MAPS_API_KEY not set"),
            PlacesError::Http(err) => write!(f, "HTTP error: {}", err),
            PlacesError::Response(msg) => write!(f, "Response error: {}", msg),
        }
    }
}

impl Error for PlacesError {}

impl From<reqwest::Error> for PlacesError {
    fn from(err: reqwest::Error) -> Self {
        PlacesError::Http(err)
    }
}

/// One entry of an ordering response: a rank for the POI at `original_index`
/// (1-based position in the input list), plus optional thematic keywords.
#[derive(Debug, Clone)]
pub struct PoiRanking {
    pub original_index: usize,
    pub order: u32,
    pub story_keywords: Option<String>,
}

/// A forward-geocode hit, carrying everything the verification rules inspect.
#[derive(Debug, Clone)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub location: GeoLocation,
    pub location_type: String,
    pub partial_match: bool,
    pub types: Vec<String>,
}

/// A find-place hit used during enrichment.
#[derive(Debug, Clone)]
pub struct PlaceDetails {
    pub place_id: String,
    pub name: String,
    pub formatted_address: Option<String>,
    pub location: Option<GeoLocation>,
    pub photo_url: Option<String>,
}

/// Aggregated walking-route totals from the directions provider.
#[derive(Debug, Clone, Copy)]
pub struct RouteMetrics {
    pub total_distance_km: f64,
    pub total_duration_minutes: f64,
}

impl RouteMetrics {
    pub fn zero() -> Self {
        Self {
            total_distance_km: 0.0,
            total_duration_minutes: 0.0,
        }
    }

    /// Metrics that fail any constraint check, used when the directions
    /// provider errors out.
    pub fn unreachable() -> Self {
        Self {
            total_distance_km: f64::INFINITY,
            total_duration_minutes: f64::INFINITY,
        }
    }
}

/// The generative-language provider: candidate POIs, guardrail validation,
/// itinerary ordering and narrative text.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Guardrail check: does this request make sense for this location?
    /// An unparseable verdict degrades to `false`; transport errors propagate.
    async fn validate_request(
        &self,
        user_address: &str,
        max_time: &str,
        distance: &str,
        custom_message: &str,
    ) -> Result<bool, ContentError>;

    /// Themed tour options for an address, as name -> one-line summary.
    async fn generate_themes(&self, address: &str) -> Result<HashMap<String, String>, ContentError>;

    /// Candidate POIs for the origin and constraints, title + address only.
    async fn generate_pois(
        &self,
        address: &str,
        time_constraint: &str,
        distance_constraint: &str,
        preferences: &str,
    ) -> Result<Vec<Poi>, ContentError>;

    /// Ask for a round-trip ordering of the verified POIs. `feedback`, when
    /// present, reports the previous attempt's constraint violation.
    async fn order_pois(
        &self,
        pois: &[Poi],
        origin: &str,
        max_time: &str,
        distance: &str,
        theme: &str,
        feedback: Option<&str>,
    ) -> Result<Vec<PoiRanking>, ContentError>;

    /// A short introduction for the finished tour.
    async fn generate_introduction(&self, pois: &[Poi], theme: &str)
        -> Result<String, ContentError>;

    /// Per-POI narrative stories, one call for the whole ordered sequence so
    /// consecutive stories can reference each other. Returned by position.
    async fn generate_stories(&self, pois: &[Poi], theme: &str)
        -> Result<Vec<String>, ContentError>;
}

/// The geocoding/places/directions provider.
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, PlacesError>;

    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<String, PlacesError>;

    async fn find_place(&self, query: &str) -> Result<Option<PlaceDetails>, PlacesError>;

    /// Total walking distance/duration for origin -> waypoints -> origin.
    async fn route_metrics(
        &self,
        origin: &str,
        waypoints: &[String],
    ) -> Result<RouteMetrics, PlacesError>;
}
