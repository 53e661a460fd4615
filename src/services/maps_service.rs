//! Google Maps Platform Service
//!
//! Real [`PlacesProvider`] over the Geocoding, Find Place and Directions web
//! services. Directions requests are always walking mode, and always route
//! back to the origin so the totals describe the full round trip.
//!
//! ## Setup
//! Set `GOOGLE_MAPS_API_KEY` with Geocoding, Places and Directions enabled.

use async_trait::async_trait;
use serde::Deserialize;
use std::{env, time::Duration};

use crate::models::tour::GeoLocation;
use crate::services::providers::{
    GeocodeResult, PlaceDetails, PlacesError, PlacesProvider, RouteMetrics,
};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const FIND_PLACE_URL: &str =
    "https://maps.googleapis.com/maps/api/place/findplacefromtext/json";
const PLACE_PHOTO_URL: &str = "https://maps.googleapis.com/maps/api/place/photo";
const DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const PHOTO_MAX_WIDTH: u32 = 400;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeEntry>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    formatted_address: String,
    geometry: Geometry,
    #[serde(default)]
    partial_match: bool,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
    #[serde(default)]
    location_type: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    status: String,
    #[serde(default)]
    candidates: Vec<PlaceCandidate>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceCandidate {
    place_id: String,
    name: String,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    photo_reference: String,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<Route>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    distance: ValueField,
    duration: ValueField,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    /// Meters for distances, seconds for durations.
    value: f64,
}

pub struct MapsService {
    client: reqwest::Client,
    api_key: String,
}

impl MapsService {
    pub fn new() -> Result<Self, PlacesError> {
        let api_key = env::var("GOOGLE_MAPS_API_KEY").map_err(|_| PlacesError::MissingApiKey)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, api_key })
    }

    fn photo_url(&self, photo_reference: &str) -> String {
        format!(
            "{}?maxwidth={}&photo_reference={}&key={}",
            PLACE_PHOTO_URL, PHOTO_MAX_WIDTH, photo_reference, self.api_key
        )
    }

    async fn geocode_query(&self, params: &[(&str, &str)]) -> Result<Vec<GeocodeResult>, PlacesError> {
        let response: GeocodeResponse = self
            .client
            .get(GEOCODE_URL)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .json()
            .await
            .map_err(PlacesError::Http)?;

        match response.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok(response
                .results
                .into_iter()
                .map(|entry| GeocodeResult {
                    formatted_address: entry.formatted_address,
                    location: GeoLocation {
                        lat: entry.geometry.location.lat,
                        lng: entry.geometry.location.lng,
                    },
                    location_type: entry.geometry.location_type,
                    partial_match: entry.partial_match,
                    types: entry.types,
                })
                .collect()),
            status => Err(PlacesError::Response(format!(
                "Geocoding failed with status {}: {}",
                status,
                response.error_message.as_deref().unwrap_or("no details")
            ))),
        }
    }
}

#[async_trait]
impl PlacesProvider for MapsService {
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, PlacesError> {
        self.geocode_query(&[("address", address)]).await
    }

    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<String, PlacesError> {
        let latlng = format!("{},{}", latitude, longitude);
        let results = self.geocode_query(&[("latlng", latlng.as_str())]).await?;
        results
            .into_iter()
            .next()
            .map(|r| r.formatted_address)
            .ok_or_else(|| {
                PlacesError::Response(format!("No address found for coordinates {}", latlng))
            })
    }

    async fn find_place(&self, query: &str) -> Result<Option<PlaceDetails>, PlacesError> {
        let response: FindPlaceResponse = self
            .client
            .get(FIND_PLACE_URL)
            .query(&[
                ("input", query),
                ("inputtype", "textquery"),
                ("fields", "place_id,name,formatted_address,geometry,photos"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(PlacesError::Http)?;

        match response.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            status => {
                return Err(PlacesError::Response(format!(
                    "Find Place failed with status {}: {}",
                    status,
                    response.error_message.as_deref().unwrap_or("no details")
                )))
            }
        }

        Ok(response.candidates.into_iter().next().map(|candidate| {
            let photo_url = candidate
                .photos
                .first()
                .map(|photo| self.photo_url(&photo.photo_reference));
            PlaceDetails {
                place_id: candidate.place_id,
                name: candidate.name,
                formatted_address: candidate.formatted_address,
                location: candidate.geometry.map(|g| GeoLocation {
                    lat: g.location.lat,
                    lng: g.location.lng,
                }),
                photo_url,
            }
        }))
    }

    async fn route_metrics(
        &self,
        origin: &str,
        waypoints: &[String],
    ) -> Result<RouteMetrics, PlacesError> {
        let stops = clean_waypoints(origin, waypoints);
        if stops.is_empty() {
            return Ok(RouteMetrics::zero());
        }

        let waypoint_param = stops.join("|");
        let response: DirectionsResponse = self
            .client
            .get(DIRECTIONS_URL)
            .query(&[
                ("origin", origin),
                // A walking tour is a loop; the walk back counts.
                ("destination", origin),
                ("waypoints", waypoint_param.as_str()),
                ("mode", "walking"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(PlacesError::Http)?;

        if response.status != "OK" {
            return Err(PlacesError::Response(format!(
                "Directions failed with status {}: {}",
                response.status,
                response.error_message.as_deref().unwrap_or("no details")
            )));
        }

        let route = response.routes.into_iter().next().ok_or_else(|| {
            PlacesError::Response("Directions returned no routes".to_string())
        })?;

        let (meters, seconds) = route.legs.iter().fold((0.0, 0.0), |(m, s), leg| {
            (m + leg.distance.value, s + leg.duration.value)
        });

        Ok(RouteMetrics {
            total_distance_km: meters / 1000.0,
            total_duration_minutes: seconds / 60.0,
        })
    }
}

/// Drops empty waypoints and ones identical to the origin; the Directions API
/// rejects duplicate endpoints as via-points.
fn clean_waypoints(origin: &str, waypoints: &[String]) -> Vec<String> {
    waypoints
        .iter()
        .filter(|w| !w.trim().is_empty() && w.as_str() != origin)
        .cloned()
        .collect()
}
