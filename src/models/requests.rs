use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::tour::TourConstraints;

#[derive(Debug, Deserialize)]
pub struct GuardrailRequest {
    pub user_address: String,
    pub constraints: TourConstraints,
}

#[derive(Debug, Serialize)]
pub struct GuardrailResponse {
    pub transaction_id: Uuid,
    pub valid: bool,
}

#[derive(Debug, Deserialize)]
pub struct ThemeOptionsRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct ThemeOptionsResponse {
    pub themes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct GeneratePoiRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub constraints: TourConstraints,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PoiCandidate {
    pub poi_title: String,
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct GeneratePoiResponse {
    pub user_address: String,
    pub pois: Vec<PoiCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct FilterPoiRequest {
    pub pois: Vec<PoiCandidate>,
}

#[derive(Debug, Serialize)]
pub struct FilterPoiResponse {
    pub verified_pois: Vec<PoiCandidate>,
    pub total_input: usize,
    pub total_verified: usize,
}
