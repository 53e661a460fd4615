pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use uuid::Uuid;

use crate::models::tour::{GeoLocation, Poi, Tour, TourStatus};

#[derive(Debug)]
pub enum StoreError {
    Database(String),
    Serialization(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(msg) => write!(f, "Database error: {}", msg),
            StoreError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl Error for StoreError {}

/// A field-merge update for a tour record. Only the fields that are `Some`
/// are written; everything else is left untouched (last-write-wins, no
/// optimistic concurrency — the design relies on one pipeline driver per
/// transaction id).
#[derive(Debug, Default, Clone)]
pub struct TourUpdate {
    pub status_code: Option<TourStatus>,
    pub user_location: Option<GeoLocation>,
    pub filtered_candidate_poi_list: Option<Vec<Poi>>,
    pub pois: Option<Vec<Poi>>,
    pub introduction: Option<String>,
    pub error_message: Option<String>,
}

impl TourUpdate {
    pub fn status(status_code: TourStatus) -> Self {
        Self {
            status_code: Some(status_code),
            ..Default::default()
        }
    }

    /// Merge semantics shared by the in-memory store.
    pub fn apply_to(&self, tour: &mut Tour) {
        if let Some(status_code) = self.status_code {
            tour.status_code = status_code;
        }
        if let Some(user_location) = self.user_location {
            tour.user_location = Some(user_location);
        }
        if let Some(ref filtered) = self.filtered_candidate_poi_list {
            tour.filtered_candidate_poi_list = filtered.clone();
        }
        if let Some(ref pois) = self.pois {
            tour.pois = pois.clone();
        }
        if let Some(ref introduction) = self.introduction {
            tour.introduction = Some(introduction.clone());
        }
        if let Some(ref error_message) = self.error_message {
            tour.error_message = Some(error_message.clone());
        }
        tour.updated_at = Some(bson::DateTime::now());
    }
}

/// Document persistence for tours, keyed by transaction id.
#[async_trait]
pub trait TourStore: Send + Sync {
    async fn insert(&self, tour: &Tour) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tour>, StoreError>;

    async fn update(&self, id: Uuid, update: TourUpdate) -> Result<(), StoreError>;
}
