//! Tour lifecycle over the [`TourStore`].
//!
//! All status changes go through here so the transition table in
//! [`TourStatus::can_transition_to`] is enforced in exactly one place.

use std::sync::Arc;
use uuid::Uuid;

use crate::db::{StoreError, TourStore, TourUpdate};
use crate::helpers::tour_helpers::{parse_distance_to_km, parse_duration_to_minutes};
use crate::models::tour::{GeoLocation, Poi, Tour, TourConstraints, TourStatus};

#[derive(Debug)]
pub enum TourServiceError {
    Store(StoreError),
    NotFound(Uuid),
    InvalidTransition {
        from: TourStatus,
        to: TourStatus,
    },
}

impl std::fmt::Display for TourServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TourServiceError::Store(e) => write!(f, "Store error: {}", e),
            TourServiceError::NotFound(id) => write!(f, "Tour {} not found", id),
            TourServiceError::InvalidTransition { from, to } => {
                write!(f, "Invalid status transition: {} -> {}", from, to)
            }
        }
    }
}

impl std::error::Error for TourServiceError {}

impl From<StoreError> for TourServiceError {
    fn from(e: StoreError) -> Self {
        TourServiceError::Store(e)
    }
}

pub struct TourService {
    store: Arc<dyn TourStore>,
}

impl TourService {
    pub fn new(store: Arc<dyn TourStore>) -> Self {
        Self { store }
    }

    /// Create and persist a new tour record. Constraints are parsed into
    /// numeric limits once, here, so the rest of the pipeline never re-parses
    /// the raw strings.
    pub async fn create_tour(
        &self,
        user_address: String,
        user_location: Option<GeoLocation>,
        constraints: TourConstraints,
        status_code: TourStatus,
    ) -> Result<Tour, TourServiceError> {
        let tour = Tour {
            id: Uuid::new_v4(),
            user_address,
            user_location,
            theme: constraints.custom.clone(),
            status_code,
            max_distance_km: parse_distance_to_km(&constraints.distance),
            max_duration_minutes: parse_duration_to_minutes(&constraints.max_time),
            constraints,
            filtered_candidate_poi_list: Vec::new(),
            pois: Vec::new(),
            introduction: None,
            error_message: None,
            created_at: Some(bson::DateTime::now()),
            updated_at: Some(bson::DateTime::now()),
        };

        self.store.insert(&tour).await?;
        log::info!("Created tour {} with status {}", tour.id, tour.status_code);
        Ok(tour)
    }

    pub async fn get_tour(&self, id: Uuid) -> Result<Option<Tour>, TourServiceError> {
        Ok(self.store.find_by_id(id).await?)
    }

    async fn require_tour(&self, id: Uuid) -> Result<Tour, TourServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(TourServiceError::NotFound(id))
    }

    /// Advance the tour to `next`, rejecting transitions the state machine
    /// does not allow.
    pub async fn update_status(&self, id: Uuid, next: TourStatus) -> Result<(), TourServiceError> {
        let tour = self.require_tour(id).await?;
        if !tour.status_code.can_transition_to(next) {
            return Err(TourServiceError::InvalidTransition {
                from: tour.status_code,
                to: next,
            });
        }
        self.store.update(id, TourUpdate::status(next)).await?;
        log::info!("Tour {}: {} -> {}", id, tour.status_code, next);
        Ok(())
    }

    pub async fn set_user_location(
        &self,
        id: Uuid,
        user_location: GeoLocation,
    ) -> Result<(), TourServiceError> {
        let update = TourUpdate {
            user_location: Some(user_location),
            ..Default::default()
        };
        Ok(self.store.update(id, update).await?)
    }

    pub async fn update_filtered_pois(
        &self,
        id: Uuid,
        pois: Vec<Poi>,
    ) -> Result<(), TourServiceError> {
        let update = TourUpdate {
            filtered_candidate_poi_list: Some(pois),
            ..Default::default()
        };
        Ok(self.store.update(id, update).await?)
    }

    pub async fn set_introduction(
        &self,
        id: Uuid,
        introduction: String,
    ) -> Result<(), TourServiceError> {
        let update = TourUpdate {
            introduction: Some(introduction),
            ..Default::default()
        };
        Ok(self.store.update(id, update).await?)
    }

    /// Write the final POI list and mark the tour completed in one update.
    pub async fn finalize_tour(&self, id: Uuid, pois: Vec<Poi>) -> Result<(), TourServiceError> {
        let tour = self.require_tour(id).await?;
        if !tour.status_code.can_transition_to(TourStatus::Completed) {
            return Err(TourServiceError::InvalidTransition {
                from: tour.status_code,
                to: TourStatus::Completed,
            });
        }
        let update = TourUpdate {
            status_code: Some(TourStatus::Completed),
            pois: Some(pois),
            ..Default::default()
        };
        self.store.update(id, update).await?;
        log::info!("Tour {} completed", id);
        Ok(())
    }

    /// Mark the tour failed with a reason. Failing an already-terminal tour
    /// is a no-op so late pipeline errors cannot clobber a completed record.
    pub async fn mark_failed(&self, id: Uuid, reason: String) -> Result<(), TourServiceError> {
        let tour = self.require_tour(id).await?;
        if tour.status_code.is_terminal() {
            log::warn!(
                "Ignoring failure for tour {} already in terminal status {}: {}",
                id,
                tour.status_code,
                reason
            );
            return Ok(());
        }
        let update = TourUpdate {
            status_code: Some(TourStatus::Failed),
            error_message: Some(reason.clone()),
            ..Default::default()
        };
        self.store.update(id, update).await?;
        log::error!("Tour {} failed: {}", id, reason);
        Ok(())
    }
}
