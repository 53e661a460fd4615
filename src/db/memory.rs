use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{StoreError, TourStore, TourUpdate};
use crate::models::tour::Tour;

/// In-process tour store with the same field-merge semantics as the MongoDB
/// store. Used by tests and local experimentation; nothing about the pipeline
/// cares which one it gets.
#[derive(Default)]
pub struct MemoryTourStore {
    tours: RwLock<HashMap<Uuid, Tour>>,
}

impl MemoryTourStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TourStore for MemoryTourStore {
    async fn insert(&self, tour: &Tour) -> Result<(), StoreError> {
        self.tours.write().await.insert(tour.id, tour.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tour>, StoreError> {
        Ok(self.tours.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, update: TourUpdate) -> Result<(), StoreError> {
        let mut tours = self.tours.write().await;
        let tour = tours
            .get_mut(&id)
            .ok_or_else(|| StoreError::Database(format!("tour {} not found", id)))?;
        update.apply_to(tour);
        Ok(())
    }
}
