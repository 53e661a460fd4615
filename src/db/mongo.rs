use async_trait::async_trait;
use mongodb::{
    bson::{doc, Document},
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::{StoreError, TourStore, TourUpdate};
use crate::models::tour::Tour;

const DATABASE: &str = "WalkingTours";
const COLLECTION: &str = "Tours";

pub async fn create_mongo_client(uri: &str) -> Arc<Client> {
    println!("Connecting to MongoDB: {}", uri);

    // Configure MongoDB client options with more robust settings
    let mut client_options = ClientOptions::parse(uri)
        .await
        .expect("MongoDB URI may be incorrect! Failed to parse.");

    // Set a reasonable timeout for operations
    client_options.connect_timeout = Some(Duration::from_secs(10));
    client_options.server_selection_timeout = Some(Duration::from_secs(10));
    client_options.max_pool_size = Some(10);
    client_options.min_pool_size = Some(1);

    // Set the server API if using MongoDB 5.0+
    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);

    // Create the client and check if it can connect
    let client =
        Client::with_options(client_options).expect("Failed to create MongoDB client with options");

    // Test the connection to make sure it works
    match client
        .database(DATABASE)
        .run_command(doc! {"ping": 1})
        .await
    {
        Ok(_) => println!("Successfully connected to MongoDB and verified with ping command"),
        Err(e) => {
            eprintln!("WARNING: Connected to MongoDB but ping test failed: {}", e);
            eprintln!("The API may still work, but some functionality might be impaired");
        }
    }

    Arc::new(client)
}

/// Tour persistence backed by the `WalkingTours.Tours` collection. Tours are
/// keyed by their `id` field (the transaction id), and updates are `$set`
/// merges of only the fields carried by the [`TourUpdate`].
pub struct MongoTourStore {
    client: Arc<Client>,
}

impl MongoTourStore {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    fn collection(&self) -> Collection<Tour> {
        self.client.database(DATABASE).collection(COLLECTION)
    }
}

#[async_trait]
impl TourStore for MongoTourStore {
    async fn insert(&self, tour: &Tour) -> Result<(), StoreError> {
        self.collection()
            .insert_one(tour)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tour>, StoreError> {
        self.collection()
            .find_one(doc! { "id": id.to_string() })
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn update(&self, id: Uuid, update: TourUpdate) -> Result<(), StoreError> {
        let mut set = Document::new();

        if let Some(status_code) = update.status_code {
            set.insert("status_code", status_code.as_str());
        }
        if let Some(user_location) = update.user_location {
            let value = bson::to_bson(&user_location)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            set.insert("user_location", value);
        }
        if let Some(filtered) = update.filtered_candidate_poi_list {
            let value = bson::to_bson(&filtered)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            set.insert("filtered_candidate_poi_list", value);
        }
        if let Some(pois) = update.pois {
            let value =
                bson::to_bson(&pois).map_err(|e| StoreError::Serialization(e.to_string()))?;
            set.insert("pois", value);
        }
        if let Some(introduction) = update.introduction {
            set.insert("introduction", introduction);
        }
        if let Some(error_message) = update.error_message {
            set.insert("error_message", error_message);
        }
        set.insert("updated_at", bson::DateTime::now());

        self.collection()
            .update_one(doc! { "id": id.to_string() }, doc! { "$set": set })
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}
