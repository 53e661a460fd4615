use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use walking_tour_api::db::mongo::{create_mongo_client, MongoTourStore};
use walking_tour_api::services::gemini_service::GeminiService;
use walking_tour_api::services::maps_service::MapsService;
use walking_tour_api::{routes, AppState};

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    println!("Application starting...");

    env_logger::init_from_env(Env::default().default_filter_or("info"));
    println!("Logger initialized");

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    } else {
        println!("Release mode");
    }

    let host = std::env::var("HOST").unwrap_or_else(|_| HOST.to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| PORT.to_string())
        .parse()
        .unwrap_or(PORT);
    println!("Attempting to bind to {}:{}", host, port);

    let mongo_uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
    println!("Got MongoDB URI, attempting connection...");
    let client = create_mongo_client(&mongo_uri).await;
    println!("MongoDB connection established");

    let store = Arc::new(MongoTourStore::new(client));
    let content = Arc::new(GeminiService::new().expect("GEMINI_API_KEY must be set"));
    let places = Arc::new(MapsService::new().expect("GOOGLE_MAPS_API_KEY must be set"));
    let state = AppState::new(store, content, places);

    println!("Starting HTTP server...");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(web::Data::new(state.clone()))
            .route("/health", web::get().to(routes::health::health_check))
            .service(
                web::scope("/api/v1")
                    .route("/guardrail", web::post().to(routes::tour::guardrail))
                    .route(
                        "/theme_options",
                        web::post().to(routes::tour::theme_options),
                    )
                    .route("/generate_poi", web::post().to(routes::tour::generate_poi))
                    .route("/filter_poi", web::post().to(routes::tour::filter_poi))
                    .route(
                        "/tours/{id}",
                        web::get().to(routes::tour::get_tour_by_id),
                    ),
            )
    })
    .bind((host, port))?
    .run()
    .await
}
