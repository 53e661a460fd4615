use actix_web::{HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::env;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

pub async fn health_check() -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let gemini = check_api_key("GEMINI_API_KEY", "Gemini");
    health.services.insert("gemini".to_string(), gemini.clone());

    let maps = check_api_key("GOOGLE_MAPS_API_KEY", "Google Maps");
    health.services.insert("google_maps".to_string(), maps.clone());

    let mongo = check_mongodb_config();
    health.services.insert("mongodb".to_string(), mongo.clone());

    if gemini.status != "ok" || maps.status != "ok" || mongo.status != "ok" {
        health.status = "degraded".to_string();
    }

    HttpResponse::Ok().json(health)
}

fn check_api_key(var: &str, label: &str) -> ServiceStatus {
    match env::var(var) {
        Ok(key) => {
            let masked_key = if key.len() > 8 {
                format!("{}***{}", &key[0..4], &key[key.len() - 4..])
            } else {
                "***".to_string()
            };

            ServiceStatus {
                status: "ok".to_string(),
                details: Some(format!("{} API key configured ({})", label, masked_key)),
            }
        }
        Err(_) => ServiceStatus {
            status: "error".to_string(),
            details: Some(format!("{} not configured", var)),
        },
    }
}

fn check_mongodb_config() -> ServiceStatus {
    match env::var("MONGODB_URI") {
        Ok(_) => ServiceStatus {
            status: "ok".to_string(),
            details: Some("MongoDB URI configured".to_string()),
        },
        Err(_) => ServiceStatus {
            status: "error".to_string(),
            details: Some("MONGODB_URI not configured".to_string()),
        },
    }
}
