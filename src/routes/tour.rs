use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;

use crate::models::requests::{
    FilterPoiRequest, FilterPoiResponse, GeneratePoiRequest, GeneratePoiResponse,
    GuardrailRequest, GuardrailResponse, PoiCandidate, ThemeOptionsRequest, ThemeOptionsResponse,
};
use crate::models::tour::Poi;
use crate::AppState;

/// POST /api/v1/guardrail
///
/// Validates the tour request, creates the tour record and, when the request
/// passes the guardrail, starts the background pipeline. The response returns
/// immediately with the transaction id to poll.
pub async fn guardrail(
    data: web::Data<AppState>,
    payload: web::Json<GuardrailRequest>,
) -> impl Responder {
    let payload = payload.into_inner();
    if payload.user_address.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "user_address must not be empty"
        }));
    }

    match data
        .orchestrator
        .validate_and_create(&payload.user_address, payload.constraints)
        .await
    {
        Ok((transaction_id, valid)) => {
            if valid {
                data.orchestrator.spawn_pipeline(transaction_id);
            }
            HttpResponse::Ok().json(GuardrailResponse {
                transaction_id,
                valid,
            })
        }
        Err(e) => {
            log::error!("Guardrail validation failed: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": format!("Failed to validate request: {}", e)
            }))
        }
    }
}

/// GET /api/v1/tours/{id}
pub async fn get_tour_by_id(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Invalid transaction id"
            }))
        }
    };

    match data.tour_service.get_tour(id).await {
        Ok(Some(tour)) => HttpResponse::Ok().json(tour),
        Ok(None) => HttpResponse::NotFound().json(json!({
            "error": format!("Tour {} not found", id)
        })),
        Err(e) => {
            log::error!("Failed to fetch tour {}: {}", id, e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch tour"
            }))
        }
    }
}

/// POST /api/v1/theme_options
pub async fn theme_options(
    data: web::Data<AppState>,
    payload: web::Json<ThemeOptionsRequest>,
) -> impl Responder {
    match data.content.generate_themes(&payload.address).await {
        Ok(themes) => HttpResponse::Ok().json(ThemeOptionsResponse { themes }),
        Err(e) => {
            log::error!("Theme generation failed: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": format!("Failed to generate theme options: {}", e)
            }))
        }
    }
}

/// POST /api/v1/generate_poi
///
/// Standalone candidate generation from raw coordinates, without creating a
/// tour record.
pub async fn generate_poi(
    data: web::Data<AppState>,
    payload: web::Json<GeneratePoiRequest>,
) -> impl Responder {
    let payload = payload.into_inner();

    let user_address = match data
        .places
        .reverse_geocode(payload.latitude, payload.longitude)
        .await
    {
        Ok(address) => address,
        Err(e) => {
            log::error!(
                "Reverse geocoding failed for ({}, {}): {}",
                payload.latitude,
                payload.longitude,
                e
            );
            return HttpResponse::InternalServerError().json(json!({
                "error": format!("Failed to resolve coordinates: {}", e)
            }));
        }
    };

    match data
        .poi_service
        .generate_candidates(
            &user_address,
            &payload.constraints.max_time,
            &payload.constraints.distance,
            &payload.constraints.custom,
        )
        .await
    {
        Ok(pois) => {
            let pois = pois
                .into_iter()
                .map(|poi| PoiCandidate {
                    poi_title: poi.poi_title,
                    address: poi.address,
                })
                .collect();
            HttpResponse::Ok().json(GeneratePoiResponse { user_address, pois })
        }
        Err(e) => {
            log::error!("POI generation failed: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": format!("Failed to generate POIs: {}", e)
            }))
        }
    }
}

/// POST /api/v1/filter_poi
///
/// Standalone geocode verification of a candidate list.
pub async fn filter_poi(
    data: web::Data<AppState>,
    payload: web::Json<FilterPoiRequest>,
) -> impl Responder {
    let candidates: Vec<Poi> = payload
        .into_inner()
        .pois
        .into_iter()
        .map(|c| Poi::candidate(c.poi_title, c.address))
        .collect();
    let total_input = candidates.len();

    let verified = data.poi_service.verify_candidates(candidates).await;
    let verified_pois: Vec<PoiCandidate> = verified
        .into_iter()
        .map(|poi| PoiCandidate {
            poi_title: poi.poi_title,
            address: poi.address,
        })
        .collect();

    HttpResponse::Ok().json(FilterPoiResponse {
        total_verified: verified_pois.len(),
        total_input,
        verified_pois,
    })
}
