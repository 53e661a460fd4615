pub mod gemini_service;
pub mod maps_service;
pub mod poi_service;
pub mod providers;
pub mod tour_orchestration_service;
pub mod tour_service;
