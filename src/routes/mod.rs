//! Rutas de la API
//!
//! Todas las rutas bajo `/api` requieren un token Bearer; `/health` es pública.

pub mod refueling_routes;
pub mod vehicle_routes;

use axum::{middleware, response::Json, routing::get, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_middleware, cors_middleware};
use crate::state::AppState;

/// Construir el router completo de la aplicación
pub fn create_app_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/refuelings", refueling_routes::create_refueling_router())
        .nest("/vehicles", vehicle_routes::create_vehicle_router())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_middleware(&state.config))
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "fuel_ledger",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
