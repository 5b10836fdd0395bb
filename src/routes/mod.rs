//! HTTP routes
//!
//! Everything under `/api` requires a bearer token; `/health` and
//! `/metrics` are public.

pub mod activity_routes;
pub mod alert_routes;
pub mod maintenance_routes;
pub mod mileage_routes;
pub mod settings_routes;
pub mod vehicle_routes;

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::metrics;
use crate::middleware::{auth_middleware, cors_middleware, cors_middleware_with_origins, rate_limit_middleware};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Build the full application router
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .nest("/mileage", mileage_routes::create_mileage_router())
        .nest("/alerts", alert_routes::create_alert_router())
        .nest("/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/maintenance", maintenance_routes::create_maintenance_router())
        .nest("/settings", settings_routes::create_settings_router())
        .nest("/activity", activity_routes::create_activity_router())
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let cors = if state.config.cors_origins.is_empty() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(&state.config.cors_origins)
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .nest("/api", api)
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => Json(json!({
            "status": "healthy",
            "service": "fleet_mileage",
            "version": env!("CARGO_PKG_VERSION")
        }))
        .into_response(),
        Err(e) => {
            error!("❌ Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "service": "fleet_mileage" })),
            )
                .into_response()
        }
    }
}

async fn metrics_endpoint() -> Result<Response, AppError> {
    let body = metrics::render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response())
}
