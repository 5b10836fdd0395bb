use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::dto::alert_dto::{AcknowledgeAllResponse, AlertListParams};
use crate::dto::ApiResponse;
use crate::models::alert::Alert;
use crate::models::auth::Actor;
use crate::models::pagination::Page;
use crate::models::vehicle::VehicleRef;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_alert_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_alerts))
        .route("/acknowledge-all", put(acknowledge_all))
        .route("/:id/acknowledge", patch(acknowledge_alert))
}

async fn list_alerts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<AlertListParams>,
) -> Result<Json<ApiResponse<Page<Alert>>>, AppError> {
    let reference = params.vehicle_id.as_deref().map(VehicleRef::parse);
    let alerts = state
        .alerts
        .list(reference.as_ref(), params.acknowledged, params.page_request(), &actor)
        .await?;
    Ok(Json(ApiResponse::success(alerts)))
}

async fn acknowledge_alert(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Alert>>, AppError> {
    let alert = state.alerts.acknowledge(id, &actor).await?;
    Ok(Json(ApiResponse::success(alert)))
}

async fn acknowledge_all(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<AcknowledgeAllResponse>, AppError> {
    let acknowledged = state.alerts.acknowledge_all(&actor).await?;
    Ok(Json(AcknowledgeAllResponse {
        success: true,
        acknowledged,
    }))
}
