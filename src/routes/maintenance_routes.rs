use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};

use crate::dto::maintenance_dto::{CreateMaintenanceRequest, MaintenanceListParams};
use crate::dto::ApiResponse;
use crate::models::auth::Actor;
use crate::models::maintenance::MaintenanceRecord;
use crate::models::pagination::Page;
use crate::models::vehicle::VehicleRef;
use crate::repositories::CommittedService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_maintenance_router() -> Router<AppState> {
    Router::new().route("/", get(list_maintenance).post(record_maintenance))
}

async fn record_maintenance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateMaintenanceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CommittedService>>), AppError> {
    let committed = state.maintenance.record_service(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(committed))))
}

async fn list_maintenance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<MaintenanceListParams>,
) -> Result<Json<ApiResponse<Page<MaintenanceRecord>>>, AppError> {
    let reference = params.vehicle_id.as_deref().map(VehicleRef::parse);
    let records = state
        .maintenance
        .list(reference.as_ref(), params.page_request(), &actor)
        .await?;
    Ok(Json(ApiResponse::success(records)))
}
