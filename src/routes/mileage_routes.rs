use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::dto::mileage_dto::{HistoryParams, RecordMileageRequest};
use crate::dto::ApiResponse;
use crate::models::auth::Actor;
use crate::models::mileage::MileageEntry;
use crate::models::pagination::Page;
use crate::models::vehicle::VehicleRef;
use crate::services::RecordedMileage;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_mileage_router() -> Router<AppState> {
    Router::new()
        .route("/", post(record_mileage))
        .route("/:vehicle/history", get(mileage_history))
}

async fn record_mileage(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<RecordMileageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RecordedMileage>>), AppError> {
    request.validate()?;

    let reference = VehicleRef::parse(&request.vehicle_id);
    let recorded = state
        .mileage
        .record(&reference, request.mileage, &actor, request.notes)
        .await?;

    let message = match &recorded.alert {
        Some(alert) => alert.message.clone(),
        None => "Mileage recorded".to_string(),
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::success_with_message(recorded, message))))
}

async fn mileage_history(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(vehicle): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<ApiResponse<Page<MileageEntry>>>, AppError> {
    let reference = VehicleRef::parse(&vehicle);
    let page = state
        .mileage
        .history(&reference, &params.query(), params.page_request(), &actor)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}
