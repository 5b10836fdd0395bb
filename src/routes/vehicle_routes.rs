use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};

use crate::dto::vehicle_dto::{CreateVehicleRequest, VehicleListQuery};
use crate::dto::ApiResponse;
use crate::models::auth::Actor;
use crate::models::vehicle::{Vehicle, VehicleRef};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles).post(create_vehicle))
        .route("/:vehicle", get(get_vehicle).delete(delete_vehicle))
}

async fn create_vehicle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vehicle>>), AppError> {
    let vehicle = state.vehicles.create(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(vehicle))))
}

async fn list_vehicles(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<VehicleListQuery>,
) -> Result<Json<ApiResponse<Vec<Vehicle>>>, AppError> {
    let vehicles = state.vehicles.list(&actor, query.include_deleted).await?;
    Ok(Json(ApiResponse::success(vehicles)))
}

/// Reconciled against the ledger before it is returned
async fn get_vehicle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(vehicle): Path<String>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let vehicle = state
        .mileage
        .current_vehicle(&VehicleRef::parse(&vehicle), &actor)
        .await?;
    Ok(Json(ApiResponse::success(vehicle)))
}

async fn delete_vehicle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(vehicle): Path<String>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let vehicle = state.vehicles.delete(&VehicleRef::parse(&vehicle), &actor).await?;
    Ok(Json(ApiResponse::success_with_message(
        vehicle,
        "Vehicle deleted".to_string(),
    )))
}
