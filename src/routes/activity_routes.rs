use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};

use crate::dto::{ActivityQuery, ApiResponse};
use crate::models::activity::ActivityEvent;
use crate::models::auth::Actor;
use crate::services::AuthorizationService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_activity_router() -> Router<AppState> {
    Router::new().route("/", get(recent_activity))
}

async fn recent_activity(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ApiResponse<Vec<ActivityEvent>>>, AppError> {
    AuthorizationService::new().require_fleet_manager(&actor, "view activity")?;

    let events = state.store.recent_activity(query.limit()).await?;
    Ok(Json(ApiResponse::success(events)))
}
