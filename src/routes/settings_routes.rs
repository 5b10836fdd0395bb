use axum::{extract::State, routing::get, Extension, Json, Router};

use crate::dto::ApiResponse;
use crate::models::auth::Actor;
use crate::models::settings::{FleetSettings, SettingsPatch};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_settings_router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

async fn get_settings(State(state): State<AppState>) -> Json<ApiResponse<FleetSettings>> {
    Json(ApiResponse::success(state.settings.current().await))
}

async fn update_settings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<ApiResponse<FleetSettings>>, AppError> {
    let settings = state.settings.update(patch, &actor).await?;
    Ok(Json(ApiResponse::success_with_message(
        settings,
        "Settings updated".to_string(),
    )))
}
