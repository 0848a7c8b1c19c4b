use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{created_response, no_content_response, success_response},
    services::settings::{CreateSettingInput, UpdateSettingInput},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Json, Router,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/public", get(public_settings))
        .route("/", get(list_settings).post(create_setting))
        .route(
            "/{key}",
            get(get_setting).put(update_setting).delete(delete_setting),
        )
}

/// Cached read; may serve values up to one TTL stale after an admin edit.
async fn public_settings(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let settings = state.settings.public_settings().await?;
    Ok(success_response(settings))
}

async fn list_settings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    user.require_admin()?;
    let settings = state.settings.list().await?;
    Ok(success_response(settings))
}

async fn get_setting(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key): Path<String>,
) -> Result<Response, ServiceError> {
    user.require_admin()?;
    let setting = state.settings.get(&key).await?;
    Ok(success_response(setting))
}

async fn create_setting(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateSettingInput>,
) -> Result<Response, ServiceError> {
    user.require_admin()?;
    let setting = state.settings.create(input).await?;
    Ok(created_response(setting))
}

async fn update_setting(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key): Path<String>,
    Json(input): Json<UpdateSettingInput>,
) -> Result<Response, ServiceError> {
    user.require_admin()?;
    let setting = state.settings.update(&key, input).await?;
    Ok(success_response(setting))
}

async fn delete_setting(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key): Path<String>,
) -> Result<Response, ServiceError> {
    user.require_admin()?;
    state.settings.delete(&key).await?;
    Ok(no_content_response())
}
