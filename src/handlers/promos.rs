use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::created_response,
    services::promos::CreatePromoCodeInput,
    AppState,
};
use axum::{extract::State, response::Response, routing::post, Json, Router};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(create_promo_code))
}

async fn create_promo_code(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreatePromoCodeInput>,
) -> Result<Response, ServiceError> {
    user.require_admin()?;
    let promo = state.promos.create_code(input).await?;
    Ok(created_response(promo))
}
