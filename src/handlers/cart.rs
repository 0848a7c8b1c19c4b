use crate::{
    auth::AuthUser,
    entities::{CartItemModel, PromoCodeModel},
    errors::ServiceError,
    handlers::common::{no_content_response, success_response},
    services::{
        cart::{AddToCartInput, CartLineDetail, CartValidation},
        pricing::{self, CartSummary},
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/{id}", put(update_item).delete(remove_item))
        .route("/validate", post(validate_cart))
        .route("/summary", get(get_summary))
        .route("/promo", post(apply_promo).delete(remove_promo))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartResponse {
    items: Vec<CartLineDetail>,
    item_count: usize,
}

async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let items = state.cart.load_lines(user.user_id).await?;
    let item_count = items.len();
    Ok(success_response(CartResponse { items, item_count }))
}

async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<AddToCartInput>,
) -> Result<Response, ServiceError> {
    let item = state.cart.add_item(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)).into_response())
}

#[derive(Debug, Deserialize)]
struct UpdateQuantityRequest {
    quantity: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateQuantityResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    item: Option<CartItemModel>,
}

async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Response, ServiceError> {
    let item = state
        .cart
        .update_quantity(user.user_id, item_id, request.quantity)
        .await?;
    let message = match &item {
        Some(_) => "Quantity updated".to_string(),
        None => "Item removed from cart".to_string(),
    };
    Ok(success_response(UpdateQuantityResponse { message, item }))
}

async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.cart.remove_item(user.user_id, item_id).await?;
    Ok(no_content_response())
}

async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    state.cart.clear(user.user_id).await?;
    Ok(no_content_response())
}

/// Returns 400 when the cart fails validation; the body carries the full
/// verdict either way so clients can render the issues.
async fn validate_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let verdict: CartValidation = state.cart.validate(user.user_id).await?;
    let status = if verdict.valid {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(verdict)).into_response())
}

/// Promo fields exposed to cart clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppliedPromo {
    code: String,
    discount_type: crate::entities::DiscountType,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    discount_value: Decimal,
}

impl AppliedPromo {
    fn from_model(promo: &PromoCodeModel) -> Self {
        Self {
            code: promo.code.clone(),
            discount_type: promo.discount_type,
            discount_value: promo.discount_value,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    #[serde(flatten)]
    summary: CartSummary,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    free_shipping_threshold: Decimal,
    applied_promo: Option<AppliedPromo>,
}

async fn get_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let (summary, promo) = state.cart.summary(user.user_id).await?;
    Ok(success_response(SummaryResponse {
        summary,
        free_shipping_threshold: pricing::decimal_from_f64(
            state.config.free_shipping_threshold,
        ),
        applied_promo: promo.as_ref().map(AppliedPromo::from_model),
    }))
}

#[derive(Debug, Deserialize)]
struct ApplyPromoRequest {
    code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyPromoResponse {
    message: String,
    summary: CartSummary,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    discount: Decimal,
    promo_code: AppliedPromo,
}

async fn apply_promo(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ApplyPromoRequest>,
) -> Result<Response, ServiceError> {
    let (promo, summary) = state.cart.apply_promo(user.user_id, &request.code).await?;
    Ok(success_response(ApplyPromoResponse {
        message: format!("Promo code {} applied", promo.code),
        discount: summary.discount,
        promo_code: AppliedPromo::from_model(&promo),
        summary,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemovePromoResponse {
    message: String,
    summary: CartSummary,
}

async fn remove_promo(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let summary = state.cart.remove_promo(user.user_id).await?;
    Ok(success_response(RemovePromoResponse {
        message: "Promo code removed".to_string(),
        summary,
    }))
}
