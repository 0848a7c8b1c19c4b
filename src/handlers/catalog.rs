use crate::{
    auth::AuthUser,
    entities::{ProductModel, ProductVariantModel},
    errors::ServiceError,
    handlers::common::{success_response, Pagination},
    services::catalog::UpdateProductInput,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product).put(update_product))
        .route("/products/{id}/variants", get(list_variants))
        .route("/properties/{id}", get(get_property))
        .route("/activities/{id}", get(get_activity))
}

// Pagination fields are inlined rather than flattened: serde(flatten)
// buffers query values as strings and the u64 fields then fail to parse
// under `Query`.
#[derive(Debug, Deserialize)]
struct ListProductsQuery {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_limit")]
    limit: u64,
    #[serde(default)]
    include_inactive: bool,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductListResponse {
    products: Vec<ProductModel>,
    pagination: Pagination,
}

async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Response, ServiceError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let (products, total) = state
        .catalog
        .list_products(!query.include_inactive, page, limit)
        .await?;
    Ok(success_response(ProductListResponse {
        products,
        pagination: Pagination::new(page, limit, total),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductResponse {
    product: ProductModel,
    variants: Vec<ProductVariantModel>,
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let product = state.catalog.get_product(id).await?;
    let variants = state.catalog.list_variants(id).await?;
    Ok(success_response(ProductResponse { product, variants }))
}

async fn list_variants(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    // 404 for unknown products rather than an empty list
    state.catalog.get_product(id).await?;
    let variants = state.catalog.list_variants(id).await?;
    Ok(success_response(variants))
}

async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> Result<Response, ServiceError> {
    user.require_admin()?;
    let product = state.catalog.update_product(id, input).await?;
    Ok(success_response(product))
}

async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let property = state.catalog.get_property(id).await?;
    Ok(success_response(property))
}

async fn get_activity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let activity = state.catalog.get_activity(id).await?;
    Ok(success_response(activity))
}
