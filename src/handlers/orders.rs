use crate::{
    auth::AuthUser,
    entities::{OrderModel, OrderStatus},
    errors::ServiceError,
    handlers::common::{success_response, Pagination},
    services::orders::{CreateOrderInput, OrderDetail, OrderListQuery, PaymentInstructions},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/{id}", get(get_order))
}

/// The order fields echoed back on creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedOrder {
    id: Uuid,
    order_number: String,
    status: OrderStatus,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    total: Decimal,
    payment_method: String,
}

impl CreatedOrder {
    fn from_model(order: &OrderModel) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number.clone(),
            status: order.status,
            total: order.total,
            payment_method: order.payment_method.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderResponse {
    message: String,
    order: CreatedOrder,
    payment: PaymentInstructions,
}

async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateOrderInput>,
) -> Result<Response, ServiceError> {
    let (order, payment) = state.orders.create(user.user_id, input).await?;
    Ok(success_response(CreateOrderResponse {
        message: format!("Order {} created", order.order_number),
        order: CreatedOrder::from_model(&order),
        payment,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderListResponse {
    orders: Vec<OrderModel>,
    pagination: Pagination,
}

async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Response, ServiceError> {
    let (orders, total) = state.orders.list(user.user_id, &query).await?;
    let pagination = Pagination::new(query.page.max(1), query.limit.clamp(1, 100), total);
    Ok(success_response(OrderListResponse { orders, pagination }))
}

async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let detail: OrderDetail = state
        .orders
        .get(order_id, user.user_id, user.is_admin())
        .await?;
    Ok(success_response(detail))
}
