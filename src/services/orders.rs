//! Order and booking creation.
//!
//! Items are validated fail-fast before any write. The write itself is one
//! transaction: order row, child rows, stock decrements, and (for product
//! orders) the cart wipe all commit or roll back together. Stock decrements
//! use a conditional UPDATE so two checkouts racing for the last unit cannot
//! both succeed.

use crate::{
    entities::{
        activity_booking, cart_item, order, order_item, product, product_variant,
        property_booking, Activity, ActivityBooking, ActivityBookingModel, ActivityModel,
        BookingStatus, Order, OrderItem, OrderItemModel, OrderModel, OrderStatus, OrderType,
        PaymentStatus, Product, ProductModel, ProductVariant, ProductVariantModel, Property,
        PropertyBooking, PropertyBookingModel, PropertyModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        catalog::{effective_price, effective_stock},
        pricing::{self, OrderTotals, PricingPolicy},
    },
};
use chrono::{NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Attempts before giving up on an order number collision.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    policy: PricingPolicy,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        policy: PricingPolicy,
    ) -> Self {
        Self {
            db,
            event_sender,
            policy,
        }
    }

    /// Creates an order with its child rows in a single transaction and
    /// returns the order with payment instructions for the chosen method.
    #[instrument(skip(self, input), fields(order_type = ?input.order_type))]
    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<(OrderModel, PaymentInstructions), ServiceError> {
        input.validate()?;
        if input.items.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Order must contain at least one item".to_string(),
            ));
        }

        let validated = self.validate_items(input.order_type, &input.items).await?;
        // Line totals stay unrounded; the subtotal is rounded once.
        let subtotal: Decimal = validated.iter().map(ValidatedItem::line_total).sum();
        let totals = pricing::order_totals(&self.policy, input.order_type, subtotal);

        let order = self
            .commit_with_retry(user_id, &input, &validated, &totals)
            .await?;

        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id: order.id,
                order_number: order.order_number.clone(),
            })
            .await;
        for item in &validated {
            match item {
                ValidatedItem::Property { property, .. } => {
                    self.event_sender
                        .send_or_log(Event::PropertyBooked {
                            property_id: property.id,
                            order_id: order.id,
                        })
                        .await;
                }
                ValidatedItem::Activity { activity, .. } => {
                    self.event_sender
                        .send_or_log(Event::ActivityBooked {
                            activity_id: activity.id,
                            order_id: order.id,
                        })
                        .await;
                }
                ValidatedItem::Product { .. } => {}
            }
        }

        info!(order_number = %order.order_number, total = %order.total, "order created");
        let instructions = payment_instructions(&order);
        Ok((order, instructions))
    }

    /// Lists the user's orders, newest first, optionally filtered by status
    /// and type.
    pub async fn list(
        &self,
        user_id: Uuid,
        query: &OrderListQuery,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let page = query.page.max(1);
        let limit = query.limit.clamp(1, 100);

        let mut find = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt);
        if let Some(status) = query.status {
            find = find.filter(order::Column::Status.eq(status));
        }
        if let Some(order_type) = query.order_type {
            find = find.filter(order::Column::OrderType.eq(order_type));
        }

        let paginator = find.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;
        Ok((orders, total))
    }

    /// Fetches one order with its child rows. Non-admins can only read
    /// their own orders.
    pub async fn get(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        is_admin: bool,
    ) -> Result<OrderDetail, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;
        if order.user_id != user_id && !is_admin {
            return Err(ServiceError::Forbidden(
                "Order belongs to another user".to_string(),
            ));
        }

        let items = order.find_related(OrderItem).all(&*self.db).await?;
        let property_bookings = order.find_related(PropertyBooking).all(&*self.db).await?;
        let activity_bookings = order.find_related(ActivityBooking).all(&*self.db).await?;

        Ok(OrderDetail {
            order,
            items,
            property_bookings,
            activity_bookings,
        })
    }

    async fn validate_items(
        &self,
        order_type: OrderType,
        items: &[OrderItemInput],
    ) -> Result<Vec<ValidatedItem>, ServiceError> {
        let mut validated = Vec::with_capacity(items.len());
        for item in items {
            let checked = match order_type {
                OrderType::Product => self.validate_product_item(item).await?,
                OrderType::Property => self.validate_property_item(item).await?,
                OrderType::Activity => self.validate_activity_item(item).await?,
            };
            validated.push(checked);
        }
        Ok(validated)
    }

    async fn validate_product_item(
        &self,
        item: &OrderItemInput,
    ) -> Result<ValidatedItem, ServiceError> {
        let product_id = item.product_id.ok_or_else(|| {
            ServiceError::InvalidInput("productId is required for product orders".to_string())
        })?;
        if item.quantity < 1 {
            return Err(ServiceError::InvalidInput(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;
        if !product.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "{} is not available",
                product.name
            )));
        }

        let variant = match item.variant_id {
            Some(variant_id) => {
                let variant = ProductVariant::find_by_id(variant_id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Variant {variant_id} not found"))
                    })?;
                if variant.product_id != product.id {
                    return Err(ServiceError::InvalidInput(
                        "Variant does not belong to this product".to_string(),
                    ));
                }
                if !variant.is_active {
                    return Err(ServiceError::InvalidOperation(format!(
                        "The selected option for {} is not available",
                        product.name
                    )));
                }
                Some(variant)
            }
            None => None,
        };

        if let Some(stock) = effective_stock(&product, variant.as_ref()) {
            if stock < item.quantity {
                return Err(ServiceError::InsufficientStock {
                    name: product.name.clone(),
                    available: stock,
                    requested: item.quantity,
                });
            }
        }

        let unit_price = effective_price(&product, variant.as_ref());
        let line_total = unit_price * Decimal::from(item.quantity);
        Ok(ValidatedItem::Product {
            product,
            variant,
            quantity: item.quantity,
            unit_price,
            line_total,
        })
    }

    async fn validate_property_item(
        &self,
        item: &OrderItemInput,
    ) -> Result<ValidatedItem, ServiceError> {
        let property_id = item.property_id.ok_or_else(|| {
            ServiceError::InvalidInput("propertyId is required for property orders".to_string())
        })?;
        let check_in = item.check_in.ok_or_else(|| {
            ServiceError::InvalidInput("checkIn is required for property orders".to_string())
        })?;
        let check_out = item.check_out.ok_or_else(|| {
            ServiceError::InvalidInput("checkOut is required for property orders".to_string())
        })?;
        if check_out <= check_in {
            return Err(ServiceError::InvalidInput(
                "checkOut must be after checkIn".to_string(),
            ));
        }

        let property = Property::find_by_id(property_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Property {property_id} not found")))?;
        if !property.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "{} is not available",
                property.name
            )));
        }

        let guests = item.guests.unwrap_or(1);
        if guests < 1 || guests > property.max_guests {
            return Err(ServiceError::InvalidInput(format!(
                "{} accommodates between 1 and {} guests",
                property.name, property.max_guests
            )));
        }

        if has_overlapping_booking(&*self.db, property_id, check_in, check_out).await? {
            return Err(ServiceError::InvalidOperation(format!(
                "{} is not available for the selected dates",
                property.name
            )));
        }

        let nights = (check_out - check_in).num_days() as i32;
        let line_total = property.nightly_rate * Decimal::from(nights);
        Ok(ValidatedItem::Property {
            property,
            check_in,
            check_out,
            guests,
            nights,
            line_total,
        })
    }

    async fn validate_activity_item(
        &self,
        item: &OrderItemInput,
    ) -> Result<ValidatedItem, ServiceError> {
        let activity_id = item.activity_id.ok_or_else(|| {
            ServiceError::InvalidInput("activityId is required for activity orders".to_string())
        })?;
        let activity_date = item.activity_date.ok_or_else(|| {
            ServiceError::InvalidInput("activityDate is required for activity orders".to_string())
        })?;
        let participants = item.participants.ok_or_else(|| {
            ServiceError::InvalidInput(
                "participants is required for activity orders".to_string(),
            )
        })?;

        let activity = Activity::find_by_id(activity_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Activity {activity_id} not found")))?;
        if !activity.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "{} is not available",
                activity.name
            )));
        }
        if participants < activity.min_participants || participants > activity.max_participants {
            return Err(ServiceError::InvalidInput(format!(
                "{} requires between {} and {} participants",
                activity.name, activity.min_participants, activity.max_participants
            )));
        }

        let line_total = activity.price * Decimal::from(participants);
        Ok(ValidatedItem::Activity {
            activity,
            activity_date,
            participants,
            line_total,
        })
    }

    /// Runs the order transaction, regenerating the order number on a
    /// unique-index collision.
    async fn commit_with_retry(
        &self,
        user_id: Uuid,
        input: &CreateOrderInput,
        validated: &[ValidatedItem],
        totals: &OrderTotals,
    ) -> Result<OrderModel, ServiceError> {
        for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
            let order_number = generate_order_number();
            let items = validated.to_vec();
            let order_type = input.order_type;
            let payment_method = input.payment_method.clone();
            let shipping_address = input.shipping_address.clone();
            let billing_address = input.billing_address.clone();
            let notes = input.notes.clone();
            let totals = totals.clone();

            let result = self
                .db
                .transaction::<_, OrderModel, ServiceError>(move |txn| {
                    Box::pin(async move {
                        let now = Utc::now();
                        let order = order::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            order_number: Set(order_number),
                            user_id: Set(user_id),
                            order_type: Set(order_type),
                            status: Set(OrderStatus::Pending),
                            subtotal: Set(totals.subtotal),
                            tax: Set(totals.tax),
                            shipping: Set(totals.shipping),
                            total: Set(totals.total),
                            payment_method: Set(payment_method),
                            payment_status: Set(PaymentStatus::Pending),
                            shipping_address: Set(shipping_address),
                            billing_address: Set(billing_address),
                            notes: Set(notes),
                            created_at: Set(now),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await?;

                        for item in items {
                            insert_order_item(txn, &order, item).await?;
                        }

                        if order_type == OrderType::Product {
                            cart_item::Entity::delete_many()
                                .filter(cart_item::Column::UserId.eq(user_id))
                                .exec(txn)
                                .await?;
                        }

                        Ok(order)
                    })
                })
                .await;

            match result {
                Ok(order) => return Ok(order),
                Err(TransactionError::Connection(e)) => return Err(e.into()),
                Err(TransactionError::Transaction(e)) => {
                    if attempt < ORDER_NUMBER_ATTEMPTS && is_unique_violation(&e) {
                        warn!(attempt, "order number collision, retrying");
                        continue;
                    }
                    return Err(e);
                }
            }
        }
        Err(ServiceError::InternalError(
            "Could not allocate a unique order number".to_string(),
        ))
    }
}

/// Inserts the type-specific child row and performs its side effect.
async fn insert_order_item<C: ConnectionTrait>(
    txn: &C,
    order: &OrderModel,
    item: ValidatedItem,
) -> Result<(), ServiceError> {
    match item {
        ValidatedItem::Product {
            product,
            variant,
            quantity,
            unit_price,
            line_total,
        } => {
            decrement_stock(txn, &product, variant.as_ref(), quantity).await?;
            let name = match &variant {
                Some(v) => format!("{} ({})", product.name, v.name),
                None => product.name.clone(),
            };
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(product.id),
                variant_id: Set(variant.map(|v| v.id)),
                name: Set(name),
                quantity: Set(quantity),
                unit_price: Set(unit_price),
                line_total: Set(pricing::round2(line_total)),
                created_at: Set(Utc::now()),
            }
            .insert(txn)
            .await?;
        }
        ValidatedItem::Property {
            property,
            check_in,
            check_out,
            guests,
            nights,
            line_total,
        } => {
            // The pre-check can race another checkout; repeat it inside the
            // transaction so double bookings cannot commit.
            if has_overlapping_booking(txn, property.id, check_in, check_out).await? {
                return Err(ServiceError::InvalidOperation(format!(
                    "{} is not available for the selected dates",
                    property.name
                )));
            }
            property_booking::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                property_id: Set(property.id),
                check_in: Set(check_in),
                check_out: Set(check_out),
                guests: Set(guests),
                nights: Set(nights),
                nightly_rate: Set(property.nightly_rate),
                total: Set(pricing::round2(line_total)),
                status: Set(BookingStatus::Pending),
                created_at: Set(Utc::now()),
            }
            .insert(txn)
            .await?;
        }
        ValidatedItem::Activity {
            activity,
            activity_date,
            participants,
            line_total,
        } => {
            activity_booking::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                activity_id: Set(activity.id),
                activity_date: Set(activity_date),
                participants: Set(participants),
                unit_price: Set(activity.price),
                total: Set(pricing::round2(line_total)),
                status: Set(BookingStatus::Pending),
                created_at: Set(Utc::now()),
            }
            .insert(txn)
            .await?;
        }
    }
    Ok(())
}

/// Conditionally decrements stock, failing when fewer units remain than
/// requested. Untracked stock (null) is never decremented.
async fn decrement_stock<C: ConnectionTrait>(
    txn: &C,
    product: &ProductModel,
    variant: Option<&ProductVariantModel>,
    quantity: i32,
) -> Result<(), ServiceError> {
    let out_of_stock = |available: i32| ServiceError::InsufficientStock {
        name: product.name.clone(),
        available,
        requested: quantity,
    };

    match variant {
        Some(v) if v.stock_quantity.is_some() => {
            let result = ProductVariant::update_many()
                .col_expr(
                    product_variant::Column::StockQuantity,
                    Expr::col(product_variant::Column::StockQuantity).sub(quantity),
                )
                .filter(product_variant::Column::Id.eq(v.id))
                .filter(product_variant::Column::StockQuantity.gte(quantity))
                .exec(txn)
                .await?;
            if result.rows_affected == 0 {
                let available = ProductVariant::find_by_id(v.id)
                    .one(txn)
                    .await?
                    .and_then(|v| v.stock_quantity)
                    .unwrap_or(0);
                return Err(out_of_stock(available));
            }
        }
        Some(_) => {}
        None if product.stock_quantity.is_some() => {
            let result = Product::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).sub(quantity),
                )
                .filter(product::Column::Id.eq(product.id))
                .filter(product::Column::StockQuantity.gte(quantity))
                .exec(txn)
                .await?;
            if result.rows_affected == 0 {
                let available = Product::find_by_id(product.id)
                    .one(txn)
                    .await?
                    .and_then(|p| p.stock_quantity)
                    .unwrap_or(0);
                return Err(out_of_stock(available));
            }
        }
        None => {}
    }
    Ok(())
}

/// True when any pending or confirmed booking for the property overlaps
/// the [check_in, check_out) range.
async fn has_overlapping_booking<C: ConnectionTrait>(
    conn: &C,
    property_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<bool, ServiceError> {
    let count = PropertyBooking::find()
        .filter(property_booking::Column::PropertyId.eq(property_id))
        .filter(
            property_booking::Column::Status
                .is_in([BookingStatus::Pending, BookingStatus::Confirmed]),
        )
        .filter(property_booking::Column::CheckIn.lt(check_out))
        .filter(property_booking::Column::CheckOut.gt(check_in))
        .count(conn)
        .await?;
    Ok(count > 0)
}

fn is_unique_violation(err: &ServiceError) -> bool {
    matches!(err, ServiceError::DatabaseError(db_err)
        if matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))))
}

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `ORD-<base36 millis>-<4 random base36 chars>`. Readable and sortable by
/// creation time; the unique index plus retry covers collisions.
pub fn generate_order_number() -> String {
    let mut millis = Utc::now().timestamp_millis() as u64;
    let mut stamp = Vec::new();
    while millis > 0 {
        stamp.push(BASE36[(millis % 36) as usize]);
        millis /= 36;
    }
    stamp.reverse();
    let stamp = String::from_utf8_lossy(&stamp).into_owned();

    let mut rng = rand::thread_rng();
    let suffix: String = (0..4)
        .map(|_| BASE36[rng.gen_range(0..36)] as char)
        .collect();
    format!("ORD-{stamp}-{suffix}")
}

/// Informational payment response; never affects committed order state.
pub fn payment_instructions(order: &OrderModel) -> PaymentInstructions {
    match order.payment_method.as_str() {
        "bank_transfer" => PaymentInstructions::BankTransfer {
            bank_name: "Shoreline Community Bank".to_string(),
            account_name: "ShoreStay Holdings LLC".to_string(),
            account_number: "8839-104-772".to_string(),
            reference: order.order_number.clone(),
            amount: order.total,
        },
        "cash" => PaymentInstructions::Cash {
            notice: "Payment is due in cash at check-in or pickup".to_string(),
            amount: order.total,
        },
        other => PaymentInstructions::Other {
            method: other.to_string(),
        },
    }
}

#[derive(Debug, Clone)]
enum ValidatedItem {
    Product {
        product: ProductModel,
        variant: Option<ProductVariantModel>,
        quantity: i32,
        unit_price: Decimal,
        line_total: Decimal,
    },
    Property {
        property: PropertyModel,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: i32,
        nights: i32,
        line_total: Decimal,
    },
    Activity {
        activity: ActivityModel,
        activity_date: NaiveDate,
        participants: i32,
        line_total: Decimal,
    },
}

impl ValidatedItem {
    fn line_total(&self) -> Decimal {
        match self {
            Self::Product { line_total, .. }
            | Self::Property { line_total, .. }
            | Self::Activity { line_total, .. } => *line_total,
        }
    }
}

fn default_quantity() -> i32 {
    1
}

/// One heterogeneous item in an order request; which fields are required
/// depends on the order type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub property_id: Option<Uuid>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: Option<i32>,
    pub activity_id: Option<Uuid>,
    pub activity_date: Option<NaiveDate>,
    pub participants: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub items: Vec<OrderItemInput>,
    pub shipping_address: Option<Value>,
    pub billing_address: Option<Value>,
    #[validate(length(min = 1, max = 50))]
    pub payment_method: String,
    pub payment_details: Option<Value>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<OrderStatus>,
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
    pub property_bookings: Vec<PropertyBookingModel>,
    pub activity_bookings: Vec<ActivityBookingModel>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentInstructions {
    #[serde(rename_all = "camelCase")]
    BankTransfer {
        bank_name: String,
        account_name: String,
        account_number: String,
        reference: String,
        #[serde(serialize_with = "crate::entities::money::serialize")]
        amount: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    Cash {
        notice: String,
        #[serde(serialize_with = "crate::entities::money::serialize")]
        amount: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    Other { method: String },
}
