//! Cart lines, self-healing validation, and summary orchestration.
//!
//! Validation deletes lines whose product or variant is gone, inactive, or
//! fully out of stock, even when the overall call reports failure; the cart
//! is kept usable rather than rejected. Quantity problems are advisory and
//! leave the line in place with a suggested correction.

use crate::{
    entities::{
        cart_item, product, product_variant, CartItem, CartItemModel, Product, ProductModel,
        ProductVariant, ProductVariantModel, PromoCodeModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        catalog::{effective_price, effective_stock},
        pricing::{self, CartSummary, PricedLine, PricingPolicy},
        promos::PromoService,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    promos: Arc<PromoService>,
    policy: PricingPolicy,
}

/// A cart line joined with its catalog snapshot. Product or variant may be
/// gone if the catalog changed since the line was added; validation
/// classifies those cases.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineDetail {
    pub item: CartItemModel,
    pub product: Option<ProductModel>,
    pub variant: Option<ProductVariantModel>,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        promos: Arc<PromoService>,
        policy: PricingPolicy,
    ) -> Self {
        Self {
            db,
            event_sender,
            promos,
            policy,
        }
    }

    /// Adds a line, merging quantity into an existing line for the same
    /// product and variant.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartItemModel, ServiceError> {
        input.validate()?;

        let product = Product::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;
        if !product.is_active {
            return Err(ServiceError::InvalidOperation(
                "Product is not available".to_string(),
            ));
        }

        if let Some(variant_id) = input.variant_id {
            let variant = ProductVariant::find_by_id(variant_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Variant {variant_id} not found"))
                })?;
            if variant.product_id != input.product_id {
                return Err(ServiceError::InvalidInput(
                    "Variant does not belong to this product".to_string(),
                ));
            }
            if !variant.is_active {
                return Err(ServiceError::InvalidOperation(
                    "Variant is not available".to_string(),
                ));
            }
        }

        let existing = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .filter(match input.variant_id {
                Some(v) => cart_item::Column::VariantId.eq(v),
                None => cart_item::Column::VariantId.is_null(),
            })
            .one(&*self.db)
            .await?;

        let line = if let Some(item) = existing {
            let quantity = item.quantity + input.quantity;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(quantity);
            item.updated_at = Set(Utc::now());
            item.update(&*self.db).await?
        } else {
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                product_id: Set(input.product_id),
                variant_id: Set(input.variant_id),
                quantity: Set(input.quantity),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            }
            .insert(&*self.db)
            .await?
        };

        self.event_sender
            .send_or_log(Event::CartLineAdded {
                user_id,
                product_id: input.product_id,
            })
            .await;
        Ok(line)
    }

    /// Updates a line's quantity; zero or less removes the line.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<Option<CartItemModel>, ServiceError> {
        let item = self.owned_line(user_id, item_id).await?;

        if quantity <= 0 {
            item.delete(&*self.db).await?;
            self.event_sender
                .send_or_log(Event::CartLineRemoved { user_id, item_id })
                .await;
            return Ok(None);
        }

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        item.updated_at = Set(Utc::now());
        Ok(Some(item.update(&*self.db).await?))
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let item = self.owned_line(user_id, item_id).await?;
        item.delete(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CartLineRemoved { user_id, item_id })
            .await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;
        self.event_sender
            .send_or_log(Event::CartCleared { user_id })
            .await;
        Ok(())
    }

    /// All of the user's cart lines with their catalog snapshot.
    pub async fn load_lines(&self, user_id: Uuid) -> Result<Vec<CartLineDetail>, ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let variant_ids: Vec<Uuid> = items.iter().filter_map(|i| i.variant_id).collect();

        let products: HashMap<Uuid, ProductModel> = Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let variants: HashMap<Uuid, ProductVariantModel> = if variant_ids.is_empty() {
            HashMap::new()
        } else {
            ProductVariant::find()
                .filter(product_variant::Column::Id.is_in(variant_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|v| (v.id, v))
                .collect()
        };

        Ok(items
            .into_iter()
            .map(|item| {
                let product = products.get(&item.product_id).cloned();
                let variant = item.variant_id.and_then(|id| variants.get(&id).cloned());
                CartLineDetail {
                    item,
                    product,
                    variant,
                }
            })
            .collect())
    }

    /// Checks each line against current catalog state, removing lines with
    /// terminal issues and flagging quantity problems.
    #[instrument(skip(self))]
    pub async fn validate(&self, user_id: Uuid) -> Result<CartValidation, ServiceError> {
        let lines = self.load_lines(user_id).await?;

        let mut issues = Vec::new();
        let mut valid_items = Vec::new();
        let mut removed = 0usize;
        let mut subtotal = Decimal::ZERO;

        for line in lines {
            match classify_line(&line) {
                LineVerdict::Removed(issue) => {
                    let item_id = line.item.id;
                    line.item.delete(&*self.db).await?;
                    removed += 1;
                    issues.push(issue);
                    self.event_sender
                        .send_or_log(Event::CartLineRemoved { user_id, item_id })
                        .await;
                }
                LineVerdict::Kept(advisory) => {
                    // Kept lines always carry their product.
                    let Some(product) = line.product.as_ref() else {
                        continue;
                    };
                    let unit_price = effective_price(product, line.variant.as_ref());
                    // Raw line total; the subtotal is rounded once below.
                    let line_total = unit_price * Decimal::from(line.item.quantity);
                    subtotal += line_total;
                    valid_items.push(ValidCartItem {
                        item_id: line.item.id,
                        product_id: line.item.product_id,
                        variant_id: line.item.variant_id,
                        name: product.name.clone(),
                        quantity: line.item.quantity,
                        unit_price,
                        line_total: pricing::round2(line_total),
                    });
                    if let Some(issue) = advisory {
                        issues.push(issue);
                    }
                }
            }
        }

        let valid = !valid_items.is_empty();
        if removed > 0 {
            info!(%user_id, removed, "cart lines removed during validation");
        }

        Ok(CartValidation {
            valid,
            item_count: valid_items.len(),
            subtotal: pricing::round2(subtotal),
            issues,
            valid_items,
            removed_items: removed,
        })
    }

    /// Lines that count toward pricing: product active, variant (when
    /// present) active.
    fn priced_lines(lines: &[CartLineDetail]) -> Vec<PricedLine> {
        lines
            .iter()
            .filter_map(|line| {
                let product = line.product.as_ref().filter(|p| p.is_active)?;
                let variant = match line.item.variant_id {
                    Some(_) => Some(line.variant.as_ref().filter(|v| v.is_active)?),
                    None => None,
                };
                Some(PricedLine {
                    unit_price: effective_price(product, variant),
                    quantity: line.item.quantity,
                })
            })
            .collect()
    }

    /// Reconciles the applied promo, then computes the summary. The same
    /// computation backs the display read and the promo endpoints.
    pub async fn summary(
        &self,
        user_id: Uuid,
    ) -> Result<(CartSummary, Option<PromoCodeModel>), ServiceError> {
        let promo = self.promos.reconcile(user_id).await?;
        let lines = self.load_lines(user_id).await?;
        let priced = Self::priced_lines(&lines);
        let summary = pricing::cart_summary(&self.policy, &priced, promo.as_ref());
        Ok((summary, promo))
    }

    /// Applies a promo code and returns the recomputed summary.
    pub async fn apply_promo(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> Result<(PromoCodeModel, CartSummary), ServiceError> {
        let lines = self.load_lines(user_id).await?;
        let priced = Self::priced_lines(&lines);
        let subtotal = pricing::subtotal(&priced);

        let promo = self.promos.apply(user_id, code, subtotal).await?;
        let summary = pricing::cart_summary(&self.policy, &priced, Some(&promo));
        Ok((promo, summary))
    }

    /// Removes any applied promo and returns the recomputed summary.
    pub async fn remove_promo(&self, user_id: Uuid) -> Result<CartSummary, ServiceError> {
        self.promos.remove(user_id).await?;
        let lines = self.load_lines(user_id).await?;
        let priced = Self::priced_lines(&lines);
        Ok(pricing::cart_summary(&self.policy, &priced, None))
    }

    async fn owned_line(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartItemModel, ServiceError> {
        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {item_id} not found")))?;
        if item.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Cart item belongs to another user".to_string(),
            ));
        }
        Ok(item)
    }
}

enum LineVerdict {
    /// Terminal issue: the line is deleted.
    Removed(CartIssue),
    /// The line survives, possibly with an advisory issue.
    Kept(Option<CartIssue>),
}

fn classify_line(line: &CartLineDetail) -> LineVerdict {
    let item = &line.item;

    let product = match line.product.as_ref().filter(|p| p.is_active) {
        Some(p) => p,
        None => {
            return LineVerdict::Removed(CartIssue {
                issue_type: CartIssueType::ProductInactive,
                message: "This product is no longer available".to_string(),
                item_id: item.id,
                product_id: item.product_id,
                available_quantity: None,
                max_quantity: None,
                action: None,
            })
        }
    };

    let variant = match item.variant_id {
        Some(_) => match line.variant.as_ref().filter(|v| v.is_active) {
            Some(v) => Some(v),
            None => {
                return LineVerdict::Removed(CartIssue {
                    issue_type: CartIssueType::VariantInactive,
                    message: format!("The selected option for {} is no longer available", product.name),
                    item_id: item.id,
                    product_id: item.product_id,
                    available_quantity: None,
                    max_quantity: None,
                    action: None,
                })
            }
        },
        None => None,
    };

    if let Some(stock) = effective_stock(product, variant) {
        if stock <= 0 {
            return LineVerdict::Removed(CartIssue {
                issue_type: CartIssueType::OutOfStock,
                message: format!("{} is out of stock", product.name),
                item_id: item.id,
                product_id: item.product_id,
                available_quantity: Some(0),
                max_quantity: None,
                action: None,
            });
        }
        if item.quantity > stock {
            return LineVerdict::Kept(Some(CartIssue {
                issue_type: CartIssueType::InsufficientStock,
                message: format!("Only {stock} of {} left in stock", product.name),
                item_id: item.id,
                product_id: item.product_id,
                available_quantity: Some(stock),
                max_quantity: None,
                action: Some(CartIssueAction::ReduceQuantity),
            }));
        }
    }

    if let Some(max) = product.max_quantity_per_order {
        if item.quantity > max {
            return LineVerdict::Kept(Some(CartIssue {
                issue_type: CartIssueType::MaxQuantityExceeded,
                message: format!("Maximum {max} of {} per order", product.name),
                item_id: item.id,
                product_id: item.product_id,
                available_quantity: None,
                max_quantity: Some(max),
                action: Some(CartIssueAction::ReduceQuantity),
            }));
        }
    }

    LineVerdict::Kept(None)
}

/// Input for adding a cart line
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartInput {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Validation verdict for the whole cart
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartValidation {
    pub valid: bool,
    pub item_count: usize,
    pub subtotal: Decimal,
    pub issues: Vec<CartIssue>,
    pub valid_items: Vec<ValidCartItem>,
    pub removed_items: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartIssueType {
    ProductInactive,
    VariantInactive,
    OutOfStock,
    InsufficientStock,
    MaxQuantityExceeded,
}

impl CartIssueType {
    /// Terminal issues remove the line; advisory ones keep it flagged.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::ProductInactive | Self::VariantInactive | Self::OutOfStock
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartIssueAction {
    ReduceQuantity,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartIssue {
    #[serde(rename = "type")]
    pub issue_type: CartIssueType,
    pub message: String,
    pub item_id: Uuid,
    pub product_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<CartIssueAction>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidCartItem {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub unit_price: Decimal,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub line_total: Decimal,
}
