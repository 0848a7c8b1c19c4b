//! Read-mostly catalog access: products, variants, properties, activities.

use crate::{
    entities::{
        product, product_variant, Activity, ActivityModel, Product, ProductModel, ProductVariant,
        ProductVariantModel, Property, PropertyModel,
    },
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Unit price for a cart or order line: the variant's price when a variant
/// is present, the product's otherwise.
pub fn effective_price(product: &ProductModel, variant: Option<&ProductVariantModel>) -> Decimal {
    variant.map(|v| v.price).unwrap_or(product.price)
}

/// Effective stock for a line. `None` means untracked stock, which never
/// limits a purchase.
pub fn effective_stock(
    product: &ProductModel,
    variant: Option<&ProductVariantModel>,
) -> Option<i32> {
    match variant {
        Some(v) => v.stock_quantity,
        None => product.stock_quantity,
    }
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get_product(&self, id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {id} not found")))
    }

    pub async fn list_products(
        &self,
        active_only: bool,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let mut query = Product::find().order_by_asc(product::Column::Name);
        if active_only {
            query = query.filter(product::Column::IsActive.eq(true));
        }
        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    pub async fn list_variants(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<ProductVariantModel>, ServiceError> {
        Ok(ProductVariant::find()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .order_by_asc(product_variant::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_property(&self, id: Uuid) -> Result<PropertyModel, ServiceError> {
        Property::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Property {id} not found")))
    }

    pub async fn get_activity(&self, id: Uuid) -> Result<ActivityModel, ServiceError> {
        Activity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Activity {id} not found")))
    }

    /// Admin catalog mutation: price, stock, availability, per-order cap.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        let product = self.get_product(id).await?;
        let mut active: product::ActiveModel = product.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(price) = input.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::InvalidInput(
                    "price must not be negative".to_string(),
                ));
            }
            active.price = Set(price);
        }
        if let Some(stock) = input.stock_quantity {
            if stock < 0 {
                return Err(ServiceError::InvalidInput(
                    "stock must not be negative".to_string(),
                ));
            }
            active.stock_quantity = Set(Some(stock));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(max) = input.max_quantity_per_order {
            active.max_quantity_per_order = Set(Some(max));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        info!(product_id = %id, "product updated");
        Ok(updated)
    }
}

/// Partial product update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
    pub max_quantity_per_order: Option<i32>,
}
