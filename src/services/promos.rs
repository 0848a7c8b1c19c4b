//! Promo code application.
//!
//! A user has at most one active promo association at a time; applying a
//! new code deactivates every prior one first. Expiry is detected lazily:
//! `reconcile` runs before every summary computation and deactivates an
//! expired association as an explicit, visible step.

use crate::{
    entities::{promo_code, user_promo_code, PromoCode, PromoCodeModel, UserPromoCode},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Codes are matched case-insensitively by storing and looking them up
/// upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// The state-independent validity rules: active flag and expiry.
fn check_static_terms(promo: &PromoCodeModel, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if !promo.is_active {
        return Err(ServiceError::InvalidOperation(
            "This promo code is no longer active".to_string(),
        ));
    }
    if let Some(expires_at) = promo.expires_at {
        if expires_at <= now {
            return Err(ServiceError::InvalidOperation(
                "This promo code has expired".to_string(),
            ));
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct PromoService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PromoService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<PromoCodeModel>, ServiceError> {
        Ok(PromoCode::find()
            .filter(promo_code::Column::Code.eq(normalize_code(code)))
            .one(&*self.db)
            .await?)
    }

    /// The user's currently applied promo, if any.
    pub async fn active_association(
        &self,
        user_id: Uuid,
    ) -> Result<Option<(user_promo_code::Model, PromoCodeModel)>, ServiceError> {
        let row = UserPromoCode::find()
            .filter(user_promo_code::Column::UserId.eq(user_id))
            .filter(user_promo_code::Column::IsActive.eq(true))
            .find_also_related(PromoCode)
            .one(&*self.db)
            .await?;

        match row {
            Some((assoc, Some(promo))) => Ok(Some((assoc, promo))),
            Some((_, None)) | None => Ok(None),
        }
    }

    /// Pre-summary reconciliation: deactivates the applied promo when it
    /// has expired since application, and auto-deactivates the code itself.
    /// Returns the promo that still counts toward a discount, if any.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, user_id: Uuid) -> Result<Option<PromoCodeModel>, ServiceError> {
        let Some((assoc, promo)) = self.active_association(user_id).await? else {
            return Ok(None);
        };

        let expired = promo
            .expires_at
            .map(|at| at <= Utc::now())
            .unwrap_or(false);
        if !expired && promo.is_active {
            return Ok(Some(promo));
        }

        let txn = self.db.begin().await?;
        let mut assoc: user_promo_code::ActiveModel = assoc.into();
        assoc.is_active = Set(false);
        assoc.updated_at = Set(Utc::now());
        assoc.update(&txn).await?;

        if expired && promo.is_active {
            let promo_id = promo.id;
            let mut active: promo_code::ActiveModel = promo.into();
            active.is_active = Set(false);
            active.updated_at = Set(Utc::now());
            active.update(&txn).await?;
            self.event_sender
                .send_or_log(Event::PromoExpired {
                    promo_code_id: promo_id,
                })
                .await;
        }
        txn.commit().await?;

        info!(%user_id, "expired promo association deactivated");
        Ok(None)
    }

    /// Checks every eligibility rule in sequence, returning the first
    /// violated one.
    pub async fn validate_for_user(
        &self,
        promo: &PromoCodeModel,
        user_id: Uuid,
        subtotal: Decimal,
    ) -> Result<(), ServiceError> {
        check_static_terms(promo, Utc::now())?;

        if let Some(limit) = promo.usage_limit {
            let uses = UserPromoCode::find()
                .filter(user_promo_code::Column::PromoCodeId.eq(promo.id))
                .count(&*self.db)
                .await?;
            if uses >= limit as u64 {
                return Err(ServiceError::InvalidOperation(
                    "This promo code has reached its usage limit".to_string(),
                ));
            }
        }

        let already_used = UserPromoCode::find()
            .filter(user_promo_code::Column::PromoCodeId.eq(promo.id))
            .filter(user_promo_code::Column::UserId.eq(user_id))
            .count(&*self.db)
            .await?
            > 0;
        if already_used {
            return Err(ServiceError::Conflict(
                "You have already used this promo code".to_string(),
            ));
        }

        if let Some(minimum) = promo.minimum_amount {
            if subtotal < minimum {
                return Err(ServiceError::MinimumAmountNotMet {
                    minimum_amount: minimum,
                    current_amount: subtotal,
                });
            }
        }

        Ok(())
    }

    /// Applies a code for the user against the given cart subtotal.
    /// Deactivates any previously applied promo first, so at most one
    /// association stays active.
    #[instrument(skip(self))]
    pub async fn apply(
        &self,
        user_id: Uuid,
        code: &str,
        subtotal: Decimal,
    ) -> Result<PromoCodeModel, ServiceError> {
        let promo = self
            .find_by_code(code)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Invalid promo code".to_string()))?;

        self.validate_for_user(&promo, user_id, subtotal).await?;

        let txn = self.db.begin().await?;
        UserPromoCode::update_many()
            .col_expr(
                user_promo_code::Column::IsActive,
                sea_orm::sea_query::Expr::value(false),
            )
            .col_expr(
                user_promo_code::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(user_promo_code::Column::UserId.eq(user_id))
            .filter(user_promo_code::Column::IsActive.eq(true))
            .exec(&txn)
            .await?;

        user_promo_code::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            promo_code_id: Set(promo.id),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PromoApplied {
                user_id,
                promo_code_id: promo.id,
            })
            .await;

        info!(%user_id, code = %promo.code, "promo applied");
        Ok(promo)
    }

    /// Deactivates every active association for the user. Idempotent.
    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: Uuid) -> Result<(), ServiceError> {
        UserPromoCode::update_many()
            .col_expr(
                user_promo_code::Column::IsActive,
                sea_orm::sea_query::Expr::value(false),
            )
            .col_expr(
                user_promo_code::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(user_promo_code::Column::UserId.eq(user_id))
            .filter(user_promo_code::Column::IsActive.eq(true))
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send_or_log(Event::PromoRemoved { user_id })
            .await;
        Ok(())
    }

    /// Admin creation of a promo code.
    #[instrument(skip(self, input))]
    pub async fn create_code(
        &self,
        input: CreatePromoCodeInput,
    ) -> Result<PromoCodeModel, ServiceError> {
        if input.discount_value <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "discount value must be positive".to_string(),
            ));
        }
        if input.discount_type == promo_code::DiscountType::Percentage
            && input.discount_value > Decimal::from(100)
        {
            return Err(ServiceError::InvalidInput(
                "percentage discount cannot exceed 100".to_string(),
            ));
        }

        let model = promo_code::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(normalize_code(&input.code)),
            discount_type: Set(input.discount_type),
            discount_value: Set(input.discount_value),
            minimum_amount: Set(input.minimum_amount),
            maximum_discount: Set(input.maximum_discount),
            usage_limit: Set(input.usage_limit),
            expires_at: Set(input.expires_at),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        match model.insert(&*self.db).await {
            Ok(promo) => Ok(promo),
            Err(e) if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) => {
                Err(ServiceError::Conflict(
                    "A promo code with this code already exists".to_string(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Admin input for creating a promo code.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromoCodeInput {
    pub code: String,
    pub discount_type: promo_code::DiscountType,
    pub discount_value: Decimal,
    pub minimum_amount: Option<Decimal>,
    pub maximum_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}
