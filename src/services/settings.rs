//! Site settings with typed values and a cached public read.
//!
//! Values are stored as strings and coerced per their declared type on the
//! way out. The public read is cached for the configured TTL; admin writes
//! do not invalidate it, so readers may see stale values for up to one TTL.

use crate::{
    cache::SettingsCache,
    entities::{setting, Setting, SettingModel, SettingType},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

const PUBLIC_CACHE_KEY: &str = "settings:public";

#[derive(Clone)]
pub struct SettingsService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    cache: Arc<SettingsCache>,
}

impl SettingsService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        cache: Arc<SettingsCache>,
    ) -> Self {
        Self {
            db,
            event_sender,
            cache,
        }
    }

    /// All settings grouped by category, served from cache when fresh.
    pub async fn public_settings(&self) -> Result<Value, ServiceError> {
        if let Some(cached) = self.cache.get(PUBLIC_CACHE_KEY) {
            return Ok(cached);
        }

        let settings = Setting::find()
            .order_by_asc(setting::Column::Category)
            .order_by_asc(setting::Column::Key)
            .all(&*self.db)
            .await?;

        let mut grouped: BTreeMap<String, serde_json::Map<String, Value>> = BTreeMap::new();
        for s in settings {
            grouped
                .entry(s.category.clone())
                .or_default()
                .insert(s.key.clone(), coerce_value(&s));
        }
        let value = json!(grouped);
        self.cache.put(PUBLIC_CACHE_KEY, value.clone());
        Ok(value)
    }

    pub async fn list(&self) -> Result<Vec<SettingView>, ServiceError> {
        let settings = Setting::find()
            .order_by_asc(setting::Column::Category)
            .order_by_asc(setting::Column::Key)
            .all(&*self.db)
            .await?;
        Ok(settings.iter().map(SettingView::from_model).collect())
    }

    pub async fn get(&self, key: &str) -> Result<SettingView, ServiceError> {
        let setting = self.find_by_key(key).await?;
        Ok(SettingView::from_model(&setting))
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CreateSettingInput) -> Result<SettingView, ServiceError> {
        input.validate()?;
        check_encoding(&input.value, input.data_type)?;

        let now = Utc::now();
        let result = setting::ActiveModel {
            id: Set(Uuid::new_v4()),
            key: Set(input.key.clone()),
            value: Set(input.value),
            data_type: Set(input.data_type),
            category: Set(input.category),
            is_editable: Set(input.is_editable.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await;

        let setting = match result {
            Ok(s) => s,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(ServiceError::Conflict(format!(
                    "Setting '{}' already exists",
                    input.key
                )));
            }
            Err(e) => return Err(e.into()),
        };

        self.event_sender
            .send_or_log(Event::SettingUpdated {
                key: setting.key.clone(),
            })
            .await;
        Ok(SettingView::from_model(&setting))
    }

    /// Updates a setting's value (and optionally category). Non-editable
    /// settings reject updates.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        key: &str,
        input: UpdateSettingInput,
    ) -> Result<SettingView, ServiceError> {
        let setting = self.find_by_key(key).await?;
        if !setting.is_editable {
            return Err(ServiceError::InvalidOperation(format!(
                "Setting '{key}' is not editable"
            )));
        }
        check_encoding(&input.value, setting.data_type)?;

        let mut active: setting::ActiveModel = setting.into();
        active.value = Set(input.value);
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        active.updated_at = Set(Utc::now());
        let setting = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::SettingUpdated {
                key: setting.key.clone(),
            })
            .await;
        Ok(SettingView::from_model(&setting))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let setting = self.find_by_key(key).await?;
        if !setting.is_editable {
            return Err(ServiceError::InvalidOperation(format!(
                "Setting '{key}' is not editable"
            )));
        }
        setting.delete(&*self.db).await?;
        Ok(())
    }

    async fn find_by_key(&self, key: &str) -> Result<SettingModel, ServiceError> {
        Setting::find()
            .filter(setting::Column::Key.eq(key))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Setting '{key}' not found")))
    }
}

/// Decodes a stored string per its declared type. Values that fail to parse
/// fall back to the raw string so one bad row cannot break the read.
pub fn coerce_value(setting: &SettingModel) -> Value {
    match setting.data_type {
        SettingType::String => Value::String(setting.value.clone()),
        SettingType::Number => match setting.value.parse::<f64>() {
            Ok(n) => json!(n),
            Err(_) => {
                warn!(key = %setting.key, "number setting does not parse, serving raw");
                Value::String(setting.value.clone())
            }
        },
        SettingType::Boolean => match setting.value.parse::<bool>() {
            Ok(b) => Value::Bool(b),
            Err(_) => {
                warn!(key = %setting.key, "boolean setting does not parse, serving raw");
                Value::String(setting.value.clone())
            }
        },
        SettingType::Json => match serde_json::from_str(&setting.value) {
            Ok(v) => v,
            Err(_) => {
                warn!(key = %setting.key, "json setting does not parse, serving raw");
                Value::String(setting.value.clone())
            }
        },
    }
}

/// Rejects writes whose encoded value does not parse for the declared type.
fn check_encoding(value: &str, data_type: SettingType) -> Result<(), ServiceError> {
    let ok = match data_type {
        SettingType::String => true,
        SettingType::Number => value.parse::<f64>().is_ok(),
        SettingType::Boolean => value.parse::<bool>().is_ok(),
        SettingType::Json => serde_json::from_str::<Value>(value).is_ok(),
    };
    if ok {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "Value does not encode a {} setting",
            match data_type {
                SettingType::String => "string",
                SettingType::Number => "number",
                SettingType::Boolean => "boolean",
                SettingType::Json => "json",
            }
        )))
    }
}

/// A setting with its value already coerced to its declared type.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingView {
    pub key: String,
    pub value: Value,
    pub data_type: SettingType,
    pub category: String,
    pub is_editable: bool,
}

impl SettingView {
    fn from_model(setting: &SettingModel) -> Self {
        Self {
            key: setting.key.clone(),
            value: coerce_value(setting),
            data_type: setting.data_type,
            category: setting.category.clone(),
            is_editable: setting.is_editable,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSettingInput {
    #[validate(length(min = 1, max = 100))]
    pub key: String,
    pub value: String,
    pub data_type: SettingType,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    pub is_editable: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingInput {
    pub value: String,
    pub category: Option<String>,
}
