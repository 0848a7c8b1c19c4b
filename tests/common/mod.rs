use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use shorestay_api::{
    app_router,
    auth::{issue_token, ROLE_ADMIN},
    config::AppConfig,
    db,
    entities::{activity, product, product_variant, promo_code, property, DiscountType},
    events::EventSender,
    AppState,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Test harness over an in-memory SQLite database with the full router.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

const TEST_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            0,
        );
        // A single connection keeps every query on the same in-memory db.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool).await.expect("migrations failed");

        let (tx, rx) = mpsc::channel(256);
        let event_task = tokio::spawn(shorestay_api::events::process_events(rx));

        let state = AppState::new(
            Arc::new(pool),
            Arc::new(cfg),
            Arc::new(EventSender::new(tx)),
        );
        let router = app_router(state.clone());
        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub fn user_token(&self, user_id: Uuid) -> String {
        issue_token(TEST_SECRET, user_id, "customer", 3600).expect("token")
    }

    pub fn admin_token(&self, user_id: Uuid) -> String {
        issue_token(TEST_SECRET, user_id, ROLE_ADMIN, 3600).expect("token")
    }

    /// Sends a JSON request and returns status plus parsed body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body read")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body is not json")
        };
        (status, json)
    }
}

pub struct ProductSpec {
    pub price: Decimal,
    pub stock: Option<i32>,
    pub is_active: bool,
    pub max_per_order: Option<i32>,
}

impl Default for ProductSpec {
    fn default() -> Self {
        Self {
            price: Decimal::new(1999, 2),
            stock: Some(10),
            is_active: true,
            max_per_order: None,
        }
    }
}

pub async fn seed_product(app: &TestApp, spec: ProductSpec) -> Uuid {
    let id = Uuid::new_v4();
    product::ActiveModel {
        id: Set(id),
        name: Set(format!("Test Product {id}")),
        description: Set(None),
        price: Set(spec.price),
        stock_quantity: Set(spec.stock),
        is_active: Set(spec.is_active),
        max_quantity_per_order: Set(spec.max_per_order),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("seed product");
    id
}

pub async fn seed_variant(
    app: &TestApp,
    product_id: Uuid,
    price: Decimal,
    stock: Option<i32>,
    is_active: bool,
) -> Uuid {
    let id = Uuid::new_v4();
    product_variant::ActiveModel {
        id: Set(id),
        product_id: Set(product_id),
        name: Set("Large".to_string()),
        price: Set(price),
        stock_quantity: Set(stock),
        is_active: Set(is_active),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("seed variant");
    id
}

pub async fn seed_property(app: &TestApp, nightly_rate: Decimal, max_guests: i32) -> Uuid {
    let id = Uuid::new_v4();
    property::ActiveModel {
        id: Set(id),
        name: Set("Dune Cottage".to_string()),
        description: Set(None),
        location: Set("Shell Point".to_string()),
        nightly_rate: Set(nightly_rate),
        max_guests: Set(max_guests),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("seed property");
    id
}

pub async fn seed_activity(
    app: &TestApp,
    price: Decimal,
    min_participants: i32,
    max_participants: i32,
) -> Uuid {
    let id = Uuid::new_v4();
    activity::ActiveModel {
        id: Set(id),
        name: Set("Kayak Tour".to_string()),
        description: Set(None),
        price: Set(price),
        min_participants: Set(min_participants),
        max_participants: Set(max_participants),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("seed activity");
    id
}

pub struct PromoSpec {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub minimum_amount: Option<Decimal>,
    pub maximum_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub expires_at: Option<chrono::DateTime<Utc>>,
    pub is_active: bool,
}

impl Default for PromoSpec {
    fn default() -> Self {
        Self {
            code: "SUMMER10".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::new(10, 0),
            minimum_amount: None,
            maximum_discount: None,
            usage_limit: None,
            expires_at: None,
            is_active: true,
        }
    }
}

pub async fn seed_promo(app: &TestApp, spec: PromoSpec) -> Uuid {
    let id = Uuid::new_v4();
    promo_code::ActiveModel {
        id: Set(id),
        code: Set(spec.code),
        discount_type: Set(spec.discount_type),
        discount_value: Set(spec.discount_value),
        minimum_amount: Set(spec.minimum_amount),
        maximum_discount: Set(spec.maximum_discount),
        usage_limit: Set(spec.usage_limit),
        expires_at: Set(spec.expires_at),
        is_active: Set(spec.is_active),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("seed promo");
    id
}
