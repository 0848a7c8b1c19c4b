use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Application configuration with validation.
///
/// Values are layered from `config/default.toml`, an optional per-environment
/// file, and `APP_`-prefixed environment variables, in that order.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL (postgres or sqlite)
    pub database_url: String,

    /// JWT secret used to verify bearer tokens (minimum 32 characters)
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON (production default)
    #[serde(default)]
    pub log_json: bool,

    /// Run migrations on startup
    #[serde(default = "default_true")]
    pub auto_migrate: bool,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub db_min_connections: u32,

    /// TTL for the public settings cache, in seconds
    #[serde(default = "default_settings_cache_ttl")]
    pub settings_cache_ttl_secs: u64,

    /// Cart-level tax rate applied to the discounted subtotal
    #[serde(default = "default_cart_tax_rate")]
    pub cart_tax_rate: f64,

    /// Order-level tax rate for product orders
    #[serde(default = "default_cart_tax_rate")]
    pub product_order_tax_rate: f64,

    /// Order-level tax rate for property and activity orders
    #[serde(default = "default_service_tax_rate")]
    pub service_order_tax_rate: f64,

    /// Discounted subtotal at or above which shipping is free
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: f64,

    /// Flat shipping rate below the free-shipping threshold
    #[serde(default = "default_shipping_rate")]
    pub standard_shipping_rate: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_settings_cache_ttl() -> u64 {
    300
}
fn default_cart_tax_rate() -> f64 {
    0.15
}
fn default_service_tax_rate() -> f64 {
    0.10
}
fn default_free_shipping_threshold() -> f64 {
    50.0
}
fn default_shipping_rate() -> f64 {
    5.99
}

impl AppConfig {
    /// Construct a configuration directly, used by tests.
    pub fn new(database_url: String, jwt_secret: String, host: String, port: u16) -> Self {
        Self {
            database_url,
            jwt_secret,
            host,
            port,
            environment: "test".to_string(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: true,
            db_max_connections: default_max_connections(),
            db_min_connections: default_min_connections(),
            settings_cache_ttl_secs: default_settings_cache_ttl(),
            cart_tax_rate: default_cart_tax_rate(),
            product_order_tax_rate: default_cart_tax_rate(),
            service_order_tax_rate: default_service_tax_rate(),
            free_shipping_threshold: default_free_shipping_threshold(),
            standard_shipping_rate: default_shipping_rate(),
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Load configuration from files and environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder();

    let default_path = Path::new(CONFIG_DIR).join("default.toml");
    if default_path.exists() {
        builder = builder.add_source(File::from(default_path));
    }

    let env_path = Path::new(CONFIG_DIR).join(format!("{run_env}.toml"));
    if env_path.exists() {
        builder = builder.add_source(File::from(env_path));
    }

    let cfg: AppConfig = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

    info!(environment = %cfg.environment, "configuration loaded");
    Ok(cfg)
}

/// Initialise the tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
