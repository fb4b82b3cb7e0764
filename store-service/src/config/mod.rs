use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub pricing: PricingConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub reset_code_ttl_minutes: i64,
}

/// Pricing policy knobs. Amounts are integer currency units.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Flat shipping fee applied to any non-empty cart or order.
    pub shipping_fee: i64,
    /// Tax as an integer percentage of the subtotal.
    pub tax_rate_percent: i64,
    /// Points earned per order = total / divisor. One point redeems one
    /// currency unit.
    pub loyalty_earn_divisor: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: String,
}

impl StoreConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(StoreConfig {
            common: common_config,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("store_db"), is_prod)?,
            },
            redis: RedisConfig {
                url: get_env("REDIS_URL", Some("redis://localhost:6379"), is_prod)?,
            },
            auth: AuthConfig {
                jwt_secret: get_env("JWT_SECRET", Some("dev-only-secret"), is_prod)?,
                token_ttl_hours: get_env("TOKEN_TTL_HOURS", Some("24"), is_prod)?
                    .parse()
                    .unwrap_or(24),
                reset_code_ttl_minutes: get_env("RESET_CODE_TTL_MINUTES", Some("15"), is_prod)?
                    .parse()
                    .unwrap_or(15),
            },
            pricing: PricingConfig {
                shipping_fee: get_env("SHIPPING_FEE", Some("30000"), is_prod)?
                    .parse()
                    .unwrap_or(30000),
                tax_rate_percent: get_env("TAX_RATE_PERCENT", Some("0"), is_prod)?
                    .parse()
                    .unwrap_or(0),
                loyalty_earn_divisor: get_env("LOYALTY_EARN_DIVISOR", Some("100"), is_prod)?
                    .parse()
                    .unwrap_or(100),
            },
            uploads: UploadConfig {
                dir: get_env("UPLOADS_DIR", Some("uploads"), is_prod)?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::Config(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::Config(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
