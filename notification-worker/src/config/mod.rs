use serde::Deserialize;
use service_core::error::AppError;
use service_core::jobs::EMAIL_QUEUE_KEY;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub redis: RedisConfig,
    pub smtp: SmtpConfig,
    /// BRPOP timeout. Bounds how long a shutdown request can wait.
    pub poll_timeout_secs: u64,
    /// Upper bound on the retry window for a single send.
    pub max_retry_elapsed_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub queue_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub enabled: bool,
}

impl WorkerConfig {
    pub fn load() -> Result<Self, AppError> {
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(WorkerConfig {
            redis: RedisConfig {
                url: get_env("REDIS_URL", Some("redis://localhost:6379"), is_prod)?,
                queue_key: get_env("EMAIL_QUEUE_KEY", Some(EMAIL_QUEUE_KEY), is_prod)?,
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("smtp.gmail.com"), is_prod)?,
                port: get_env("SMTP_PORT", Some("587"), is_prod)?
                    .parse()
                    .unwrap_or(587),
                user: get_env("SMTP_USER", Some(""), is_prod)?,
                password: get_env("SMTP_PASSWORD", Some(""), is_prod)?,
                from_email: get_env("SMTP_FROM_EMAIL", Some("noreply@example.com"), is_prod)?,
                from_name: get_env("SMTP_FROM_NAME", Some("Store"), is_prod)?,
                enabled: env::var("SMTP_ENABLED")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()
                    .unwrap_or(false),
            },
            poll_timeout_secs: get_env("POLL_TIMEOUT_SECS", Some("5"), is_prod)?
                .parse()
                .unwrap_or(5),
            max_retry_elapsed_secs: get_env("MAX_RETRY_ELAPSED_SECS", Some("60"), is_prod)?
                .parse()
                .unwrap_or(60),
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
