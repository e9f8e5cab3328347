use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value `{value}`")]
    InvalidValue { key: &'static str, value: String },
    #[error("AUTH_SECRET must be set while AUTH_ENFORCED is on")]
    MissingAuthSecret,
}

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub init_db: bool,
    /// Queue endpoint for payment requests. `None` turns the notifier off.
    pub payment_queue_url: Option<String>,
    /// Longest a checkout waits on the queue before giving up on the message.
    pub payment_queue_timeout: Duration,
    pub currency: String,
    pub auth_enforced: bool,
    pub auth_secret: Option<String>,
    pub assets_bucket: String,
    pub assets_base_url: String,
    pub upload_signing_key: Option<String>,
    pub upload_url_ttl: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let auth_enforced = parse_bool("AUTH_ENFORCED", var("AUTH_ENFORCED"), true)?;
        let auth_secret = var("AUTH_SECRET");
        if auth_enforced && auth_secret.is_none() {
            return Err(ConfigError::MissingAuthSecret);
        }

        let assets_bucket =
            var("ASSETS_BUCKET").unwrap_or_else(|| "storefront-assets".to_owned());
        let assets_base_url = var("ASSETS_BASE_URL")
            .unwrap_or_else(|| format!("https://{assets_bucket}.s3.amazonaws.com"));

        Ok(Self {
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://store.db?mode=rwc".to_owned()),
            port: parse_number("PORT", var("PORT"), 8080)?,
            init_db: parse_bool("INIT_DB", var("INIT_DB"), false)?,
            payment_queue_url: var("PAYMENT_QUEUE_URL"),
            payment_queue_timeout: Duration::from_secs(parse_number(
                "PAYMENT_QUEUE_TIMEOUT_SECS",
                var("PAYMENT_QUEUE_TIMEOUT_SECS"),
                5,
            )?),
            currency: var("PAYMENT_CURRENCY").unwrap_or_else(|| "COP".to_owned()),
            auth_enforced,
            upload_signing_key: var("UPLOAD_SIGNING_KEY").or_else(|| auth_secret.clone()),
            auth_secret,
            assets_bucket,
            assets_base_url: assets_base_url.trim_end_matches('/').to_owned(),
            upload_url_ttl: Duration::from_secs(parse_number(
                "UPLOAD_URL_TTL_SECS",
                var("UPLOAD_URL_TTL_SECS"),
                300,
            )?),
            request_timeout: Duration::from_secs(parse_number(
                "REQUEST_TIMEOUT_SECS",
                var("REQUEST_TIMEOUT_SECS"),
                30,
            )?),
        })
    }
}

fn parse_bool(key: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}
