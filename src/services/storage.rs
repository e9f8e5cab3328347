//! Time-limited upload URLs for product images.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

static UNSAFE_KEY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9.-]").expect("key pattern compiles"));

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to sign upload url: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Object storage capability that authorises direct uploads.
pub trait UploadSigner: Send + Sync {
    /// URL a client may `PUT` `key` to, valid for `ttl`.
    fn presign_put(&self, key: &str, content_type: &str, ttl: Duration)
        -> Result<String, StorageError>;

    /// Where the object is readable once uploaded.
    fn public_url(&self, key: &str) -> String;
}

/// Claims embedded in an upload URL; the storage gateway verifies them.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadClaims {
    pub key: String,
    pub content_type: String,
    pub exp: usize,
}

/// Signs upload URLs with a shared key (HS256).
pub struct TokenUploadSigner {
    base_url: String,
    key: EncodingKey,
}

impl TokenUploadSigner {
    pub fn new(base_url: impl Into<String>, secret: &str) -> Self {
        Self {
            base_url: base_url.into(),
            key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl UploadSigner for TokenUploadSigner {
    fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let exp = Utc::now().timestamp() as u64 + ttl.as_secs();
        let claims = UploadClaims {
            key: key.to_owned(),
            content_type: content_type.to_owned(),
            exp: exp as usize,
        };
        let token = encode(&Header::default(), &claims, &self.key)?;
        Ok(format!("{}?token={token}", self.public_url(key)))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }
}

/// Storage key for an uploaded product image: `products/<millis>-<name>`,
/// with anything outside `[a-zA-Z0-9.-]` replaced by `_`.
pub fn object_key(filename: &str, now_millis: i64) -> String {
    let clean = UNSAFE_KEY_CHARS.replace_all(filename, "_");
    format!("products/{now_millis}-{clean}")
}
