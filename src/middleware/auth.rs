use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::error::ApiError;

pub const ADMIN_GROUP: &str = "admin";

/// Caller identity extracted from a verified token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub sub: String,
    pub email: Option<String>,
    pub groups: Vec<String>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.groups.iter().any(|group| group == ADMIN_GROUP)
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization token required")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("Administrator role required")]
    NotAdmin,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken(_) => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::NotAdmin => ApiError::Forbidden(err.to_string()),
        }
    }
}

/// Identity-token verifier.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    pub exp: usize,
}

/// Verifies HS256 tokens signed with a shared secret.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)?.claims;
        Ok(Identity {
            sub: claims.sub,
            email: claims.email,
            groups: claims.groups,
        })
    }
}

/// How admin routes are guarded. `Disabled` is an explicit local/dev mode.
#[derive(Clone)]
pub enum AuthMode {
    Enforced(Arc<dyn IdentityVerifier>),
    Disabled,
}

pub async fn require_admin(
    State(mode): State<AuthMode>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let verifier = match mode {
        AuthMode::Enforced(verifier) => verifier,
        AuthMode::Disabled => {
            debug!(uri = %req.uri(), "Auth disabled, admin route left open");
            return Ok(next.run(req).await);
        }
    };

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)?;

    let identity = verifier.verify(token).await?;
    if !identity.is_admin() {
        return Err(AuthError::NotAdmin.into());
    }

    debug!(email = ?identity.email, "Admin request authorised");
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
