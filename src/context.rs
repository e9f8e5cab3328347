//! App Context

use sea_orm::{DatabaseConnection, DbErr};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::database;
use crate::entities::{seed_catalog, setup_schema};
use crate::middleware::auth::{AuthMode, JwtVerifier};
use crate::services::{
    notifier::{publish_budget, HttpQueuePublisher, PaymentNotifier},
    storage::{TokenUploadSigner, UploadSigner},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database: {0}")]
    Database(#[source] DbErr),
    #[error("failed to initialise schema: {0}")]
    Schema(#[source] DbErr),
}

/// Shared, per-process capabilities handed to every request.
#[derive(Clone)]
pub struct AppContext {
    pub db: Arc<DatabaseConnection>,
    pub notifier: Arc<PaymentNotifier>,
    pub uploads: Option<Arc<dyn UploadSigner>>,
    pub upload_ttl: Duration,
    pub request_timeout: Duration,
    pub auth: AuthMode,
}

impl AppContext {
    /// Connects to the store and wires the external collaborators from `config`.
    pub async fn from_config(config: &Config) -> Result<Self, AppInitError> {
        let db = database::connect(&config.database_url)
            .await
            .map_err(AppInitError::Database)?;

        if config.init_db {
            setup_schema(&db).await.map_err(AppInitError::Schema)?;
            seed_catalog(&db).await.map_err(AppInitError::Schema)?;
        }

        let publish_timeout = publish_budget(config.payment_queue_timeout, config.request_timeout);
        let notifier = match &config.payment_queue_url {
            Some(url) => {
                info!(queue = %url, timeout = ?publish_timeout, "Payment requests go to queue");
                PaymentNotifier::new(Arc::new(HttpQueuePublisher::new(url.clone())), &config.currency)
                    .with_timeout(publish_timeout)
            }
            None => {
                warn!("PAYMENT_QUEUE_URL not set, payment requests will not be sent");
                PaymentNotifier::disabled(&config.currency)
            }
        };

        let auth = match (&config.auth_secret, config.auth_enforced) {
            (Some(secret), true) => AuthMode::Enforced(Arc::new(JwtVerifier::new(secret))),
            _ => {
                warn!("AUTH_ENFORCED is off, admin routes are NOT protected");
                AuthMode::Disabled
            }
        };

        let uploads = config.upload_signing_key.as_deref().map(|key| {
            Arc::new(TokenUploadSigner::new(config.assets_base_url.clone(), key))
                as Arc<dyn UploadSigner>
        });

        Ok(Self {
            db: Arc::new(db),
            notifier: Arc::new(notifier),
            uploads,
            upload_ttl: config.upload_url_ttl,
            request_timeout: config.request_timeout,
            auth,
        })
    }
}
