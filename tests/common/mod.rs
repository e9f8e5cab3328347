#![allow(dead_code)]

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::Client;
use sea_orm::{EntityTrait, PaginatorTrait};
use std::{sync::Arc, time::Duration};
use tempfile::TempDir;

use storefront_orders::{
    create_api_router, database,
    entities::{customer, order, order_item, seed_catalog, setup_schema},
    middleware::auth::{AuthMode, Claims, JwtVerifier},
    services::{
        notifier::{
            publish_budget, InMemoryQueue, PaymentNotifier, PaymentRequest, PublishError,
            QueuePublisher, DEFAULT_PUBLISH_TIMEOUT,
        },
        storage::{TokenUploadSigner, UploadSigner},
    },
    AppContext,
};

pub const AUTH_SECRET: &str = "integration-secret";

pub enum QueueSetup {
    InMemory,
    Broken,
    /// Answers only after the given delay.
    Slow(Duration),
    Unconfigured,
}

pub struct TestOptions {
    pub auth_enforced: bool,
    pub queue: QueueSetup,
    pub request_timeout: Duration,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            auth_enforced: false,
            queue: QueueSetup::InMemory,
            request_timeout: Duration::from_secs(10),
        }
    }
}

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub ctx: AppContext,
    pub queue: Arc<InMemoryQueue>,
    _dir: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// (customers, orders, order items)
    pub async fn row_counts(&self) -> (u64, u64, u64) {
        let db = self.ctx.db.as_ref();
        (
            customer::Entity::find().count(db).await.expect("count customers"),
            order::Entity::find().count(db).await.expect("count orders"),
            order_item::Entity::find().count(db).await.expect("count items"),
        )
    }

    pub async fn checkout(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/orders"))
            .json(&body)
            .send()
            .await
            .expect("Failed to send checkout request")
    }
}

/// Queue that refuses every message.
pub struct BrokenQueue;

#[async_trait]
impl QueuePublisher for BrokenQueue {
    async fn publish(&self, _message: &PaymentRequest) -> Result<String, PublishError> {
        Err(PublishError::Unavailable("queue is down".into()))
    }
}

/// Queue that waits before acknowledging each message.
pub struct SlowQueue(pub Duration);

#[async_trait]
impl QueuePublisher for SlowQueue {
    async fn publish(&self, _message: &PaymentRequest) -> Result<String, PublishError> {
        tokio::time::sleep(self.0).await;
        Ok("slow-1".into())
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(TestOptions::default()).await
}

pub async fn spawn_app_with(options: TestOptions) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = database::sqlite_file_url(&dir.path().join("store.db"));
    let db = database::connect(&url).await.expect("Failed to connect");
    setup_schema(&db).await.expect("Failed to create schema");
    seed_catalog(&db).await.expect("Failed to seed catalog");

    let queue = Arc::new(InMemoryQueue::new());
    let notifier = match options.queue {
        QueueSetup::InMemory => PaymentNotifier::new(queue.clone(), "COP"),
        QueueSetup::Broken => PaymentNotifier::new(Arc::new(BrokenQueue), "COP"),
        QueueSetup::Slow(delay) => PaymentNotifier::new(Arc::new(SlowQueue(delay)), "COP"),
        QueueSetup::Unconfigured => PaymentNotifier::disabled("COP"),
    }
    .with_timeout(publish_budget(DEFAULT_PUBLISH_TIMEOUT, options.request_timeout));

    let auth = if options.auth_enforced {
        AuthMode::Enforced(Arc::new(JwtVerifier::new(AUTH_SECRET)))
    } else {
        AuthMode::Disabled
    };

    let ctx = AppContext {
        db: Arc::new(db),
        notifier: Arc::new(notifier),
        uploads: Some(Arc::new(TokenUploadSigner::new(
            "https://assets.example.com",
            AUTH_SECRET,
        )) as Arc<dyn UploadSigner>),
        upload_ttl: Duration::from_secs(300),
        request_timeout: options.request_timeout,
        auth,
    };

    let app = create_api_router(ctx.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let address = format!("http://{}", listener.local_addr().expect("local addr"));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });

    TestApp {
        address,
        client: Client::new(),
        ctx,
        queue,
        _dir: dir,
    }
}

pub fn token_with_groups(groups: &[&str]) -> String {
    let claims = Claims {
        sub: "test-user".into(),
        email: Some("admin@example.com".into()),
        groups: groups.iter().map(|group| (*group).to_owned()).collect(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(AUTH_SECRET.as_bytes()),
    )
    .expect("Failed to sign token")
}
