//! Best-effort handoff of committed orders to the payment processor queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info};
use uuid::Uuid;

use crate::services::pricing::PricedLineItem;

pub const PAYMENT_REQUEST: &str = "PAYMENT_REQUEST";

pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Publish deadline for a checkout: the configured value, capped at half the
/// request timeout so the caller always gets the receipt.
pub fn publish_budget(configured: Duration, request_timeout: Duration) -> Duration {
    configured.min(request_timeout / 2)
}

/// Queue message asking the payment processor to charge an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub order_id: i32,
    pub customer_id: i32,
    pub customer_email: String,
    pub amount: Decimal,
    pub currency: String,
    pub items: Vec<PricedLineItem>,
    pub created_at: DateTime<Utc>,
}

impl PaymentRequest {
    /// Routing attributes sent next to the body.
    pub fn attributes(&self) -> [(&'static str, String); 2] {
        [
            ("OrderId", self.order_id.to_string()),
            ("EventType", self.kind.clone()),
        ]
    }
}

/// Order data the notifier needs once the checkout transaction committed.
#[derive(Clone, Debug)]
pub struct CommittedOrder<'a> {
    pub order_id: i32,
    pub customer_id: i32,
    pub customer_email: &'a str,
    pub total: Decimal,
    pub items: &'a [PricedLineItem],
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("queue transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("queue rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("queue unavailable: {0}")]
    Unavailable(String),
    #[error("queue did not answer within {0:?}")]
    TimedOut(Duration),
}

/// Fire-and-forget publisher. Returns the id the queue assigned.
#[async_trait]
pub trait QueuePublisher: Send + Sync {
    async fn publish(&self, message: &PaymentRequest) -> Result<String, PublishError>;
}

/// Publishes by POSTing the JSON message to a queue endpoint.
#[derive(Debug, Clone)]
pub struct HttpQueuePublisher {
    endpoint: String,
    http: Client,
}

impl HttpQueuePublisher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: Client::new(),
        }
    }
}

#[async_trait]
impl QueuePublisher for HttpQueuePublisher {
    async fn publish(&self, message: &PaymentRequest) -> Result<String, PublishError> {
        let message_id = Uuid::new_v4().to_string();
        let mut request = self
            .http
            .post(&self.endpoint)
            .header("X-Message-Id", &message_id)
            .json(message);
        for (name, value) in message.attributes() {
            request = request.header(format!("X-Message-Attribute-{name}"), value);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected { status, body });
        }

        Ok(message_id)
    }
}

/// Keeps published messages in memory. Used by tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    messages: Mutex<Vec<PaymentRequest>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<PaymentRequest> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueuePublisher for InMemoryQueue {
    async fn publish(&self, message: &PaymentRequest) -> Result<String, PublishError> {
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| PublishError::Unavailable("in-memory queue poisoned".into()))?;
        messages.push(message.clone());
        Ok(format!("mem-{}", messages.len()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent { message_id: String },
    /// No queue is configured.
    NotSent,
}

#[derive(Clone)]
pub struct PaymentNotifier {
    publisher: Option<Arc<dyn QueuePublisher>>,
    currency: String,
    timeout: Duration,
}

impl PaymentNotifier {
    pub fn new(publisher: Arc<dyn QueuePublisher>, currency: impl Into<String>) -> Self {
        Self {
            publisher: Some(publisher),
            currency: currency.into(),
            timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    pub fn disabled(currency: impl Into<String>) -> Self {
        Self {
            publisher: None,
            currency: currency.into(),
            timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Upper bound for the single publish attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Makes exactly one publish attempt, abandoned after the configured
    /// timeout. Callers decide what a failure means; it never affects the
    /// already committed order.
    pub async fn request_payment(
        &self,
        order: CommittedOrder<'_>,
    ) -> Result<NotifyOutcome, PublishError> {
        let Some(publisher) = &self.publisher else {
            debug!(order_id = order.order_id, "No payment queue configured, skipping");
            return Ok(NotifyOutcome::NotSent);
        };

        let message = PaymentRequest {
            kind: PAYMENT_REQUEST.to_owned(),
            order_id: order.order_id,
            customer_id: order.customer_id,
            customer_email: order.customer_email.to_owned(),
            amount: order.total,
            currency: self.currency.clone(),
            items: order.items.to_vec(),
            created_at: Utc::now(),
        };

        let message_id = timeout(self.timeout, publisher.publish(&message))
            .await
            .map_err(|_| PublishError::TimedOut(self.timeout))??;
        info!(
            order_id = order.order_id,
            message_id = %message_id,
            "Payment request queued"
        );

        Ok(NotifyOutcome::Sent { message_id })
    }
}
