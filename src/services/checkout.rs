//! Checkout: validate, price, persist, then ask for payment.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

use crate::entities::order::Status;
use crate::error::ApiError;
use crate::services::{
    ledger::{self, CustomerDetails, LedgerError},
    notifier::{CommittedOrder, PaymentNotifier},
    pricing::{self, CartEntry, PricingError},
};

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub customer: Option<CustomerInput>,
    #[serde(default)]
    pub cart: Option<Vec<CartEntry>>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct CustomerInput {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    #[validate(regex(path = *EMAIL_REGEX))]
    pub email: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl CustomerInput {
    fn into_details(self) -> Result<CustomerDetails, CheckoutError> {
        let input = Self {
            name: self.name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            ..self
        };
        input
            .validate()
            .map_err(|_| CheckoutError::Validation("a name and a valid email are required".into()))?;

        Ok(CustomerDetails {
            name: input.name,
            email: input.email,
            address: input.address.unwrap_or_default(),
            phone: input.phone.unwrap_or_default(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub ok: bool,
    pub order_id: i32,
    pub total: Decimal,
    pub status: Status,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Validation(msg) => ApiError::Validation(msg),
            CheckoutError::Pricing(PricingError::EmptyCart) => {
                ApiError::Validation("cart is empty".into())
            }
            CheckoutError::Pricing(PricingError::ProductNotFound(id)) => {
                ApiError::NotFound(format!("product {id} does not exist"))
            }
            CheckoutError::Pricing(err @ PricingError::AmountTooLarge(_)) => {
                ApiError::Validation(err.to_string())
            }
            CheckoutError::Pricing(PricingError::Catalog(err)) => ApiError::from(err),
            CheckoutError::Ledger(err) => ApiError::Internal(err.to_string()),
        }
    }
}

/// Runs one checkout. Pricing happens before the transaction opens, the
/// notifier only after it committed; a notifier failure is logged and the
/// order is still reported as placed.
pub async fn place_order(
    db: &DatabaseConnection,
    notifier: &PaymentNotifier,
    request: CheckoutRequest,
) -> Result<CheckoutReceipt, CheckoutError> {
    let customer = request.customer.unwrap_or_default().into_details()?;
    let cart = match request.cart {
        Some(cart) if !cart.is_empty() => cart,
        _ => return Err(CheckoutError::Validation("cart is empty".into())),
    };

    let priced = pricing::price_cart(db, &cart).await?;

    let txn = db.begin().await.map_err(LedgerError::from)?;
    let placed = match ledger::record_order(&txn, &customer, &priced).await {
        Ok(placed) => placed,
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                error!(error = %rollback_err, "Failed to roll back checkout");
            }
            return Err(err.into());
        }
    };
    txn.commit().await.map_err(LedgerError::from)?;

    info!(
        order_id = placed.order_id,
        total = %placed.total,
        currency = notifier.currency(),
        customer = %customer.name,
        email = %customer.email,
        "Order placed"
    );

    let committed = CommittedOrder {
        order_id: placed.order_id,
        customer_id: placed.customer_id,
        customer_email: &customer.email,
        total: placed.total,
        items: &priced.items,
    };
    if let Err(err) = notifier.request_payment(committed).await {
        error!(
            order_id = placed.order_id,
            error = %err,
            "Payment request not queued; order stays committed"
        );
    }

    Ok(CheckoutReceipt {
        ok: true,
        order_id: placed.order_id,
        total: placed.total,
        status: Status::PendingPayment,
    })
}
