//! Transactional write of a checkout: customer upsert, order header and its
//! line items. Every function here runs inside a caller-owned transaction.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr, TransactionTrait,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::entities::{
    customer::{self, Entity as CustomerEntity},
    order::{self, Status},
    order_item::{self, Entity as OrderItemEntity},
};
use crate::money;
use crate::services::pricing::PricedCart;

/// Validated customer fields. Address and phone are empty when not given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: i32,
    pub customer_id: i32,
    pub total: Decimal,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("customer {0} kept conflicting with a concurrent checkout")]
    Conflict(String),
    #[error("amount cannot be stored")]
    AmountOutOfRange,
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

/// Persists customer, order and items. Nothing is committed here.
pub async fn record_order(
    txn: &DatabaseTransaction,
    details: &CustomerDetails,
    cart: &PricedCart,
) -> Result<PlacedOrder, LedgerError> {
    let customer_id = upsert_customer(txn, details).await?;

    let total = cart.total();
    let new_order = order::ActiveModel {
        customer_id: Set(Some(customer_id)),
        status: Set(Status::Pending),
        subtotal_cents: Set(cents(cart.subtotal)?),
        tax_cents: Set(cents(cart.tax)?),
        total_cents: Set(cents(total)?),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let order = new_order.insert(txn).await?;

    let rows = cart
        .items
        .iter()
        .map(|item| {
            Ok(order_item::ActiveModel {
                order_id: Set(order.id),
                product_id: Set(item.product_id),
                name: Set(item.name.clone()),
                unit_price_cents: Set(cents(item.unit_price)?),
                quantity: Set(item.quantity),
                line_total_cents: Set(cents(item.line_total)?),
                ..Default::default()
            })
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;
    OrderItemEntity::insert_many(rows).exec(txn).await?;

    debug!(
        order_id = order.id,
        customer_id,
        items = cart.items.len(),
        "Order rows written"
    );

    Ok(PlacedOrder {
        order_id: order.id,
        customer_id,
        total,
    })
}

/// Finds the customer by email and overwrites its contact fields, or
/// creates it. Returns the customer id.
pub async fn upsert_customer(
    txn: &DatabaseTransaction,
    details: &CustomerDetails,
) -> Result<i32, LedgerError> {
    match update_existing(txn, details).await? {
        Some(id) => Ok(id),
        None => insert_or_adopt(txn, details).await,
    }
}

/// Inserts a new customer inside a savepoint. If a concurrent checkout
/// created the same email first, the savepoint is dropped and the lookup is
/// retried once.
pub(crate) async fn insert_or_adopt(
    txn: &DatabaseTransaction,
    details: &CustomerDetails,
) -> Result<i32, LedgerError> {
    let savepoint = txn.begin().await?;
    let new_customer = customer::ActiveModel {
        name: Set(details.name.clone()),
        email: Set(details.email.clone()),
        address: Set(details.address.clone()),
        phone: Set(details.phone.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    match new_customer.insert(&savepoint).await {
        Ok(model) => {
            savepoint.commit().await?;
            Ok(model.id)
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            savepoint.rollback().await?;
            warn!(email = %details.email, "Customer created concurrently, retrying lookup");
            update_existing(txn, details)
                .await?
                .ok_or_else(|| LedgerError::Conflict(details.email.clone()))
        }
        Err(err) => {
            savepoint.rollback().await?;
            Err(err.into())
        }
    }
}

async fn update_existing(
    txn: &DatabaseTransaction,
    details: &CustomerDetails,
) -> Result<Option<i32>, LedgerError> {
    let Some(existing) = CustomerEntity::find()
        .filter(customer::Column::Email.eq(details.email.as_str()))
        .one(txn)
        .await?
    else {
        return Ok(None);
    };

    let id = existing.id;
    let mut existing: customer::ActiveModel = existing.into();
    existing.name = Set(details.name.clone());
    existing.address = Set(details.address.clone());
    existing.phone = Set(details.phone.clone());
    existing.update(txn).await?;

    Ok(Some(id))
}

fn cents(amount: Decimal) -> Result<i64, LedgerError> {
    money::to_cents(amount).ok_or(LedgerError::AmountOutOfRange)
}
