//! Order lookup and externally driven status changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::entities::{
    customer,
    order::{self, Entity as OrderEntity, InvalidStatus, Status},
    order_item::{self, Entity as OrderItemEntity},
};
use crate::error::ApiError;
use crate::money;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub id: i32,
    pub status: Status,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub items: Vec<OrderLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: i32,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub line_total: Decimal,
}

impl From<order_item::Model> for OrderLine {
    fn from(item: order_item::Model) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name,
            unit_price: money::from_cents(item.unit_price_cents),
            quantity: item.quantity,
            line_total: money::from_cents(item.line_total_cents),
        }
    }
}

/// Loads an order with its items in insertion order. The customer fields are
/// empty when the customer row was deleted after the order was placed.
pub async fn find_order(db: &DatabaseConnection, id: i32) -> Result<Option<OrderDetails>, DbErr> {
    let Some((order, customer)) = OrderEntity::find_by_id(id)
        .find_also_related(customer::Entity)
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let items = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(OrderLine::from)
        .collect();

    Ok(Some(OrderDetails {
        id: order.id,
        status: order.status,
        subtotal: money::from_cents(order.subtotal_cents),
        tax: money::from_cents(order.tax_cents),
        total: money::from_cents(order.total_cents),
        created_at: order.created_at,
        customer_name: customer.as_ref().map(|c| c.name.clone()),
        customer_email: customer.map(|c| c.email),
        items,
    }))
}

#[derive(Debug, Error)]
pub enum StatusUpdateError {
    #[error(transparent)]
    Invalid(#[from] InvalidStatus),
    #[error("order {0} not found")]
    NotFound(i32),
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

impl From<StatusUpdateError> for ApiError {
    fn from(err: StatusUpdateError) -> Self {
        match err {
            StatusUpdateError::Invalid(InvalidStatus(value)) => ApiError::Validation(format!(
                "invalid status `{value}`, accepted: {}",
                Status::accepted_values()
            )),
            StatusUpdateError::NotFound(id) => ApiError::NotFound(format!("order {id} not found")),
            StatusUpdateError::Db(err) => ApiError::from(err),
        }
    }
}

/// Sets the order status to any value of the enumeration. The value is
/// checked before the store is touched.
pub async fn update_status(
    db: &DatabaseConnection,
    id: i32,
    raw_status: &str,
) -> Result<Status, StatusUpdateError> {
    let status: Status = raw_status.parse()?;

    let order = OrderEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(StatusUpdateError::NotFound(id))?;

    let mut order: order::ActiveModel = order.into();
    order.status = Set(status);
    order.update(db).await?;

    info!(order_id = id, status = %status, "Order status updated");
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::checkout::{place_order, CheckoutRequest, CustomerInput};
    use crate::services::notifier::PaymentNotifier;
    use crate::services::pricing::CartEntry;
    use crate::test::db::TestDb;
    use rust_decimal_macros::dec;

    async fn placed_order(db: &TestDb) -> i32 {
        let request = CheckoutRequest {
            customer: Some(CustomerInput {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                address: Some("Calle 1".into()),
                phone: None,
            }),
            cart: Some(vec![
                CartEntry {
                    product_id: 4,
                    quantity: Some(1),
                },
                CartEntry {
                    product_id: 1,
                    quantity: Some(2),
                },
            ]),
        };
        place_order(&db.conn, &PaymentNotifier::disabled("COP"), request)
            .await
            .unwrap()
            .order_id
    }

    #[tokio::test]
    async fn finds_order_with_customer_and_items() {
        let db = TestDb::seeded().await;
        let id = placed_order(&db).await;

        let details = find_order(&db.conn, id).await.unwrap().unwrap();

        assert_eq!(details.status, Status::Pending);
        assert_eq!(details.subtotal, dec!(35900.00));
        assert_eq!(details.tax, dec!(0));
        assert_eq!(details.total, details.subtotal + details.tax);
        assert_eq!(details.customer_email.as_deref(), Some("ana@example.com"));
        let products: Vec<i32> = details.items.iter().map(|line| line.product_id).collect();
        assert_eq!(products, vec![4, 1]);
    }

    #[tokio::test]
    async fn missing_order_is_none() {
        let db = TestDb::seeded().await;
        assert_eq!(find_order(&db.conn, 12345).await.unwrap(), None);
    }

    #[tokio::test]
    async fn accepts_any_listed_status() {
        let db = TestDb::seeded().await;
        let id = placed_order(&db).await;

        assert_eq!(update_status(&db.conn, id, "DELIVERED").await.unwrap(), Status::Delivered);
        assert_eq!(update_status(&db.conn, id, "PENDING").await.unwrap(), Status::Pending);
        assert_eq!(update_status(&db.conn, id, "PAID").await.unwrap(), Status::Paid);

        let details = find_order(&db.conn, id).await.unwrap().unwrap();
        assert_eq!(details.status, Status::Paid);
    }

    #[tokio::test]
    async fn invalid_status_leaves_the_order_untouched() {
        let db = TestDb::seeded().await;
        let id = placed_order(&db).await;

        let err = update_status(&db.conn, id, "REFUNDED").await.unwrap_err();

        assert!(matches!(err, StatusUpdateError::Invalid(_)));
        assert!(matches!(ApiError::from(err), ApiError::Validation(_)));
        let details = find_order(&db.conn, id).await.unwrap().unwrap();
        assert_eq!(details.status, Status::Pending);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let db = TestDb::seeded().await;
        let err = update_status(&db.conn, 404, "PAID").await.unwrap_err();
        assert!(matches!(err, StatusUpdateError::NotFound(404)));
    }
}
