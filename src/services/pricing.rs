//! Server-side cart pricing. Prices always come from the catalog; whatever
//! the client believes an item costs is never read.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::entities::product::{self, Entity as ProductEntity};
use crate::money;

/// Read side of the catalog needed for pricing.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Returns the products matching `ids`. Unknown ids are simply absent.
    async fn fetch_products_by_ids(&self, ids: &[i32]) -> Result<Vec<product::Model>, DbErr>;
}

#[async_trait]
impl CatalogReader for DatabaseConnection {
    async fn fetch_products_by_ids(&self, ids: &[i32]) -> Result<Vec<product::Model>, DbErr> {
        ProductEntity::find()
            .filter(product::Column::Id.is_in(ids.iter().copied()))
            .all(self)
            .await
    }
}

/// One line of a client-submitted cart. Untrusted.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product_id: i32,
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl CartEntry {
    /// Missing or non-positive quantities count as one unit.
    pub fn clamped_quantity(&self) -> i64 {
        self.quantity.unwrap_or(1).max(1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLineItem {
    pub product_id: i32,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricedCart {
    pub items: Vec<PricedLineItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
}

impl PricedCart {
    pub fn total(&self) -> Decimal {
        self.subtotal + self.tax
    }
}

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("product {0} does not exist")]
    ProductNotFound(i32),
    #[error("amount for product {0} is too large")]
    AmountTooLarge(i32),
    #[error("failed to read catalog")]
    Catalog(#[from] DbErr),
}

/// Tax applied on top of the subtotal. No tax policy exists yet.
fn tax_for(_subtotal: Decimal) -> Decimal {
    Decimal::new(0, money::SCALE)
}

pub async fn price_cart<R>(catalog: &R, cart: &[CartEntry]) -> Result<PricedCart, PricingError>
where
    R: CatalogReader + ?Sized,
{
    if cart.is_empty() {
        return Err(PricingError::EmptyCart);
    }

    let ids: Vec<i32> = cart
        .iter()
        .map(|entry| entry.product_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let by_id: HashMap<i32, product::Model> = catalog
        .fetch_products_by_ids(&ids)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let mut subtotal = Decimal::new(0, money::SCALE);
    let mut items = Vec::with_capacity(cart.len());

    for entry in cart {
        let product = by_id
            .get(&entry.product_id)
            .ok_or(PricingError::ProductNotFound(entry.product_id))?;

        let quantity = entry.clamped_quantity();
        let unit_price = money::from_cents(product.price_cents);
        let line_total = unit_price
            .checked_mul(Decimal::from(quantity))
            .filter(|total| money::to_cents(*total).is_some())
            .ok_or(PricingError::AmountTooLarge(product.id))?;

        subtotal = subtotal
            .checked_add(line_total)
            .filter(|total| money::to_cents(*total).is_some())
            .ok_or(PricingError::AmountTooLarge(product.id))?;

        items.push(PricedLineItem {
            product_id: product.id,
            name: product.name.clone(),
            unit_price,
            quantity,
            line_total,
        });
    }

    Ok(PricedCart {
        tax: tax_for(subtotal),
        items,
        subtotal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    /// Catalog double that records every batch read.
    struct FixedCatalog {
        products: Vec<product::Model>,
        reads: Mutex<Vec<Vec<i32>>>,
    }

    impl FixedCatalog {
        fn new(products: &[(i32, &str, i64)]) -> Self {
            Self {
                products: products
                    .iter()
                    .map(|(id, name, price_cents)| product::Model {
                        id: *id,
                        name: (*name).to_owned(),
                        price_cents: *price_cents,
                        image_key: None,
                        category: None,
                    })
                    .collect(),
                reads: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CatalogReader for FixedCatalog {
        async fn fetch_products_by_ids(
            &self,
            ids: &[i32],
        ) -> Result<Vec<product::Model>, DbErr> {
            self.reads.lock().unwrap().push(ids.to_vec());
            Ok(self
                .products
                .iter()
                .filter(|product| ids.contains(&product.id))
                .cloned()
                .collect())
        }
    }

    fn entry(product_id: i32, quantity: Option<i64>) -> CartEntry {
        CartEntry {
            product_id,
            quantity,
        }
    }

    #[tokio::test]
    async fn prices_a_single_line_from_the_catalog() {
        let catalog = FixedCatalog::new(&[(1, "Sustrato universal x 1 kg", 850_000)]);

        let priced = price_cart(&catalog, &[entry(1, Some(2))]).await.unwrap();

        assert_eq!(
            priced.items,
            vec![PricedLineItem {
                product_id: 1,
                name: "Sustrato universal x 1 kg".into(),
                unit_price: dec!(8500.00),
                quantity: 2,
                line_total: dec!(17000.00),
            }]
        );
        assert_eq!(priced.subtotal, dec!(17000.00));
        assert_eq!(priced.tax, Decimal::ZERO);
        assert_eq!(priced.total(), dec!(17000.00));
    }

    #[tokio::test]
    async fn subtotal_is_the_sum_of_line_totals_in_cart_order() {
        let catalog = FixedCatalog::new(&[(1, "a", 1_999), (2, "b", 250), (3, "c", 10)]);
        let cart = [entry(3, Some(3)), entry(1, Some(1)), entry(2, Some(4)), entry(1, Some(2))];

        let priced = price_cart(&catalog, &cart).await.unwrap();

        let ids: Vec<i32> = priced.items.iter().map(|item| item.product_id).collect();
        assert_eq!(ids, vec![3, 1, 2, 1]);
        let sum: Decimal = priced
            .items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum();
        assert_eq!(priced.subtotal, sum);
        assert_eq!(priced.subtotal, dec!(70.27));
    }

    #[tokio::test]
    async fn reads_each_distinct_product_once_in_one_batch() {
        let catalog = FixedCatalog::new(&[(1, "a", 100), (2, "b", 200)]);
        let cart = [entry(2, None), entry(1, None), entry(2, Some(5))];

        price_cart(&catalog, &cart).await.unwrap();

        assert_eq!(*catalog.reads.lock().unwrap(), vec![vec![1, 2]]);
    }

    #[tokio::test]
    async fn missing_or_non_positive_quantities_become_one() {
        let catalog = FixedCatalog::new(&[(7, "pot", 950_000)]);
        let cart = [entry(7, None), entry(7, Some(0)), entry(7, Some(-4))];

        let priced = price_cart(&catalog, &cart).await.unwrap();

        assert!(priced.items.iter().all(|item| item.quantity == 1));
        assert_eq!(priced.subtotal, dec!(28500.00));
    }

    #[tokio::test]
    async fn unknown_product_fails_the_whole_cart() {
        let catalog = FixedCatalog::new(&[(1, "a", 100)]);

        let err = price_cart(&catalog, &[entry(1, Some(1)), entry(999, Some(1))])
            .await
            .unwrap_err();

        assert!(matches!(err, PricingError::ProductNotFound(999)));
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_before_reading_the_catalog() {
        let catalog = FixedCatalog::new(&[(1, "a", 100)]);

        let err = price_cart(&catalog, &[]).await.unwrap_err();

        assert!(matches!(err, PricingError::EmptyCart));
        assert!(catalog.reads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn absurd_quantities_are_rejected_instead_of_overflowing() {
        let catalog = FixedCatalog::new(&[(1, "a", 2_100_000)]);

        let err = price_cart(&catalog, &[entry(1, Some(i64::MAX))])
            .await
            .unwrap_err();

        assert!(matches!(err, PricingError::AmountTooLarge(1)));
    }
}
