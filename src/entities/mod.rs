pub mod customer;
pub mod order;
pub mod order_item;
pub mod product;

use sea_orm::{
    sea_query::{OnConflict, TableCreateStatement},
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Schema, Set,
};
use tracing::info;

use crate::entities::{
    customer::Entity as Customer, order::Entity as Order, order_item::Entity as OrderItem,
    product::Entity as Product,
};

/// Creates every table the service needs when it does not exist yet.
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables: [(&str, TableCreateStatement); 4] = [
        ("products", schema.create_table_from_entity(Product)),
        ("customers", schema.create_table_from_entity(Customer)),
        ("orders", schema.create_table_from_entity(Order)),
        ("order_items", schema.create_table_from_entity(OrderItem)),
    ];

    for (name, mut statement) in tables {
        statement.if_not_exists();
        db.execute(backend.build(&statement)).await?;
        info!(table = name, "Schema ensured");
    }

    let indexes = [
        schema.create_index_from_entity(Order),
        schema.create_index_from_entity(OrderItem),
    ];
    for mut index in indexes.into_iter().flatten() {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    Ok(())
}

const STARTER_CATALOG: [(i32, &str, i64, &str, &str); 10] = [
    (1, "Sustrato universal x 1 kg", 850_000, "products/sustrato1kg.jpg", "Sustrato"),
    (2, "Sustrato premium para orquideas 2 kg", 1_550_000, "products/sustrato-orquideas.jpg", "Sustrato"),
    (3, "Fertilizante liquido foliar 1L", 1_250_000, "products/fertilizante-foliar.jpg", "Fertilizante"),
    (4, "Abono organico compostado 3 kg", 1_890_000, "products/abono-organico.jpg", "Fertilizante"),
    (5, "Maceta de barro pequena", 950_000, "products/maceta-barro.jpg", "Macetas"),
    (6, "Maceta plastica mediana con plato", 1_290_000, "products/maceta-plastica.jpg", "Macetas"),
    (7, "Maceta colgante de fibra natural", 1_790_000, "products/maceta-colgante.jpg", "Macetas"),
    (8, "Tijeras de poda de acero inoxidable", 2_100_000, "products/tijeras-poda.jpg", "Herramientas"),
    (9, "Palita metalica para jardineria", 990_000, "products/palita-metalica.jpg", "Herramientas"),
    (10, "Guantes de jardineria con agarre", 750_000, "products/guantes-jardineria.jpg", "Herramientas"),
];

/// Inserts the starter catalog. Rows whose id already exists are left alone.
pub async fn seed_catalog(db: &DatabaseConnection) -> Result<u64, DbErr> {
    let rows = STARTER_CATALOG
        .iter()
        .map(|(id, name, price_cents, image_key, category)| product::ActiveModel {
            id: Set(*id),
            name: Set((*name).to_owned()),
            price_cents: Set(*price_cents),
            image_key: Set(Some((*image_key).to_owned())),
            category: Set(Some((*category).to_owned())),
        });

    Product::insert_many(rows)
        .on_conflict(OnConflict::column(product::Column::Id).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;

    let count = Product::find().count(db).await?;
    info!(products = count, "Catalog seeded");

    Ok(count)
}
