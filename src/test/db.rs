//! Throw-away SQLite databases for unit tests.

use sea_orm::DatabaseConnection;
use tempfile::TempDir;

use crate::database;
use crate::entities::{seed_catalog, setup_schema};

pub struct TestDb {
    pub conn: DatabaseConnection,
    _dir: TempDir,
}

impl TestDb {
    /// Schema plus the starter catalog, in a file that lives as long as `self`.
    pub async fn seeded() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let url = database::sqlite_file_url(&dir.path().join("store.db"));
        let conn = database::connect(&url).await.expect("connect test database");
        setup_schema(&conn).await.expect("create schema");
        seed_catalog(&conn).await.expect("seed catalog");
        Self { conn, _dir: dir }
    }
}
