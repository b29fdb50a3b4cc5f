#![allow(dead_code)]

use std::path::PathBuf;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Engine, MoneyCents};
use migration::MigratorTrait;
use uuid::Uuid;

pub const PASSWORD: &str = "password";

pub fn cents(value: i64) -> MoneyCents {
    MoneyCents::new(value)
}

pub async fn memory_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    engine_with_options(false).await
}

pub async fn engine_with_options(strict_split_totals: bool) -> (Engine, DatabaseConnection) {
    let db = memory_db().await;
    let engine = Engine::builder()
        .database(db.clone())
        .strict_split_totals(strict_split_totals)
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// File-backed database under `target/test_dbs`, for tests that need more
/// than one connection.
pub async fn file_db() -> (DatabaseConnection, String, PathBuf) {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    (db, url, path)
}

/// Inserts users straight into the table and returns their ids in order.
pub async fn seed_users(db: &DatabaseConnection, names: &[&str]) -> Vec<i64> {
    let backend = db.get_database_backend();
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let result = db
            .execute(Statement::from_sql_and_values(
                backend,
                "INSERT INTO users (username, password) VALUES (?, ?)",
                vec![(*name).into(), PASSWORD.into()],
            ))
            .await
            .unwrap();
        ids.push(i64::try_from(result.last_insert_id()).unwrap());
    }
    ids
}

pub async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "n").unwrap()
}
