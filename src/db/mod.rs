mod accounts;
mod contacts;
mod food;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

pub use accounts::*;
pub use contacts::*;
pub use food::*;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS accounts (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS foods (
        id TEXT PRIMARY KEY,
        donor_id TEXT NOT NULL REFERENCES accounts(id),
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        quantity INTEGER NOT NULL,
        location TEXT NOT NULL,
        status TEXT NOT NULL,
        expires_at TEXT,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS bookings (
        id TEXT PRIMARY KEY,
        food_id TEXT NOT NULL REFERENCES foods(id),
        ngo_id TEXT NOT NULL REFERENCES accounts(id),
        donor_id TEXT NOT NULL REFERENCES accounts(id),
        quantity INTEGER NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS contacts (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        message TEXT NOT NULL,
        created_at TEXT NOT NULL
    )"#,
];

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(database_url)
        .await?;
    migrate(&db_pool).await?;
    info!("database ready at {database_url}");
    Ok(db_pool)
}

/// Single-connection in-memory database with the schema applied.
pub async fn memory() -> anyhow::Result<SqlitePool> {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    migrate(&db_pool).await?;
    Ok(db_pool)
}

pub async fn migrate(db_pool: &SqlitePool) -> sqlx::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(db_pool).await?;
    }
    Ok(())
}
