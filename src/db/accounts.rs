use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::Role;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub struct NewAccount<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: String,
    pub role: Role,
}

pub async fn insert_account(db_pool: &SqlitePool, new: NewAccount<'_>) -> sqlx::Result<Account> {
    let account = Account {
        id: Uuid::now_v7().to_string(),
        name: new.name.to_owned(),
        email: new.email.to_lowercase(),
        password_hash: new.password_hash,
        role: new.role,
        created_at: OffsetDateTime::now_utc(),
    };

    sqlx::query("INSERT INTO accounts (id,name,email,password_hash,role,created_at) VALUES (?,?,?,?,?,?)")
        .bind(&account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role)
        .bind(account.created_at)
        .execute(db_pool)
        .await?;

    Ok(account)
}

pub async fn account_by_id(db_pool: &SqlitePool, id: &str) -> sqlx::Result<Option<Account>> {
    sqlx::query_as("SELECT id,name,email,password_hash,role,created_at FROM accounts WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn account_by_email(db_pool: &SqlitePool, email: &str) -> sqlx::Result<Option<Account>> {
    sqlx::query_as("SELECT id,name,email,password_hash,role,created_at FROM accounts WHERE email=?")
        .bind(email.to_lowercase())
        .fetch_optional(db_pool)
        .await
}

pub async fn rename_account(db_pool: &SqlitePool, id: &str, name: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE accounts SET name=? WHERE id=?")
        .bind(name)
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(())
}
