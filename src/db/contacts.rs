use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn insert_contact(
    db_pool: &SqlitePool,
    name: &str,
    email: &str,
    message: &str,
) -> sqlx::Result<Contact> {
    let contact = Contact {
        id: Uuid::now_v7().to_string(),
        name: name.to_owned(),
        email: email.to_owned(),
        message: message.to_owned(),
        created_at: OffsetDateTime::now_utc(),
    };

    sqlx::query("INSERT INTO contacts (id,name,email,message,created_at) VALUES (?,?,?,?,?)")
        .bind(&contact.id)
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.message)
        .bind(contact.created_at)
        .execute(db_pool)
        .await?;

    Ok(contact)
}

pub async fn contacts(db_pool: &SqlitePool) -> sqlx::Result<Vec<Contact>> {
    sqlx::query_as("SELECT id,name,email,message,created_at FROM contacts ORDER BY created_at DESC")
        .fetch_all(db_pool)
        .await
}
