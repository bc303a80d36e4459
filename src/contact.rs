use std::sync::Arc;

use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::{
    auth::{require_auth, AuthUser},
    config::Config,
    db::{self, Contact},
    validate::{self, Validate, ValidJson},
    AppError, AppResult, AppState,
};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/",
        get(list)
            .route_layer(from_fn_with_state(state.clone(), require_auth))
            .post(submit),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    message: String,
}

impl Validate for ContactForm {
    fn validate(&self) -> Result<(), String> {
        validate::required("name", &self.name)?;
        validate::email("email", &self.email)?;
        validate::required("message", &self.message)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Submitted {
    success: bool,
    contact: Contact,
}

#[debug_handler(state = AppState)]
pub(crate) async fn submit(
    State(db_pool): State<SqlitePool>,
    ValidJson(ContactForm { name, email, message }): ValidJson<ContactForm>,
) -> AppResult<(StatusCode, Json<Submitted>)> {
    let contact = db::insert_contact(&db_pool, name.trim(), email.trim(), &message).await?;
    info!(contact_id = %contact.id, "contact message received");
    Ok((StatusCode::CREATED, Json(Submitted { success: true, contact })))
}

/// Visitor messages, readable by the accounts listed in `ADMIN_EMAILS`.
#[debug_handler(state = AppState)]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    user: AuthUser,
) -> AppResult<Json<Vec<Contact>>> {
    if !config.is_admin(&user.email) {
        return Err(AppError::Forbidden("only admins can read contact messages".into()));
    }
    Ok(Json(db::contacts(&db_pool).await?))
}
