use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    auth::{require_auth, AuthUser},
    db::{self, Food, NewFood},
    store::Role,
    validate::{self, Validate, ValidJson},
    AppResult, AppState,
};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(donate))
        .route("/mine", get(mine))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Donation {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    quantity: i64,
    #[serde(default)]
    location: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    expires_at: Option<OffsetDateTime>,
}

impl Validate for Donation {
    fn validate(&self) -> Result<(), String> {
        validate::required("title", &self.title)?;
        validate::required("location", &self.location)?;
        if self.quantity <= 0 {
            return Err("quantity must be positive".into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Donated {
    success: bool,
    food: Food,
}

#[debug_handler(state = AppState)]
pub(crate) async fn donate(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    ValidJson(donation): ValidJson<Donation>,
) -> AppResult<(StatusCode, Json<Donated>)> {
    user.require_role(Role::Donor)?;

    let food = db::insert_food(&db_pool, NewFood {
        donor_id: user.id,
        title: donation.title.trim().to_owned(),
        description: donation.description,
        quantity: donation.quantity,
        location: donation.location.trim().to_owned(),
        expires_at: donation.expires_at,
    })
    .await?;

    info!(food_id = %food.id, donor_id = %food.donor_id, "food listed");
    Ok((StatusCode::CREATED, Json(Donated { success: true, food })))
}

#[debug_handler(state = AppState)]
pub(crate) async fn mine(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<Vec<Food>>> {
    Ok(Json(db::foods_by_donor(&db_pool, &user.id).await?))
}
