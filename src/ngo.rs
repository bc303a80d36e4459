//! Food booking between NGOs and donors. Each booking change is pushed to the
//! other party through [`Presence`] when they are online.

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    auth::{require_auth, AuthUser},
    db::{self, Booking, BookingStatus, Food},
    presence::{Presence, ServerEvent},
    store::Role,
    validate::{self, Validate, ValidJson},
    AppError, AppResult, AppState,
};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/book-food", post(book_food))
        .route("/requests", get(requests))
        .route("/requests/{id}", patch(update_request))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .route("/food-availability", get(food_availability))
}

#[debug_handler(state = AppState)]
pub(crate) async fn food_availability(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<Food>>> {
    Ok(Json(db::available_foods(&db_pool, OffsetDateTime::now_utc()).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BookFood {
    #[serde(default)]
    food_id: String,
    quantity: Option<i64>,
}

impl Validate for BookFood {
    fn validate(&self) -> Result<(), String> {
        validate::required("foodId", &self.food_id)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Booked {
    success: bool,
    booking: Booking,
    /// Whether the donor was online to receive the push.
    notified: bool,
}

#[debug_handler(state = AppState)]
pub(crate) async fn book_food(
    State(db_pool): State<SqlitePool>,
    State(presence): State<Presence>,
    user: AuthUser,
    ValidJson(BookFood { food_id, quantity }): ValidJson<BookFood>,
) -> AppResult<(StatusCode, Json<Booked>)> {
    user.require_role(Role::Ngo)?;

    let (booking, food) = db::book_food(&db_pool, &food_id, &user.id, quantity).await?;
    info!(booking_id = %booking.id, food_id = %food.id, ngo_id = %user.id, "food booked");

    let notified = presence.notify(
        &booking.donor_id,
        ServerEvent::FoodBooked { booking: booking.clone(), food },
    );

    Ok((StatusCode::CREATED, Json(Booked { success: true, booking, notified })))
}

/// Bookings the caller is part of, as NGO or as donor.
#[debug_handler(state = AppState)]
pub(crate) async fn requests(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<Vec<Booking>>> {
    Ok(Json(db::bookings_for(&db_pool, &user.id).await?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct BookingUpdate {
    status: BookingStatus,
}

impl Validate for BookingUpdate {
    fn validate(&self) -> Result<(), String> {
        match self.status {
            BookingStatus::Pending => Err("status cannot go back to pending".into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Updated {
    success: bool,
    booking: Booking,
    notified: bool,
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_request(
    Path(id): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(presence): State<Presence>,
    user: AuthUser,
    ValidJson(BookingUpdate { status }): ValidJson<BookingUpdate>,
) -> AppResult<Json<Updated>> {
    let booking = db::booking_by_id(&db_pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("booking {id}")))?;

    if booking.donor_id != user.id {
        return Err(AppError::Forbidden("only the donor can update this booking".into()));
    }
    if matches!(booking.status, BookingStatus::Rejected | BookingStatus::Collected) {
        return Err(AppError::BadRequest(format!("booking {id} is already closed")));
    }

    let booking = db::update_booking_status(&db_pool, booking, status).await?;
    info!(booking_id = %booking.id, status = ?booking.status, "booking updated");

    let notified = presence.notify(
        &booking.ngo_id,
        ServerEvent::BookingUpdated { booking: booking.clone() },
    );

    Ok(Json(Updated { success: true, booking, notified }))
}
