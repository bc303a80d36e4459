use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FoodStatus {
    Available,
    Booked,
    Collected,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    pub id: String,
    pub donor_id: String,
    pub title: String,
    pub description: String,
    pub quantity: i64,
    pub location: String,
    pub status: FoodStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    Collected,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub food_id: String,
    pub ngo_id: String,
    pub donor_id: String,
    pub quantity: i64,
    pub status: BookingStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub struct NewFood {
    pub donor_id: String,
    pub title: String,
    pub description: String,
    pub quantity: i64,
    pub location: String,
    pub expires_at: Option<OffsetDateTime>,
}

const FOOD_COLUMNS: &str = "id,donor_id,title,description,quantity,location,status,expires_at,created_at";
const BOOKING_COLUMNS: &str = "id,food_id,ngo_id,donor_id,quantity,status,created_at,updated_at";

pub async fn insert_food(db_pool: &SqlitePool, new: NewFood) -> sqlx::Result<Food> {
    let food = Food {
        id: Uuid::now_v7().to_string(),
        donor_id: new.donor_id,
        title: new.title,
        description: new.description,
        quantity: new.quantity,
        location: new.location,
        status: FoodStatus::Available,
        expires_at: new.expires_at,
        created_at: OffsetDateTime::now_utc(),
    };

    sqlx::query(&format!("INSERT INTO foods ({FOOD_COLUMNS}) VALUES (?,?,?,?,?,?,?,?,?)"))
        .bind(&food.id)
        .bind(&food.donor_id)
        .bind(&food.title)
        .bind(&food.description)
        .bind(food.quantity)
        .bind(&food.location)
        .bind(food.status)
        .bind(food.expires_at)
        .bind(food.created_at)
        .execute(db_pool)
        .await?;

    Ok(food)
}

pub async fn food_by_id(db_pool: &SqlitePool, id: &str) -> sqlx::Result<Option<Food>> {
    sqlx::query_as(&format!("SELECT {FOOD_COLUMNS} FROM foods WHERE id=?"))
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn foods_by_donor(db_pool: &SqlitePool, donor_id: &str) -> sqlx::Result<Vec<Food>> {
    sqlx::query_as(&format!("SELECT {FOOD_COLUMNS} FROM foods WHERE donor_id=? ORDER BY created_at DESC"))
        .bind(donor_id)
        .fetch_all(db_pool)
        .await
}

/// Listings still open for booking. Expired ones are left out.
pub async fn available_foods(db_pool: &SqlitePool, now: OffsetDateTime) -> sqlx::Result<Vec<Food>> {
    let foods: Vec<Food> = sqlx::query_as(&format!("SELECT {FOOD_COLUMNS} FROM foods WHERE status=? ORDER BY created_at"))
        .bind(FoodStatus::Available)
        .fetch_all(db_pool)
        .await?;

    Ok(foods
        .into_iter()
        .filter(|f| f.expires_at.is_none_or(|at| at > now))
        .collect())
}

/// Books `quantity` of a listing for an NGO, the whole remainder when absent.
/// The listing keeps whatever is left and is marked booked once nothing is.
pub async fn book_food(
    db_pool: &SqlitePool,
    food_id: &str,
    ngo_id: &str,
    quantity: Option<i64>,
) -> AppResult<(Booking, Food)> {
    let not_available = || AppError::BadRequest(format!("food {food_id} is not available"));

    let Some(food) = food_by_id(db_pool, food_id).await? else {
        return Err(AppError::not_found(format!("food {food_id}")));
    };
    if food.status != FoodStatus::Available {
        return Err(not_available());
    }

    let quantity = quantity.unwrap_or(food.quantity);
    if quantity <= 0 || quantity > food.quantity {
        return Err(AppError::BadRequest(format!(
            "quantity must be between 1 and {}",
            food.quantity
        )));
    }

    let mut tx = db_pool.begin().await?;

    // Claim first so racing bookings queue on the write lock and re-check here.
    let claimed: Option<Food> = sqlx::query_as(&format!(
        "UPDATE foods SET quantity=quantity-?, status=CASE WHEN quantity=? THEN ? ELSE status END \
         WHERE id=? AND status=? AND quantity>=? RETURNING {FOOD_COLUMNS}"
    ))
    .bind(quantity)
    .bind(quantity)
    .bind(FoodStatus::Booked)
    .bind(food_id)
    .bind(FoodStatus::Available)
    .bind(quantity)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(food) = claimed else {
        return Err(not_available());
    };

    let now = OffsetDateTime::now_utc();
    let booking = Booking {
        id: Uuid::now_v7().to_string(),
        food_id: food.id.clone(),
        ngo_id: ngo_id.to_owned(),
        donor_id: food.donor_id.clone(),
        quantity,
        status: BookingStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(&format!("INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES (?,?,?,?,?,?,?,?)"))
        .bind(&booking.id)
        .bind(&booking.food_id)
        .bind(&booking.ngo_id)
        .bind(&booking.donor_id)
        .bind(booking.quantity)
        .bind(booking.status)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok((booking, food))
}

pub async fn booking_by_id(db_pool: &SqlitePool, id: &str) -> sqlx::Result<Option<Booking>> {
    sqlx::query_as(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id=?"))
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

/// Bookings where the account is either side of the handover.
pub async fn bookings_for(db_pool: &SqlitePool, account_id: &str) -> sqlx::Result<Vec<Booking>> {
    sqlx::query_as(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE ngo_id=? OR donor_id=? ORDER BY created_at DESC"
    ))
    .bind(account_id)
    .bind(account_id)
    .fetch_all(db_pool)
    .await
}

/// Moves a booking to `status` and brings the listing along with it. A
/// rejection hands the booked quantity back to the listing. A listing is
/// collected once it is fully claimed and none of its bookings are still open.
pub async fn update_booking_status(
    db_pool: &SqlitePool,
    mut booking: Booking,
    status: BookingStatus,
) -> sqlx::Result<Booking> {
    let mut tx = db_pool.begin().await?;
    let now = OffsetDateTime::now_utc();

    sqlx::query("UPDATE bookings SET status=?, updated_at=? WHERE id=?")
        .bind(status)
        .bind(now)
        .bind(&booking.id)
        .execute(&mut *tx)
        .await?;

    match status {
        BookingStatus::Rejected => {
            sqlx::query("UPDATE foods SET quantity=quantity+?, status=? WHERE id=?")
                .bind(booking.quantity)
                .bind(FoodStatus::Available)
                .bind(&booking.food_id)
                .execute(&mut *tx)
                .await?;
        }
        BookingStatus::Collected => {
            sqlx::query(
                "UPDATE foods SET status=? WHERE id=? AND quantity=0 \
                 AND NOT EXISTS (SELECT 1 FROM bookings WHERE food_id=? AND status IN (?,?))",
            )
            .bind(FoodStatus::Collected)
            .bind(&booking.food_id)
            .bind(&booking.food_id)
            .bind(BookingStatus::Pending)
            .bind(BookingStatus::Accepted)
            .execute(&mut *tx)
            .await?;
        }
        BookingStatus::Pending | BookingStatus::Accepted => {}
    }

    tx.commit().await?;

    booking.status = status;
    booking.updated_at = now;
    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{self, insert_account, NewAccount},
        store::Role,
    };

    async fn donor_and_ngo(db_pool: &SqlitePool) -> (String, String) {
        let donor = insert_account(db_pool, NewAccount {
            name: "Bakery",
            email: "bakery@example.com",
            password_hash: "x$y".into(),
            role: Role::Donor,
        })
        .await
        .unwrap();
        let ngo = insert_account(db_pool, NewAccount {
            name: "Shelter",
            email: "shelter@example.com",
            password_hash: "x$y".into(),
            role: Role::Ngo,
        })
        .await
        .unwrap();
        (donor.id, ngo.id)
    }

    fn bread(donor_id: &str) -> NewFood {
        NewFood {
            donor_id: donor_id.to_owned(),
            title: "Bread".into(),
            description: "Day-old loaves".into(),
            quantity: 10,
            location: "Main St".into(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn partial_bookings_leave_the_rest_available() {
        let db_pool = db::memory().await.unwrap();
        let (donor, ngo) = donor_and_ngo(&db_pool).await;
        let food = insert_food(&db_pool, bread(&donor)).await.unwrap();
        let now = OffsetDateTime::now_utc();

        let (booking, left) = book_food(&db_pool, &food.id, &ngo, Some(4)).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.donor_id, donor);
        assert_eq!(booking.quantity, 4);
        assert_eq!(left.quantity, 6);
        assert_eq!(left.status, FoodStatus::Available);

        let available = available_foods(&db_pool, now).await.unwrap();
        assert_eq!(available[0].quantity, 6);

        let (rest, left) = book_food(&db_pool, &food.id, &ngo, None).await.unwrap();
        assert_eq!(rest.quantity, 6);
        assert_eq!(left.quantity, 0);
        assert_eq!(left.status, FoodStatus::Booked);
        assert!(available_foods(&db_pool, now).await.unwrap().is_empty());

        let again = book_food(&db_pool, &food.id, &ngo, None).await;
        assert!(matches!(again, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn racing_bookings_get_one_winner_and_clean_refusals() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("race.db").display());
        let db_pool = db::connect(&url).await.unwrap();
        let (donor, ngo) = donor_and_ngo(&db_pool).await;
        let food = insert_food(&db_pool, bread(&donor)).await.unwrap();

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let db_pool = db_pool.clone();
                let food_id = food.id.clone();
                let ngo = ngo.clone();
                tokio::spawn(async move { book_food(&db_pool, &food_id, &ngo, None).await })
            })
            .collect();

        let mut booked = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => booked += 1,
                Err(AppError::BadRequest(_)) => {}
                Err(other) => panic!("expected a clean refusal, got {other:?}"),
            }
        }

        assert_eq!(booked, 1);
        assert_eq!(bookings_for(&db_pool, &ngo).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejecting_a_booking_reopens_the_listing() {
        let db_pool = db::memory().await.unwrap();
        let (donor, ngo) = donor_and_ngo(&db_pool).await;
        let food = insert_food(&db_pool, bread(&donor)).await.unwrap();
        let (booking, _) = book_food(&db_pool, &food.id, &ngo, Some(7)).await.unwrap();

        let booking = update_booking_status(&db_pool, booking, BookingStatus::Rejected).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Rejected);

        let food = food_by_id(&db_pool, &food.id).await.unwrap().unwrap();
        assert_eq!(food.status, FoodStatus::Available);
        assert_eq!(food.quantity, 10);
        assert_eq!(bookings_for(&db_pool, &donor).await.unwrap().len(), 1);
        assert_eq!(bookings_for(&db_pool, &ngo).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oversized_and_unknown_bookings_are_refused() {
        let db_pool = db::memory().await.unwrap();
        let (donor, ngo) = donor_and_ngo(&db_pool).await;
        let food = insert_food(&db_pool, bread(&donor)).await.unwrap();

        let too_many = book_food(&db_pool, &food.id, &ngo, Some(11)).await;
        assert!(matches!(too_many, Err(AppError::BadRequest(_))));

        let missing = book_food(&db_pool, "nope", &ngo, None).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn listing_is_collected_after_its_last_open_booking() {
        let db_pool = db::memory().await.unwrap();
        let (donor, ngo) = donor_and_ngo(&db_pool).await;
        let food = insert_food(&db_pool, bread(&donor)).await.unwrap();
        let (first, _) = book_food(&db_pool, &food.id, &ngo, Some(3)).await.unwrap();
        let (second, _) = book_food(&db_pool, &food.id, &ngo, None).await.unwrap();

        update_booking_status(&db_pool, first, BookingStatus::Collected).await.unwrap();
        let status = food_by_id(&db_pool, &food.id).await.unwrap().unwrap().status;
        assert_eq!(status, FoodStatus::Booked);

        update_booking_status(&db_pool, second, BookingStatus::Collected).await.unwrap();
        let status = food_by_id(&db_pool, &food.id).await.unwrap().unwrap().status;
        assert_eq!(status, FoodStatus::Collected);
    }

    #[tokio::test]
    async fn expired_listings_are_hidden() {
        let db_pool = db::memory().await.unwrap();
        let (donor, _) = donor_and_ngo(&db_pool).await;
        let now = OffsetDateTime::now_utc();
        insert_food(&db_pool, NewFood {
            expires_at: Some(now - time::Duration::hours(1)),
            ..bread(&donor)
        })
        .await
        .unwrap();

        assert!(available_foods(&db_pool, now).await.unwrap().is_empty());
        assert_eq!(foods_by_donor(&db_pool, &donor).await.unwrap().len(), 1);
    }
}
