pub mod appresult;
pub mod auth;
pub mod config;
pub mod contact;
pub mod db;
pub mod food;
pub mod individual;
pub mod investor;
pub mod jobs;
pub mod messages;
pub mod ngo;
pub mod presence;
pub mod profiles;
pub mod startup;
pub mod store;
pub mod validate;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::FromRef,
    http::{header::{AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method},
    middleware::map_response_with_state,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing::warn;

pub use appresult::{AppError, AppResult};
use config::Config;
use presence::Presence;
use store::Store;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: SqlitePool,
    pub store: Store,
    pub presence: Presence,
}

impl AppState {
    pub fn new(config: Config, db_pool: SqlitePool, store: Store) -> Self {
        Self {
            config: Arc::new(config),
            db_pool,
            store,
            presence: Presence::default(),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::router(&state))
        .nest("/individual", individual::router())
        .nest("/startup", startup::router(&state))
        .nest("/investor", investor::router())
        .nest("/messages", messages::router())
        .nest("/jobs", jobs::router(&state))
        .nest("/profile", profiles::router(&state))
        .nest("/contact", contact::router(&state))
        .nest("/food", food::router(&state))
        .nest("/ngo", ngo::router(&state));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .merge(presence::router())
        .layer(map_response_with_state(state.clone(), appresult::reveal_internal_errors))
        .layer(cors(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    match config.cors_origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => cors.allow_origin(origin),
        Some(Err(err)) => {
            warn!("ignoring invalid CORS_ORIGIN: {err}");
            cors.allow_origin(Any)
        }
        None => cors.allow_origin(Any),
    }
}
