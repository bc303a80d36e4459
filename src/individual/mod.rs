mod apply;
mod dashboard;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/dashboard", get(dashboard::dashboard))
        .route("/{id}/apply", post(apply::apply))
        .route("/{id}/save", post(apply::save))
        .route("/{id}/applications", get(apply::applications))
}
