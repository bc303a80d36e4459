mod page;

use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::{auth::require_auth, AppState};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(page::profile).put(page::update_profile))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}
