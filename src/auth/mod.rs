mod login;
mod middleware;
mod password;
mod register;
pub mod token;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{db::Account, AppResult, AppState};

pub use middleware::{require_auth, AuthUser};
pub use password::{hash_password, verify_password};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(login::me))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .route("/register", post(register::register))
        .route("/login", post(login::login))
}

#[derive(Serialize)]
pub(crate) struct TokenResponse {
    success: bool,
    token: String,
    user: Account,
}

pub(crate) fn token_response(state: &AppState, account: Account) -> AppResult<TokenResponse> {
    let claims = token::Claims::new(
        account.id.clone(),
        account.role,
        OffsetDateTime::now_utc(),
        state.config.token_ttl,
    );
    let token = token::issue(&claims, &state.config.jwt_secret)?;

    Ok(TokenResponse {
        success: true,
        token,
        user: account,
    })
}
