use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    db::{self, Account},
    validate::{self, Validate, ValidJson},
    AppError, AppResult, AppState,
};

use super::{token_response, verify_password, AuthUser, TokenResponse};

#[derive(Debug, Deserialize)]
pub(crate) struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl Validate for LoginBody {
    fn validate(&self) -> Result<(), String> {
        validate::required("email", &self.email)?;
        validate::required("password", &self.password)
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(state): State<AppState>,
    ValidJson(LoginBody { email, password }): ValidJson<LoginBody>,
) -> AppResult<Json<TokenResponse>> {
    let invalid = || AppError::Unauthorized("invalid email or password".into());

    let Some(account) = db::account_by_email(&state.db_pool, email.trim()).await? else {
        debug!("login for unknown email");
        return Err(invalid());
    };
    if !verify_password(password, account.password_hash.clone()).await? {
        debug!(user_id = %account.id, "login with wrong password");
        return Err(invalid());
    }

    info!(user_id = %account.id, "welcome back");
    Ok(Json(token_response(&state, account)?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Account>> {
    let account = db::account_by_id(&state.db_pool, &user.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("account {}", user.id)))?;
    Ok(Json(account))
}
