use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::debug;

use crate::{config::Config, db, store::Role, AppError, AppResult, AppState};

use super::token::{self, Claims};

/// The caller of an authenticated route, as attached by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub claims: Claims,
}

impl AuthUser {
    pub fn require_role(&self, role: Role) -> AppResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("only a {role} may do this")))
        }
    }
}

fn bearer(parts: &Parts) -> AppResult<&str> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("malformed authorization header".into()))
}

/// Verifies the bearer token, loads its account and attaches an [`AuthUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let (mut parts, body) = request.into_parts();
    let user = authenticate(&parts, &state.config, &state.db_pool).await?;
    debug!(user_id = %user.id, role = %user.role, "authenticated");

    parts.extensions.insert(user);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

async fn authenticate(parts: &Parts, config: &Arc<Config>, db_pool: &SqlitePool) -> AppResult<AuthUser> {
    let token = bearer(parts)?;
    let claims = token::verify(token, &config.jwt_secret, OffsetDateTime::now_utc())
        .map_err(|err| AppError::Unauthorized(err.to_string()))?;

    let account = db::account_by_id(db_pool, &claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".into()))?;

    Ok(AuthUser {
        id: account.id,
        name: account.name,
        email: account.email,
        role: account.role,
        claims,
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("authentication required".into()))
    }
}
