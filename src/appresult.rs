use std::{fmt::Display, sync::Arc};

use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

use crate::config::Config;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: impl Display) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Message of an internal error. Rides along in the response extensions and
/// only reaches the body when [`reveal_internal_errors`] allows it.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

const GENERIC_INTERNAL: &str = "Internal server error";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Internal(err) => {
                tracing::error!("internal error: {err:#}");
                let mut response = (
                    status,
                    Json(json!({ "success": false, "message": GENERIC_INTERNAL })),
                )
                    .into_response();
                response.extensions_mut().insert(InternalDetail(format!("{err:#}")));
                response
            }
            other => (
                status,
                Json(json!({ "success": false, "message": other.to_string() })),
            )
                .into_response(),
        }
    }
}

/// Swaps the generic 500 body for the real message when running in development.
pub async fn reveal_internal_errors(
    State(config): State<Arc<Config>>,
    mut response: Response,
) -> Response {
    let Some(InternalDetail(detail)) = response.extensions_mut().remove::<InternalDetail>() else {
        return response;
    };
    if !config.environment.is_development() {
        return response;
    }

    (
        response.status(),
        Json(json!({ "success": false, "message": detail })),
    )
        .into_response()
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self::Internal(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self::Internal(anyhow::Error::msg(err.to_owned()))
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Internal(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(serde_json::Error);
apperr_impl!(sqlx::Error);
apperr_impl!(std::io::Error);
apperr_impl!(axum::Error);
apperr_impl!(tokio::task::JoinError);
