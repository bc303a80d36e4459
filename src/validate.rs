use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::AppError;

/// Field checks run after a body has deserialized.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// `Json<T>` that answers 400 for bad JSON and for bodies failing [`Validate`].
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate().map_err(AppError::BadRequest)?;
        Ok(ValidJson(value))
    }
}

pub fn required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(())
    }
}

pub fn email(field: &str, value: &str) -> Result<(), String> {
    required(field, value)?;
    match value.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(format!("{field} must be an email address")),
    }
}

pub fn min_len(field: &str, value: &str, min: usize) -> Result<(), String> {
    if value.chars().count() < min {
        Err(format!("{field} must be at least {min} characters"))
    } else {
        Ok(())
    }
}
