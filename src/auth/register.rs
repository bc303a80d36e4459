use axum::{debug_handler, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;

use crate::{
    db::{self, NewAccount},
    store::{Profile, Role, User},
    validate::{self, Validate, ValidJson},
    AppError, AppResult, AppState,
};

use super::{hash_password, token_response, TokenResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    role: Role,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    description: String,
}

impl Validate for RegisterBody {
    fn validate(&self) -> Result<(), String> {
        validate::required("name", &self.name)?;
        validate::email("email", self.email.trim())?;
        validate::min_len("password", &self.password, 6)
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterBody>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    let email = body.email.trim().to_lowercase();
    let email_taken = || AppError::BadRequest("email already registered".into());

    if db::account_by_email(&state.db_pool, &email).await?.is_some() {
        return Err(email_taken());
    }

    let password_hash = hash_password(body.password).await?;
    let account = db::insert_account(&state.db_pool, NewAccount {
        name: body.name.trim(),
        email: &email,
        password_hash,
        role: body.role,
    })
    .await
    .map_err(|err| match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => email_taken(),
        _ => AppError::from(err),
    })?;

    if let Some(mut profile) = Profile::empty(body.role) {
        match &mut profile {
            Profile::Individual(individual) => individual.skills = body.skills,
            Profile::Startup(startup) => startup.description = body.description,
            Profile::Investor(_) => {}
        }

        let user = User {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            inbox: Vec::new(),
            profile,
        };
        state
            .store
            .write(move |data| {
                data.users.push(user);
                Ok(())
            })
            .await?;
    }

    info!(user_id = %account.id, role = %account.role, "account registered");
    Ok((StatusCode::CREATED, Json(token_response(&state, account)?)))
}
