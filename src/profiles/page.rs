use axum::{debug_handler, extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    auth::AuthUser,
    db::{self, Account},
    store::{Profile, User},
    validate::{self, Validate, ValidJson},
    AppError, AppResult, AppState,
};

#[derive(Debug, Serialize)]
pub(crate) struct ProfileView {
    account: Account,
    /// Absent for donors and NGOs.
    user: Option<User>,
}

async fn load(state: &AppState, id: &str) -> AppResult<ProfileView> {
    let account = db::account_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("account {id}")))?;

    let user_id = id.to_owned();
    let user = state.store.read(move |data| data.user(&user_id).cloned()).await?;

    Ok(ProfileView { account, user })
}

#[debug_handler(state = AppState)]
pub(crate) async fn profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ProfileView>> {
    Ok(Json(load(&state, &user.id).await?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileUpdate {
    name: Option<String>,
    skills: Option<Vec<String>>,
    description: Option<String>,
}

impl Validate for ProfileUpdate {
    fn validate(&self) -> Result<(), String> {
        match &self.name {
            Some(name) => validate::required("name", name),
            None => Ok(()),
        }
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(ProfileUpdate { name, skills, description }): ValidJson<ProfileUpdate>,
) -> AppResult<Json<ProfileView>> {
    let name = name.map(|name| name.trim().to_owned());
    if let Some(name) = &name {
        db::rename_account(&state.db_pool, &user.id, name).await?;
    }

    if user.role.has_marketplace_profile() {
        let id = user.id.clone();
        state
            .store
            .write(move |data| {
                let user = data
                    .user_mut(&id)
                    .ok_or_else(|| AppError::not_found(format!("user {id}")))?;
                if let Some(name) = name {
                    user.name = name;
                }
                match &mut user.profile {
                    Profile::Individual(individual) => {
                        if let Some(skills) = skills {
                            individual.skills = skills;
                        }
                    }
                    Profile::Startup(startup) => {
                        if let Some(description) = description {
                            startup.description = description;
                        }
                    }
                    Profile::Investor(_) => {}
                }
                Ok(())
            })
            .await?;
    }

    info!(user_id = %user.id, "profile updated");
    Ok(Json(load(&state, &user.id).await?))
}
