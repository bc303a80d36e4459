use axum::{
    debug_handler,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    store::{Data, Role, Store, User},
    validate::{self, Validate, ValidJson},
    AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(investor))
        .route("/{id}/discover", get(discover))
        .route("/{id}/portfolio", post(add_to_portfolio))
}

#[debug_handler(state = AppState)]
pub(crate) async fn investor(
    Path(id): Path<String>,
    State(store): State<Store>,
) -> AppResult<Json<User>> {
    let user = store
        .read(move |data| data.user_in_role(&id, Role::Investor).cloned())
        .await??;
    Ok(Json(user))
}

/// Every startup not already in the investor's portfolio.
pub(crate) fn discoverable(data: &Data, investor_id: &str) -> AppResult<Vec<User>> {
    let portfolio = data
        .user_in_role(investor_id, Role::Investor)?
        .as_investor()
        .map(|p| p.portfolio.as_slice())
        .unwrap_or_default();

    Ok(data
        .users
        .iter()
        .filter(|user| user.role() == Role::Startup)
        .filter(|user| !portfolio.contains(&user.id))
        .cloned()
        .collect())
}

#[debug_handler(state = AppState)]
pub(crate) async fn discover(
    Path(id): Path<String>,
    State(store): State<Store>,
) -> AppResult<Json<Vec<User>>> {
    let startups = store.read(move |data| discoverable(data, &id)).await??;
    Ok(Json(startups))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartupRef {
    #[serde(default)]
    startup_id: String,
}

impl Validate for StartupRef {
    fn validate(&self) -> Result<(), String> {
        validate::required("startupId", &self.startup_id)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Portfolio {
    success: bool,
    portfolio: Vec<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn add_to_portfolio(
    Path(id): Path<String>,
    State(store): State<Store>,
    ValidJson(StartupRef { startup_id }): ValidJson<StartupRef>,
) -> AppResult<Json<Portfolio>> {
    let portfolio = store
        .write(move |data| {
            data.user_in_role(&startup_id, Role::Startup)?;
            let investor = data.investor_mut(&id)?;
            if !investor.portfolio.contains(&startup_id) {
                investor.portfolio.push(startup_id);
            }
            Ok(investor.portfolio.clone())
        })
        .await?;

    Ok(Json(Portfolio { success: true, portfolio }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InvestorProfile, Profile, StartupProfile};

    fn user(id: &str, profile: Profile) -> User {
        User {
            id: id.into(),
            name: id.into(),
            email: String::new(),
            inbox: vec![],
            profile,
        }
    }

    #[test]
    fn discover_skips_the_portfolio() {
        let data = Data {
            users: vec![
                user("v1", Profile::Investor(InvestorProfile { portfolio: vec!["s1".into()] })),
                user("s1", Profile::Startup(StartupProfile::default())),
                user("s2", Profile::Startup(StartupProfile::default())),
                user("s3", Profile::Startup(StartupProfile::default())),
            ],
            ..Default::default()
        };

        let ids: Vec<_> = discoverable(&data, "v1").unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec!["s2".to_owned(), "s3".to_owned()]);
    }

    #[test]
    fn discover_requires_an_investor() {
        let data = Data {
            users: vec![user("s1", Profile::Startup(StartupProfile::default()))],
            ..Default::default()
        };
        assert!(discoverable(&data, "s1").is_err());
    }
}
