use axum::{
    debug_handler,
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    auth::{require_auth, AuthUser},
    store::{Job, JobStatus, Role, Store},
    validate::{Validate, ValidJson},
    AppError, AppResult, AppState,
};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/{id}/status", patch(set_status))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .route("/", get(list))
        .route("/{id}", get(job))
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobQuery {
    skill: Option<String>,
}

/// Open jobs, optionally narrowed to one skill.
#[debug_handler(state = AppState)]
pub(crate) async fn list(
    Query(JobQuery { skill }): Query<JobQuery>,
    State(store): State<Store>,
) -> AppResult<Json<Vec<Job>>> {
    let jobs = store
        .read(move |data| {
            let skill: Vec<String> = skill.into_iter().collect();
            data.jobs
                .iter()
                .filter(|job| job.status == JobStatus::Active)
                .filter(|job| skill.is_empty() || job.matches_any(&skill))
                .cloned()
                .collect::<Vec<_>>()
        })
        .await?;

    Ok(Json(jobs))
}

#[debug_handler(state = AppState)]
pub(crate) async fn job(
    Path(id): Path<String>,
    State(store): State<Store>,
) -> AppResult<Json<Job>> {
    let job = store.read(move |data| data.job(&id).cloned()).await??;
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChange {
    status: JobStatus,
}

impl Validate for StatusChange {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Opens or closes a job. Only the owning startup may do this.
#[debug_handler(state = AppState)]
pub(crate) async fn set_status(
    Path(id): Path<String>,
    State(store): State<Store>,
    user: AuthUser,
    ValidJson(StatusChange { status }): ValidJson<StatusChange>,
) -> AppResult<Json<Job>> {
    user.require_role(Role::Startup)?;

    let job = store
        .write(move |data| {
            let job = data.job_mut(&id)?;
            if job.startup_id != user.id {
                return Err(AppError::Forbidden(format!("job {id} belongs to another startup")));
            }
            job.status = status;
            Ok(job.clone())
        })
        .await?;

    info!(job_id = %job.id, status = ?job.status, "job status changed");
    Ok(Json(job))
}
