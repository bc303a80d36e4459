use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{require_auth, AuthUser},
    store::{Application, ApplicationStatus, Job, JobStatus, Role, Store, User},
    validate::{self, Validate, ValidJson},
    AppError, AppResult, AppState,
};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/{id}/applications/{application_id}", patch(review))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .route("/{id}/jobs", get(jobs).post(create_job))
        .route("/{id}/applicants", get(applicants))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewJob {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    skills_required: Vec<String>,
}

impl Validate for NewJob {
    fn validate(&self) -> Result<(), String> {
        validate::required("title", &self.title)?;
        validate::required("description", &self.description)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Created {
    success: bool,
    job: Job,
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_job(
    Path(id): Path<String>,
    State(store): State<Store>,
    ValidJson(NewJob { title, description, skills_required }): ValidJson<NewJob>,
) -> AppResult<(StatusCode, Json<Created>)> {
    let job = store
        .write(move |data| {
            let job = Job {
                id: Uuid::now_v7().to_string(),
                title: title.trim().to_owned(),
                description,
                startup_id: id.clone(),
                skills_required: skills_required
                    .into_iter()
                    .map(|skill| skill.trim().to_owned())
                    .filter(|skill| !skill.is_empty())
                    .collect(),
                applicants: Vec::new(),
                status: JobStatus::Active,
                created_at: OffsetDateTime::now_utc(),
            };
            data.startup_mut(&id)?.jobs.push(job.id.clone());
            data.jobs.push(job.clone());
            Ok(job)
        })
        .await?;

    info!(job_id = %job.id, startup_id = %job.startup_id, "job posted");
    Ok((StatusCode::CREATED, Json(Created { success: true, job })))
}

#[debug_handler(state = AppState)]
pub(crate) async fn jobs(
    Path(id): Path<String>,
    State(store): State<Store>,
) -> AppResult<Json<Vec<Job>>> {
    let jobs = store
        .read(move |data| -> AppResult<Vec<Job>> {
            data.user_in_role(&id, Role::Startup)?;
            Ok(data.jobs.iter().filter(|job| job.startup_id == id).cloned().collect())
        })
        .await??;

    Ok(Json(jobs))
}

#[derive(Debug, Serialize)]
pub(crate) struct Applicant {
    application: Application,
    applicant: Option<User>,
    job: Job,
}

#[debug_handler(state = AppState)]
pub(crate) async fn applicants(
    Path(id): Path<String>,
    State(store): State<Store>,
) -> AppResult<Json<Vec<Applicant>>> {
    let applicants = store
        .read(move |data| -> AppResult<Vec<Applicant>> {
            data.user_in_role(&id, Role::Startup)?;
            let applicants = data
                .applications
                .iter()
                .filter_map(|application| {
                    let job = data.job(&application.job_id).ok()?;
                    (job.startup_id == id).then(|| Applicant {
                        application: application.clone(),
                        applicant: data.user(&application.individual_id).cloned(),
                        job: job.clone(),
                    })
                })
                .collect();
            Ok(applicants)
        })
        .await??;

    Ok(Json(applicants))
}

#[derive(Debug, Deserialize)]
pub(crate) struct Review {
    status: ApplicationStatus,
}

impl Validate for Review {
    fn validate(&self) -> Result<(), String> {
        match self.status {
            ApplicationStatus::Submitted => Err("status cannot go back to submitted".into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Reviewed {
    success: bool,
    application: Application,
}

/// Sets the status of an application to one of the startup's jobs. Only the
/// signed-in startup itself may review.
#[debug_handler(state = AppState)]
pub(crate) async fn review(
    Path((id, application_id)): Path<(String, String)>,
    State(store): State<Store>,
    user: AuthUser,
    ValidJson(Review { status }): ValidJson<Review>,
) -> AppResult<Json<Reviewed>> {
    user.require_role(Role::Startup)?;
    if user.id != id {
        return Err(AppError::Forbidden(format!("cannot review applications for startup {id}")));
    }

    let application = store
        .write(move |data| {
            data.user_in_role(&id, Role::Startup)?;

            let job_id = data
                .applications
                .iter()
                .find(|a| a.id == application_id)
                .map(|a| a.job_id.clone())
                .ok_or_else(|| AppError::not_found(format!("application {application_id}")))?;
            if data.job(&job_id)?.startup_id != id {
                return Err(AppError::Forbidden(format!(
                    "application {application_id} is not for a job of startup {id}"
                )));
            }

            let Some(application) = data.applications.iter_mut().find(|a| a.id == application_id) else {
                return Err(AppError::not_found(format!("application {application_id}")));
            };
            application.status = status;
            Ok(application.clone())
        })
        .await?;

    info!(application_id = %application.id, status = ?application.status, "application reviewed");
    Ok(Json(Reviewed { success: true, application }))
}
