use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    store::{Application, ApplicationStatus, Store},
    validate::{self, Validate, ValidJson},
    AppResult,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobRef {
    #[serde(default)]
    job_id: String,
}

impl Validate for JobRef {
    fn validate(&self) -> Result<(), String> {
        validate::required("jobId", &self.job_id)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Applied {
    success: bool,
    application: Application,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Saved {
    success: bool,
    saved_jobs: Vec<String>,
}

/// Files an application. Repeat applications are recorded again.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn apply(
    Path(id): Path<String>,
    State(store): State<Store>,
    ValidJson(JobRef { job_id }): ValidJson<JobRef>,
) -> AppResult<(StatusCode, Json<Applied>)> {
    let application = store
        .write(move |data| {
            data.individual(&id)?;
            data.job_mut(&job_id)?.applicants.push(id.clone());

            let application = Application {
                id: Uuid::now_v7().to_string(),
                job_id,
                individual_id: id.clone(),
                status: ApplicationStatus::Submitted,
                applied_at: OffsetDateTime::now_utc(),
            };
            data.individual_mut(&id)?.applications.push(application.id.clone());
            data.applications.push(application.clone());
            Ok(application)
        })
        .await?;

    info!(
        application_id = %application.id,
        job_id = %application.job_id,
        individual_id = %application.individual_id,
        "application submitted"
    );
    Ok((StatusCode::CREATED, Json(Applied { success: true, application })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn save(
    Path(id): Path<String>,
    State(store): State<Store>,
    ValidJson(JobRef { job_id }): ValidJson<JobRef>,
) -> AppResult<Json<Saved>> {
    let saved_jobs = store
        .write(move |data| {
            data.job(&job_id)?;
            let profile = data.individual_mut(&id)?;
            if !profile.saved_jobs.contains(&job_id) {
                profile.saved_jobs.push(job_id);
            }
            Ok(profile.saved_jobs.clone())
        })
        .await?;

    Ok(Json(Saved { success: true, saved_jobs }))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn applications(
    Path(id): Path<String>,
    State(store): State<Store>,
) -> AppResult<Json<Vec<Application>>> {
    let applications = store
        .read(move |data| -> AppResult<Vec<Application>> {
            data.individual(&id)?;
            Ok(data.applications_of(&id).cloned().collect())
        })
        .await??;

    Ok(Json(applications))
}
