use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::{
    store::{Application, Data, Job, JobStatus, Role, Store, User},
    AppResult,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Dashboard {
    user: User,
    recommended_jobs: Vec<Job>,
    my_apps: Vec<AppliedJob>,
    saved_jobs: Vec<Job>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AppliedJob {
    #[serde(flatten)]
    application: Application,
    job: Option<Job>,
}

/// Open jobs matching the individual's skills that they have not applied to,
/// plus their applications and saved jobs.
pub(crate) fn build_dashboard(data: &Data, id: &str) -> AppResult<Dashboard> {
    let user = data.user_in_role(id, Role::Individual)?;
    let profile = data.individual(id)?;

    let recommended_jobs = data
        .jobs
        .iter()
        .filter(|job| job.status == JobStatus::Active)
        .filter(|job| job.matches_any(&profile.skills))
        .filter(|job| !data.has_applied(id, &job.id))
        .cloned()
        .collect();

    let my_apps = data
        .applications_of(id)
        .map(|application| AppliedJob {
            application: application.clone(),
            job: data.job(&application.job_id).ok().cloned(),
        })
        .collect();

    let saved_jobs = profile
        .saved_jobs
        .iter()
        .filter_map(|job_id| data.job(job_id).ok().cloned())
        .collect();

    Ok(Dashboard {
        user: user.clone(),
        recommended_jobs,
        my_apps,
        saved_jobs,
    })
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn dashboard(
    Path(id): Path<String>,
    State(store): State<Store>,
) -> AppResult<Json<Dashboard>> {
    let dashboard = store.read(move |data| build_dashboard(data, &id)).await??;
    Ok(Json(dashboard))
}
