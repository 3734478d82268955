use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::models::{
    required_title, CreateJobPostRequest, DeleteJobRequest, ExperienceLevel, ExperienceLevelQuery,
    SalaryRangeQuery, UpdateJobRequest,
};
use crate::jobs::service::{normalize_salaries, upsert_by_app_id, with_references, SALARY_PATH};
use crate::state::AppState;
use crate::store::{Collection, Document, Filter};

fn render_all(docs: Vec<Document>) -> Json<Value> {
    Json(Value::Array(docs.into_iter().map(Document::into_json).collect()))
}

/// GET /search_by_job_id/:job_id
pub async fn handle_search_by_job_id(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = Uuid::parse_str(&job_id).map_err(|e| {
        AppError::Validation(format!("'{job_id}' is not a valid job identifier: {e}"))
    })?;

    let job = state
        .store
        .get(Collection::Jobs, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job document not found".to_string()))?;

    Ok(Json(with_references(state.store.as_ref(), job).await?))
}

/// POST /create/jobPost
pub async fn handle_create_job_post(
    State(state): State<AppState>,
    body: Result<Json<CreateJobPostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(req) = body?;
    let post = req.into_job_post();
    post.validate()?;

    // Independent writes: a failure after the related upserts leaves them in place.
    if let Some(industry) = post.industry {
        upsert_by_app_id(state.store.as_ref(), Collection::Industry, industry).await?;
    }
    if let Some(company) = post.company {
        upsert_by_app_id(state.store.as_ref(), Collection::Companies, company).await?;
    }

    let id = state.store.insert(Collection::Jobs, post.job.clone()).await?;
    info!("Created job post {id}");

    let created = Document { id, body: post.job };
    Ok((StatusCode::CREATED, Json(created.into_json())))
}

/// PUT /update_by_job_title
pub async fn handle_update_by_job_title(
    State(state): State<AppState>,
    body: Result<Json<UpdateJobRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(req) = body?;
    let title = required_title(&req.title, "update")?;

    let job = state
        .store
        .find_one(Collection::Jobs, &Filter::equals("title", title.clone()))
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let updates = req.job_updates();
    if !updates.is_empty() {
        state.store.merge(Collection::Jobs, job.id, updates).await?;
        info!("Updated job {} (title {title})", job.id);
    }

    if let Some(industry) = req.industry {
        upsert_by_app_id(state.store.as_ref(), Collection::Industry, industry).await?;
    }
    if let Some(company) = req.company {
        upsert_by_app_id(state.store.as_ref(), Collection::Companies, company).await?;
    }

    Ok(Json(json!({ "message": "Job updated successfully" })))
}

/// DELETE /delete_by_job_title
///
/// Two-step: without `confirm` the matched job is echoed back and nothing changes.
pub async fn handle_delete_by_job_title(
    State(state): State<AppState>,
    body: Result<Json<DeleteJobRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(req) = body?;
    let title = required_title(&req.title, "delete")?;

    let job = state
        .store
        .find_one(Collection::Jobs, &Filter::equals("title", title.clone()))
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    if !req.is_confirmed() {
        return Ok(Json(json!({
            "message": "Job found. Please confirm deletion.",
            "job_details": job.into_json(),
        })));
    }

    state.store.delete(Collection::Jobs, job.id).await?;
    info!("Deleted job {} (title {title})", job.id);

    Ok(Json(json!({ "message": "Job deleted successfully" })))
}

/// GET /query_by_salary_range?min_salary=&max_salary=
///
/// Side effect: normalizes stored salaries to integers before querying.
pub async fn handle_query_by_salary_range(
    State(state): State<AppState>,
    params: Result<Query<SalaryRangeQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params?;
    let (min, max) = params.bounds()?;

    normalize_salaries(state.store.as_ref()).await?;

    let filter = Filter::IntRange {
        path: SALARY_PATH,
        min: Some(min),
        max: Some(max),
    };
    let jobs = state.store.find_many(Collection::Jobs, &filter).await?;
    Ok(render_all(jobs))
}

/// GET /query_by_experience_level?experience_level=
pub async fn handle_query_by_experience_level(
    State(state): State<AppState>,
    params: Result<Query<ExperienceLevelQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params?;
    let level = ExperienceLevel::parse(params.experience_level.as_deref().unwrap_or_default())?;
    let jobs = state
        .store
        .find_many(Collection::Jobs, &level.filter())
        .await?;
    Ok(render_all(jobs))
}
