pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::jobs::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::greeting_handler))
        .route("/health", get(health::health_handler))
        .route(
            "/search_by_job_id/:job_id",
            get(handlers::handle_search_by_job_id),
        )
        .route("/create/jobPost", post(handlers::handle_create_job_post))
        .route(
            "/update_by_job_title",
            put(handlers::handle_update_by_job_title),
        )
        .route(
            "/delete_by_job_title",
            delete(handlers::handle_delete_by_job_title),
        )
        .route(
            "/query_by_salary_range",
            get(handlers::handle_query_by_salary_range),
        )
        .route(
            "/query_by_experience_level",
            get(handlers::handle_query_by_experience_level),
        )
        .with_state(state)
}
