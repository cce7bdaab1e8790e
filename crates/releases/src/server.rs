//! HTTP server for release and repository requests.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use scm::Backend;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::ReleaseError;
use crate::orchestrator::ReleaseOrchestrator;
use crate::outcome::OrchestrationOutcome;
use crate::request::{parse_backend, ReleaseRequest, RepositoryKey};
use crate::store::{RepositoryRecord, RepositoryStore, StoreError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ReleaseOrchestrator>,
    pub store: Arc<dyn RepositoryStore>,
}

/// Build the HTTP router for the release service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/releases/create", post(create_release))
        .route("/repositories/create", post(create_repository))
        .route("/repositories/delete", post(delete_repository))
        .route("/repositories/list", get(list_repositories))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn rejected(rejection: &JsonRejection) -> OrchestrationOutcome {
    warn!(error = %rejection.body_text(), "Malformed request body");
    OrchestrationOutcome::new(format!("Invalid request body: {}", rejection.body_text()), 400)
}

fn store_failure(error: &StoreError) -> OrchestrationOutcome {
    match error {
        StoreError::NotFound(key) => OrchestrationOutcome::new(format!("{key} does not exist"), 404),
        StoreError::AlreadyExists(key) => {
            OrchestrationOutcome::new(format!("{key} already exists"), 409)
        }
        StoreError::Io(_) | StoreError::Serialization(_) => {
            error!(error = %error, "Repository store failure");
            OrchestrationOutcome::new("Unable to access repository records", 500)
        }
    }
}

async fn create_release(
    State(state): State<AppState>,
    payload: Result<Json<ReleaseRequest>, JsonRejection>,
) -> OrchestrationOutcome {
    match payload {
        Ok(Json(request)) => {
            info!(repo = %request.repo_name, version = %request.release_version, "Handling release request");
            state.orchestrator.handle(request).await
        }
        Err(rejection) => rejected(&rejection),
    }
}

/// Check that a record can be released from later and return it with
/// whitespace stripped and the backend tag in canonical form.
fn validate_record(mut record: RepositoryRecord) -> Result<RepositoryRecord, ReleaseError> {
    for field in [
        &mut record.repo_name,
        &mut record.repo_owner,
        &mut record.branch_base,
        &mut record.branch_head,
        &mut record.current_version,
    ] {
        *field = field.trim().to_string();
    }
    if let Some(id) = record.gitlab_project_id.as_mut() {
        *id = id.trim().to_string();
    }

    let provider = parse_backend(record.repo_provider.as_deref())?;
    record.repo_provider = Some(provider.as_str().to_string());

    let invalid = [
        ("repo_name", record.repo_name.is_empty()),
        ("repo_owner", provider == Backend::GitHub && record.repo_owner.is_empty()),
        (
            "gitlab_project_id",
            provider == Backend::GitLab
                && record.gitlab_project_id.as_deref().is_none_or(str::is_empty),
        ),
        ("branch_base", record.branch_base.is_empty()),
        ("branch_head", record.branch_head.is_empty()),
    ]
    .into_iter()
    .find_map(|(field, bad)| bad.then_some(field));

    match invalid {
        Some(field) => Err(ReleaseError::Validation { field }),
        None => Ok(record),
    }
}

async fn create_repository(
    State(state): State<AppState>,
    payload: Result<Json<RepositoryRecord>, JsonRejection>,
) -> OrchestrationOutcome {
    let record = match payload {
        Ok(Json(record)) => record,
        Err(rejection) => return rejected(&rejection),
    };
    let record = match validate_record(record) {
        Ok(record) => record,
        Err(e) => return OrchestrationOutcome::from_error(&e, state.orchestrator.statuses()),
    };

    let key = record.key();
    match state.store.create(record).await {
        Ok(()) => {
            info!(key = %key, "Repository created");
            OrchestrationOutcome::new(format!("Created repository {key}"), 200)
        }
        Err(e) => store_failure(&e),
    }
}

#[derive(Debug, Deserialize)]
struct DeleteRepositoryRequest {
    #[serde(default)]
    repo_owner: String,
    #[serde(default)]
    repo_name: String,
}

async fn delete_repository(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRepositoryRequest>, JsonRejection>,
) -> OrchestrationOutcome {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejected(&rejection),
    };
    if request.repo_name.trim().is_empty() {
        let e = ReleaseError::Validation { field: "repo_name" };
        return OrchestrationOutcome::from_error(&e, state.orchestrator.statuses());
    }

    let key = RepositoryKey::new(&request.repo_owner, &request.repo_name);
    match state.store.delete(&key).await {
        Ok(()) => {
            info!(key = %key, "Repository deleted");
            OrchestrationOutcome::new(format!("Deleted repository {key}"), 200)
        }
        Err(e) => store_failure(&e),
    }
}

#[derive(Debug, Serialize)]
struct RepositoryList {
    repositories: Vec<RepositoryRecord>,
}

async fn list_repositories(State(state): State<AppState>) -> axum::response::Response {
    match state.store.list().await {
        Ok(repositories) => Json(RepositoryList { repositories }).into_response(),
        Err(e) => store_failure(&e).into_response(),
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
