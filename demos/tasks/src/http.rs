//! HTTP adapter for the task list.
//!
//! Maps dispatch results onto responses: the success value as JSON with
//! `200 OK`, or `{"errors": [...]}` with a status chosen from the kind of
//! the first error.

use crate::features::{CompleteTask, CreateTask, GetAllTasks};
use crate::types::TaskId;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use courier_core::outcome::{Error, ErrorKind, Failure, Outcome};
use courier_runtime::{DispatchError, Mediator};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Error code reported when a route has no registered handler
pub const MEDIATOR_MISCONFIGURED: &str = "MEDIATOR_MISCONFIGURED";

/// Shared state for every route
#[derive(Clone)]
pub struct AppState {
    mediator: Mediator,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State without a metrics endpoint
    #[must_use]
    pub const fn new(mediator: Mediator) -> Self {
        Self {
            mediator,
            metrics: None,
        }
    }

    /// Serve `GET /metrics` from `handle`
    #[must_use]
    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/tasks", post(create_task).get(list_tasks))
        .route("/tasks/:id/complete", post(complete_task))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// HTTP status for a failure of the given kind
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Unknown => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A dispatch result ready to be sent
pub struct Reply<T>(Result<Outcome<T>, DispatchError>);

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        match self.0 {
            Ok(Outcome::Success(value)) => (StatusCode::OK, Json(value)).into_response(),
            Ok(Outcome::Failure(failure)) => failure_response(&failure),
            Err(err) => {
                tracing::error!(error = %err, "Route dispatched a request nothing handles");
                failure_response(&Failure::new(Error::internal(MEDIATOR_MISCONFIGURED, err.to_string())))
            }
        }
    }
}

fn failure_response(failure: &Failure) -> Response {
    (status_for(failure.primary().kind()), Json(failure)).into_response()
}

/// Token cancelled when the returned guard drops, i.e. when the client goes
/// away mid-request or the request finishes.
fn request_token() -> (CancellationToken, tokio_util::sync::DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    (token, guard)
}

async fn create_task(State(state): State<AppState>, Json(command): Json<CreateTask>) -> Reply<serde_json::Value> {
    let (cancel, _guard) = request_token();
    let result = state.mediator.command(&command, &cancel).await;
    Reply(result.map(|outcome| outcome.map(|()| serde_json::json!({}))))
}

async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    let (cancel, _guard) = request_token();
    Reply(state.mediator.query(&GetAllTasks, &cancel).await)
}

async fn complete_task(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let (cancel, _guard) = request_token();
    let command = CompleteTask {
        id: TaskId::from_uuid(id),
    };
    Reply(state.mediator.command(&command, &cancel).await)
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
