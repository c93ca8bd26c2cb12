//! Requests, handlers, and validation for the task list.

use crate::types::{Clock, CompleteError, TaskId, TaskItem, TaskStore};
use chrono::{DateTime, Utc};
use courier_core::handler::{CommandHandler, QueryHandler};
use courier_core::outcome::{Error, ErrorDetail, Outcome};
use courier_macros::{Command, Query};
use courier_runtime::{ValidationBehavior, Validator};
use futures::future::BoxFuture;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Error code for a rejected [`CreateTask`]
pub const CREATE_INVALID: &str = "CREATE_001";
/// Error code for completing an unknown task
pub const TASK_NOT_FOUND: &str = "TASK_404";
/// Error code for completing a task twice
pub const TASK_ALREADY_COMPLETED: &str = "TASK_409";

// ============================================================================
// Create
// ============================================================================

/// Adds a task to the list
#[derive(Command, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    /// Title of the new task
    pub title: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Optional deadline, must not be in the past
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateTask {
    /// A task with only a title
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
        }
    }
}

/// Appends the new task to the store
pub struct CreateTaskHandler {
    store: TaskStore,
    clock: Arc<dyn Clock>,
}

impl CreateTaskHandler {
    /// Creates the handler
    #[must_use]
    pub fn new(store: TaskStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

impl CommandHandler for CreateTaskHandler {
    type Command = CreateTask;

    fn handle<'a>(&'a self, command: &'a CreateTask, _cancel: &'a CancellationToken) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let task = TaskItem::new(TaskId::new(), command.title.clone(), self.clock.now())
                .with_description(command.description.clone())
                .with_due_date(command.due_date);

            tracing::info!(task_id = %task.id, title = %task.title, "Task created");
            self.store.add(task).await;
            Outcome::completed()
        })
    }
}

/// Field rules for [`CreateTask`]
pub struct CreateTaskValidator {
    clock: Arc<dyn Clock>,
}

impl CreateTaskValidator {
    /// Creates the validator; due dates are compared against `clock`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Validator<CreateTask> for CreateTaskValidator {
    fn validate(&self, request: &CreateTask) -> Vec<ErrorDetail> {
        let mut problems = Vec::new();

        if request.title.trim().is_empty() {
            problems.push(ErrorDetail::new("title", "Title is required."));
        }
        if request.due_date.is_some_and(|due| due < self.clock.now()) {
            problems.push(ErrorDetail::new("dueDate", "Due date cannot be in the past."));
        }

        problems
    }
}

/// Validation behavior for [`CreateTask`], reporting every field problem
/// under [`CREATE_INVALID`]
#[must_use]
pub fn create_task_validation(clock: Arc<dyn Clock>) -> ValidationBehavior<CreateTask> {
    ValidationBehavior::new()
        .with_code(CREATE_INVALID, "Invalid fields upon creation")
        .with_validator(CreateTaskValidator::new(clock))
}

// ============================================================================
// List
// ============================================================================

/// Returns every task, in creation order
#[derive(Query, Debug, Clone, Copy, Default)]
#[query(response = Vec<TaskItem>)]
pub struct GetAllTasks;

/// Reads the whole store
pub struct GetAllTasksHandler {
    store: TaskStore,
}

impl GetAllTasksHandler {
    /// Creates the handler
    #[must_use]
    pub const fn new(store: TaskStore) -> Self {
        Self { store }
    }
}

impl QueryHandler for GetAllTasksHandler {
    type Query = GetAllTasks;

    fn handle<'a>(
        &'a self,
        _query: &'a GetAllTasks,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Outcome<Vec<TaskItem>>> {
        Box::pin(async move { Outcome::success(self.store.all().await) })
    }
}

// ============================================================================
// Complete
// ============================================================================

/// Marks a task as done
#[derive(Command, Debug, Clone, Copy)]
#[command(response = TaskItem)]
pub struct CompleteTask {
    /// Task to complete
    pub id: TaskId,
}

/// Completes a stored task
pub struct CompleteTaskHandler {
    store: TaskStore,
    clock: Arc<dyn Clock>,
}

impl CompleteTaskHandler {
    /// Creates the handler
    #[must_use]
    pub fn new(store: TaskStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

impl CommandHandler for CompleteTaskHandler {
    type Command = CompleteTask;

    fn handle<'a>(
        &'a self,
        command: &'a CompleteTask,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Outcome<TaskItem>> {
        Box::pin(async move {
            match self.store.complete(command.id, self.clock.now()).await {
                Ok(task) => {
                    tracing::info!(task_id = %task.id, "Task completed");
                    Outcome::success(task)
                }
                Err(CompleteError::NotFound) => Outcome::from(Error::not_found(
                    TASK_NOT_FOUND,
                    format!("Task {} does not exist", command.id),
                )),
                Err(CompleteError::AlreadyCompleted) => Outcome::from(Error::conflict(
                    TASK_ALREADY_COMPLETED,
                    format!("Task {} is already completed", command.id),
                )),
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::FixedClock;
    use chrono::{Duration, TimeZone};

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()))
    }

    #[test]
    fn test_validator_reports_every_field() {
        let clock = clock();
        let validator = CreateTaskValidator::new(Arc::clone(&clock));
        let command = CreateTask {
            title: "   ".into(),
            description: None,
            due_date: Some(clock.now() - Duration::days(1)),
        };

        let problems = validator.validate(&command);
        let fields: Vec<_> = problems.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, ["title", "dueDate"]);
    }

    #[test]
    fn test_validator_accepts_future_due_date() {
        let clock = clock();
        let validator = CreateTaskValidator::new(Arc::clone(&clock));
        let command = CreateTask {
            title: "Plan sprint".into(),
            description: Some("Q2".into()),
            due_date: Some(clock.now() + Duration::hours(1)),
        };

        assert!(validator.validate(&command).is_empty());
    }

    #[test]
    fn test_create_task_deserializes_camel_case() {
        let command: CreateTask =
            serde_json::from_str(r#"{"title":"Read","dueDate":"2030-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(command.title, "Read");
        assert!(command.description.is_none());
        assert!(command.due_date.is_some());
    }
}
