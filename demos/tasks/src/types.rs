//! Domain types for the task list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Unique identifier for a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new random `TaskId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `TaskId` from a UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single task
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    /// Unique identifier
    pub id: TaskId,
    /// Short title, never blank
    pub title: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Optional deadline
    pub due_date: Option<DateTime<Utc>>,
    /// Whether the task is done
    #[serde(rename = "isCompleted")]
    pub completed: bool,
    /// When the task was created
    pub created_at: DateTime<Utc>,
    /// When the task was completed (if completed)
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskItem {
    /// Creates an open task
    #[must_use]
    pub const fn new(id: TaskId, title: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            description: None,
            due_date: None,
            completed: false,
            created_at,
            completed_at: None,
        }
    }

    /// Sets the description
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Sets the due date
    #[must_use]
    pub const fn with_due_date(mut self, due_date: Option<DateTime<Utc>>) -> Self {
        self.due_date = due_date;
        self
    }

    /// Marks the task as completed
    pub const fn complete(&mut self, completed_at: DateTime<Utc>) {
        self.completed = true;
        self.completed_at = Some(completed_at);
    }
}

/// Why a task could not be completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteError {
    /// No task has this id
    NotFound,
    /// The task was already completed
    AlreadyCompleted,
}

/// In-memory task storage shared by every handler.
///
/// Cloning is cheap; clones see the same tasks.
#[derive(Clone, Debug, Default)]
pub struct TaskStore {
    tasks: Arc<RwLock<Vec<TaskItem>>>,
}

impl TaskStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task
    pub async fn add(&self, task: TaskItem) {
        self.tasks.write().await.push(task);
    }

    /// Every task, in insertion order
    pub async fn all(&self) -> Vec<TaskItem> {
        self.tasks.read().await.clone()
    }

    /// Looks up a task by id
    pub async fn get(&self, id: TaskId) -> Option<TaskItem> {
        self.tasks.read().await.iter().find(|t| t.id == id).cloned()
    }

    /// Number of stored tasks
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Returns `true` if no task is stored
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Marks a task completed and returns its new state
    ///
    /// # Errors
    ///
    /// Returns [`CompleteError::NotFound`] for an unknown id and
    /// [`CompleteError::AlreadyCompleted`] when the task is already done.
    pub async fn complete(&self, id: TaskId, at: DateTime<Utc>) -> Result<TaskItem, CompleteError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(CompleteError::NotFound)?;

        if task.completed {
            return Err(CompleteError::AlreadyCompleted);
        }
        task.complete(at);
        Ok(task.clone())
    }
}

/// Source of the current time
pub trait Clock: Send + Sync {
    /// The current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant, for tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    /// A clock that always reports `now`
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_complete_transitions_once() {
        let store = TaskStore::new();
        let at = Utc::now();
        let task = TaskItem::new(TaskId::new(), "Write docs".into(), at);
        let id = task.id;
        store.add(task).await;

        let done = store.complete(id, at).await.unwrap();
        assert!(done.completed);
        assert_eq!(done.completed_at, Some(at));
        assert_eq!(store.complete(id, at).await, Err(CompleteError::AlreadyCompleted));
        assert_eq!(store.complete(TaskId::new(), at).await, Err(CompleteError::NotFound));
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let task = TaskItem::new(TaskId::new(), "Ship".into(), Utc::now());
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["isCompleted"], false);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("dueDate").is_some());
        assert_eq!(json["id"], task.id.to_string());
    }
}
