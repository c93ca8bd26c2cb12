//! Task list served through a Courier mediator.
//!
//! Demonstrates:
//!
//! - Requests declared with `#[derive(Command)]` and `#[derive(Query)]`
//! - One handler per request, registered through a [`HandlerModule`](courier_runtime::HandlerModule)
//! - A typed validation behavior for `CreateTask`
//! - Open logging and metrics behaviors wrapping every request
//! - An axum adapter mapping outcomes to HTTP statuses
//!
//! # Quick Start
//!
//! ```no_run
//! use courier_runtime::Mediator;
//! use tasks::{CreateTask, GetAllTasks, TaskStore, TasksModule};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = TaskStore::new();
//! let mediator = Mediator::builder()
//!     .logging()
//!     .module(TasksModule::new(store.clone()).with_validation())
//!     .build()?;
//!
//! let cancel = CancellationToken::new();
//! mediator.command(&CreateTask::titled("Buy milk"), &cancel).await?;
//! let tasks = mediator.query(&GetAllTasks, &cancel).await?;
//! assert!(tasks.is_success());
//! # Ok(())
//! # }
//! ```

pub mod features;
pub mod http;
pub mod module;
pub mod types;

pub use features::{
    CompleteTask, CompleteTaskHandler, CreateTask, CreateTaskHandler, CreateTaskValidator, GetAllTasks,
    GetAllTasksHandler, create_task_validation,
};
pub use http::{AppState, router};
pub use module::TasksModule;
pub use types::{Clock, FixedClock, SystemClock, TaskId, TaskItem, TaskStore};
