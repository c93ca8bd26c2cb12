//! Registration manifest for the task list.

use crate::features::{CompleteTaskHandler, CreateTask, CreateTaskHandler, GetAllTasksHandler, create_task_validation};
use crate::types::{Clock, SystemClock, TaskStore};
use courier_runtime::{HandlerModule, MediatorBuilder};
use std::sync::Arc;

/// Registers every task handler, and optionally `CreateTask` validation.
///
/// Open behaviors added to the builder before this module wrap the
/// validation layer.
pub struct TasksModule {
    store: TaskStore,
    clock: Arc<dyn Clock>,
    validate: bool,
}

impl TasksModule {
    /// Handlers over `store`, using wall-clock time, without validation
    #[must_use]
    pub fn new(store: TaskStore) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            validate: false,
        }
    }

    /// Use `clock` for timestamps and due-date checks
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate `CreateTask` before it reaches its handler
    #[must_use]
    pub const fn with_validation(mut self) -> Self {
        self.validate = true;
        self
    }
}

impl HandlerModule for TasksModule {
    fn register(self, builder: MediatorBuilder) -> MediatorBuilder {
        let builder = if self.validate {
            builder.behavior_for::<CreateTask, _>(create_task_validation(Arc::clone(&self.clock)))
        } else {
            builder
        };

        builder
            .command_handler(CreateTaskHandler::new(self.store.clone(), Arc::clone(&self.clock)))
            .query_handler(GetAllTasksHandler::new(self.store.clone()))
            .command_handler(CompleteTaskHandler::new(self.store, self.clock))
    }
}
