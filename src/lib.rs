//! TaskFlow: a kanban task board with a write-through JSON mirror.

pub mod analytics;
pub mod app;
pub mod board;
pub mod cli;
pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod seed;
pub mod storage;
pub mod store;
pub mod task;
pub mod ui;

pub use error::{StorageError, StoreError};
pub use storage::{BackgroundStorage, FileStorage, MemoryStorage, Storage};
pub use store::{TaskStats, TaskStore};
pub use task::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus};
