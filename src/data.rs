//! Export and import of the whole board as a JSON file.

use crate::store::TaskStore;
use crate::task::Task;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn export_tasks(store: &TaskStore, path: &Path) -> Result<usize> {
    let json = serde_json::to_string_pretty(store.tasks())?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Exported {} tasks to {}", store.tasks().len(), path.display());
    Ok(store.tasks().len())
}

/// Replaces the board with the tasks in `path`. The board is untouched if
/// the file cannot be read or holds an invalid collection.
pub fn import_tasks(store: &mut TaskStore, path: &Path) -> Result<usize> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let tasks: Vec<Task> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a task list", path.display()))?;
    let count = tasks.len();
    store
        .replace_all(tasks)
        .with_context(|| format!("Refusing to import {}", path.display()))?;
    tracing::info!("Imported {} tasks from {}", count, path.display());
    Ok(count)
}
