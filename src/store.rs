//! The task collection and its durable mirror.
//!
//! Every mutation is applied to the in-memory list first and then written
//! through to the storage slot. Storage faults are logged and never undo or
//! block the in-memory change.

use crate::clock::{Clock, ClockIds, IdGenerator, SystemClock};
use crate::error::StoreError;
use crate::seed::seed_tasks;
use crate::storage::Storage;
use crate::task::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::HashSet;

pub const DEFAULT_KEY: &str = "taskflow_tasks";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub completion_rate: u32,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let count = |status| tasks.iter().filter(|t| t.status == status).count();
        let total = tasks.len();
        let completed = count(TaskStatus::Completed);
        Self {
            total,
            pending: count(TaskStatus::Pending),
            in_progress: count(TaskStatus::InProgress),
            completed,
            completion_rate: completion_rate(completed, total),
        }
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Completed => self.completed,
        }
    }
}

/// Percentage of completed tasks, rounded half up. Zero for an empty board.
pub fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed as f64 * 100.0 / total as f64).round() as u32
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

pub fn is_overdue(task: &Task, clock: &dyn Clock) -> bool {
    match task.due_date {
        Some(due) if !task.is_completed() => midnight(due) < clock.now(),
        _ => false,
    }
}

pub fn is_created_this_week(task: &Task, clock: &dyn Clock) -> bool {
    midnight(task.created_date) >= clock.now() - Duration::days(7)
}

pub struct TaskStore {
    tasks: Vec<Task>,
    loading: bool,
    key: String,
    storage: Box<dyn Storage>,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

impl TaskStore {
    /// Creates an unloaded store. Call [`TaskStore::load`] before use.
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            tasks: Vec::new(),
            loading: true,
            key: DEFAULT_KEY.to_string(),
            storage: Box::new(storage),
            clock: Box::new(SystemClock),
            ids: Box::new(ClockIds::default()),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Shorthand for `new(..).load()`.
    pub fn open(storage: impl Storage + 'static) -> Self {
        let mut store = Self::new(storage);
        store.load();
        store
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Reads the slot, falling back to the seed list when it is missing or
    /// unreadable. Only the first call has an effect.
    pub fn load(&mut self) {
        if !self.loading {
            return;
        }

        let (tasks, seeded) = match self.read_slot() {
            Some(tasks) => (tasks, false),
            None => (seed_tasks(), true),
        };
        self.tasks = tasks;
        self.observe_ids();
        self.loading = false;

        if seeded {
            tracing::info!("Seeding '{}' with {} sample tasks", self.key, self.tasks.len());
            self.persist();
        } else {
            tracing::debug!("Loaded {} tasks from '{}'", self.tasks.len(), self.key);
        }
    }

    fn read_slot(&self) -> Option<Vec<Task>> {
        match self.storage.read(&self.key) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(tasks) => Some(tasks),
                Err(e) => {
                    tracing::warn!("Discarding unreadable slot '{}': {}", self.key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read slot '{}': {}", self.key, e);
                None
            }
        }
    }

    fn observe_ids(&mut self) {
        if let Some(max) = self.tasks.iter().map(|t| t.id).max() {
            self.ids.observe(max);
        }
    }

    /// Asks the generator for an id, falling back to the smallest unused one
    /// when the generator has run out.
    fn next_id(&mut self) -> TaskId {
        let id = self.ids.next_id(self.clock.as_ref());
        if self.tasks.iter().all(|t| t.id != id) {
            return id;
        }
        let used: HashSet<TaskId> = self.tasks.iter().map(|t| t.id).collect();
        (1..=TaskId::MAX)
            .find(|candidate| !used.contains(candidate))
            .unwrap_or_default()
    }

    fn persist(&mut self) {
        if self.loading {
            return;
        }
        let bytes = match serde_json::to_vec_pretty(&self.tasks) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to serialize tasks: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.write(&self.key, &bytes) {
            tracing::warn!("Failed to save tasks to '{}': {}", self.key, e);
        }
    }

    pub fn create(&mut self, fields: NewTask) -> Result<Task, StoreError> {
        if fields.title.trim().is_empty() {
            return Err(StoreError::EmptyTitle);
        }

        let today = self.clock.today();
        let task = Task {
            id: self.next_id(),
            title: fields.title,
            description: fields.description,
            status: fields.status,
            priority: fields.priority,
            due_date: fields.due_date,
            created_date: today,
            updated_date: Some(today),
            assigned_to: fields.assigned_to,
            tags: fields.tags,
        };
        tracing::debug!("Created task {} '{}'", task.id, task.title);

        self.tasks.push(task.clone());
        self.persist();
        Ok(task)
    }

    /// Merges `patch` over the task with `id`. Returns `None` if there is no
    /// such task.
    pub fn update(&mut self, id: TaskId, patch: TaskPatch) -> Option<Task> {
        let today = self.clock.today();
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            tracing::debug!("Update of unknown task {}", id);
            return None;
        };

        patch.apply(task);
        let previous = task.updated_date.unwrap_or(task.created_date);
        task.updated_date = Some(today.max(previous).max(task.created_date));
        let updated = task.clone();

        self.persist();
        Some(updated)
    }

    /// Moves a task to another column. Any transition is allowed, including
    /// to the current status.
    pub fn update_status(&mut self, id: TaskId, status: TaskStatus) -> Option<Task> {
        self.update(id, TaskPatch::status(status))
    }

    pub fn delete(&mut self, id: TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        let removed = self.tasks.remove(index);
        tracing::debug!("Deleted task {}", id);
        self.persist();
        Some(removed)
    }

    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn list_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == status)
            .cloned()
            .collect()
    }

    pub fn list_by_priority(&self, priority: Priority) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.priority == priority)
            .cloned()
            .collect()
    }

    /// Empties the board and removes the slot.
    pub fn clear_all(&mut self) {
        self.tasks.clear();
        if self.loading {
            return;
        }
        if let Err(e) = self.storage.remove(&self.key) {
            tracing::warn!("Failed to remove slot '{}': {}", self.key, e);
        }
    }

    pub fn reset_to_seed(&mut self) {
        self.tasks = seed_tasks();
        self.observe_ids();
        self.persist();
    }

    /// Replaces the whole collection, e.g. from an imported file.
    pub fn replace_all(&mut self, tasks: Vec<Task>) -> Result<(), StoreError> {
        let mut seen = HashSet::with_capacity(tasks.len());
        for task in &tasks {
            if !seen.insert(task.id) {
                return Err(StoreError::DuplicateId(task.id));
            }
            if task.title.trim().is_empty() {
                return Err(StoreError::EmptyTitle);
            }
        }

        self.tasks = tasks;
        self.observe_ids();
        self.persist();
        Ok(())
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    pub fn overdue(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| is_overdue(t, self.clock.as_ref()))
            .cloned()
            .collect()
    }

    pub fn created_this_week(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| is_created_this_week(t, self.clock.as_ref()))
            .cloned()
            .collect()
    }
}
