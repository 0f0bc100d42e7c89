//! Figures shown on the analytics page.

use crate::clock::Clock;
use crate::store::{completion_rate, is_created_this_week, is_overdue, TaskStore};
use crate::task::{Priority, Task, TaskStatus};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityBreakdown {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub urgent: usize,
}

impl PriorityBreakdown {
    pub fn count(&self, priority: Priority) -> usize {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
            Priority::Urgent => self.urgent,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Analytics {
    pub total_tasks: usize,
    pub completion_rate: u32,
    /// Mean days from creation to last update over completed tasks that
    /// carry an update date.
    pub average_completion_days: Option<f64>,
    pub tasks_this_week: usize,
    pub overdue_tasks: usize,
    pub tasks_by_status: StatusBreakdown,
    pub tasks_by_priority: PriorityBreakdown,
}

impl Analytics {
    pub fn from_tasks(tasks: &[Task], clock: &dyn Clock) -> Self {
        let mut analytics = Analytics {
            total_tasks: tasks.len(),
            ..Analytics::default()
        };

        let mut completion_days = Vec::new();
        for task in tasks {
            match task.status {
                TaskStatus::Pending => analytics.tasks_by_status.pending += 1,
                TaskStatus::InProgress => analytics.tasks_by_status.in_progress += 1,
                TaskStatus::Completed => {
                    analytics.tasks_by_status.completed += 1;
                    if let Some(updated) = task.updated_date {
                        completion_days.push((updated - task.created_date).num_days() as f64);
                    }
                }
            }
            match task.priority {
                Priority::Low => analytics.tasks_by_priority.low += 1,
                Priority::Medium => analytics.tasks_by_priority.medium += 1,
                Priority::High => analytics.tasks_by_priority.high += 1,
                Priority::Urgent => analytics.tasks_by_priority.urgent += 1,
            }
            if is_overdue(task, clock) {
                analytics.overdue_tasks += 1;
            }
            if is_created_this_week(task, clock) {
                analytics.tasks_this_week += 1;
            }
        }

        analytics.completion_rate =
            completion_rate(analytics.tasks_by_status.completed, analytics.total_tasks);
        if !completion_days.is_empty() {
            let sum: f64 = completion_days.iter().sum();
            analytics.average_completion_days = Some(sum / completion_days.len() as f64);
        }
        analytics
    }

    pub fn from_store(store: &TaskStore) -> Self {
        Self::from_tasks(store.tasks(), store.clock())
    }
}
