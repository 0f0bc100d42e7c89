use crate::task::{Priority, Task, TaskStatus};
use chrono::NaiveDate;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn sample(
    id: u64,
    title: &str,
    description: &str,
    status: TaskStatus,
    priority: Priority,
    due: NaiveDate,
    created: NaiveDate,
) -> Task {
    Task {
        id,
        title: title.to_string(),
        description: Some(description.to_string()),
        status,
        priority,
        due_date: Some(due),
        created_date: created,
        updated_date: None,
        assigned_to: None,
        tags: Vec::new(),
    }
}

/// Sample board written to an empty or unreadable slot.
pub fn seed_tasks() -> Vec<Task> {
    vec![
        sample(
            1,
            "Setup Development Environment",
            "Configure development tools and dependencies",
            TaskStatus::Completed,
            Priority::High,
            date(2025, 6, 10),
            date(2025, 6, 1),
        ),
        sample(
            2,
            "Design Database Schema",
            "Create tables and relationships for the application",
            TaskStatus::InProgress,
            Priority::High,
            date(2025, 6, 20),
            date(2025, 6, 5),
        ),
        sample(
            3,
            "Implement Authentication",
            "Add user login and registration functionality",
            TaskStatus::Pending,
            Priority::Medium,
            date(2025, 6, 25),
            date(2025, 6, 8),
        ),
        sample(
            4,
            "Create API Documentation",
            "Document all API endpoints and usage examples",
            TaskStatus::Pending,
            Priority::Low,
            date(2025, 7, 1),
            date(2025, 6, 10),
        ),
        sample(
            5,
            "Write Unit Tests",
            "Add comprehensive test coverage for all components",
            TaskStatus::Pending,
            Priority::Medium,
            date(2025, 6, 30),
            date(2025, 6, 12),
        ),
    ]
}
