use crate::analytics::Analytics;
use crate::board::{sort_tasks, SortOrder};
use crate::config::Preferences;
use crate::data;
use crate::store::TaskStore;
use crate::task::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus};
use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "Kanban task board for the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tasks
    List {
        /// Only tasks with this status
        #[arg(short, long)]
        status: Option<TaskStatus>,

        /// Only tasks with this priority
        #[arg(short, long)]
        priority: Option<Priority>,

        /// due-date, priority, created or alphabetical
        #[arg(long)]
        sort: Option<SortOrder>,
    },
    /// Add a new task
    Add {
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        #[arg(short, long, default_value = "pending")]
        status: TaskStatus,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Move a task to another column
    Move { id: TaskId, status: TaskStatus },
    /// Change fields of a task
    Edit {
        id: TaskId,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        priority: Option<Priority>,

        /// Due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "no_due")]
        due: Option<NaiveDate>,

        /// Remove the due date
        #[arg(long)]
        no_due: bool,
    },
    /// Delete a task
    Delete { id: TaskId },
    /// Show one task
    Show { id: TaskId },
    /// Show statistics
    Stats,
    /// List overdue tasks
    Overdue,
    /// List tasks created in the last 7 days
    Week,
    /// Replace the board with the sample tasks
    Reset,
    /// Delete every task
    Clear,
    /// Write the board to a JSON file
    Export { path: PathBuf },
    /// Replace the board with a JSON file
    Import { path: PathBuf },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the full configuration
    Show,
    /// Print one value
    Get { key: String },
    /// Change one value
    Set { key: String, value: String },
}

fn print_task(out: &mut impl Write, task: &Task) -> Result<()> {
    let due = task
        .due_date
        .map(|d| format!(" (Due: {d})"))
        .unwrap_or_default();
    writeln!(
        out,
        "- [#{}] {} [{}] {}{}",
        task.id, task.title, task.status, task.priority, due
    )?;
    Ok(())
}

fn print_tasks(out: &mut impl Write, tasks: &[Task]) -> Result<()> {
    if tasks.is_empty() {
        writeln!(out, "No tasks.")?;
    }
    for task in tasks {
        print_task(out, task)?;
    }
    Ok(())
}

fn not_found(id: TaskId) -> anyhow::Error {
    anyhow::anyhow!("No task with id {}", id)
}

/// Runs a task command against a loaded store. `Config` is handled by the
/// binary since it never touches the board.
pub fn execute(
    command: Commands,
    store: &mut TaskStore,
    preferences: &Preferences,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Commands::List {
            status,
            priority,
            sort,
        } => {
            let mut tasks: Vec<Task> = store
                .tasks()
                .iter()
                .filter(|t| status.map_or(true, |s| t.status == s))
                .filter(|t| priority.map_or(true, |p| t.priority == p))
                .filter(|t| status.is_some() || preferences.show_completed || !t.is_completed())
                .cloned()
                .collect();
            sort_tasks(&mut tasks, sort.unwrap_or(preferences.sort_order));
            print_tasks(out, &tasks)
        }
        Commands::Add {
            title,
            description,
            priority,
            status,
            due,
        } => {
            let fields = NewTask {
                title,
                description,
                status,
                priority,
                due_date: due,
                assigned_to: None,
                tags: Vec::new(),
            };
            let task = store.create(fields)?;
            writeln!(out, "Created task #{}", task.id)?;
            Ok(())
        }
        Commands::Move { id, status } => {
            let task = store.update_status(id, status).ok_or_else(|| not_found(id))?;
            writeln!(out, "Task \"{}\" moved to {}", task.title, status)?;
            Ok(())
        }
        Commands::Edit {
            id,
            title,
            description,
            priority,
            due,
            no_due,
        } => {
            if title.as_deref().is_some_and(|t| t.trim().is_empty()) {
                anyhow::bail!("Task title must not be empty");
            }
            let patch = TaskPatch {
                title,
                description: description.map(Some),
                priority,
                due_date: if no_due { Some(None) } else { due.map(Some) },
                ..TaskPatch::default()
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to change");
            }
            let task = store.update(id, patch).ok_or_else(|| not_found(id))?;
            print_task(out, &task)
        }
        Commands::Delete { id } => {
            let task = store.delete(id).ok_or_else(|| not_found(id))?;
            writeln!(out, "Deleted \"{}\"", task.title)?;
            Ok(())
        }
        Commands::Show { id } => {
            let task = store.get(id).ok_or_else(|| not_found(id))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&task)?)?;
            Ok(())
        }
        Commands::Stats => {
            let analytics = Analytics::from_store(store);
            writeln!(out, "Total:           {}", analytics.total_tasks)?;
            writeln!(out, "Pending:         {}", analytics.tasks_by_status.pending)?;
            writeln!(out, "In progress:     {}", analytics.tasks_by_status.in_progress)?;
            writeln!(out, "Completed:       {}", analytics.tasks_by_status.completed)?;
            writeln!(out, "Completion rate: {}%", analytics.completion_rate)?;
            writeln!(out, "Overdue:         {}", analytics.overdue_tasks)?;
            writeln!(out, "This week:       {}", analytics.tasks_this_week)?;
            for priority in Priority::ALL {
                writeln!(
                    out,
                    "Priority {:<7} {}",
                    format!("{priority}:"),
                    analytics.tasks_by_priority.count(priority)
                )?;
            }
            Ok(())
        }
        Commands::Overdue => print_tasks(out, &store.overdue()),
        Commands::Week => print_tasks(out, &store.created_this_week()),
        Commands::Reset => {
            store.reset_to_seed();
            writeln!(out, "Restored {} sample tasks", store.tasks().len())?;
            Ok(())
        }
        Commands::Clear => {
            store.clear_all();
            writeln!(out, "All tasks deleted")?;
            Ok(())
        }
        Commands::Export { path } => {
            let count = data::export_tasks(store, &path)?;
            writeln!(out, "Exported {} tasks to {}", count, path.display())?;
            Ok(())
        }
        Commands::Import { path } => {
            let count = data::import_tasks(store, &path)?;
            writeln!(out, "Imported {} tasks", count)?;
            Ok(())
        }
        Commands::Config { .. } => {
            anyhow::bail!("config commands do not operate on the board")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::MemoryStorage;

    fn store() -> TaskStore {
        let clock = FixedClock::at(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(), 12);
        let mut store = TaskStore::new(MemoryStorage::new()).with_clock(clock);
        store.load();
        store
    }

    fn run(store: &mut TaskStore, args: &[&str]) -> Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("taskflow").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        execute(
            cli.command.expect("subcommand"),
            store,
            &Preferences::default(),
            &mut out,
        )?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn add_then_list_by_status() {
        let mut store = store();
        let output = run(
            &mut store,
            &["add", "Write release notes", "-p", "high", "--due", "2025-06-20"],
        )
        .unwrap();
        assert!(output.starts_with("Created task #"));

        let output = run(
            &mut store,
            &["list", "--status", "pending", "--priority", "high"],
        )
        .unwrap();
        assert_eq!(output.lines().count(), 1);
        assert!(output.contains("Write release notes [pending] high (Due: 2025-06-20)"));
    }

    #[test]
    fn move_and_missing_ids() {
        let mut store = store();
        let output = run(&mut store, &["move", "3", "in-progress"]).unwrap();
        assert_eq!(output.trim(), "Task \"Implement Authentication\" moved to in-progress");
        assert_eq!(store.get(3).unwrap().status, TaskStatus::InProgress);

        assert!(run(&mut store, &["move", "42", "completed"]).is_err());
        assert!(run(&mut store, &["delete", "42"]).is_err());
        assert!(run(&mut store, &["show", "42"]).is_err());
        assert!(run(&mut store, &["move", "3", "blocked"]).is_err());
    }

    #[test]
    fn edit_clears_due_date() {
        let mut store = store();
        run(&mut store, &["edit", "4", "--no-due", "--title", "Docs"]).unwrap();
        let task = store.get(4).unwrap();
        assert_eq!(task.title, "Docs");
        assert_eq!(task.due_date, None);

        assert!(run(&mut store, &["edit", "4"]).is_err());
        assert!(run(&mut store, &["edit", "4", "--title", " "]).is_err());
    }

    #[test]
    fn stats_output() {
        let mut store = store();
        let output = run(&mut store, &["stats"]).unwrap();
        assert!(output.contains("Total:           5"));
        assert!(output.contains("Completion rate: 20%"));
        // The only seed task due before mid-June is already completed.
        assert!(output.contains("Overdue:         0"));
        assert!(output.contains("This week:       2"));
    }

    #[test]
    fn list_hides_completed_when_preferred() {
        let mut store = store();
        let prefs = Preferences {
            show_completed: false,
            ..Preferences::default()
        };
        let mut out = Vec::new();
        let cli = Cli::try_parse_from(["taskflow", "list"]).unwrap();
        execute(cli.command.unwrap(), &mut store, &prefs, &mut out).unwrap();
        let output = String::from_utf8(out).unwrap();
        assert_eq!(output.lines().count(), 4);
        assert!(!output.contains("[completed]"));
    }

    #[test]
    fn clear_then_reset() {
        let mut store = store();
        run(&mut store, &["clear"]).unwrap();
        assert_eq!(run(&mut store, &["list"]).unwrap().trim(), "No tasks.");
        run(&mut store, &["reset"]).unwrap();
        assert_eq!(store.tasks().len(), 5);
    }
}
