//! Selection and drag state of the kanban page.

use crate::store::TaskStore;
use crate::task::{Priority, Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    DueDate,
    Priority,
    Created,
    Alphabetical,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::DueDate,
        SortOrder::Priority,
        SortOrder::Created,
        SortOrder::Alphabetical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::DueDate => "due-date",
            SortOrder::Priority => "priority",
            SortOrder::Created => "created",
            SortOrder::Alphabetical => "alphabetical",
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|o| *o == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str() == s.trim())
            .ok_or_else(|| format!("unknown sort order '{s}'"))
    }
}

fn priority_rank(priority: Priority) -> u8 {
    match priority {
        Priority::Urgent => 0,
        Priority::High => 1,
        Priority::Medium => 2,
        Priority::Low => 3,
    }
}

/// Stable sort, so ties keep board order.
pub fn sort_tasks(tasks: &mut [Task], order: SortOrder) {
    match order {
        SortOrder::DueDate => tasks.sort_by(|a, b| match (a.due_date, b.due_date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        SortOrder::Priority => tasks.sort_by_key(|t| priority_rank(t.priority)),
        SortOrder::Created => tasks.sort_by(|a, b| b.created_date.cmp(&a.created_date)),
        SortOrder::Alphabetical => tasks.sort_by_key(|t| t.title.to_lowercase()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drag {
    pub id: TaskId,
    pub origin: TaskStatus,
}

#[derive(Debug, Default)]
pub struct BoardState {
    pub column: usize,
    pub row: usize,
    pub dragging: Option<Drag>,
    pub sort: SortOrder,
    /// The Completed column is not drawn and cannot be selected.
    pub hide_completed: bool,
}

impl BoardState {
    pub fn new(sort: SortOrder) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn with_hidden_completed(mut self, hide: bool) -> Self {
        self.hide_completed = hide;
        self
    }

    pub fn set_hide_completed(&mut self, hide: bool, store: &TaskStore) {
        self.hide_completed = hide;
        if self.column > self.last_column() {
            self.column = self.last_column();
            self.cancel_drag();
        }
        self.clamp(store);
    }

    fn last_column(&self) -> usize {
        if self.hide_completed {
            TaskStatus::Completed.column() - 1
        } else {
            TaskStatus::ALL.len() - 1
        }
    }

    pub fn status(&self) -> TaskStatus {
        TaskStatus::ALL[self.column.min(TaskStatus::ALL.len() - 1)]
    }

    pub fn column_tasks(&self, store: &TaskStore, status: TaskStatus) -> Vec<Task> {
        let mut tasks = store.list_by_status(status);
        sort_tasks(&mut tasks, self.sort);
        tasks
    }

    pub fn selected_task(&self, store: &TaskStore) -> Option<Task> {
        self.column_tasks(store, self.status()).get(self.row).cloned()
    }

    /// Keeps the selection inside the current column after it shrank.
    pub fn clamp(&mut self, store: &TaskStore) {
        let len = store.list_by_status(self.status()).len();
        self.row = self.row.min(len.saturating_sub(1));
    }

    pub fn select_left(&mut self, store: &TaskStore) {
        self.column = self.column.saturating_sub(1);
        self.clamp(store);
    }

    pub fn select_right(&mut self, store: &TaskStore) {
        self.column = (self.column + 1).min(self.last_column());
        self.clamp(store);
    }

    pub fn select_up(&mut self) {
        self.row = self.row.saturating_sub(1);
    }

    pub fn select_down(&mut self, store: &TaskStore) {
        self.row += 1;
        self.clamp(store);
    }

    /// Starts dragging the selected card. Returns false on an empty column.
    pub fn pick_up(&mut self, store: &TaskStore) -> bool {
        match self.selected_task(store) {
            Some(task) => {
                self.dragging = Some(Drag {
                    id: task.id,
                    origin: task.status,
                });
                true
            }
            None => false,
        }
    }

    /// Ends the drag over the current column. Yields the status change to
    /// apply, or nothing when the card is dropped where it came from.
    pub fn drop_here(&mut self) -> Option<(TaskId, TaskStatus)> {
        let drag = self.dragging.take()?;
        let target = self.status();
        (drag.origin != target).then_some((drag.id, target))
    }

    pub fn cancel_drag(&mut self) {
        self.dragging = None;
    }

    /// Moves the selection onto `id`, wherever it now lives. A card in a
    /// hidden column leaves the selection where it is.
    pub fn focus(&mut self, store: &TaskStore, id: TaskId) {
        let visible = self.last_column() + 1;
        for (column, status) in TaskStatus::ALL.into_iter().enumerate().take(visible) {
            if let Some(row) = self
                .column_tasks(store, status)
                .iter()
                .position(|t| t.id == id)
            {
                self.column = column;
                self.row = row;
                return;
            }
        }
        self.clamp(store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::NaiveDate;

    fn seeded() -> TaskStore {
        TaskStore::open(MemoryStorage::new())
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn navigation_clamps() {
        let store = seeded();
        let mut board = BoardState::default();

        board.select_left(&store);
        assert_eq!(board.column, 0);
        for _ in 0..10 {
            board.select_down(&store);
        }
        assert_eq!(board.row, 2);

        // In-progress column holds a single card.
        board.select_right(&store);
        assert_eq!(board.status(), TaskStatus::InProgress);
        assert_eq!(board.row, 0);

        board.select_right(&store);
        board.select_right(&store);
        assert_eq!(board.column, 2);
    }

    #[test]
    fn hidden_completed_column_is_skipped() {
        let mut store = seeded();
        let mut board = BoardState::default().with_hidden_completed(true);

        board.select_right(&store);
        board.select_right(&store);
        assert_eq!(board.status(), TaskStatus::InProgress);

        // A card moved into the hidden column does not pull the selection along.
        let id = board.selected_task(&store).unwrap().id;
        store.update_status(id, TaskStatus::Completed).unwrap();
        board.focus(&store, id);
        assert_eq!(board.status(), TaskStatus::InProgress);
        assert_eq!(board.selected_task(&store), None);
    }

    #[test]
    fn hiding_completed_moves_selection_off_it() {
        let store = seeded();
        let mut board = BoardState::default();
        board.select_right(&store);
        board.select_right(&store);
        board.pick_up(&store);
        assert_eq!(board.status(), TaskStatus::Completed);

        board.set_hide_completed(true, &store);
        assert_eq!(board.status(), TaskStatus::InProgress);
        assert!(board.dragging.is_none());
        assert_eq!(board.row, 0);
    }

    #[test]
    fn drop_on_other_column_moves_card() {
        let mut store = seeded();
        let mut board = BoardState::default();
        assert!(board.pick_up(&store));
        let picked = board.dragging.unwrap();
        assert_eq!(picked.origin, TaskStatus::Pending);

        board.select_right(&store);
        board.select_right(&store);
        let (id, status) = board.drop_here().unwrap();
        assert_eq!((id, status), (picked.id, TaskStatus::Completed));
        assert!(board.dragging.is_none());

        store.update_status(id, status).unwrap();
        board.focus(&store, id);
        assert_eq!(board.selected_task(&store).unwrap().id, id);
    }

    #[test]
    fn drop_on_origin_is_noop() {
        let store = seeded();
        let mut board = BoardState::default();
        board.pick_up(&store);
        board.select_right(&store);
        board.select_left(&store);
        assert_eq!(board.drop_here(), None);
        assert!(board.dragging.is_none());
    }

    #[test]
    fn empty_column_cannot_be_picked() {
        let mut store = seeded();
        store.clear_all();
        let mut board = BoardState::default();
        assert!(!board.pick_up(&store));
        assert_eq!(board.drop_here(), None);
    }

    #[test]
    fn sort_orders() {
        let mut tasks = crate::seed::seed_tasks();
        tasks[4].due_date = None;

        sort_tasks(&mut tasks, SortOrder::DueDate);
        assert_eq!(
            titles(&tasks),
            vec![
                "Setup Development Environment",
                "Design Database Schema",
                "Implement Authentication",
                "Create API Documentation",
                "Write Unit Tests",
            ]
        );

        sort_tasks(&mut tasks, SortOrder::Priority);
        assert_eq!(tasks[0].priority, Priority::High);
        assert_eq!(tasks[1].priority, Priority::High);
        assert_eq!(tasks[4].priority, Priority::Low);
        // Ties keep the previous order.
        assert_eq!(tasks[2].title, "Implement Authentication");

        sort_tasks(&mut tasks, SortOrder::Created);
        assert_eq!(tasks[0].created_date, NaiveDate::from_ymd_opt(2025, 6, 12).unwrap());

        tasks[0].title = "alpha".into();
        sort_tasks(&mut tasks, SortOrder::Alphabetical);
        assert_eq!(tasks[0].title, "alpha");
        assert_eq!(tasks[1].title, "Create API Documentation");
    }

    #[test]
    fn sort_order_cycles_and_parses() {
        assert_eq!(SortOrder::Alphabetical.next(), SortOrder::DueDate);
        assert_eq!("priority".parse::<SortOrder>(), Ok(SortOrder::Priority));
        assert!("random".parse::<SortOrder>().is_err());
    }
}
