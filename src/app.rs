//! State and key handling of the terminal dashboard.

use crate::board::BoardState;
use crate::config::{self, Config};
use crate::data;
use crate::storage::{BackgroundStorage, FileStorage, Storage};
use crate::store::TaskStore;
use crate::task::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus};
use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::KeyCode;
use std::path::PathBuf;

/// Opens the board described by `config`, backed by files in its data
/// directory.
pub fn open_store(config: &Config) -> Result<TaskStore> {
    let data_dir = config::get_data_dir(config)?;
    let files = FileStorage::new(data_dir);
    let storage: Box<dyn Storage> = if config.storage.background_writes {
        Box::new(BackgroundStorage::spawn(files)?)
    } else {
        Box::new(files)
    };
    Ok(TaskStore::new(storage).with_key(config.storage.key.clone()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Tasks,
    Analytics,
    Settings,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Tasks, Page::Analytics, Page::Settings];

    pub fn title(&self) -> &'static str {
        match self {
            Page::Tasks => "Tasks",
            Page::Analytics => "Analytics",
            Page::Settings => "Settings",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Page::Tasks => 0,
            Page::Analytics => 1,
            Page::Settings => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    Delete(TaskId),
    Reset,
    ClearAll,
}

impl Confirm {
    pub fn question(&self) -> String {
        match self {
            Confirm::Delete(id) => format!("Delete task #{id}? (y/n)"),
            Confirm::Reset => "Replace the board with the sample tasks? (y/n)".into(),
            Confirm::ClearAll => "Delete every task? (y/n)".into(),
        }
    }
}

pub const SETTINGS: [&str; 5] = [
    "Task sort order",
    "Show completed tasks",
    "Export data",
    "Reset sample data",
    "Clear all data",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    Priority,
    DueDate,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Title,
        FormField::Description,
        FormField::Priority,
        FormField::DueDate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Description => "Description",
            FormField::Priority => "Priority",
            FormField::DueDate => "Due date (YYYY-MM-DD)",
        }
    }
}

/// The add/edit task modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub editing: Option<TaskId>,
    pub field: usize,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: String,
    pub status: TaskStatus,
    pub error: Option<String>,
}

impl TaskForm {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            editing: None,
            field: 0,
            title: String::new(),
            description: String::new(),
            priority: Priority::Medium,
            due_date: String::new(),
            status,
            error: None,
        }
    }

    pub fn edit(task: &Task) -> Self {
        Self {
            editing: Some(task.id),
            field: 0,
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            priority: task.priority,
            due_date: task.due_date.map(|d| d.to_string()).unwrap_or_default(),
            status: task.status,
            error: None,
        }
    }

    pub fn current(&self) -> FormField {
        FormField::ALL[self.field % FormField::ALL.len()]
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.current() {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::DueDate => Some(&mut self.due_date),
            FormField::Priority => None,
        }
    }

    fn cycle_priority(&mut self, step: isize) {
        let all = Priority::ALL;
        let index = all.iter().position(|p| *p == self.priority).unwrap_or(0) as isize;
        let next = (index + step).rem_euclid(all.len() as isize) as usize;
        self.priority = all[next];
    }

    fn parse_due(&self) -> Result<Option<NaiveDate>, String> {
        let due = self.due_date.trim();
        if due.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(due, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("'{due}' is not a YYYY-MM-DD date"))
    }

    fn description(&self) -> Option<String> {
        let description = self.description.trim();
        (!description.is_empty()).then(|| description.to_string())
    }
}

pub struct App {
    pub store: TaskStore,
    pub board: BoardState,
    pub page: Page,
    pub config: Config,
    pub config_file: Option<PathBuf>,
    pub form: Option<TaskForm>,
    pub confirm: Option<Confirm>,
    pub settings_row: usize,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(store: TaskStore, config: Config) -> Self {
        Self {
            store,
            board: BoardState::new(config.preferences.sort_order)
                .with_hidden_completed(!config.preferences.show_completed),
            page: Page::Tasks,
            config,
            config_file: None,
            form: None,
            confirm: None,
            settings_row: 0,
            status: None,
            should_quit: false,
        }
    }

    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        if self.store.is_loading() {
            if key == KeyCode::Char('q') {
                self.should_quit = true;
            }
            return;
        }
        if let Some(confirm) = self.confirm.take() {
            if matches!(key, KeyCode::Char('y') | KeyCode::Char('Y')) {
                self.apply_confirm(confirm);
            } else {
                self.set_status("Cancelled");
            }
            return;
        }
        if self.form.is_some() {
            self.handle_form_key(key);
            return;
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.page = Page::ALL[(self.page.index() + 1) % Page::ALL.len()],
            KeyCode::BackTab => {
                self.page = Page::ALL[(self.page.index() + Page::ALL.len() - 1) % Page::ALL.len()]
            }
            KeyCode::Char('1') => self.page = Page::Tasks,
            KeyCode::Char('2') => self.page = Page::Analytics,
            KeyCode::Char('3') => self.page = Page::Settings,
            _ => match self.page {
                Page::Tasks => self.handle_board_key(key),
                Page::Analytics => {}
                Page::Settings => self.handle_settings_key(key),
            },
        }
    }

    fn handle_board_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Left | KeyCode::Char('h') => self.board.select_left(&self.store),
            KeyCode::Right | KeyCode::Char('l') => self.board.select_right(&self.store),
            KeyCode::Up | KeyCode::Char('k') => self.board.select_up(),
            KeyCode::Down | KeyCode::Char('j') => self.board.select_down(&self.store),
            KeyCode::Char(' ') => {
                if self.board.dragging.is_some() {
                    self.drop_card();
                } else if self.board.pick_up(&self.store) {
                    self.set_status("Moving card: choose a column and press space to drop");
                }
            }
            KeyCode::Esc => {
                if self.board.dragging.is_some() {
                    self.board.cancel_drag();
                    self.set_status("Move cancelled");
                }
            }
            KeyCode::Enter => {
                // Advance the selected card one column.
                if let Some(task) = self.board.selected_task(&self.store) {
                    let next = (task.status.column() + 1).min(TaskStatus::ALL.len() - 1);
                    self.move_card(task.id, TaskStatus::ALL[next]);
                }
            }
            KeyCode::Char('a') => self.form = Some(TaskForm::new(self.board.status())),
            KeyCode::Char('e') => {
                if let Some(task) = self.board.selected_task(&self.store) {
                    self.form = Some(TaskForm::edit(&task));
                }
            }
            KeyCode::Char('d') => {
                if let Some(task) = self.board.selected_task(&self.store) {
                    self.confirm = Some(Confirm::Delete(task.id));
                }
            }
            _ => {}
        }
    }

    fn drop_card(&mut self) {
        let dragged = self.board.dragging.map(|d| d.id);
        match self.board.drop_here() {
            Some((id, status)) => self.move_card(id, status),
            None => {
                if let Some(id) = dragged {
                    self.board.focus(&self.store, id);
                }
            }
        }
    }

    fn move_card(&mut self, id: TaskId, status: TaskStatus) {
        match self.store.update_status(id, status) {
            Some(task) => {
                self.board.focus(&self.store, id);
                self.set_status(format!(
                    "Task \"{}\" moved to {}",
                    task.title,
                    status.label().to_lowercase()
                ));
            }
            None => self.set_status(format!("Task #{id} no longer exists")),
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.form = None;
                return;
            }
            KeyCode::Enter => {
                self.submit_form();
                return;
            }
            _ => {}
        }

        let Some(form) = self.form.as_mut() else {
            return;
        };
        match key {
            KeyCode::Tab | KeyCode::Down => form.field = (form.field + 1) % FormField::ALL.len(),
            KeyCode::BackTab | KeyCode::Up => {
                form.field = (form.field + FormField::ALL.len() - 1) % FormField::ALL.len()
            }
            KeyCode::Left if form.current() == FormField::Priority => form.cycle_priority(-1),
            KeyCode::Right if form.current() == FormField::Priority => form.cycle_priority(1),
            KeyCode::Backspace => {
                if let Some(text) = form.text_mut() {
                    text.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = form.text_mut() {
                    text.push(c);
                }
            }
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        let Some(mut form) = self.form.take() else {
            return;
        };
        if form.title.trim().is_empty() {
            form.error = Some("Title is required".into());
            self.form = Some(form);
            return;
        }
        let due_date = match form.parse_due() {
            Ok(due) => due,
            Err(e) => {
                form.error = Some(e);
                self.form = Some(form);
                return;
            }
        };

        match form.editing {
            Some(id) => {
                let patch = TaskPatch {
                    title: Some(form.title.trim().to_string()),
                    description: Some(form.description()),
                    priority: Some(form.priority),
                    due_date: Some(due_date),
                    ..TaskPatch::default()
                };
                match self.store.update(id, patch) {
                    Some(task) => self.set_status(format!("Task \"{}\" updated", task.title)),
                    None => self.set_status(format!("Task #{id} no longer exists")),
                }
            }
            None => {
                let fields = NewTask {
                    title: form.title.trim().to_string(),
                    description: form.description(),
                    status: form.status,
                    priority: form.priority,
                    due_date,
                    assigned_to: None,
                    tags: Vec::new(),
                };
                match self.store.create(fields) {
                    Ok(task) => {
                        self.board.focus(&self.store, task.id);
                        self.set_status("Task created successfully");
                    }
                    Err(e) => self.set_status(format!("Task creation failed: {e}")),
                }
            }
        }
    }

    fn handle_settings_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                self.settings_row = self.settings_row.saturating_sub(1)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.settings_row = (self.settings_row + 1).min(SETTINGS.len() - 1)
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.activate_setting(),
            _ => {}
        }
    }

    fn activate_setting(&mut self) {
        match self.settings_row {
            0 => {
                self.config.preferences.sort_order = self.config.preferences.sort_order.next();
                self.board.sort = self.config.preferences.sort_order;
                self.save_preferences();
            }
            1 => {
                self.config.preferences.show_completed = !self.config.preferences.show_completed;
                self.board
                    .set_hide_completed(!self.config.preferences.show_completed, &self.store);
                self.save_preferences();
            }
            2 => self.export(),
            3 => self.confirm = Some(Confirm::Reset),
            _ => self.confirm = Some(Confirm::ClearAll),
        }
    }

    fn save_preferences(&mut self) {
        let Some(path) = self.config_file.clone() else {
            return;
        };
        if let Err(e) = config::save_config_to(&self.config, &path) {
            tracing::warn!("Failed to save preferences: {:#}", e);
            self.set_status(format!("Could not save preferences: {e}"));
        } else {
            self.set_status("Preferences saved");
        }
    }

    fn export(&mut self) {
        let result = config::get_data_dir(&self.config).and_then(|dir| {
            std::fs::create_dir_all(&dir)?;
            let path = dir.join("taskflow-export.json");
            data::export_tasks(&self.store, &path).map(|count| (count, path))
        });
        match result {
            Ok((count, path)) => {
                self.set_status(format!("Exported {count} tasks to {}", path.display()))
            }
            Err(e) => self.set_status(format!("Export failed: {e}")),
        }
    }

    fn apply_confirm(&mut self, confirm: Confirm) {
        match confirm {
            Confirm::Delete(id) => {
                if let Some(task) = self.store.delete(id) {
                    self.board.clamp(&self.store);
                    self.set_status(format!("Task \"{}\" deleted", task.title));
                }
            }
            Confirm::Reset => {
                self.store.reset_to_seed();
                self.board = BoardState::new(self.board.sort)
                    .with_hidden_completed(self.board.hide_completed);
                self.set_status("Sample tasks restored");
            }
            Confirm::ClearAll => {
                self.store.clear_all();
                self.board = BoardState::new(self.board.sort)
                    .with_hidden_completed(self.board.hide_completed);
                self.set_status("All tasks deleted");
            }
        }
    }
}
