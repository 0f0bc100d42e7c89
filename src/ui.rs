use crate::analytics::Analytics;
use crate::app::{App, FormField, Page, SETTINGS};
use crate::task::{Priority, Task, TaskStatus};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    if app.store.is_loading() {
        terminal.draw(|f| draw(f, app))?;
        app.store.load();
    }

    loop {
        terminal.draw(|f| draw(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            app.handle_key(key.code);
            if app.should_quit {
                return Ok(());
            }
        }
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    let titles: Vec<Line> = Page::ALL.iter().map(|p| Line::from(p.title())).collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("TaskFlow").borders(Borders::ALL))
        .select(app.page.index())
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[0]);

    if app.store.is_loading() {
        let loading = Paragraph::new("Loading tasks...")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(loading, chunks[1]);
    } else {
        match app.page {
            Page::Tasks => draw_board(f, app, chunks[1]),
            Page::Analytics => draw_analytics(f, app, chunks[1]),
            Page::Settings => draw_settings(f, app, chunks[1]),
        }
    }

    draw_status(f, app, chunks[2]);

    if app.form.is_some() {
        draw_form(f, app);
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Low => Color::Green,
        Priority::Medium => Color::Yellow,
        Priority::High => Color::LightRed,
        Priority::Urgent => Color::Red,
    }
}

fn card(task: &Task, dragged: bool, overdue: bool) -> ListItem<'_> {
    let mut spans = vec![
        Span::raw(format!("[#{}] ", task.id)),
        Span::styled(&task.title, Style::default().fg(Color::White)),
        Span::styled(
            format!(" {}", task.priority),
            Style::default().fg(priority_color(task.priority)),
        ),
    ];
    if let Some(due) = task.due_date {
        let style = if overdue {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!(" (Due: {due})"), style));
    }
    let mut style = Style::default();
    if dragged {
        style = style.add_modifier(Modifier::DIM | Modifier::ITALIC);
    }
    ListItem::new(Line::from(spans)).style(style)
}

fn draw_board(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(area);

    let dragged = app.board.dragging.map(|d| d.id);
    let clock = app.store.clock();

    for (i, status) in TaskStatus::ALL.into_iter().enumerate() {
        let tasks = app.board.column_tasks(&app.store, status);
        let hidden = status == TaskStatus::Completed && !app.config.preferences.show_completed;

        let items: Vec<ListItem> = if hidden {
            vec![ListItem::new(format!("{} hidden", tasks.len()))]
        } else {
            tasks
                .iter()
                .enumerate()
                .map(|(row, t)| {
                    let item = card(t, Some(t.id) == dragged, crate::store::is_overdue(t, clock));
                    if app.board.column == i && app.board.row == row && dragged.is_none() {
                        item.style(Style::default().add_modifier(Modifier::REVERSED))
                    } else {
                        item
                    }
                })
                .collect()
        };

        let border_style = if app.board.column == i && dragged.is_some() {
            Style::default().fg(Color::Magenta)
        } else if app.board.column == i {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!("{} ({})", status.label(), tasks.len()))
                    .borders(Borders::ALL)
                    .border_style(border_style),
            )
            .highlight_style(Style::default().add_modifier(Modifier::BOLD));

        f.render_widget(list, chunks[i]);
    }
}

fn draw_analytics(f: &mut Frame, app: &App, area: Rect) {
    let analytics = Analytics::from_store(&app.store);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(3), Constraint::Min(4)])
        .split(area);

    let gauge = Gauge::default()
        .block(Block::default().title("Completion rate").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Green))
        .percent(analytics.completion_rate.min(100) as u16);
    f.render_widget(gauge, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(chunks[1]);

    let average = analytics
        .average_completion_days
        .map(|days| format!("{days:.1} days"))
        .unwrap_or_else(|| "-".to_string());
    let overview = vec![
        Line::from(format!("Total tasks:      {}", analytics.total_tasks)),
        Line::from(format!("Created this week: {}", analytics.tasks_this_week)),
        Line::from(Span::styled(
            format!("Overdue:          {}", analytics.overdue_tasks),
            if analytics.overdue_tasks > 0 {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            },
        )),
        Line::from(format!("Avg. completion:  {average}")),
    ];
    f.render_widget(
        Paragraph::new(overview).block(Block::default().title("Overview").borders(Borders::ALL)),
        columns[0],
    );

    let by_status: Vec<Line> = [
        (TaskStatus::Pending, analytics.tasks_by_status.pending),
        (TaskStatus::InProgress, analytics.tasks_by_status.in_progress),
        (TaskStatus::Completed, analytics.tasks_by_status.completed),
    ]
    .into_iter()
    .map(|(status, count)| Line::from(format!("{:<12} {}", status.label(), count)))
    .collect();
    f.render_widget(
        Paragraph::new(by_status).block(Block::default().title("By status").borders(Borders::ALL)),
        columns[1],
    );

    let by_priority: Vec<Line> = Priority::ALL
        .into_iter()
        .rev()
        .map(|priority| {
            Line::from(Span::styled(
                format!("{:<8} {}", priority, analytics.tasks_by_priority.count(priority)),
                Style::default().fg(priority_color(priority)),
            ))
        })
        .collect();
    f.render_widget(
        Paragraph::new(by_priority)
            .block(Block::default().title("By priority").borders(Borders::ALL)),
        columns[2],
    );
}

fn draw_settings(f: &mut Frame, app: &App, area: Rect) {
    let prefs = &app.config.preferences;
    let items: Vec<ListItem> = SETTINGS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let value = match i {
                0 => prefs.sort_order.to_string(),
                1 => (if prefs.show_completed { "on" } else { "off" }).to_string(),
                _ => String::new(),
            };
            let style = if i == app.settings_row {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            ListItem::new(format!("{label:<24} {value}")).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(format!("Settings (slot: {})", app.store.key()))
            .borders(Borders::ALL),
    );
    f.render_widget(list, area);
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let text = if let Some(confirm) = &app.confirm {
        Line::from(Span::styled(
            confirm.question(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))
    } else if let Some(status) = &app.status {
        Line::from(status.as_str())
    } else {
        let help = match app.page {
            Page::Tasks => concat!(
                "arrows: select  space: pick up/drop  enter: advance  ",
                "a: add  e: edit  d: delete  tab: page  q: quit",
            ),
            Page::Analytics => "tab: page  q: quit",
            Page::Settings => "up/down: select  enter: change  tab: page  q: quit",
        };
        Line::from(Span::styled(help, Style::default().fg(Color::DarkGray)))
    };
    f.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_form(f: &mut Frame, app: &App) {
    let Some(form) = &app.form else {
        return;
    };
    let area = centered(f.area(), 60, 12);
    f.render_widget(Clear, area);

    let mut lines = Vec::new();
    for (i, field) in FormField::ALL.into_iter().enumerate() {
        let value = match field {
            FormField::Title => form.title.clone(),
            FormField::Description => form.description.clone(),
            FormField::Priority => format!("< {} >", form.priority),
            FormField::DueDate => form.due_date.clone(),
        };
        let style = if i == form.field {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<22} ", field.label()), style),
            Span::raw(value),
        ]));
    }
    lines.push(Line::from(""));
    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(Span::styled(
        "tab: next field  enter: save  esc: cancel",
        Style::default().fg(Color::DarkGray),
    )));

    let title = if form.editing.is_some() {
        "Edit task"
    } else {
        "New task"
    };
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::MemoryStorage;
    use crate::store::TaskStore;
    use crossterm::event::KeyCode;
    use ratatui::backend::TestBackend;

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_loading_then_board() {
        let mut app = App::new(TaskStore::new(MemoryStorage::new()), Config::default());
        assert!(screen(&app).contains("Loading tasks..."));

        app.store.load();
        let text = screen(&app);
        assert!(text.contains("Pending (3)"));
        assert!(text.contains("In Progress (1)"));
        assert!(text.contains("Completed (1)"));
        assert!(text.contains("Design Database Schema"));
    }

    #[test]
    fn renders_analytics_and_settings() {
        let mut app = App::new(TaskStore::open(MemoryStorage::new()), Config::default());
        app.handle_key(KeyCode::Char('2'));
        let text = screen(&app);
        assert!(text.contains("Completion rate"));
        assert!(text.contains("20%"));

        app.handle_key(KeyCode::Char('3'));
        let text = screen(&app);
        assert!(text.contains("Task sort order"));
        assert!(text.contains("due-date"));
    }

    #[test]
    fn hides_completed_column_when_disabled() {
        let mut config = Config::default();
        config.preferences.show_completed = false;
        let app = App::new(TaskStore::open(MemoryStorage::new()), config);
        let text = screen(&app);
        assert!(text.contains("1 hidden"));
        assert!(!text.contains("Setup Development Environment"));
    }

    #[test]
    fn renders_form() {
        let mut app = App::new(TaskStore::open(MemoryStorage::new()), Config::default());
        app.handle_key(KeyCode::Char('a'));
        let text = screen(&app);
        assert!(text.contains("New task"));
        assert!(text.contains("Due date (YYYY-MM-DD)"));
    }
}
