use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs;
use std::io;
use std::sync::Mutex;
use taskflow::app::{self, App};
use taskflow::cli::{self, Cli, Commands, ConfigAction};
use taskflow::config::{self, Config};
use taskflow::ui;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// WARN unless `directives` (the RUST_LOG text) says otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives.unwrap_or_default())
}

fn init_tracing(log_file: Option<fs::File>) {
    // RUST_LOG=debug shows every store operation
    let rust_log = std::env::var("RUST_LOG").ok();
    let builder = tracing_subscriber::fmt().with_env_filter(log_filter(rust_log.as_deref()));
    match log_file {
        Some(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        None => builder.with_writer(io::stderr).init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;

    match cli.command {
        None => run_dashboard(cfg),
        Some(Commands::Config { action }) => {
            init_tracing(None);
            run_config(cfg, action)
        }
        Some(command) => {
            init_tracing(None);
            let mut store = app::open_store(&cfg)?;
            store.load();
            let mut stdout = io::stdout().lock();
            cli::execute(command, &mut store, &cfg.preferences, &mut stdout)
        }
    }
}

fn run_config(mut cfg: Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigAction::Get { key } => match config::get_config_value(&cfg, &key) {
            Some(value) => println!("{}", value),
            None => anyhow::bail!("No value for '{}'", key),
        },
        ConfigAction::Set { key, value } => {
            config::set_config_value(&mut cfg, &key, &value)?;
            config::save_config(&cfg)?;
            println!("{} = {}", key, value);
        }
    }
    Ok(())
}

fn run_dashboard(cfg: Config) -> Result<()> {
    // Log to a file so output does not tear the screen
    let data_dir = config::get_data_dir(&cfg)?;
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join("taskflow.log"))?;
    init_tracing(Some(log_file));

    let store = app::open_store(&cfg)?;
    let mut app = App::new(store, cfg).with_config_file(config::get_config_file()?);

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Dropping the store drains any queued writes
    drop(app);

    result.context("Dashboard failed")
}
