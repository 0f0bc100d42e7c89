use crate::board::SortOrder;
use crate::store::DEFAULT_KEY;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "taskflow";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
    pub key: String,
    /// Hand slot writes to a writer thread instead of waiting on the disk.
    pub background_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            key: DEFAULT_KEY.to_string(),
            background_writes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub sort_order: SortOrder,
    pub show_completed: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            sort_order: SortOrder::default(),
            show_completed: true,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME).context("Could not determine home directory")
}

pub fn get_config_dir() -> Result<PathBuf> {
    // TASKFLOW_CONFIG_PATH overrides the default config directory
    if let Ok(path) = std::env::var("TASKFLOW_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn get_config_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

pub fn get_data_dir(config: &Config) -> Result<PathBuf> {
    if let Some(path) = &config.storage.data_dir {
        return Ok(path.clone());
    }
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_file()?)
}

pub fn load_config_from(config_file: &Path) -> Result<Config> {
    if !config_file.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(config_file)
        .with_context(|| format!("Failed to read config file: {}", config_file.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", config_file.display()))
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &get_config_file()?)
}

pub fn save_config_to(config: &Config, config_file: &Path) -> Result<()> {
    if let Some(config_dir) = config_file.parent() {
        fs::create_dir_all(config_dir).with_context(|| {
            format!("Failed to create config directory: {}", config_dir.display())
        })?;
    }

    let contents = toml::to_string_pretty(config)?;
    fs::write(config_file, contents)
        .with_context(|| format!("Failed to write config file: {}", config_file.display()))
}

pub fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "storage.data_dir" => config.storage.data_dir.as_ref().map(|p| p.display().to_string()),
        "storage.key" => Some(config.storage.key.clone()),
        "storage.background_writes" => Some(config.storage.background_writes.to_string()),
        "preferences.sort_order" => Some(config.preferences.sort_order.to_string()),
        "preferences.show_completed" => Some(config.preferences.show_completed.to_string()),
        _ => None,
    }
}

pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "storage.data_dir" => config.storage.data_dir = Some(PathBuf::from(value)),
        "storage.key" => {
            if value.is_empty() || value.contains(['/', '\\']) {
                anyhow::bail!("Invalid storage key: {}", value);
            }
            config.storage.key = value.to_string();
        }
        "storage.background_writes" => {
            config.storage.background_writes = parse_bool(value)?;
        }
        "preferences.sort_order" => {
            config.preferences.sort_order = value.parse().map_err(anyhow::Error::msg)?;
        }
        "preferences.show_completed" => {
            config.preferences.show_completed = parse_bool(value)?;
        }
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => anyhow::bail!("Expected true or false, got '{}'", value),
    }
}
