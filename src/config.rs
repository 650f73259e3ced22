use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width_percent: u16,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Fire time for reminders on tasks without a time
    #[serde(default = "default_reminder_time")]
    pub default_reminder_time: String,
    /// Length of the Scheduled view in months
    #[serde(default = "default_scheduled_months")]
    pub scheduled_months: u32,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default = "default_current_theme")]
    pub current_theme: String,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_new")]
    pub new: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_search")]
    pub search: String,
    #[serde(default = "default_select")]
    pub select: String,
    #[serde(default = "default_back")]
    pub back: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_tab_left")]
    pub tab_left: String,
    #[serde(default = "default_tab_right")]
    pub tab_right: String,
    #[serde(default = "default_help")]
    pub help: String,
    #[serde(default = "default_undo")]
    pub undo: String,
    #[serde(default = "default_toggle_complete")]
    pub toggle_complete: String,
    #[serde(default = "default_toggle_flag")]
    pub toggle_flag: String,
    #[serde(default = "default_copy")]
    pub copy: String,
    #[serde(default = "default_clear_completed")]
    pub clear_completed: String,
    #[serde(default = "default_save")]
    pub save: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default = "default_highlight_fg")]
    pub highlight_fg: String,
    #[serde(default = "default_tab_bg")]
    pub tab_bg: String,
    #[serde(default = "default_flag_fg")]
    pub flag_fg: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sidebar_width_percent: default_sidebar_width(),
            database_path: default_database_path(),
            log_level: default_log_level(),
            default_reminder_time: default_reminder_time(),
            scheduled_months: default_scheduled_months(),
            poll_interval_secs: default_poll_interval(),
            resync_interval_secs: default_resync_interval(),
            key_bindings: KeyBindings::default(),
            current_theme: default_current_theme(),
            themes: HashMap::new(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            new: default_new(),
            delete: default_delete(),
            search: default_search(),
            select: default_select(),
            back: default_back(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            tab_left: default_tab_left(),
            tab_right: default_tab_right(),
            help: default_help(),
            undo: default_undo(),
            toggle_complete: default_toggle_complete(),
            toggle_flag: default_toggle_flag(),
            copy: default_copy(),
            clear_completed: default_clear_completed(),
            save: default_save(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            bg: default_bg(),
            highlight_bg: default_highlight_bg(),
            highlight_fg: default_highlight_fg(),
            tab_bg: default_tab_bg(),
            flag_fg: default_flag_fg(),
        }
    }
}

impl Theme {
    /// Preset themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        let mut themes = HashMap::new();

        themes.insert("default".to_string(), Theme::default());

        themes.insert("light".to_string(), Theme {
            fg: "black".to_string(),
            bg: "white".to_string(),
            highlight_bg: "blue".to_string(),
            highlight_fg: "white".to_string(),
            tab_bg: "gray".to_string(),
            flag_fg: "red".to_string(),
        });

        themes.insert("monochrome".to_string(), Theme {
            fg: "white".to_string(),
            bg: "black".to_string(),
            highlight_bg: "white".to_string(),
            highlight_fg: "black".to_string(),
            tab_bg: "gray".to_string(),
            flag_fg: "white".to_string(),
        });

        themes
    }
}

// Default value functions
fn default_sidebar_width() -> u16 {
    45
}

fn default_database_path() -> String {
    database_path_for_profile(utils::Profile::Prod)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_reminder_time() -> String {
    "11:00".to_string()
}

fn default_scheduled_months() -> u32 {
    12
}

fn default_poll_interval() -> u64 {
    1
}

fn default_resync_interval() -> u64 {
    30
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_new() -> String {
    "n".to_string()
}

fn default_delete() -> String {
    "d".to_string()
}

fn default_search() -> String {
    "/".to_string()
}

fn default_select() -> String {
    "Enter".to_string()
}

fn default_back() -> String {
    "Esc".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_tab_left() -> String {
    "Left".to_string()
}

fn default_tab_right() -> String {
    "Right".to_string()
}

fn default_help() -> String {
    "F1".to_string()
}

fn default_undo() -> String {
    "u".to_string()
}

fn default_toggle_complete() -> String {
    "Space".to_string()
}

fn default_toggle_flag() -> String {
    "f".to_string()
}

fn default_copy() -> String {
    "y".to_string()
}

fn default_clear_completed() -> String {
    "c".to_string()
}

fn default_save() -> String {
    "Ctrl+s".to_string()
}

fn default_current_theme() -> String {
    "default".to_string()
}

fn default_fg() -> String {
    "white".to_string()
}

fn default_bg() -> String {
    "black".to_string()
}

fn default_highlight_bg() -> String {
    "blue".to_string()
}

fn default_highlight_fg() -> String {
    "white".to_string()
}

fn default_tab_bg() -> String {
    "gray".to_string()
}

fn default_flag_fg() -> String {
    "#ff8c00".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

fn database_path_for_profile(profile: utils::Profile) -> String {
    if let Some(data_dir) = utils::get_data_dir(profile) {
        data_dir.join("reminders.db").to_string_lossy().to_string()
    } else {
        match profile {
            utils::Profile::Dev => "~/.local/share/reminders-dev/reminders.db".to_string(),
            utils::Profile::Prod => "~/.local/share/reminders/reminders.db".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Invalid config value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

impl Config {
    /// Load configuration from file, or create default if missing.
    /// The profile picks the config file and the default database path.
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        Self::load_from_path(&config_path, profile)
    }

    /// Load configuration from an explicit file, creating it with defaults if missing
    pub fn load_from_path(config_path: &Path, profile: utils::Profile) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let mut config: Config = toml::from_str(&contents)?;

            if config.database_path.trim().is_empty() {
                config.database_path = database_path_for_profile(profile);
            }
            config.validate()?;
            Ok(config)
        } else {
            let mut config = Config::default();
            config.database_path = database_path_for_profile(profile);
            config.save_to_path(config_path)?;
            Ok(config)
        }
    }

    pub fn save_to_path(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile).ok_or_else(|| {
            ConfigError::ConfigDirError("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Log directory sits next to the database
    pub fn get_log_dir(&self) -> PathBuf {
        self.get_database_path()
            .parent()
            .map(|p| p.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    /// Parsed `default_reminder_time`
    pub fn reminder_time(&self) -> Result<NaiveTime, ConfigError> {
        utils::parse_time(&self.default_reminder_time).map_err(|e| ConfigError::InvalidValue {
            field: "default_reminder_time",
            message: format!("'{}': {}", self.default_reminder_time, e),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reminder_time()?;
        if self.scheduled_months == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduled_months",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Theme named by `current_theme`, falling back to the default preset
    pub fn get_active_theme(&self) -> Theme {
        self.themes
            .get(&self.current_theme)
            .cloned()
            .or_else(|| Theme::get_preset_themes().remove(&self.current_theme))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str("scheduled_months = 6\n").unwrap();
        assert_eq!(config.scheduled_months, 6);
        assert_eq!(config.default_reminder_time, "11:00");
        assert_eq!(config.key_bindings.toggle_complete, "Space");
        assert_eq!(config.reminder_time().unwrap(), NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    }

    #[test]
    fn bad_reminder_time_is_rejected() {
        let config = Config {
            default_reminder_time: "eleven".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn unknown_theme_falls_back_to_default() {
        let config = Config {
            current_theme: "neon".to_string(),
            ..Config::default()
        };
        assert_eq!(config.get_active_theme(), Theme::default());
    }
}
