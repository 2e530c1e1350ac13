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
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub firebase: FirebaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default = "default_current_theme")]
    pub current_theme: String,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
}

/// Hosted identity provider and realtime database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub database_url: String,
    #[serde(default = "default_auth_endpoint")]
    pub auth_endpoint: String,
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Hosted language model used for date extraction and task questions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Speak confirmations and answers
    #[serde(default)]
    pub enabled: bool,
    /// External command that records one utterance and prints its transcript
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recognizer_command: Option<String>,
    /// Voice name fragments tried before the built-in list
    #[serde(default)]
    pub preferred_voices: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Custom alarm file; a generated beep is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_path: Option<String>,
    /// Audio player program; detected when unset (afplay, paplay, aplay)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub extract_failure_policy: ExtractFailurePolicy,
}

/// What task creation does when due-date extraction fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractFailurePolicy {
    /// Create the task without a schedule
    #[default]
    Undated,
    /// Refuse to create the task and report the error
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_new_task")]
    pub new_task: String,
    #[serde(default = "default_ask")]
    pub ask: String,
    #[serde(default = "default_edit")]
    pub edit: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_toggle_complete")]
    pub toggle_complete: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_stop_alarm")]
    pub stop_alarm: String,
    #[serde(default = "default_refresh")]
    pub refresh: String,
    #[serde(default = "default_sign_out")]
    pub sign_out: String,
    #[serde(default = "default_help")]
    pub help: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default = "default_highlight_fg")]
    pub highlight_fg: String,
    #[serde(default = "default_accent")]
    pub accent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: Some(CURRENT_CONFIG_VERSION),
            database_path: default_database_path(),
            firebase: FirebaseConfig::default(),
            llm: LlmConfig::default(),
            voice: VoiceConfig::default(),
            alarm: AlarmConfig::default(),
            tasks: TaskConfig::default(),
            key_bindings: KeyBindings::default(),
            current_theme: default_current_theme(),
            themes: HashMap::new(),
        }
    }
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            database_url: String::new(),
            auth_endpoint: default_auth_endpoint(),
            token_endpoint: default_token_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_llm_model(),
            endpoint: default_llm_endpoint(),
            temperature: default_llm_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound_path: None,
            player: None,
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            new_task: default_new_task(),
            ask: default_ask(),
            edit: default_edit(),
            delete: default_delete(),
            toggle_complete: default_toggle_complete(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            listen: default_listen(),
            stop_alarm: default_stop_alarm(),
            refresh: default_refresh(),
            sign_out: default_sign_out(),
            help: default_help(),
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
            accent: default_accent(),
        }
    }
}

impl Theme {
    fn preset(fg: &str, bg: &str, highlight_bg: &str, accent: &str) -> Self {
        Self {
            fg: fg.to_string(),
            bg: bg.to_string(),
            highlight_bg: highlight_bg.to_string(),
            highlight_fg: String::new(),
            accent: accent.to_string(),
        }
    }

    /// Themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        HashMap::from([
            ("default".to_string(), Theme::default()),
            ("dark".to_string(), Theme::preset("white", "black", "cyan", "yellow")),
            ("light".to_string(), Theme::preset("black", "white", "blue", "magenta")),
        ])
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

fn default_database_path() -> String {
    Config::default_database_path_for_profile(utils::Profile::Prod)
}

fn default_auth_endpoint() -> String {
    "https://identitytoolkit.googleapis.com/v1".to_string()
}

fn default_token_endpoint() -> String {
    "https://securetoken.googleapis.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_llm_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_llm_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_llm_temperature() -> f32 {
    0.2
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_new_task() -> String {
    "n".to_string()
}

fn default_ask() -> String {
    "a".to_string()
}

fn default_edit() -> String {
    "e".to_string()
}

fn default_delete() -> String {
    "d".to_string()
}

fn default_toggle_complete() -> String {
    "Space".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_listen() -> String {
    "F3".to_string()
}

fn default_stop_alarm() -> String {
    "s".to_string()
}

fn default_refresh() -> String {
    "r".to_string()
}

fn default_sign_out() -> String {
    "Ctrl+o".to_string()
}

fn default_help() -> String {
    "F1".to_string()
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

fn default_accent() -> String {
    "green".to_string()
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
}

impl Config {
    /// Load configuration, creating a default file when none exists.
    /// `custom_path` (from `--config`) replaces the profile's config file.
    pub fn load_with_profile(
        profile: utils::Profile,
        custom_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let config_path = match custom_path {
            Some(path) => path.to_path_buf(),
            None => Self::get_config_path(profile)?,
        };

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let mut config: Config = toml::from_str(&contents)?;
            // Dev and prod never share a database
            if custom_path.is_none() {
                config.database_path = Self::default_database_path_for_profile(profile);
            }
            config
        } else {
            let mut config = Config::default();
            config.database_path = Self::default_database_path_for_profile(profile);
            if let Err(e) = config.save_to(&config_path) {
                tracing::error!("Failed to save config file {:?}: {}", config_path, e);
                return Err(e);
            }
            config
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Secrets may come from the environment instead of the config file
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty("GOGODO_FIREBASE_API_KEY") {
            self.firebase.api_key = key;
        }
        if let Some(url) = non_empty("GOGODO_DATABASE_URL") {
            self.firebase.database_url = url;
        }
        if let Some(key) = non_empty("GEMINI_API_KEY") {
            self.llm.api_key = key;
        }
    }

    /// Write configuration to `path`, creating parent directories
    pub fn save_to(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile).ok_or_else(|| {
            ConfigError::ConfigDirError("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("config.toml"))
    }

    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        match utils::get_data_dir(profile) {
            Some(data_dir) => data_dir.join("gogodo.db").to_string_lossy().to_string(),
            None => match profile {
                utils::Profile::Dev => "~/.local/share/gogodo-dev/gogodo.db".to_string(),
                utils::Profile::Prod => "~/.local/share/gogodo/gogodo.db".to_string(),
            },
        }
    }

    /// Database path with `~` expanded
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Directory next to the database, used for the log file and generated sounds
    pub fn get_data_dir(&self) -> PathBuf {
        self.get_database_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// The active theme, falling back to the default preset.
    /// An empty highlight_fg is derived from highlight_bg.
    pub fn get_active_theme(&self) -> Theme {
        use crate::tui::widgets::color::{format_color_for_display, get_contrast_text_color, parse_color};

        let mut theme = self
            .themes
            .get(&self.current_theme)
            .cloned()
            .or_else(|| Theme::get_preset_themes().remove(&self.current_theme))
            .unwrap_or_default();

        if theme.highlight_fg.is_empty() {
            let calculated = get_contrast_text_color(parse_color(&theme.highlight_bg));
            theme.highlight_fg = format_color_for_display(&calculated);
        }

        theme
    }
}
