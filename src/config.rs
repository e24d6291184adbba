use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::sequence::SequenceShape;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Shape of every built sequence
    #[serde(default)]
    pub sequence: SequenceShape,
    pub session: SessionConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub effects: EffectsConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionConfig {
    /// Hours after which a saved session is no longer offered (default: 12)
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
    /// Storage key of the session snapshot (default: "session")
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

fn default_max_age_hours() -> u64 {
    12
}

fn default_storage_key() -> String {
    "session".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age_hours: default_max_age_hours(),
            storage_key: default_storage_key(),
        }
    }
}

impl SessionConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours * 60 * 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PathsConfig {
    /// Directory for session snapshots, preferences, journal and logs
    pub state: String,
}

fn default_state_dir() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("rosary").to_string_lossy().to_string())
        .unwrap_or_else(|| ".rosary".to_string())
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state: default_state_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EffectsConfig {
    /// Ring the terminal bell on navigation (toggle at runtime with `h`)
    #[serde(default = "default_true")]
    pub haptics: bool,
    /// Hold an idle inhibitor while a session is active
    #[serde(default = "default_true")]
    pub keep_awake: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            haptics: true,
            keep_awake: true,
        }
    }
}

/// Where completed sessions are recorded
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompletionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Append completions to `completions.jsonl` in the state directory
    #[serde(default = "default_true")]
    pub journal: bool,
    #[serde(default)]
    pub os: OsNotificationConfig,
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            journal: true,
            os: OsNotificationConfig::default(),
            webhook: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OsNotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub sound: bool,
}

impl Default for OsNotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebhookConfig {
    /// Display name used in logs
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub url: String,
    /// Environment variable holding a bearer token
    #[serde(default)]
    pub token_env: Option<String>,
    /// Delivery attempts after the first failure (default: 3)
    #[serde(default = "default_webhook_retries")]
    pub max_retries: usize,
}

fn default_webhook_retries() -> usize {
    3
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ContentConfig {
    /// TOML catalog overriding the built-in English texts
    #[serde(default)]
    pub catalog: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to file while the interactive session owns the terminal
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_log_to_file(),
        }
    }
}

impl Config {
    /// Path to the project-local config file
    pub fn local_config_path() -> PathBuf {
        PathBuf::from(".rosary/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so rosary works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        // User config in ~/.config/rosary/ (global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("rosary").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Local config in .rosary/ (per-directory overrides)
        let local_config = Self::local_config_path();
        if local_config.exists() {
            builder = builder.add_source(config::File::from(local_config));
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with ROSARY_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("ROSARY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        let config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config
            .sequence
            .validate()
            .context("Invalid [sequence] configuration")?;

        Ok(config)
    }

    /// Save config to .rosary/config.toml
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::local_config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create rosary config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(&config_path, toml_str).context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get absolute path to the state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }

    /// Get path to the completion journal
    pub fn journal_path(&self) -> PathBuf {
        self.state_path().join("completions.jsonl")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sequence: SequenceShape::default(),
            session: SessionConfig::default(),
            paths: PathsConfig::default(),
            effects: EffectsConfig::default(),
            completion: CompletionConfig::default(),
            content: ContentConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
