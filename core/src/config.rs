use crate::errors::{GeminiError, GeminiResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Directory name under `~/.config`
pub const APP_NAME: &str = "gemini-chat";

/// Fixed, namespaced name of the persisted history file
pub const HISTORY_FILE_NAME: &str = "goc_chat_history.json";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Models the chat is allowed to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SupportedModel {
    Gemini20Flash,
    Gemini15Flash,
    Gemini15Pro,
    #[default]
    Gemini25Flash,
}

impl SupportedModel {
    pub const ALL: [SupportedModel; 4] = [
        SupportedModel::Gemini20Flash,
        SupportedModel::Gemini15Flash,
        SupportedModel::Gemini15Pro,
        SupportedModel::Gemini25Flash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedModel::Gemini20Flash => "gemini-2.0-flash",
            SupportedModel::Gemini15Flash => "gemini-1.5-flash",
            SupportedModel::Gemini15Pro => "gemini-1.5-pro",
            SupportedModel::Gemini25Flash => "gemini-2.5-flash",
        }
    }
}

impl fmt::Display for SupportedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupportedModel {
    type Err = GeminiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == wanted)
            .ok_or_else(|| GeminiError::UnsupportedModel(wanted.to_string()))
    }
}

/// Configuration struct for the chat client
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub base_url: Option<String>,
    /// `0` disables the timeout
    pub request_timeout_secs: Option<u64>,
    pub history_file: Option<PathBuf>,
    pub tts_enabled: Option<bool>,
    /// External program that speaks its last argument, e.g. `espeak`
    pub tts_command: Option<String>,
    pub log_level: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: Some(SupportedModel::default().to_string()),
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
            history_file: None,
            tts_enabled: Some(false),
            tts_command: None,
            log_level: Some("warn".to_string()),
        }
    }
}

impl GeminiConfig {
    /// Layers defaults, the TOML file (default location when `path` is
    /// `None`), `.env` and `GEMINI_*` environment variables.
    pub fn load(path: Option<&Path>) -> GeminiResult<Self> {
        dotenvy::dotenv().ok();

        let path = match path {
            Some(path) => path.to_path_buf(),
            None => get_default_config_file(APP_NAME)?,
        };
        debug!(path = %path.display(), "Loading configuration");

        let settings = ::config::Config::builder()
            .add_source(
                ::config::File::new(&path.to_string_lossy(), ::config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(::config::Environment::with_prefix("GEMINI").try_parsing(true))
            .build()
            .map_err(|e| GeminiError::ConfigError(format!("Failed to load config: {}", e)))?;

        let loaded: Self = settings
            .try_deserialize()
            .map_err(|e| GeminiError::ConfigError(format!("Failed to parse config: {}", e)))?;

        Ok(Self::default().merge(&loaded))
    }

    /// Records `model` as `model_name` in the TOML file at `path`.
    ///
    /// Only that key is touched; everything else in the file, including keys
    /// this version does not know about, is written back as it was read.
    pub fn remember_model(path: &Path, model: SupportedModel) -> GeminiResult<()> {
        let mut table = match fs::read_to_string(path) {
            Ok(content) => content.parse::<toml::Table>().map_err(|e| {
                GeminiError::ConfigError(format!("Failed to parse config file: {}", e))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => toml::Table::new(),
            Err(e) => return Err(e.into()),
        };
        table.insert(
            "model_name".to_string(),
            toml::Value::String(model.as_str().to_string()),
        );

        let content = toml::to_string(&table).map_err(|e| {
            GeminiError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;

        debug!(path = %path.display(), model = %model, "Saved model choice");
        Ok(())
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            history_file: other
                .history_file
                .clone()
                .or_else(|| self.history_file.clone()),
            tts_enabled: other.tts_enabled.or(self.tts_enabled),
            tts_command: other.tts_command.clone().or_else(|| self.tts_command.clone()),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
        }
    }

    /// The configured model, checked against the allow-list
    pub fn model(&self) -> GeminiResult<SupportedModel> {
        match self.model_name.as_deref() {
            Some(name) => name.parse(),
            None => Ok(SupportedModel::default()),
        }
    }

    /// The API key, which must be present and non-blank
    pub fn api_key(&self) -> GeminiResult<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(GeminiError::ConfigError(
                "API key is required (set GEMINI_API_KEY or api_key in config.toml)".to_string(),
            )),
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
        }
    }

    /// Where the conversation history is persisted
    pub fn history_path(&self) -> GeminiResult<PathBuf> {
        match &self.history_file {
            Some(path) => Ok(path.clone()),
            None => Ok(get_default_config_dir(APP_NAME)?.join(HISTORY_FILE_NAME)),
        }
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> GeminiResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        GeminiError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> GeminiResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
