use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Config file name, looked up next to the document.
pub const CONFIG_FILE: &str = "docx-live-reload.toml";

/// Configuration loaded from `docx-live-reload.toml` in the document's directory.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LiveReloadConfig {
    pub server: ServerConfig,
    pub sync: SyncConfig,
    pub editor: EditorConfig,
    pub generation: GenerationConfig,
    pub question_file: QuestionFileConfig,
}

/// HTTP ingress settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Polling and debounce intervals, in milliseconds.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
    pub liveness_tick_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            debounce_ms: 1000,
            liveness_tick_ms: 1000,
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn liveness_tick(&self) -> Duration {
        Duration::from_millis(self.liveness_tick_ms)
    }
}

/// Preview application command; the preview copy path is appended.
///
/// `{profile}` is replaced by a private per-run profile directory, so the
/// office suite starts a dedicated instance instead of handing the file to
/// one that is already running.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EditorConfig {
    pub command: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "libreoffice".to_string(),
                "-env:UserInstallation={profile}".to_string(),
                "--nologo".to_string(),
                "--norestore".to_string(),
                "--writer".to_string(),
            ],
        }
    }
}

/// Text-generation service settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_url: String,
    /// Falls back to the `ANTHROPIC_API_KEY` environment variable.
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Write the failure description into the document when generation fails.
    pub write_failure_text: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: None,
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 1000,
            temperature: 0.0,
            timeout_secs: 60,
            write_failure_text: false,
        }
    }
}

impl GenerationConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
    }
}

/// Local question-file trigger.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QuestionFileConfig {
    pub enabled: bool,
    pub debounce_ms: u64,
}

impl Default for QuestionFileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 500,
        }
    }
}

impl LiveReloadConfig {
    /// Load configuration from `docx-live-reload.toml` in the given directory.
    ///
    /// Returns a default configuration if the file does not exist or cannot be parsed.
    pub fn load(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!("failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!("failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}
