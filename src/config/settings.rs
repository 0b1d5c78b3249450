//! Configuration settings for Cutroom.

use crate::error::{CutroomError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub workspace: WorkspaceSettings,
    pub runner: RunnerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level used when neither `-v` nor `RUST_LOG` is given
    /// (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Chat completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model shared by all four roles.
    pub name: String,
    /// OpenAI-compatible API base URL. None uses the OpenAI default.
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature. None leaves the provider default.
    pub temperature: Option<f32>,
    /// Request `json_object` responses. Gemini's OpenAI-compatible endpoint
    /// rejects JSON mode together with function calling, so set this to
    /// false there.
    pub json_mode: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 300,
            temperature: None,
            json_mode: true,
        }
    }
}

/// Working folder layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Folder holding the input assets and the requirements document.
    pub working_dir: String,
    /// Scratch subdirectory (relative to the working folder) for generated files.
    pub scratch_dir: String,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            working_dir: "./assets".to_string(),
            scratch_dir: "temp".to_string(),
        }
    }
}

/// Limits for the agent runtime and the interactive step runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Maximum backend round trips with tool calls within one invocation.
    pub max_tool_iterations: usize,
    /// Maximum clarification questions a single stage may ask.
    pub max_clarification_rounds: usize,
    /// Re-prompts allowed when the model's output does not match the stage contract.
    pub max_schema_retries: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            max_tool_iterations: 25,
            max_clarification_rounds: 8,
            max_schema_retries: 2,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

/// API credential read once at startup.
///
/// The value never appears in `Debug` output.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap an explicit key.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(CutroomError::Config("API key is empty".to_string()));
        }
        Ok(Self(key))
    }

    /// Read the key from the environment variable named in the model settings.
    pub fn from_env(model: &ModelSettings) -> Result<Self> {
        match std::env::var(&model.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(Self(key)),
            Ok(_) => Err(CutroomError::Config(format!(
                "{} is empty. Set it with: export {}='...'",
                model.api_key_env, model.api_key_env
            ))),
            Err(_) => Err(CutroomError::Config(format!(
                "{} not set. Set it with: export {}='...' or add it to a .env file",
                model.api_key_env, model.api_key_env
            ))),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Masked form for diagnostics.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&"****").finish()
    }
}

impl Settings {
    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cutroom")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded working folder path.
    pub fn working_dir(&self) -> PathBuf {
        Self::expand_path(&self.workspace.working_dir)
    }

    /// Get the scratch directory path beneath the working folder.
    pub fn scratch_dir(&self) -> PathBuf {
        self.working_dir().join(&self.workspace.scratch_dir)
    }
}
