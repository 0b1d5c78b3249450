//! Error types for Cutroom.

use thiserror::Error;

/// Library-level error type for Cutroom operations.
#[derive(Error, Debug)]
pub enum CutroomError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("{role} did not produce a valid {contract} after {attempts} attempt(s): {reason}")]
    Schema {
        role: String,
        contract: String,
        attempts: usize,
        reason: String,
    },

    #[error("{role} asked for clarification more than {limit} times")]
    ClarificationLimit { role: String, limit: usize },

    #[error("{role} exceeded maximum tool iterations ({limit})")]
    ToolIterationLimit { role: String, limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Cutroom operations.
pub type Result<T> = std::result::Result<T, CutroomError>;
