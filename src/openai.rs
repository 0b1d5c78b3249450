//! OpenAI-compatible client configuration.

use crate::config::{ApiKey, ModelSettings};
use crate::error::{CutroomError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create a chat completion client from explicit model settings and credential.
///
/// `base_url` lets the same client talk to any OpenAI-compatible endpoint.
pub fn create_client(model: &ModelSettings, api_key: &ApiKey) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(model.timeout_secs))
        .build()
        .map_err(|e| CutroomError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::new().with_api_key(api_key.expose());
    if let Some(base_url) = &model.base_url {
        config = config.with_api_base(base_url.trim_end_matches('/'));
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
