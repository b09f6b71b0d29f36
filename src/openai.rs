//! OpenAI client configuration with sensible defaults.

use crate::error::{Result, VidsageError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Create an OpenAI client with configured timeout.
///
/// Fails if `OPENAI_API_KEY` is missing or empty.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    check_api_key()?;

    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| VidsageError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Check if the OpenAI API key is configured.
pub fn check_api_key() -> Result<()> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(VidsageError::Configuration(format!(
            "{} is empty. Set it with: export {}='sk-...'",
            API_KEY_ENV, API_KEY_ENV
        ))),
        Err(_) => Err(VidsageError::Configuration(format!(
            "{} not set. Set it with: export {}='sk-...'",
            API_KEY_ENV, API_KEY_ENV
        ))),
    }
}
