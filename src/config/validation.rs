use crate::config::types::{ClientConfig, Config, LimitsConfig, ServerConfig};
use crate::ConfigError;

/// Upper bound on workers per request
const MAX_WORKERS_CEILING: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_server_config(&config.server)?;
    validate_limits_config(&config.limits)?;
    validate_client_config(&config.client)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    // "[]" is the smallest body that decodes
    if config.max_request_body_bytes < 2 {
        return Err(ConfigError::Validation(format!(
            "max_request_body_bytes must be >= 2, got {}",
            config.max_request_body_bytes
        )));
    }

    if config.read_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "read_timeout_ms must be >= 1ms".to_string(),
        ));
    }

    Ok(())
}

fn validate_limits_config(config: &LimitsConfig) -> Result<(), ConfigError> {
    if config.max_batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "max_batch_size must be >= 1, got {}",
            config.max_batch_size
        )));
    }

    if config.max_workers < 1 || config.max_workers > MAX_WORKERS_CEILING {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and {}, got {}",
            MAX_WORKERS_CEILING, config.max_workers
        )));
    }

    if config.per_url_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "per_url_timeout_ms must be >= 1ms".to_string(),
        ));
    }

    // The request that brings the counter to the limit is shed, so 1 would admit nothing
    if config.max_concurrent_requests < 2 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be >= 2, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.request_timeout_ms == Some(0) {
        return Err(ConfigError::Validation(
            "request_timeout_ms must be >= 1ms when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.connect_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout_ms must be >= 1ms".to_string(),
        ));
    }

    Ok(())
}
