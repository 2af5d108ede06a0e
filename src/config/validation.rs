use crate::config::types::{
    Config, CookieConfig, FetcherConfig, StoreBackend, StoreConfig, WorkerConfig,
};
use crate::ConfigError;

/// Upper bound on redirects the tier-1 fetcher may follow
const MAX_REDIRECTS_LIMIT: usize = 20;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_store_config(&config.store)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_cookie_config(&config.cookies)?;
    validate_worker_config(&config.worker)?;
    Ok(())
}

/// Rejects store backends whose state does not outlive the process
///
/// The CLI runs one command per process, so an in-memory store would forget
/// every queued URL between `enqueue` and `crawl`.
pub fn require_persistent_store(config: &Config) -> Result<(), ConfigError> {
    if config.store.backend == StoreBackend::Memory {
        return Err(ConfigError::Validation(
            "backend 'memory' keeps state in-process only and cannot be used from the \
             command line; use 'sqlite'"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validates backing store configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.backend == StoreBackend::Sqlite && config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty for the sqlite backend".to_string(),
        ));
    }

    if config.history_path.is_empty() {
        return Err(ConfigError::Validation(
            "history_path cannot be empty".to_string(),
        ));
    }

    validate_key_prefix(&config.key_prefix)?;

    Ok(())
}

/// Validates a store key prefix: non-empty, no whitespace, no ':' at the ends
fn validate_key_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() {
        return Err(ConfigError::Validation(
            "key_prefix cannot be empty".to_string(),
        ));
    }

    if prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "key_prefix cannot contain whitespace, got '{}'",
            prefix
        )));
    }

    if prefix.starts_with(':') || prefix.ends_with(':') {
        return Err(ConfigError::Validation(format!(
            "key_prefix cannot start or end with ':', got '{}'",
            prefix
        )));
    }

    Ok(())
}

/// Validates tier-1 fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 || config.connect_timeout_secs > config.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be between 1 and timeout_secs ({}), got {}",
            config.timeout_secs, config.connect_timeout_secs
        )));
    }

    if config.max_redirects > MAX_REDIRECTS_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be <= {}, got {}",
            MAX_REDIRECTS_LIMIT, config.max_redirects
        )));
    }

    Ok(())
}

/// Validates cookie cache configuration
fn validate_cookie_config(config: &CookieConfig) -> Result<(), ConfigError> {
    if config.default_ttl_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "default_ttl_secs must be >= 1, got {}",
            config.default_ttl_secs
        )));
    }
    Ok(())
}

/// Validates crawl worker configuration
fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }
    Ok(())
}
