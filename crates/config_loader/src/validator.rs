//! Configuration validation
//!
//! Rules:
//! - feed endpoint is complete (host non-empty, port non-zero)
//! - reconnect backoff is positive and its ceiling is not below the start
//! - timeouts and periods are positive
//! - batch size / batch timeout / queue capacity are positive
//! - batch timeout is at most `MAX_BATCH_TIMEOUT_S`
//! - dedup capacity is positive when deduplication is enabled
//! - database url is set and the pool holds at least one connection

use contracts::{
    ContractError, DatabaseConfig, FeedConfig, ProcessingConfig, ServiceConfig, MAX_BATCH_TIMEOUT_S,
};

/// Validate a ServiceConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &ServiceConfig) -> Result<(), ContractError> {
    validate_feed(&config.feed)?;
    validate_processing(&config.processing)?;
    validate_database(&config.database)?;
    Ok(())
}

/// Non-fatal findings worth surfacing to the operator
pub fn warnings(config: &ServiceConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.processing.enable_deduplication {
        warnings.push(
            "processing.enable_deduplication = false: repeated records will be persisted"
                .to_string(),
        );
    }

    if config.processing.stats_interval_s == 0 {
        warnings.push("processing.stats_interval_s = 0: periodic statistics disabled".to_string());
    }

    if config.database.is_in_memory() {
        warnings.push(format!(
            "database.url '{}' is an in-memory database: data is lost on exit",
            config.database.url
        ));
    }

    warnings
}

fn validate_feed(feed: &FeedConfig) -> Result<(), ContractError> {
    if feed.host.trim().is_empty() {
        return Err(ContractError::config_validation(
            "feed.host",
            "host cannot be empty",
        ));
    }

    if feed.port == 0 {
        return Err(ContractError::config_validation(
            "feed.port",
            "port must be non-zero",
        ));
    }

    if feed.reconnect_interval_s == 0 {
        return Err(ContractError::config_validation(
            "feed.reconnect_interval_s",
            "reconnect_interval_s must be > 0",
        ));
    }

    if feed.max_reconnect_interval_s < feed.reconnect_interval_s {
        return Err(ContractError::config_validation(
            "feed.reconnect_interval_s / feed.max_reconnect_interval_s",
            format!(
                "max_reconnect_interval_s ({}) must be >= reconnect_interval_s ({})",
                feed.max_reconnect_interval_s, feed.reconnect_interval_s
            ),
        ));
    }

    if feed.connect_timeout_s == 0 {
        return Err(ContractError::config_validation(
            "feed.connect_timeout_s",
            "connect_timeout_s must be > 0",
        ));
    }

    if feed.read_timeout_s == 0 {
        return Err(ContractError::config_validation(
            "feed.read_timeout_s",
            "read_timeout_s must be > 0",
        ));
    }

    Ok(())
}

fn validate_processing(processing: &ProcessingConfig) -> Result<(), ContractError> {
    if processing.batch_size == 0 {
        return Err(ContractError::config_validation(
            "processing.batch_size",
            "batch_size must be > 0",
        ));
    }

    let timeout = processing.batch_timeout_s;
    if !(timeout.is_finite() && timeout > 0.0) {
        return Err(ContractError::config_validation(
            "processing.batch_timeout_s",
            format!(
                "batch_timeout_s must be a positive number, got {}",
                processing.batch_timeout_s
            ),
        ));
    }

    if timeout > MAX_BATCH_TIMEOUT_S {
        return Err(ContractError::config_validation(
            "processing.batch_timeout_s",
            format!("batch_timeout_s must be at most {MAX_BATCH_TIMEOUT_S}, got {timeout}"),
        ));
    }

    if processing.enable_deduplication && processing.dedup_capacity == 0 {
        return Err(ContractError::config_validation(
            "processing.dedup_capacity",
            "dedup_capacity must be > 0 when deduplication is enabled",
        ));
    }

    if processing.flush_check_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "processing.flush_check_interval_ms",
            "flush_check_interval_ms must be > 0",
        ));
    }

    if processing.line_queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "processing.line_queue_capacity",
            "line_queue_capacity must be > 0",
        ));
    }

    Ok(())
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ContractError> {
    if database.url.trim().is_empty() {
        return Err(ContractError::config_validation(
            "database.url",
            "database url cannot be empty",
        ));
    }

    if database.pool_size == 0 {
        return Err(ContractError::config_validation(
            "database.pool_size",
            "pool_size must be > 0",
        ));
    }

    Ok(())
}
