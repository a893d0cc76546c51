use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_DB_PATH: &str = "data/ADS_METRICS.sqlite";

/// 64 MiB.
pub const DEFAULT_INGEST_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: usize| -> Result<usize, ConfigError> {
        lookup(var).map_or(Ok(default), |raw| {
            raw.parse::<usize>().map_err(|e| invalid(var, e.to_string()))
        })
    };

    let db_path = or_default("SQLITE_DB_PATH", DEFAULT_DB_PATH);
    if db_path.trim().is_empty() {
        return Err(invalid("SQLITE_DB_PATH", "path must not be empty".to_string()));
    }

    let env = parse_environment(&or_default("ADSPEND_ENV", "development"));

    let bind_addr = or_default("ADSPEND_BIND_ADDR", "0.0.0.0:8000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("ADSPEND_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("ADSPEND_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("ADSPEND_DB_MAX_CONNECTIONS", "5")?;
    let db_acquire_timeout_secs = parse_u64("ADSPEND_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    let db_busy_timeout_secs = parse_u64("ADSPEND_DB_BUSY_TIMEOUT_SECS", "5")?;
    let request_timeout_secs = parse_u64("ADSPEND_REQUEST_TIMEOUT_SECS", "30")?;
    let ingest_max_body_bytes =
        parse_usize("ADSPEND_INGEST_MAX_BODY_BYTES", DEFAULT_INGEST_MAX_BODY_BYTES)?;

    Ok(AppConfig {
        db_path: PathBuf::from(db_path),
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_acquire_timeout_secs,
        db_busy_timeout_secs,
        request_timeout_secs,
        ingest_max_body_bytes,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
