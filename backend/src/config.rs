//! Application configuration loaded from the environment.

use std::env;

use crate::error::{AppError, Result};

/// Default page size for task and submission listings.
pub const DEFAULT_LIST_LIMIT: i64 = 20;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_address: String,
    pub jwt_secret: String,
    /// One of `filesystem`, `memory`, `s3`.
    pub storage_backend: String,
    pub storage_path: String,
    pub s3_bucket: Option<String>,
    pub task_list_limit: i64,
    pub max_upload_bytes: usize,
    /// Reject every write request when set.
    pub read_only: bool,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let storage_backend = env_or("STORAGE_BACKEND", "filesystem").to_lowercase();
        let s3_bucket = env::var("S3_BUCKET").ok().filter(|v| !v.is_empty());

        if !matches!(storage_backend.as_str(), "filesystem" | "memory" | "s3") {
            return Err(AppError::Config(format!(
                "Unsupported STORAGE_BACKEND '{}'",
                storage_backend
            )));
        }
        if storage_backend == "s3" && s3_bucket.is_none() {
            return Err(AppError::Config(
                "S3_BUCKET is required when STORAGE_BACKEND=s3".to_string(),
            ));
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            bind_address: env_or("BIND_ADDRESS", "0.0.0.0:8080"),
            jwt_secret: required("JWT_SECRET")?,
            storage_backend,
            storage_path: env_or("STORAGE_PATH", "./data/storage"),
            s3_bucket,
            task_list_limit: parse_or("TASK_LIST_LIMIT", DEFAULT_LIST_LIMIT)?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            read_only: parse_bool(&env_or("READ_ONLY", "false")),
            log_format: match env_or("LOG_FORMAT", "pretty").to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("{} must be set", key)))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value '{}'", key, raw))),
        _ => Ok(default),
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_variants() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(parse_bool("yes"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("nope"));
    }

    #[test]
    fn test_parse_or_uses_default_for_missing_key() {
        let value: i64 = parse_or("JOURNAL_DESK_TEST_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }
}
