//! Configuration management for the todo server.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default persistence path
pub const DEFAULT_TODO_FILE: &str = "todos.json";

/// Address the server listens on
pub const BIND_ADDR: &str = "localhost:8000";

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info,todo_server=debug";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// JSON document holding the todos (`TODO_FILE`)
    pub todo_file: PathBuf,
    /// Listen address
    pub bind_addr: String,
    /// Tracing filter used when `RUST_LOG` is unset or invalid
    pub log_filter: String,
    /// How long shutdown waits for pending saves
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Loads configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            todo_file: lookup("TODO_FILE")
                .filter(|value| !value.is_empty())
                .map_or_else(|| PathBuf::from(DEFAULT_TODO_FILE), PathBuf::from),
            bind_addr: BIND_ADDR.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.todo_file, PathBuf::from("todos.json"));
        assert_eq!(config.bind_addr, "localhost:8000");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
    }

    #[test]
    fn todo_file_from_environment() {
        let config = Config::from_lookup(|key| {
            (key == "TODO_FILE").then(|| "/tmp/test_todos.json".to_string())
        });
        assert_eq!(config.todo_file, PathBuf::from("/tmp/test_todos.json"));
    }

    #[test]
    fn empty_todo_file_falls_back() {
        let config = Config::from_lookup(|_| Some(String::new()));
        assert_eq!(config.todo_file, PathBuf::from(DEFAULT_TODO_FILE));
    }
}
