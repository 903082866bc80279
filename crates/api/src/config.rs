//! Application configuration loaded from environment variables.

use std::str::FromStr;

use domain::{DEFAULT_MAX_PAGE_SIZE, OrderServiceConfig, TransitionPolicy};

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `DATABASE_URL`: PostgreSQL URL; the in-memory store is used when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `DEFAULT_PAGE_SIZE`: page size when a listing gives none (default: `10`)
/// - `MAX_PAGE_SIZE`: larger page sizes are clamped (default: `100`)
/// - `ORDER_TRANSITIONS`: `permissive` or `lifecycle` (default: `permissive`)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub transition_policy: TransitionPolicy,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse_var(&lookup, "LOG_FORMAT").unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_var::<u32>(&lookup, "DATABASE_MAX_CONNECTIONS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.database_max_connections),
            default_page_size: parse_var::<u32>(&lookup, "DEFAULT_PAGE_SIZE")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.default_page_size),
            max_page_size: parse_var::<u32>(&lookup, "MAX_PAGE_SIZE")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_page_size),
            transition_policy: parse_var(&lookup, "ORDER_TRANSITIONS")
                .unwrap_or(defaults.transition_policy),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Order service settings derived from this configuration.
    pub fn service_config(&self) -> OrderServiceConfig {
        OrderServiceConfig {
            transition_policy: self.transition_policy,
            max_page_size: self.max_page_size,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            database_max_connections: 5,
            default_page_size: 10,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            transition_policy: TransitionPolicy::Permissive,
        }
    }
}
