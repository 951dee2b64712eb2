//! Environment-driven runtime configuration.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use crate::api::HttpApiConfig;
use crate::shaper::{DEFAULT_LABEL_BUDGET, DEFAULT_TOP_N};

pub const DEFAULT_DASHBOARD_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartConfig {
    pub label_budget: usize,
    pub top_n: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            label_budget: DEFAULT_LABEL_BUDGET,
            top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `salesdash=debug,info`.
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub api: HttpApiConfig,
    pub chart: ChartConfig,
    pub logging: LoggingConfig,
    pub bind_addr: SocketAddr,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid SALESDASH_DASHBOARD_ADDR {raw:?}: {source}")]
    InvalidBindAddr {
        raw: String,
        source: std::net::AddrParseError,
    },
}

/// Reads `SALESDASH_*` variables. Unparseable numbers fall back to defaults;
/// only a bad bind address is an error.
pub fn dashboard_config_from_env() -> Result<DashboardConfig, ConfigError> {
    let mut api = HttpApiConfig::default();
    if let Some(base_url) = non_empty_var("SALESDASH_API_BASE_URL") {
        api.base_url = base_url;
    }
    api.timeout_ms = non_empty_var("SALESDASH_HTTP_TIMEOUT_MS")
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|ms| *ms > 0);

    let mut chart = ChartConfig::default();
    if let Some(budget) = positive_usize_var("SALESDASH_LABEL_BUDGET") {
        chart.label_budget = budget;
    }
    if let Some(top_n) = positive_usize_var("SALESDASH_TOP_N") {
        chart.top_n = top_n;
    }

    let raw_addr = non_empty_var("SALESDASH_DASHBOARD_ADDR")
        .unwrap_or_else(|| DEFAULT_DASHBOARD_ADDR.to_string());
    let bind_addr = raw_addr
        .parse::<SocketAddr>()
        .map_err(|source| ConfigError::InvalidBindAddr {
            raw: raw_addr.clone(),
            source,
        })?;

    Ok(DashboardConfig {
        api,
        chart,
        logging: logging_from_env(),
        bind_addr,
    })
}

fn logging_from_env() -> LoggingConfig {
    let mut logging = LoggingConfig::default();
    if let Some(level) = non_empty_var("SALESDASH_LOG_LEVEL") {
        logging.level = level;
    }
    if let Some(format) = non_empty_var("SALESDASH_LOG_FORMAT").and_then(parse_log_format) {
        logging.format = format;
    }
    if let Some(include_target) = flag_var("SALESDASH_LOG_TARGET") {
        logging.include_target = include_target;
    }
    logging
}

fn parse_log_format(raw: String) -> Option<LogFormat> {
    match raw.to_ascii_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" => Some(LogFormat::Pretty),
        _ => None,
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn flag_var(key: &str) -> Option<bool> {
    match non_empty_var(key)?.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn positive_usize_var(key: &str) -> Option<usize> {
    non_empty_var(key)
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|value| *value > 0)
}
