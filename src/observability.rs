//! Subscriber setup and the structured events the dashboard emits.
//!
//! Every event carries `component` and `event` fields so JSON output can be
//! filtered without parsing messages.

use std::net::SocketAddr;

use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::ApiError;
use crate::config::{LogFormat, LoggingConfig};
use crate::filters::FilterSelection;

const FALLBACK_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Installs the global subscriber. An unparseable level directive falls back
/// to `info` and is reported once the subscriber is live.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let (env_filter, fell_back) = env_filter_for(&config.level);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.include_target)
        .with_ansi(config.format == LogFormat::Pretty);

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }

    if fell_back {
        warn!(
            component = "dashboard_server",
            event = "logging.level.fallback",
            requested = %config.level,
            effective = FALLBACK_LEVEL
        );
    }
    Ok(())
}

fn env_filter_for(level: &str) -> (EnvFilter, bool) {
    match EnvFilter::try_new(level) {
        Ok(filter) => (filter, false),
        Err(_) => (EnvFilter::new(FALLBACK_LEVEL), true),
    }
}

pub fn log_app_start(config: &LoggingConfig) {
    info!(
        component = "dashboard_server",
        event = "app.start",
        log_level = %config.level,
        log_format = ?config.format,
        include_target = config.include_target
    );
}

pub fn log_app_bind(bound_addr: SocketAddr) {
    info!(
        component = "dashboard_server",
        event = "app.bind",
        bind_addr = %bound_addr,
        route = "/dashboard/snapshot"
    );
}

pub fn log_api_selected(base_url: &str, timeout_ms: Option<u64>) {
    match timeout_ms {
        Some(timeout_ms) => info!(
            component = "dashboard_server",
            event = "api.selected",
            base_url,
            timeout_ms
        ),
        None => info!(
            component = "dashboard_server",
            event = "api.selected",
            base_url,
            timeout = "none"
        ),
    }
}

pub fn log_dashboard_mounted(widget_count: usize) {
    info!(
        component = "dashboard",
        event = "dashboard.mount",
        widget_count
    );
}

pub fn log_fetch_started(widget: &'static str, generation: u64) {
    debug!(
        component = "fetch_controller",
        event = "fetch.start",
        widget,
        generation
    );
}

pub fn log_fetch_succeeded(widget: &'static str, generation: u64) {
    debug!(
        component = "fetch_controller",
        event = "fetch.success",
        widget,
        generation
    );
}

pub fn log_fetch_failed(widget: &'static str, generation: u64, err: &ApiError) {
    warn!(
        component = "fetch_controller",
        event = "fetch.error",
        widget,
        generation,
        error_kind = err.kind(),
        error = %err
    );
}

pub fn log_fetch_discarded(widget: &'static str, ticket_generation: u64, current_generation: u64) {
    debug!(
        component = "fetch_controller",
        event = "fetch.discard.stale",
        widget,
        ticket_generation,
        current_generation
    );
}

pub fn log_filters_applied(selection: &FilterSelection) {
    info!(
        component = "filter_store",
        event = "filters.apply",
        year = ?selection.year,
        region = ?selection.region,
        category = ?selection.category
    );
}

pub fn log_snapshot_request(filters: &FilterSelection) {
    info!(
        component = "dashboard_http",
        event = "http.snapshot.request",
        filters_constrained = !filters.is_unconstrained()
    );
}

pub fn log_api_request(url: &str) {
    debug!(component = "analytics_api", event = "http.request", url);
}
