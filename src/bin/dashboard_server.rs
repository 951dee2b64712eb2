use std::sync::Arc;

use salesdash::{
    dashboard_config_from_env, dashboard_router, init_logging, log_api_selected, log_app_bind,
    log_app_start, AnalyticsApi, Dashboard, HttpAnalyticsApi,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = dashboard_config_from_env()?;
    init_logging(&cfg.logging)?;
    log_app_start(&cfg.logging);

    let api = HttpAnalyticsApi::new(&cfg.api)?;
    log_api_selected(api.base_url(), cfg.api.timeout_ms);

    let api: Arc<dyn AnalyticsApi> = Arc::new(api);
    let dashboard = Arc::new(Dashboard::new(api, cfg.chart));
    dashboard.mount();

    let app = dashboard_router(dashboard);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    let bound_addr = listener.local_addr()?;

    log_app_bind(bound_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
