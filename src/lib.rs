//! Sales analytics dashboard orchestration.
//!
//! Widgets fetch from a remote analytics API, track their own
//! loading/success/error lifecycle with newest-trigger-wins ordering, and
//! project the results into chart-ready view models. A shared filter store
//! drives the overview widget; insight widgets carry a front/back flip state
//! and local selectors.

mod api;
mod config;
mod dashboard;
mod fetch;
mod filters;
mod flip;
mod format;
mod observability;
mod shaper;
mod widgets;

pub use api::{
    AnalyticsApi, ApiError, CategorySales, CustomerRow, HttpAnalyticsApi, HttpApiConfig,
    KpiCards, MomGrowthRow, OverviewCharts, OverviewPayload, ProductShareRow, ProfitLoss,
    ReturnRateRow, RevenuePoint, ShippingRow, StateRevenue,
};
pub use config::{
    dashboard_config_from_env, ChartConfig, ConfigError, DashboardConfig, LogFormat, LoggingConfig,
};
pub use dashboard::{
    dashboard_router, Dashboard, DashboardError, DashboardSnapshot, FlipQuery, ModeChoice,
    StateChoice, YearChoice,
};
pub use fetch::{FetchController, FetchState, FetchTicket};
pub use filters::{
    FilterError, FilterForm, FilterSelection, FilterStore, FilterSubscriber, YearField,
};
pub use flip::{FlipCard, FlipState};
pub use format::{
    format_compact, format_currency_compact, format_js_number, format_percent, format_usd_whole,
};
pub use observability::{
    init_logging, log_api_selected, log_app_bind, log_app_start, LoggingInitError,
};
pub use shaper::{
    rank_and_color, reverse_for_ranked_layout, shape_customers, shape_kpi_cards,
    shape_mom_growth, shape_overview, shape_profit_loss, shape_return_rates, shape_shipping,
    shape_top_products, truncate_label, CategorySlice, CustomerLine, GrowthPoint, KpiCard,
    OverviewView, PieSlice, ProductBar, ProductChart, ProductMode, ProfitLossBreakdown,
    RankedRow, ReturnRateBar, ShippingPoint, StateBar, Tone, Tooltip, TrendPoint, BASE_COLOR,
    CATEGORY_PALETTE, DEFAULT_LABEL_BUDGET, DEFAULT_TOP_N, HIGHLIGHT_COLOR, LOSS_COLOR,
    PROFIT_COLOR,
};
pub use widgets::{
    ActionError, DependentFetch, InsightView, MomGrowthWidget, OverviewWidget, Panel,
    ProductLists, ProfitLossWidget, ReturnRateWidget, SelectorState, SelectorView,
    ShippingWidget, TopCustomersWidget, TopProductsView, TopProductsWidget, WidgetId,
};
