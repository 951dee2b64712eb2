//! Dashboard composition and HTTP routes.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::AnalyticsApi;
use crate::config::ChartConfig;
use crate::filters::{FilterError, FilterForm, FilterSelection, FilterStore, FilterSubscriber};
use crate::flip::{FlipCard, FlipState};
use crate::observability::{log_dashboard_mounted, log_snapshot_request};
use crate::shaper::{
    CustomerLine, GrowthPoint, OverviewView, ProductMode, ProfitLossBreakdown, ReturnRateBar,
    ShippingPoint,
};
use crate::widgets::{
    ActionError, InsightView, MomGrowthWidget, OverviewWidget, Panel, ProfitLossWidget,
    ReturnRateWidget, SelectorView, ShippingWidget, TopCustomersWidget, TopProductsView,
    TopProductsWidget, WidgetId,
};

const WIDGET_COUNT: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: String,
    pub filters: FilterSelection,
    pub overview: Panel<OverviewView>,
    pub return_rate: InsightView<Vec<ReturnRateBar>>,
    pub shipping: InsightView<Vec<ShippingPoint>>,
    pub profit_loss: InsightView<ProfitLossBreakdown>,
    pub top_products: TopProductsView,
    pub mom_growth: SelectorView<i32, Vec<GrowthPoint>>,
    pub top_customers: SelectorView<String, Vec<CustomerLine>>,
}

/// Owns the filter store and every widget of one dashboard page.
pub struct Dashboard {
    filters: FilterStore,
    overview: Arc<OverviewWidget>,
    return_rate: ReturnRateWidget,
    shipping: ShippingWidget,
    profit_loss: ProfitLossWidget,
    top_products: TopProductsWidget,
    mom_growth: MomGrowthWidget,
    top_customers: TopCustomersWidget,
}

impl Dashboard {
    pub fn new(api: Arc<dyn AnalyticsApi>, chart: ChartConfig) -> Self {
        let overview = Arc::new(OverviewWidget::new(Arc::clone(&api)));
        let subscriber: Arc<dyn FilterSubscriber> = Arc::clone(&overview) as _;
        let filters = FilterStore::new(subscriber);

        Self {
            filters,
            overview,
            return_rate: ReturnRateWidget::new(Arc::clone(&api)),
            shipping: ShippingWidget::new(Arc::clone(&api)),
            profit_loss: ProfitLossWidget::new(Arc::clone(&api)),
            top_products: TopProductsWidget::new(Arc::clone(&api), chart),
            mom_growth: MomGrowthWidget::new(Arc::clone(&api)),
            top_customers: TopCustomersWidget::new(api),
        }
    }

    /// Starts every widget's initial fetch. Each widget is `Loading` on return.
    pub fn mount(&self) {
        self.overview.refresh(&self.filters.selection());
        self.return_rate.refresh();
        self.shipping.refresh();
        self.profit_loss.refresh();
        self.top_products.refresh();
        self.mom_growth.mount();
        self.top_customers.mount();

        log_dashboard_mounted(WIDGET_COUNT);
    }

    /// Waits until no widget is loading.
    pub async fn settled(&self) {
        self.overview.controller().settled().await;
        self.return_rate.controller().settled().await;
        self.shipping.controller().settled().await;
        self.profit_loss.controller().settled().await;
        self.top_products.controller().settled().await;
        self.mom_growth.fetch().options().settled().await;
        self.mom_growth.fetch().detail().settled().await;
        self.top_customers.fetch().options().settled().await;
        self.top_customers.fetch().detail().settled().await;
    }

    pub fn filters(&self) -> &FilterStore {
        &self.filters
    }

    pub fn apply_filters(&self, selection: FilterSelection) {
        self.filters.apply(selection);
    }

    pub fn clear_filters(&self) {
        self.filters.clear();
    }

    pub fn toggle_flip(&self, widget: WidgetId) -> Result<FlipState, ActionError> {
        Ok(self.flip_card(widget)?.toggle())
    }

    /// "View details": always lands on the back side.
    pub fn show_details(&self, widget: WidgetId) -> Result<FlipState, ActionError> {
        Ok(self.flip_card(widget)?.show_details())
    }

    pub fn show_front(&self, widget: WidgetId) -> Result<FlipState, ActionError> {
        Ok(self.flip_card(widget)?.show_front())
    }

    fn flip_card(&self, widget: WidgetId) -> Result<&FlipCard, ActionError> {
        match widget {
            WidgetId::Overview => Err(ActionError::NotFlippable(widget)),
            WidgetId::ReturnRate => Ok(self.return_rate.flip()),
            WidgetId::Shipping => Ok(self.shipping.flip()),
            WidgetId::ProfitLoss => Ok(self.profit_loss.flip()),
            WidgetId::TopProducts => Ok(self.top_products.flip()),
            WidgetId::MomGrowth => Ok(self.mom_growth.flip()),
            WidgetId::TopCustomers => Ok(self.top_customers.flip()),
        }
    }

    pub fn select_year(&self, year: i32) -> Result<(), ActionError> {
        self.mom_growth.select_year(year).map(drop)
    }

    pub fn select_state(&self, state: impl Into<String>) -> Result<(), ActionError> {
        self.top_customers.select_state(state).map(drop)
    }

    pub fn set_product_mode(&self, mode: ProductMode) {
        self.top_products.set_mode(mode);
    }

    pub fn overview(&self) -> &OverviewWidget {
        &self.overview
    }

    pub fn return_rate(&self) -> &ReturnRateWidget {
        &self.return_rate
    }

    pub fn shipping(&self) -> &ShippingWidget {
        &self.shipping
    }

    pub fn profit_loss(&self) -> &ProfitLossWidget {
        &self.profit_loss
    }

    pub fn top_products(&self) -> &TopProductsWidget {
        &self.top_products
    }

    pub fn mom_growth(&self) -> &MomGrowthWidget {
        &self.mom_growth
    }

    pub fn top_customers(&self) -> &TopCustomersWidget {
        &self.top_customers
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            filters: self.filters.selection(),
            overview: self.overview.panel(),
            return_rate: self.return_rate.view(),
            shipping: self.shipping.view(),
            profit_loss: self.profit_loss.view(),
            top_products: self.top_products.view(),
            mom_growth: self.mom_growth.view(),
            top_customers: self.top_customers.view(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl DashboardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Action(ActionError::UnknownWidget(_)) => StatusCode::NOT_FOUND,
            Self::Action(_) | Self::Filter(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct YearChoice {
    pub year: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateChoice {
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModeChoice {
    pub mode: ProductMode,
}

/// `?side=back|front` pins the card to one side; without it the card toggles.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FlipQuery {
    pub side: Option<FlipState>,
}

#[derive(Debug, Clone, Serialize)]
struct FlipResponse {
    widget: WidgetId,
    flip: FlipState,
}

pub fn dashboard_router(dashboard: Arc<Dashboard>) -> Router {
    Router::new()
        .route("/dashboard/snapshot", get(get_dashboard_snapshot))
        .route(
            "/dashboard/filters",
            post(post_dashboard_filters).delete(delete_dashboard_filters),
        )
        .route("/dashboard/widgets/{widget}/flip", post(post_widget_flip))
        .route("/dashboard/growth/year", post(post_growth_year))
        .route("/dashboard/customers/state", post(post_customers_state))
        .route("/dashboard/products/mode", post(post_products_mode))
        .with_state(DashboardAppState { dashboard })
}

#[derive(Clone)]
struct DashboardAppState {
    dashboard: Arc<Dashboard>,
}

async fn get_dashboard_snapshot(State(state): State<DashboardAppState>) -> impl IntoResponse {
    let snapshot = state.dashboard.snapshot();
    log_snapshot_request(&snapshot.filters);
    Json(snapshot)
}

async fn post_dashboard_filters(
    State(state): State<DashboardAppState>,
    Json(form): Json<FilterForm>,
) -> Result<Json<DashboardSnapshot>, DashboardError> {
    let selection = form.into_selection()?;
    state.dashboard.apply_filters(selection);
    Ok(Json(state.dashboard.snapshot()))
}

async fn delete_dashboard_filters(State(state): State<DashboardAppState>) -> impl IntoResponse {
    state.dashboard.clear_filters();
    Json(state.dashboard.snapshot())
}

async fn post_widget_flip(
    State(state): State<DashboardAppState>,
    Path(widget): Path<String>,
    Query(query): Query<FlipQuery>,
) -> Result<Json<FlipResponse>, DashboardError> {
    let widget = widget.parse::<WidgetId>()?;
    let flip = match query.side {
        Some(FlipState::Back) => state.dashboard.show_details(widget)?,
        Some(FlipState::Front) => state.dashboard.show_front(widget)?,
        None => state.dashboard.toggle_flip(widget)?,
    };
    Ok(Json(FlipResponse { widget, flip }))
}

async fn post_growth_year(
    State(state): State<DashboardAppState>,
    Json(choice): Json<YearChoice>,
) -> Result<Json<DashboardSnapshot>, DashboardError> {
    state.dashboard.select_year(choice.year)?;
    Ok(Json(state.dashboard.snapshot()))
}

async fn post_customers_state(
    State(state): State<DashboardAppState>,
    Json(choice): Json<StateChoice>,
) -> Result<Json<DashboardSnapshot>, DashboardError> {
    state.dashboard.select_state(choice.state)?;
    Ok(Json(state.dashboard.snapshot()))
}

async fn post_products_mode(
    State(state): State<DashboardAppState>,
    Json(choice): Json<ModeChoice>,
) -> impl IntoResponse {
    state.dashboard.set_product_mode(choice.mode);
    Json(state.dashboard.snapshot())
}
