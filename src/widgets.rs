//! Dashboard panels: each one owns its fetch lifecycle, flip state and
//! local selectors, and projects them into a view model.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::api::{
    AnalyticsApi, ApiError, CustomerRow, MomGrowthRow, OverviewPayload, ProductShareRow,
    ProfitLoss, ReturnRateRow, ShippingRow,
};
use crate::config::ChartConfig;
use crate::fetch::{FetchController, FetchState};
use crate::filters::{FilterSelection, FilterSubscriber};
use crate::flip::{FlipCard, FlipState};
use crate::shaper::{
    shape_customers, shape_mom_growth, shape_overview, shape_profit_loss, shape_return_rates,
    shape_shipping, shape_top_products, CustomerLine, GrowthPoint, OverviewView, ProductChart,
    ProductMode, ProfitLossBreakdown, ReturnRateBar, ShippingPoint,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetId {
    Overview,
    ReturnRate,
    Shipping,
    ProfitLoss,
    TopProducts,
    MomGrowth,
    TopCustomers,
}

impl WidgetId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::ReturnRate => "return_rate",
            Self::Shipping => "shipping",
            Self::ProfitLoss => "profit_loss",
            Self::TopProducts => "top_products",
            Self::MomGrowth => "mom_growth",
            Self::TopCustomers => "top_customers",
        }
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetId {
    type Err = ActionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "overview" => Ok(Self::Overview),
            "return_rate" => Ok(Self::ReturnRate),
            "shipping" => Ok(Self::Shipping),
            "profit_loss" => Ok(Self::ProfitLoss),
            "top_products" => Ok(Self::TopProducts),
            "mom_growth" => Ok(Self::MomGrowth),
            "top_customers" => Ok(Self::TopCustomers),
            _ => Err(ActionError::UnknownWidget(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown widget: {0}")]
    UnknownWidget(String),
    #[error("widget {0} has no flip side")]
    NotFlippable(WidgetId),
    #[error("{value} is not one of the available options")]
    UnknownOption { value: String },
}

/// What the view renders for one widget.
///
/// Errors and empty results both collapse into `NoData`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Panel<V> {
    Loading,
    NoData,
    Ready(V),
}

impl<V> Panel<V> {
    pub fn from_state<T>(state: &FetchState<T>, shape: impl FnOnce(&T) -> Option<V>) -> Self {
        match state {
            FetchState::Idle | FetchState::Loading => Self::Loading,
            FetchState::Error(_) => Self::NoData,
            FetchState::Success(data) => shape(data).map_or(Self::NoData, Self::Ready),
        }
    }

    pub fn ready(&self) -> Option<&V> {
        match self {
            Self::Ready(view) => Some(view),
            _ => None,
        }
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightView<V> {
    pub widget: WidgetId,
    pub flip: FlipState,
    pub panel: Panel<V>,
}

/// Option list plus the current choice; defaults to the first option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorState<K> {
    pub options: Vec<K>,
    pub selected: Option<K>,
}

impl<K> Default for SelectorState<K> {
    fn default() -> Self {
        Self {
            options: Vec::new(),
            selected: None,
        }
    }
}

impl<K: Clone + PartialEq> SelectorState<K> {
    pub fn with_options(options: Vec<K>) -> Self {
        let selected = options.first().cloned();
        Self { options, selected }
    }

    pub fn select(&mut self, value: K) -> bool {
        if !self.options.contains(&value) {
            return false;
        }
        self.selected = Some(value);
        true
    }
}

/// Option list fetch followed by a detail fetch keyed on the selected option.
pub struct DependentFetch<K, T> {
    options: FetchController<Vec<K>>,
    detail: FetchController<T>,
    selector: Arc<Mutex<SelectorState<K>>>,
}

impl<K, T> Clone for DependentFetch<K, T> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            detail: self.detail.clone(),
            selector: Arc::clone(&self.selector),
        }
    }
}

impl<K, T> DependentFetch<K, T>
where
    K: Clone + PartialEq + fmt::Display + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(widget: &'static str) -> Self {
        Self {
            options: FetchController::new(widget),
            detail: FetchController::new(widget),
            selector: Arc::new(Mutex::new(SelectorState::default())),
        }
    }

    pub fn options(&self) -> &FetchController<Vec<K>> {
        &self.options
    }

    pub fn detail(&self) -> &FetchController<T> {
        &self.detail
    }

    pub fn selector(&self) -> SelectorState<K> {
        self.lock_selector().clone()
    }

    /// Both controllers enter `Loading` before this returns. The detail
    /// request waits for a non-empty option list and uses its first entry.
    pub fn mount<O, D, DF>(&self, load_options: O, load_detail: D) -> JoinHandle<()>
    where
        O: Future<Output = Result<Vec<K>, ApiError>> + Send + 'static,
        D: FnOnce(K) -> DF + Send + 'static,
        DF: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let options_ticket = self.options.begin();
        let detail_ticket = self.detail.begin();
        let this = self.clone();

        tokio::spawn(async move {
            let keys = match load_options.await {
                Ok(keys) => keys,
                Err(err) => {
                    let reason = format!("option list unavailable: {err}");
                    this.options.resolve(options_ticket, Err(err));
                    this.detail
                        .resolve(detail_ticket, Err(ApiError::Dependency(reason)));
                    return;
                }
            };

            if !this.options.is_current(options_ticket) {
                return;
            }
            let first = {
                let mut selector = this.lock_selector();
                *selector = SelectorState::with_options(keys.clone());
                selector.selected.clone()
            };
            this.options.resolve(options_ticket, Ok(keys));

            let Some(first) = first else {
                let empty = ApiError::Dependency("option list is empty".to_string());
                this.detail.resolve(detail_ticket, Err(empty));
                return;
            };

            if !this.detail.is_current(detail_ticket) {
                return;
            }
            let result = load_detail(first).await;
            this.detail.resolve(detail_ticket, result);
        })
    }

    /// Switches the selection and re-fetches the detail for it.
    pub fn select<DF>(&self, value: K, load_detail: DF) -> Result<JoinHandle<bool>, ActionError>
    where
        DF: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let accepted = self.lock_selector().select(value.clone());
        if !accepted {
            return Err(ActionError::UnknownOption {
                value: value.to_string(),
            });
        }
        Ok(self.detail.spawn(load_detail))
    }

    fn lock_selector(&self) -> MutexGuard<'_, SelectorState<K>> {
        self.selector
            .lock()
            .expect("selector lock should not be poisoned")
    }
}

#[derive(Clone)]
pub struct OverviewWidget {
    api: Arc<dyn AnalyticsApi>,
    controller: FetchController<OverviewPayload>,
    last_request: Arc<Mutex<Option<FilterSelection>>>,
}

impl OverviewWidget {
    pub fn new(api: Arc<dyn AnalyticsApi>) -> Self {
        Self {
            api,
            controller: FetchController::new(WidgetId::Overview.as_str()),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    pub fn controller(&self) -> &FetchController<OverviewPayload> {
        &self.controller
    }

    /// Selection used by the most recently issued request.
    pub fn last_request(&self) -> Option<FilterSelection> {
        self.last_request
            .lock()
            .expect("overview request lock should not be poisoned")
            .clone()
    }

    pub fn refresh(&self, filters: &FilterSelection) -> JoinHandle<bool> {
        *self
            .last_request
            .lock()
            .expect("overview request lock should not be poisoned") = Some(filters.clone());

        let api = Arc::clone(&self.api);
        let filters = filters.clone();
        self.controller
            .spawn(async move { api.overview(&filters).await })
    }

    pub fn panel(&self) -> Panel<OverviewView> {
        Panel::from_state(&self.controller.state(), |payload| {
            Some(shape_overview(payload))
        })
    }
}

impl FilterSubscriber for OverviewWidget {
    fn on_filters_changed(&self, selection: &FilterSelection) {
        self.refresh(selection);
    }
}

#[derive(Clone)]
pub struct ReturnRateWidget {
    api: Arc<dyn AnalyticsApi>,
    controller: FetchController<Vec<ReturnRateRow>>,
    flip: FlipCard,
}

impl ReturnRateWidget {
    pub fn new(api: Arc<dyn AnalyticsApi>) -> Self {
        Self {
            api,
            controller: FetchController::new(WidgetId::ReturnRate.as_str()),
            flip: FlipCard::new(),
        }
    }

    pub fn controller(&self) -> &FetchController<Vec<ReturnRateRow>> {
        &self.controller
    }

    pub fn flip(&self) -> &FlipCard {
        &self.flip
    }

    pub fn refresh(&self) -> JoinHandle<bool> {
        let api = Arc::clone(&self.api);
        self.controller
            .spawn(async move { api.return_rate_by_manager().await })
    }

    pub fn view(&self) -> InsightView<Vec<ReturnRateBar>> {
        InsightView {
            widget: WidgetId::ReturnRate,
            flip: self.flip.state(),
            panel: Panel::from_state(&self.controller.state(), |rows| {
                non_empty(shape_return_rates(rows))
            }),
        }
    }
}

#[derive(Clone)]
pub struct ShippingWidget {
    api: Arc<dyn AnalyticsApi>,
    controller: FetchController<Vec<ShippingRow>>,
    flip: FlipCard,
}

impl ShippingWidget {
    pub fn new(api: Arc<dyn AnalyticsApi>) -> Self {
        Self {
            api,
            controller: FetchController::new(WidgetId::Shipping.as_str()),
            flip: FlipCard::new(),
        }
    }

    pub fn controller(&self) -> &FetchController<Vec<ShippingRow>> {
        &self.controller
    }

    pub fn flip(&self) -> &FlipCard {
        &self.flip
    }

    pub fn refresh(&self) -> JoinHandle<bool> {
        let api = Arc::clone(&self.api);
        self.controller
            .spawn(async move { api.shipping_performance().await })
    }

    pub fn view(&self) -> InsightView<Vec<ShippingPoint>> {
        InsightView {
            widget: WidgetId::Shipping,
            flip: self.flip.state(),
            panel: Panel::from_state(&self.controller.state(), |rows| {
                non_empty(shape_shipping(rows))
            }),
        }
    }
}

#[derive(Clone)]
pub struct ProfitLossWidget {
    api: Arc<dyn AnalyticsApi>,
    controller: FetchController<Option<ProfitLoss>>,
    flip: FlipCard,
}

impl ProfitLossWidget {
    pub fn new(api: Arc<dyn AnalyticsApi>) -> Self {
        Self {
            api,
            controller: FetchController::new(WidgetId::ProfitLoss.as_str()),
            flip: FlipCard::new(),
        }
    }

    pub fn controller(&self) -> &FetchController<Option<ProfitLoss>> {
        &self.controller
    }

    pub fn flip(&self) -> &FlipCard {
        &self.flip
    }

    pub fn refresh(&self) -> JoinHandle<bool> {
        let api = Arc::clone(&self.api);
        self.controller.spawn(async move { api.profit_loss().await })
    }

    pub fn view(&self) -> InsightView<ProfitLossBreakdown> {
        InsightView {
            widget: WidgetId::ProfitLoss,
            flip: self.flip.state(),
            panel: Panel::from_state(&self.controller.state(), |data| {
                data.as_ref().map(shape_profit_loss)
            }),
        }
    }
}

pub type ProductLists = (Vec<ProductShareRow>, Vec<ProductShareRow>);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopProductsView {
    pub widget: WidgetId,
    pub flip: FlipState,
    pub mode: ProductMode,
    pub panel: Panel<ProductChart>,
}

/// Loss and profit rankings fetched together; the mode toggle only re-shapes.
#[derive(Clone)]
pub struct TopProductsWidget {
    api: Arc<dyn AnalyticsApi>,
    controller: FetchController<ProductLists>,
    mode: Arc<Mutex<ProductMode>>,
    flip: FlipCard,
    chart: ChartConfig,
}

impl TopProductsWidget {
    pub fn new(api: Arc<dyn AnalyticsApi>, chart: ChartConfig) -> Self {
        Self {
            api,
            controller: FetchController::new(WidgetId::TopProducts.as_str()),
            mode: Arc::new(Mutex::new(ProductMode::default())),
            flip: FlipCard::new(),
            chart,
        }
    }

    pub fn controller(&self) -> &FetchController<ProductLists> {
        &self.controller
    }

    pub fn flip(&self) -> &FlipCard {
        &self.flip
    }

    pub fn mode(&self) -> ProductMode {
        *self.lock_mode()
    }

    pub fn set_mode(&self, mode: ProductMode) {
        *self.lock_mode() = mode;
    }

    /// Both lists must arrive; either failure fails the pair.
    pub fn refresh(&self) -> JoinHandle<bool> {
        let api = Arc::clone(&self.api);
        self.controller.spawn(async move {
            tokio::try_join!(api.top_loss_products(), api.top_profit_products())
        })
    }

    pub fn view(&self) -> TopProductsView {
        let mode = self.mode();
        let chart = self.chart;
        TopProductsView {
            widget: WidgetId::TopProducts,
            flip: self.flip.state(),
            mode,
            panel: Panel::from_state(&self.controller.state(), |(loss, profit)| {
                let rows = match mode {
                    ProductMode::Loss => loss,
                    ProductMode::Profit => profit,
                };
                (!rows.is_empty()).then(|| {
                    shape_top_products(rows, mode, chart.top_n, chart.label_budget)
                })
            }),
        }
    }

    fn lock_mode(&self) -> MutexGuard<'_, ProductMode> {
        self.mode
            .lock()
            .expect("product mode lock should not be poisoned")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorView<K, V> {
    pub widget: WidgetId,
    pub flip: FlipState,
    pub selector: SelectorState<K>,
    pub panel: Panel<V>,
}

/// Month-over-month growth for a year chosen from the available years.
#[derive(Clone)]
pub struct MomGrowthWidget {
    api: Arc<dyn AnalyticsApi>,
    fetch: DependentFetch<i32, Vec<MomGrowthRow>>,
    flip: FlipCard,
}

impl MomGrowthWidget {
    pub fn new(api: Arc<dyn AnalyticsApi>) -> Self {
        Self {
            api,
            fetch: DependentFetch::new(WidgetId::MomGrowth.as_str()),
            flip: FlipCard::new(),
        }
    }

    pub fn fetch(&self) -> &DependentFetch<i32, Vec<MomGrowthRow>> {
        &self.fetch
    }

    pub fn flip(&self) -> &FlipCard {
        &self.flip
    }

    pub fn mount(&self) -> JoinHandle<()> {
        let years_api = Arc::clone(&self.api);
        let growth_api = Arc::clone(&self.api);
        self.fetch.mount(async move { years_api.years().await }, move |year| async move {
            growth_api.mom_growth(year).await
        })
    }

    pub fn select_year(&self, year: i32) -> Result<JoinHandle<bool>, ActionError> {
        let api = Arc::clone(&self.api);
        self.fetch
            .select(year, async move { api.mom_growth(year).await })
    }

    pub fn view(&self) -> SelectorView<i32, Vec<GrowthPoint>> {
        SelectorView {
            widget: WidgetId::MomGrowth,
            flip: self.flip.state(),
            selector: self.fetch.selector(),
            panel: Panel::from_state(&self.fetch.detail().state(), |rows| {
                non_empty(shape_mom_growth(rows))
            }),
        }
    }
}

/// Top customers for a state chosen from the available states.
#[derive(Clone)]
pub struct TopCustomersWidget {
    api: Arc<dyn AnalyticsApi>,
    fetch: DependentFetch<String, Vec<CustomerRow>>,
    flip: FlipCard,
}

impl TopCustomersWidget {
    pub fn new(api: Arc<dyn AnalyticsApi>) -> Self {
        Self {
            api,
            fetch: DependentFetch::new(WidgetId::TopCustomers.as_str()),
            flip: FlipCard::new(),
        }
    }

    pub fn fetch(&self) -> &DependentFetch<String, Vec<CustomerRow>> {
        &self.fetch
    }

    pub fn flip(&self) -> &FlipCard {
        &self.flip
    }

    pub fn mount(&self) -> JoinHandle<()> {
        let states_api = Arc::clone(&self.api);
        let customers_api = Arc::clone(&self.api);
        self.fetch.mount(async move { states_api.states().await }, move |state| async move {
            customers_api.top_customers(&state).await
        })
    }

    pub fn select_state(&self, state: impl Into<String>) -> Result<JoinHandle<bool>, ActionError> {
        let state = state.into();
        let api = Arc::clone(&self.api);
        let requested = state.clone();
        self.fetch
            .select(state, async move { api.top_customers(&requested).await })
    }

    pub fn view(&self) -> SelectorView<String, Vec<CustomerLine>> {
        SelectorView {
            widget: WidgetId::TopCustomers,
            flip: self.flip.state(),
            selector: self.fetch.selector(),
            panel: Panel::from_state(&self.fetch.detail().state(), |rows| {
                non_empty(shape_customers(rows))
            }),
        }
    }
}
