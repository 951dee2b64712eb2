#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use salesdash::{
    AnalyticsApi, ApiError, CategorySales, CustomerRow, FilterSelection, KpiCards, MomGrowthRow,
    OverviewCharts, OverviewPayload, ProductShareRow, ProfitLoss, ReturnRateRow, RevenuePoint,
    ShippingRow, StateRevenue,
};

/// Canned analytics backend with a call log, per-label failures and delays.
///
/// Labels: `overview`, `return_rate`, `states`, `customers:{state}`,
/// `shipping`, `growth:{year}`, `years`, `profit_loss`, `top_loss`,
/// `top_profit`.
#[derive(Default)]
pub struct FakeApi {
    pub data: Mutex<FakeData>,
    calls: Mutex<Vec<String>>,
    overview_requests: Mutex<Vec<FilterSelection>>,
    failing: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeData {
    pub overview: Option<OverviewPayload>,
    pub return_rates: Vec<ReturnRateRow>,
    pub states: Vec<String>,
    pub customers: HashMap<String, Vec<CustomerRow>>,
    pub shipping: Vec<ShippingRow>,
    pub years: Vec<i32>,
    pub growth: HashMap<i32, Vec<MomGrowthRow>>,
    pub profit_loss: Option<ProfitLoss>,
    pub top_loss: Vec<ProductShareRow>,
    pub top_profit: Vec<ProductShareRow>,
}

impl FakeApi {
    pub fn new(data: FakeData) -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(data),
            ..Self::default()
        })
    }

    pub fn populated() -> Arc<Self> {
        Self::new(sample_data())
    }

    pub fn fail(&self, label: &str) {
        self.failing.lock().unwrap().insert(label.to_string());
    }

    pub fn delay(&self, label: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(label.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, label: &str) -> usize {
        self.calls().iter().filter(|call| *call == label).count()
    }

    pub fn overview_requests(&self) -> Vec<FilterSelection> {
        self.overview_requests.lock().unwrap().clone()
    }

    async fn enter(&self, label: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(label.clone());
        let delay = self.delays.lock().unwrap().get(&label).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(&label) {
            return Err(ApiError::Status {
                status: 500,
                url: format!("http://fake/{label}"),
            });
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&FakeData) -> T) -> T {
        f(&self.data.lock().unwrap())
    }
}

#[async_trait]
impl AnalyticsApi for FakeApi {
    async fn overview(&self, filters: &FilterSelection) -> Result<OverviewPayload, ApiError> {
        self.overview_requests.lock().unwrap().push(filters.clone());
        self.enter("overview".to_string()).await?;
        self.read(|data| data.overview.clone())
            .ok_or_else(|| ApiError::Malformed("missing field `cards`".to_string()))
    }

    async fn return_rate_by_manager(&self) -> Result<Vec<ReturnRateRow>, ApiError> {
        self.enter("return_rate".to_string()).await?;
        Ok(self.read(|data| data.return_rates.clone()))
    }

    async fn states(&self) -> Result<Vec<String>, ApiError> {
        self.enter("states".to_string()).await?;
        Ok(self.read(|data| data.states.clone()))
    }

    async fn top_customers(&self, state: &str) -> Result<Vec<CustomerRow>, ApiError> {
        self.enter(format!("customers:{state}")).await?;
        Ok(self.read(|data| data.customers.get(state).cloned().unwrap_or_default()))
    }

    async fn shipping_performance(&self) -> Result<Vec<ShippingRow>, ApiError> {
        self.enter("shipping".to_string()).await?;
        Ok(self.read(|data| data.shipping.clone()))
    }

    async fn mom_growth(&self, year: i32) -> Result<Vec<MomGrowthRow>, ApiError> {
        self.enter(format!("growth:{year}")).await?;
        Ok(self.read(|data| data.growth.get(&year).cloned().unwrap_or_default()))
    }

    async fn years(&self) -> Result<Vec<i32>, ApiError> {
        self.enter("years".to_string()).await?;
        Ok(self.read(|data| data.years.clone()))
    }

    async fn profit_loss(&self) -> Result<Option<ProfitLoss>, ApiError> {
        self.enter("profit_loss".to_string()).await?;
        Ok(self.read(|data| data.profit_loss.clone()))
    }

    async fn top_loss_products(&self) -> Result<Vec<ProductShareRow>, ApiError> {
        self.enter("top_loss".to_string()).await?;
        Ok(self.read(|data| data.top_loss.clone()))
    }

    async fn top_profit_products(&self) -> Result<Vec<ProductShareRow>, ApiError> {
        self.enter("top_profit".to_string()).await?;
        Ok(self.read(|data| data.top_profit.clone()))
    }
}

pub fn growth_row(month: &str, sales: f64, growth: Option<f64>) -> MomGrowthRow {
    MomGrowthRow {
        order_year_month: month.to_string(),
        monthly_sales: sales,
        growth_percentage: growth,
    }
}

pub fn customer(id: &str, name: &str, state: &str, sales: f64, rn: u32) -> CustomerRow {
    CustomerRow {
        customer_id: id.to_string(),
        customer_name: name.to_string(),
        state: state.to_string(),
        total_sales: sales,
        rn: Some(rn),
    }
}

pub fn product(name: &str, share: f64) -> ProductShareRow {
    ProductShareRow {
        product_name: name.to_string(),
        share_pct: share,
    }
}

pub fn sample_overview() -> OverviewPayload {
    OverviewPayload {
        cards: KpiCards {
            total_sales: Some(2_297_200.86),
            total_profit: Some(286_397.02),
            total_orders: Some(5009.0),
            profit_margin: Some(12.47),
        },
        charts: OverviewCharts {
            revenue_trend: vec![
                RevenuePoint {
                    period: "2024-01".to_string(),
                    revenue: 94_924.84,
                },
                RevenuePoint {
                    period: "2024-02".to_string(),
                    revenue: 59_751.25,
                },
            ],
            sales_by_category: vec![
                CategorySales {
                    name: "Technology".to_string(),
                    value: 836_154.03,
                },
                CategorySales {
                    name: "Furniture".to_string(),
                    value: 741_999.8,
                },
            ],
            top_states_revenue: vec![StateRevenue {
                state: "California".to_string(),
                revenue: 457_687.63,
            }],
        },
    }
}

pub fn sample_data() -> FakeData {
    let mut customers = HashMap::new();
    customers.insert(
        "California".to_string(),
        vec![
            customer("TC-20980", "Tamara Chand", "California", 19_052.22, 1),
            customer("RB-19360", "Raymond Buch", "California", 15_117.34, 2),
        ],
    );
    customers.insert(
        "Texas".to_string(),
        vec![customer("SE-20110", "Sanjit Engle", "Texas", 12_209.44, 1)],
    );

    let mut growth = HashMap::new();
    growth.insert(
        2024,
        vec![
            growth_row("2024-01", 94_924.84, None),
            growth_row("2024-02", 59_751.25, Some(-37.05)),
        ],
    );
    growth.insert(2023, vec![growth_row("2023-01", 43_971.37, None)]);

    FakeData {
        overview: Some(sample_overview()),
        return_rates: vec![
            ReturnRateRow {
                manager: "Chuck".to_string(),
                region: "East".to_string(),
                total_orders: 1401.0,
                returned_orders: 110.0,
                return_rate_percentage: 7.85,
            },
            ReturnRateRow {
                manager: "Anna".to_string(),
                region: "West".to_string(),
                total_orders: 1611.0,
                returned_orders: 177.0,
                return_rate_percentage: 10.99,
            },
        ],
        states: vec!["California".to_string(), "Texas".to_string()],
        customers,
        shipping: vec![ShippingRow {
            ship_mode: "Standard Class".to_string(),
            avg_shipping_days: 5.0,
            late_percentage: 38.2,
        }],
        years: vec![2024, 2023],
        growth,
        profit_loss: Some(ProfitLoss {
            total_gross_profit: 1000.0,
            total_lost_money: 300.0,
            loss_percentage_impact: 23.08,
            profit_percentage_impact: 76.92,
        }),
        top_loss: vec![
            product("Cubify CubeX 3D Printer Triple Head Print", 25.0),
            product("Lexmark MX611dhe", 9.5),
        ],
        top_profit: vec![product("Canon imageCLASS 2200 Advanced Copier", 31.0)],
    }
}
