//! Read-only client for the sales analytics JSON API.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filters::FilterSelection;
use crate::observability::log_api_request;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("dependency unavailable: {0}")]
    Dependency(String),
}

impl ApiError {
    /// Stable short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Malformed(_) => "malformed",
            Self::Dependency(_) => "dependency",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiCards {
    pub total_sales: Option<f64>,
    pub total_profit: Option<f64>,
    pub total_orders: Option<f64>,
    pub profit_margin: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenuePoint {
    pub period: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySales {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRevenue {
    pub state: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewCharts {
    pub revenue_trend: Vec<RevenuePoint>,
    pub sales_by_category: Vec<CategorySales>,
    pub top_states_revenue: Vec<StateRevenue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewPayload {
    pub cards: KpiCards,
    pub charts: OverviewCharts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRateRow {
    #[serde(rename = "Manager")]
    pub manager: String,
    pub region: String,
    #[serde(rename = "Total_Orders")]
    pub total_orders: f64,
    #[serde(rename = "Returned_Orders")]
    pub returned_orders: f64,
    #[serde(rename = "Return_Rate_Percentage")]
    pub return_rate_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingRow {
    pub ship_mode: String,
    #[serde(rename = "Avg_Shipping_Days")]
    pub avg_shipping_days: f64,
    #[serde(rename = "Late_Percentage")]
    pub late_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomGrowthRow {
    pub order_year_month: String,
    pub monthly_sales: f64,
    /// Absent for the first month of a year.
    #[serde(default)]
    pub growth_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitLoss {
    #[serde(rename = "Total_Gross_Profit")]
    pub total_gross_profit: f64,
    #[serde(rename = "Total_Lost_Money")]
    pub total_lost_money: f64,
    #[serde(rename = "Loss_Percentage_Impact")]
    pub loss_percentage_impact: f64,
    #[serde(rename = "Profit_Percentage_Impact")]
    pub profit_percentage_impact: f64,
}

/// One product's share of total loss or total profit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductShareRow {
    pub product_name: String,
    #[serde(alias = "loss_pct", alias = "profit_pct")]
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRow {
    pub customer_id: String,
    pub customer_name: String,
    pub state: String,
    pub total_sales: f64,
    #[serde(default)]
    pub rn: Option<u32>,
}

#[async_trait]
pub trait AnalyticsApi: Send + Sync + 'static {
    async fn overview(&self, filters: &FilterSelection) -> Result<OverviewPayload, ApiError>;
    async fn return_rate_by_manager(&self) -> Result<Vec<ReturnRateRow>, ApiError>;
    async fn states(&self) -> Result<Vec<String>, ApiError>;
    async fn top_customers(&self, state: &str) -> Result<Vec<CustomerRow>, ApiError>;
    async fn shipping_performance(&self) -> Result<Vec<ShippingRow>, ApiError>;
    async fn mom_growth(&self, year: i32) -> Result<Vec<MomGrowthRow>, ApiError>;
    async fn years(&self) -> Result<Vec<i32>, ApiError>;
    async fn profit_loss(&self) -> Result<Option<ProfitLoss>, ApiError>;
    async fn top_loss_products(&self) -> Result<Vec<ProductShareRow>, ApiError>;
    async fn top_profit_products(&self) -> Result<Vec<ProductShareRow>, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpApiConfig {
    pub base_url: String,
    /// Transport-level timeout; `None` leaves requests unbounded.
    pub timeout_ms: Option<u64>,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: None,
        }
    }
}

#[derive(Clone)]
pub struct HttpAnalyticsApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpAnalyticsApi {
    pub fn new(cfg: &HttpApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&cfg.base_url).map_err(|err| {
            ApiError::Transport(format!("invalid base url {}: {err}", cfg.base_url))
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = cfg.timeout_ms {
            builder = builder.timeout(StdDuration::from_millis(timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path, query)?;
        log_api_request(url.as_str());

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        decode_payload(&body)
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|err| ApiError::Transport(format!("invalid path {path}: {err}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}

pub(crate) fn decode_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::Malformed(err.to_string()))
}

#[derive(Deserialize)]
struct ReturnRateEnvelope {
    return_rate_by_manager: Vec<ReturnRateRow>,
}

#[derive(Deserialize)]
struct StateEntry {
    state: String,
}

#[derive(Deserialize)]
struct StatesEnvelope {
    states: Vec<StateEntry>,
}

#[derive(Deserialize)]
struct CustomersEnvelope {
    top_customers_by_state: Option<Vec<CustomerRow>>,
}

#[derive(Deserialize)]
struct ShippingEnvelope {
    shipping_performance: Vec<ShippingRow>,
}

#[derive(Deserialize)]
struct GrowthEnvelope {
    mom_growth: Vec<MomGrowthRow>,
}

#[derive(Deserialize)]
struct YearEntry {
    year: i32,
}

#[derive(Deserialize)]
struct YearsEnvelope {
    years: Vec<YearEntry>,
}

#[derive(Deserialize)]
struct ProfitLossEnvelope {
    profit_loss: Option<ProfitLoss>,
}

#[derive(Deserialize)]
struct LossProductsEnvelope {
    top_loss_products: Option<Vec<ProductShareRow>>,
}

#[derive(Deserialize)]
struct ProfitProductsEnvelope {
    top_profit_products: Option<Vec<ProductShareRow>>,
}

#[async_trait]
impl AnalyticsApi for HttpAnalyticsApi {
    async fn overview(&self, filters: &FilterSelection) -> Result<OverviewPayload, ApiError> {
        self.get_json("/", &filters.query_pairs()).await
    }

    async fn return_rate_by_manager(&self) -> Result<Vec<ReturnRateRow>, ApiError> {
        let envelope: ReturnRateEnvelope = self.get_json("/insights", &[]).await?;
        Ok(envelope.return_rate_by_manager)
    }

    async fn states(&self) -> Result<Vec<String>, ApiError> {
        let envelope: StatesEnvelope = self.get_json("/insights/states", &[]).await?;
        Ok(envelope.states.into_iter().map(|entry| entry.state).collect())
    }

    async fn top_customers(&self, state: &str) -> Result<Vec<CustomerRow>, ApiError> {
        let envelope: CustomersEnvelope = self
            .get_json("/insights/customers", &[("state", state.to_string())])
            .await?;
        Ok(envelope.top_customers_by_state.unwrap_or_default())
    }

    async fn shipping_performance(&self) -> Result<Vec<ShippingRow>, ApiError> {
        let envelope: ShippingEnvelope = self.get_json("/insights/shipping", &[]).await?;
        Ok(envelope.shipping_performance)
    }

    async fn mom_growth(&self, year: i32) -> Result<Vec<MomGrowthRow>, ApiError> {
        let envelope: GrowthEnvelope = self
            .get_json("/insights/growth", &[("year", year.to_string())])
            .await?;
        Ok(envelope.mom_growth)
    }

    async fn years(&self) -> Result<Vec<i32>, ApiError> {
        let envelope: YearsEnvelope = self.get_json("/insights/years", &[]).await?;
        Ok(envelope.years.into_iter().map(|entry| entry.year).collect())
    }

    async fn profit_loss(&self) -> Result<Option<ProfitLoss>, ApiError> {
        let envelope: ProfitLossEnvelope = self.get_json("/insights/profit-loss", &[]).await?;
        Ok(envelope.profit_loss)
    }

    async fn top_loss_products(&self) -> Result<Vec<ProductShareRow>, ApiError> {
        let envelope: LossProductsEnvelope =
            self.get_json("/insights/top-loss-products", &[]).await?;
        Ok(envelope.top_loss_products.unwrap_or_default())
    }

    async fn top_profit_products(&self) -> Result<Vec<ProductShareRow>, ApiError> {
        let envelope: ProfitProductsEnvelope =
            self.get_json("/insights/top-profit-products", &[]).await?;
        Ok(envelope.top_profit_products.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_rate_rows_decode_api_casing() {
        let body = br#"{"return_rate_by_manager":[{"Manager":"Anna","region":"West","Total_Orders":1611,"Returned_Orders":177,"Return_Rate_Percentage":10.99}]}"#;
        let envelope: ReturnRateEnvelope = decode_payload(body).unwrap();

        assert_eq!(envelope.return_rate_by_manager.len(), 1);
        let row = &envelope.return_rate_by_manager[0];
        assert_eq!(row.manager, "Anna");
        assert_eq!(row.total_orders, 1611.0);
        assert_eq!(row.return_rate_percentage, 10.99);
    }

    #[test]
    fn product_share_accepts_loss_and_profit_keys() {
        let loss: LossProductsEnvelope =
            decode_payload(br#"{"top_loss_products":[{"product_name":"Binder","loss_pct":12.5}]}"#)
                .unwrap();
        let profit: ProfitProductsEnvelope = decode_payload(
            br#"{"top_profit_products":[{"product_name":"Copier","profit_pct":8.25}]}"#,
        )
        .unwrap();

        assert_eq!(loss.top_loss_products.unwrap()[0].share_pct, 12.5);
        assert_eq!(profit.top_profit_products.unwrap()[0].share_pct, 8.25);
    }

    #[test]
    fn missing_payload_key_is_malformed() {
        let err = decode_payload::<YearsEnvelope>(br#"{"year":[]}"#)
            .err()
            .expect("missing key should fail");
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn null_customer_list_decodes_as_none() {
        let envelope: CustomersEnvelope =
            decode_payload(br#"{"top_customers_by_state":null}"#).unwrap();
        assert!(envelope.top_customers_by_state.is_none());
    }

    #[test]
    fn growth_rows_tolerate_missing_first_month_growth() {
        let envelope: GrowthEnvelope = decode_payload(
            br#"{"mom_growth":[{"order_year_month":"2024-01","monthly_sales":100.0,"growth_percentage":null},{"order_year_month":"2024-02","monthly_sales":150.0,"growth_percentage":50.0}]}"#,
        )
        .unwrap();
        assert_eq!(envelope.mom_growth[0].growth_percentage, None);
        assert_eq!(envelope.mom_growth[1].growth_percentage, Some(50.0));
    }

    #[test]
    fn endpoint_appends_query_pairs() {
        let api = HttpAnalyticsApi::new(&HttpApiConfig::default()).unwrap();
        let url = api
            .endpoint("/insights/growth", &[("year", "2024".to_string())])
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/insights/growth?year=2024");

        let bare = api.endpoint("/", &[]).unwrap();
        assert_eq!(bare.as_str(), "http://127.0.0.1:8000/");
    }
}
