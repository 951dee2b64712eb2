//! Pure transforms from raw API rows to chart-ready series.
//!
//! Nothing here performs I/O or keeps state; the same input always shapes to
//! the same output.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{
    CustomerRow, KpiCards, MomGrowthRow, OverviewPayload, ProductShareRow, ProfitLoss,
    ReturnRateRow, ShippingRow,
};
use crate::format::{
    format_compact, format_currency_compact, format_js_number, format_percent, format_usd_whole,
};

pub const HIGHLIGHT_COLOR: &str = "#ef4444";
pub const BASE_COLOR: &str = "#3b82f6";
pub const PROFIT_COLOR: &str = "#06b6d4";
pub const LOSS_COLOR: &str = "#f43f5e";
pub const CATEGORY_PALETTE: [&str; 3] = ["#818cf8", "#34d399", "#fbbf24"];

pub const DEFAULT_LABEL_BUDGET: usize = 18;
pub const DEFAULT_TOP_N: usize = 5;
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tooltip {
    pub title: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow<R> {
    /// 1-based position after sorting.
    pub rank: usize,
    pub highlight: bool,
    pub color: &'static str,
    pub row: R,
}

/// Sorts descending by `metric` (stable) and highlights the top row.
///
/// NaN metrics sort last.
pub fn rank_and_color<R, F>(rows: &[R], metric: F) -> Vec<RankedRow<R>>
where
    R: Clone,
    F: Fn(&R) -> f64,
{
    let mut sorted: Vec<R> = rows.to_vec();
    sorted.sort_by(|a, b| descending(metric(a), metric(b)));

    sorted
        .into_iter()
        .enumerate()
        .map(|(idx, row)| RankedRow {
            rank: idx + 1,
            highlight: idx == 0,
            color: if idx == 0 { HIGHLIGHT_COLOR } else { BASE_COLOR },
            row,
        })
        .collect()
}

fn descending(a: f64, b: f64) -> Ordering {
    sortable(b).total_cmp(&sortable(a))
}

fn sortable(value: f64) -> f64 {
    if value.is_nan() {
        f64::NEG_INFINITY
    } else {
        value
    }
}

/// Cuts `name` to `budget` characters followed by `...` when longer.
pub fn truncate_label(name: &str, budget: usize) -> String {
    if name.chars().count() <= budget {
        return name.to_string();
    }
    let mut out: String = name.chars().take(budget).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Renderers that draw bottom-to-top need the top rank last.
pub fn reverse_for_ranked_layout<R>(mut rows: Vec<R>) -> Vec<R> {
    rows.reverse();
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnRateBar {
    pub manager: String,
    pub region: String,
    pub return_rate_percentage: f64,
    pub highlight: bool,
    pub color: &'static str,
    pub tooltip: Tooltip,
}

pub fn shape_return_rates(rows: &[ReturnRateRow]) -> Vec<ReturnRateBar> {
    rank_and_color(rows, |row| row.return_rate_percentage)
        .into_iter()
        .map(|ranked| {
            let row = ranked.row;
            let tooltip = Tooltip {
                title: row.region.clone(),
                lines: vec![
                    format!("Manager: {}", row.manager),
                    format!(
                        "Return Rate: {}%",
                        format_js_number(row.return_rate_percentage)
                    ),
                    format!(
                        "{} / {} orders",
                        format_js_number(row.returned_orders),
                        format_js_number(row.total_orders)
                    ),
                ],
            };
            ReturnRateBar {
                manager: row.manager,
                region: row.region,
                return_rate_percentage: row.return_rate_percentage,
                highlight: ranked.highlight,
                color: ranked.color,
                tooltip,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShippingPoint {
    pub ship_mode: String,
    pub avg_shipping_days: f64,
    pub late_percentage: f64,
    pub tooltip: Tooltip,
}

pub fn shape_shipping(rows: &[ShippingRow]) -> Vec<ShippingPoint> {
    rows.iter()
        .map(|row| ShippingPoint {
            ship_mode: row.ship_mode.clone(),
            avg_shipping_days: row.avg_shipping_days,
            late_percentage: row.late_percentage,
            tooltip: Tooltip {
                title: row.ship_mode.clone(),
                lines: vec![
                    format!("Avg Days: {}", format_js_number(row.avg_shipping_days)),
                    format!("Late: {}%", format_js_number(row.late_percentage)),
                ],
            },
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthPoint {
    pub order_year_month: String,
    pub label: String,
    pub growth_percentage: Option<f64>,
    pub monthly_sales: f64,
    pub tooltip: Tooltip,
}

pub fn shape_mom_growth(rows: &[MomGrowthRow]) -> Vec<GrowthPoint> {
    rows.iter()
        .map(|row| {
            let growth = row
                .growth_percentage
                .map(|g| format!("Growth: {}%", format_js_number(g)))
                .unwrap_or_else(|| "Growth: -".to_string());
            GrowthPoint {
                order_year_month: row.order_year_month.clone(),
                label: month_label(&row.order_year_month),
                growth_percentage: row.growth_percentage,
                monthly_sales: row.monthly_sales,
                tooltip: Tooltip {
                    title: row.order_year_month.clone(),
                    lines: vec![
                        growth,
                        format!("Sales: {}", format_usd_whole(row.monthly_sales)),
                    ],
                },
            }
        })
        .collect()
}

/// `2024-03` -> `Mar 2024`; anything unparseable is passed through.
fn month_label(year_month: &str) -> String {
    NaiveDate::parse_from_str(&format!("{year_month}-01"), "%Y-%m-%d")
        .map(|date| date.format("%b %Y").to_string())
        .unwrap_or_else(|_| year_month.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Profit,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub name: String,
    pub value: f64,
    pub amount: f64,
    pub color: &'static str,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitLossBreakdown {
    pub slices: Vec<PieSlice>,
    pub net_value: f64,
    pub net_label: String,
    pub net_tone: Tone,
}

pub fn shape_profit_loss(data: &ProfitLoss) -> ProfitLossBreakdown {
    let slice = |name: &str, value: f64, amount: f64, color: &'static str| PieSlice {
        name: name.to_string(),
        value,
        amount,
        color,
        tooltip: Tooltip {
            title: name.to_string(),
            lines: vec![
                format!("Percentage: {}", format_percent(value, 2)),
                format!("Amount: {}", format_usd_whole(amount)),
            ],
        },
    };

    let net_value = data.total_gross_profit - data.total_lost_money;
    let net_tone = if net_value >= 0.0 {
        Tone::Profit
    } else {
        Tone::Loss
    };

    ProfitLossBreakdown {
        slices: vec![
            slice(
                "Profit",
                data.profit_percentage_impact,
                data.total_gross_profit,
                PROFIT_COLOR,
            ),
            slice(
                "Loss",
                data.loss_percentage_impact,
                data.total_lost_money,
                LOSS_COLOR,
            ),
        ],
        net_value,
        net_label: format_usd_whole(net_value.abs()),
        net_tone,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductMode {
    #[default]
    Loss,
    Profit,
}

impl ProductMode {
    pub fn color(self) -> &'static str {
        match self {
            Self::Loss => LOSS_COLOR,
            Self::Profit => PROFIT_COLOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductBar {
    pub name: String,
    pub short_name: String,
    pub value: f64,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductChart {
    pub mode: ProductMode,
    pub color: &'static str,
    pub axis_max: f64,
    /// Lowest rank first; the top product is the last bar.
    pub bars: Vec<ProductBar>,
}

pub fn shape_top_products(
    rows: &[ProductShareRow],
    mode: ProductMode,
    top_n: usize,
    label_budget: usize,
) -> ProductChart {
    let mut ranked: Vec<ProductShareRow> = rows.to_vec();
    ranked.sort_by(|a, b| descending(a.share_pct, b.share_pct));
    ranked.truncate(top_n);

    let bars: Vec<ProductBar> = ranked
        .into_iter()
        .map(|row| ProductBar {
            short_name: truncate_label(&row.product_name, label_budget),
            tooltip: Tooltip {
                title: row.product_name.clone(),
                lines: vec![format!("{:.2}% contribution", row.share_pct)],
            },
            name: row.product_name,
            value: row.share_pct,
        })
        .collect();

    let max_value = bars
        .iter()
        .map(|bar| bar.value)
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));

    ProductChart {
        mode,
        color: mode.color(),
        axis_max: max_value.map_or(0.0, |m| (m * 1.1).ceil()),
        bars: reverse_for_ranked_layout(bars),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerLine {
    pub rank: u32,
    pub customer_id: String,
    pub customer_name: String,
    pub state: String,
    pub total_sales: f64,
    pub sales_label: String,
}

pub fn shape_customers(rows: &[CustomerRow]) -> Vec<CustomerLine> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| CustomerLine {
            rank: row.rn.unwrap_or(idx as u32 + 1),
            customer_id: row.customer_id.clone(),
            customer_name: row.customer_name.clone(),
            state: row.state.clone(),
            total_sales: row.total_sales,
            sales_label: format_usd_whole(row.total_sales),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KpiCard {
    pub key: &'static str,
    pub title: &'static str,
    pub value_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub revenue: f64,
    pub tick_label: String,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySlice {
    pub name: String,
    pub value: f64,
    pub value_label: String,
    pub color: &'static str,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateBar {
    pub state: String,
    pub revenue: f64,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewView {
    pub cards: Vec<KpiCard>,
    pub revenue_trend: Vec<TrendPoint>,
    pub sales_by_category: Vec<CategorySlice>,
    pub top_states: Vec<StateBar>,
}

pub fn shape_kpi_cards(cards: &KpiCards) -> Vec<KpiCard> {
    vec![
        KpiCard {
            key: "total_sales",
            title: "Total Sales",
            value_label: format_currency_compact(cards.total_sales),
        },
        KpiCard {
            key: "total_profit",
            title: "Total Profit",
            value_label: format_currency_compact(cards.total_profit),
        },
        KpiCard {
            key: "total_orders",
            title: "Total Orders",
            value_label: format_compact(cards.total_orders),
        },
        KpiCard {
            key: "profit_margin",
            title: "Profit Margin %",
            value_label: format_compact(cards.profit_margin),
        },
    ]
}

pub fn shape_overview(payload: &OverviewPayload) -> OverviewView {
    let revenue_trend = payload
        .charts
        .revenue_trend
        .iter()
        .map(|point| TrendPoint {
            period: point.period.clone(),
            revenue: point.revenue,
            tick_label: format_compact(Some(point.revenue)),
            tooltip: Tooltip {
                title: point.period.clone(),
                lines: vec![format_currency_compact(Some(point.revenue))],
            },
        })
        .collect();

    let sales_by_category = payload
        .charts
        .sales_by_category
        .iter()
        .enumerate()
        .map(|(idx, slice)| CategorySlice {
            name: slice.name.clone(),
            value: slice.value,
            value_label: format_compact(Some(slice.value)),
            color: CATEGORY_PALETTE[idx % CATEGORY_PALETTE.len()],
            tooltip: Tooltip {
                title: slice.name.clone(),
                lines: vec![format_currency_compact(Some(slice.value))],
            },
        })
        .collect();

    let top_states = payload
        .charts
        .top_states_revenue
        .iter()
        .map(|row| StateBar {
            state: row.state.clone(),
            revenue: row.revenue,
            tooltip: Tooltip {
                title: row.state.clone(),
                lines: vec![format!(
                    "Revenue: {}",
                    format_currency_compact(Some(row.revenue))
                )],
            },
        })
        .collect();

    OverviewView {
        cards: shape_kpi_cards(&payload.cards),
        revenue_trend,
        sales_by_category,
        top_states,
    }
}
