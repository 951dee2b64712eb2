use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use salesdash::{AnalyticsApi, ApiError, FilterSelection, HttpAnalyticsApi, HttpApiConfig};
use serde_json::{json, Value};

type QueryLog = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: String) -> HttpAnalyticsApi {
    HttpAnalyticsApi::new(&HttpApiConfig {
        base_url,
        timeout_ms: None,
    })
    .unwrap()
}

async fn overview(
    State(log): State<QueryLog>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    log.lock().unwrap().push(query);
    Json(json!({
        "cards": {
            "total_sales": 2297200.86,
            "total_profit": 286397.02,
            "total_orders": 5009,
            "profit_margin": 12.47
        },
        "charts": {
            "revenue_trend": [{"period": "2024-01", "revenue": 94924.84}],
            "sales_by_category": [{"name": "Technology", "value": 836154.03}],
            "top_states_revenue": [{"state": "California", "revenue": 457687.63}]
        }
    }))
}

async fn growth(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let year = query.get("year").cloned().unwrap_or_default();
    Json(json!({
        "mom_growth": [
            {"order_year_month": format!("{year}-01"), "monthly_sales": 43971.37, "growth_percentage": null},
            {"order_year_month": format!("{year}-02"), "monthly_sales": 20301.13, "growth_percentage": -53.83}
        ]
    }))
}

async fn customers(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let state = query.get("state").cloned().unwrap_or_default();
    if state == "Wyoming" {
        return Json(json!({ "top_customers_by_state": null }));
    }
    Json(json!({
        "top_customers_by_state": [
            {"customer_id": "TC-20980", "customer_name": "Tamara Chand", "state": state, "total_sales": 19052.22, "rn": 1}
        ]
    }))
}

fn analytics_backend(log: QueryLog) -> Router {
    Router::new()
        .route("/", get(overview))
        .route(
            "/insights",
            get(|| async {
                Json(json!({
                    "return_rate_by_manager": [
                        {"Manager": "Anna", "region": "West", "Total_Orders": 1611, "Returned_Orders": 177, "Return_Rate_Percentage": 10.99}
                    ]
                }))
            }),
        )
        .route(
            "/insights/states",
            get(|| async {
                Json(json!({ "states": [{"state": "California"}, {"state": "New York"}] }))
            }),
        )
        .route("/insights/customers", get(customers))
        .route(
            "/insights/shipping",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/insights/growth", get(growth))
        .route(
            "/insights/years",
            get(|| async { Json(json!({ "years": [{"year": 2024}, {"year": 2023}] })) }),
        )
        .route(
            "/insights/profit-loss",
            get(|| async { Json(json!({ "profit_loss": null })) }),
        )
        .route(
            "/insights/top-loss-products",
            get(|| async {
                Json(json!({ "top_loss_products": [{"product_name": "Cubify CubeX 3D Printer", "loss_pct": 21.4}] }))
            }),
        )
        .route(
            "/insights/top-profit-products",
            get(|| async { "not json" }),
        )
        .with_state(log)
}

#[tokio::test]
async fn overview_sends_only_constrained_filters() {
    let log = QueryLog::default();
    let api = client(spawn_backend(analytics_backend(Arc::clone(&log))).await);

    let payload = api
        .overview(&FilterSelection {
            year: Some(2024),
            region: Some("West".to_string()),
            category: None,
        })
        .await
        .unwrap();
    api.overview(&FilterSelection::unconstrained()).await.unwrap();

    assert_eq!(payload.cards.total_orders, Some(5009.0));
    assert_eq!(payload.charts.top_states_revenue[0].state, "California");

    let queries = log.lock().unwrap().clone();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].get("year").map(String::as_str), Some("2024"));
    assert_eq!(queries[0].get("region").map(String::as_str), Some("West"));
    assert!(!queries[0].contains_key("category"));
    assert!(queries[1].is_empty());
}

#[tokio::test]
async fn option_lists_and_details_decode() {
    let api = client(spawn_backend(analytics_backend(QueryLog::default())).await);

    assert_eq!(api.years().await.unwrap(), vec![2024, 2023]);
    assert_eq!(
        api.states().await.unwrap(),
        vec!["California".to_string(), "New York".to_string()]
    );

    let growth = api.mom_growth(2023).await.unwrap();
    assert_eq!(growth[0].order_year_month, "2023-01");
    assert_eq!(growth[0].growth_percentage, None);
    assert_eq!(growth[1].growth_percentage, Some(-53.83));

    let customers = api.top_customers("New York").await.unwrap();
    assert_eq!(customers[0].state, "New York");
    assert_eq!(customers[0].rn, Some(1));

    let rates = api.return_rate_by_manager().await.unwrap();
    assert_eq!(rates[0].manager, "Anna");
    assert_eq!(rates[0].returned_orders, 177.0);

    let losses = api.top_loss_products().await.unwrap();
    assert_eq!(losses[0].share_pct, 21.4);
}

#[tokio::test]
async fn null_payloads_decode_as_absent() {
    let api = client(spawn_backend(analytics_backend(QueryLog::default())).await);

    assert!(api.top_customers("Wyoming").await.unwrap().is_empty());
    assert_eq!(api.profit_loss().await.unwrap(), None);
}

#[tokio::test]
async fn non_success_status_is_classified() {
    let api = client(spawn_backend(analytics_backend(QueryLog::default())).await);

    match api.shipping_performance().await {
        Err(ApiError::Status { status, url }) => {
            assert_eq!(status, 500);
            assert!(url.ends_with("/insights/shipping"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_body_is_malformed() {
    let api = client(spawn_backend(analytics_backend(QueryLog::default())).await);

    let err = api.top_profit_products().await.unwrap_err();
    assert_eq!(err.kind(), "malformed");
}

#[tokio::test]
async fn missing_payload_key_is_malformed() {
    let router = Router::new().route(
        "/insights/years",
        get(|| async { Json(json!({ "year_list": [2024] })) }),
    );
    let api = client(spawn_backend(router).await);

    assert!(matches!(api.years().await, Err(ApiError::Malformed(_))));
}

#[tokio::test]
async fn refused_connection_is_transport() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(format!("http://{addr}"));
    assert!(matches!(api.years().await, Err(ApiError::Transport(_))));
}

#[tokio::test]
async fn configured_timeout_surfaces_as_transport() {
    let router = Router::new().route(
        "/insights/years",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "years": [] }))
        }),
    );
    let base_url = spawn_backend(router).await;
    let api = HttpAnalyticsApi::new(&HttpApiConfig {
        base_url,
        timeout_ms: Some(50),
    })
    .unwrap();

    assert!(matches!(api.years().await, Err(ApiError::Transport(_))));
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = HttpAnalyticsApi::new(&HttpApiConfig {
        base_url: "not a url".to_string(),
        timeout_ms: None,
    })
    .err()
    .expect("base url should not parse");
    assert_eq!(err.kind(), "transport");
}
