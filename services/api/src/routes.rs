use crate::infra::{deserialize_optional_date, today, AppState};
use crate::reports::{
    advisor_customers, advisor_overview, advisor_table, goal_comparison, product_report,
    AdvisorOverview, ReportParams,
};
use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use policy_desk::error::AppError;
use policy_desk::pipeline::{CustomerDataset, PolicyPipeline, RawRow, SourceRows};
use policy_desk::reporting::{
    is_known_advisor, AdvisorCustomerStats, AdvisorMonthTable, CompanySegment, GoalComparison,
    ProductReport, ReportData,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Rows for one customer dataset build.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CustomersRequest {
    #[serde(default)]
    pub(crate) axa: Vec<RawRow>,
    #[serde(default)]
    pub(crate) naersikring: Vec<RawRow>,
    #[serde(default)]
    pub(crate) accident_health: Vec<RawRow>,
    #[serde(default)]
    pub(crate) customers: Vec<RawRow>,
    #[serde(default)]
    pub(crate) marketing: Vec<RawRow>,
    #[serde(default)]
    pub(crate) export_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportQuery {
    pub(crate) segment: Option<CompanySegment>,
    #[serde(default, alias = "include_migrated")]
    pub(crate) include_migrated: bool,
    pub(crate) year: Option<i32>,
    pub(crate) month: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

impl ReportQuery {
    fn params(&self) -> ReportParams {
        ReportParams::new(
            self.segment,
            self.include_migrated,
            self.year,
            self.month,
            self.today.unwrap_or_else(today),
        )
    }
}

pub(crate) fn api_router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/customers", post(customers_endpoint))
        .route("/api/v1/reports/products", get(products_endpoint))
        .route("/api/v1/reports/goals", get(goals_endpoint))
        .route("/api/v1/reports/advisors", get(advisor_table_endpoint))
        .route("/api/v1/reports/advisors/:code", get(advisor_endpoint))
        .route(
            "/api/v1/reports/advisors/:code/customers",
            get(advisor_customers_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn customers_endpoint(
    Json(payload): Json<CustomersRequest>,
) -> Result<Json<CustomerDataset>, AppError> {
    let CustomersRequest {
        axa,
        naersikring,
        accident_health,
        customers,
        marketing,
        export_date,
    } = payload;

    let pipeline = PolicyPipeline::from_rows(&customers, &marketing);
    let sources = SourceRows {
        axa,
        naersikring,
        accident_health,
    };
    let dataset = pipeline.run(&sources, export_date.unwrap_or_else(Utc::now));
    Ok(Json(dataset))
}

/// Loads through the store on the blocking pool; a cold cache reads files.
async fn report_data(state: &AppState) -> Result<Arc<ReportData>, AppError> {
    let store = Arc::clone(&state.store);
    let data = tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))??;
    Ok(data)
}

fn unknown_advisor(code: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("unknown advisor '{code}'") })),
    )
        .into_response()
}

pub(crate) async fn products_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ProductReport>, AppError> {
    let data = report_data(&state).await?;
    Ok(Json(product_report(&data, &query.params())))
}

pub(crate) async fn goals_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<GoalComparison>, AppError> {
    let data = report_data(&state).await?;
    Ok(Json(goal_comparison(&data, &query.params())))
}

pub(crate) async fn advisor_table_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<AdvisorMonthTable>, AppError> {
    let data = report_data(&state).await?;
    Ok(Json(advisor_table(&data, &query.params())))
}

pub(crate) async fn advisor_endpoint(
    Extension(state): Extension<AppState>,
    Path(code): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    if !is_known_advisor(&code) {
        return Ok(unknown_advisor(&code));
    }
    let data = report_data(&state).await?;
    let overview: AdvisorOverview = advisor_overview(&data, &code, &query.params());
    Ok(Json(overview).into_response())
}

pub(crate) async fn advisor_customers_endpoint(
    Extension(state): Extension<AppState>,
    Path(code): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    if !is_known_advisor(&code) {
        return Ok(unknown_advisor(&code));
    }
    let data = report_data(&state).await?;
    let stats: AdvisorCustomerStats = advisor_customers(&data, &code, &query.params());
    Ok(Json(stats).into_response())
}
