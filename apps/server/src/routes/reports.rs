//! Reporting endpoints. All figures are aggregated in SQL and reported
//! in integer cents.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;

use pharma_db::{
    CustomerSpend, DashboardSummary, InventorySummary, PurchasesSummary, SalesSummary,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct RangeQuery {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl RangeQuery {
    /// Defaults to the trailing 30 days ending today.
    fn resolve(&self) -> ApiResult<(NaiveDate, NaiveDate)> {
        let to = self.to.unwrap_or_else(|| Utc::now().date_naive());
        let from = self.from.unwrap_or(to - Duration::days(30));
        if from > to {
            return Err(ApiError::bad_request("Range start is after range end"));
        }
        Ok((from, to))
    }
}

#[derive(Debug, Deserialize)]
struct TopQuery {
    #[serde(default = "default_top")]
    limit: i64,
}

fn default_top() -> i64 {
    10
}

/// GET /api/reports/sales
async fn sales_report(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<SalesSummary>> {
    let (from, to) = query.resolve()?;
    Ok(Json(state.db.reports().sales_summary(from, to).await?))
}

/// GET /api/reports/inventory
async fn inventory_report(State(state): State<AppState>) -> ApiResult<Json<InventorySummary>> {
    Ok(Json(state.db.reports().inventory_summary().await?))
}

/// GET /api/reports/purchases
async fn purchases_report(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<PurchasesSummary>> {
    let (from, to) = query.resolve()?;
    Ok(Json(state.db.reports().purchases_summary(from, to).await?))
}

/// GET /api/reports/customers
async fn customers_report(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> ApiResult<Json<Vec<CustomerSpend>>> {
    Ok(Json(state.db.reports().top_customers(query.limit).await?))
}

/// GET /api/reports/dashboard
async fn dashboard_report(State(state): State<AppState>) -> ApiResult<Json<DashboardSummary>> {
    let today = Utc::now().date_naive();
    Ok(Json(state.db.reports().dashboard(today).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reports/sales", get(sales_report))
        .route("/api/reports/inventory", get(inventory_report))
        .route("/api/reports/purchases", get(purchases_report))
        .route("/api/reports/customers", get(customers_report))
        .route("/api/reports/dashboard", get(dashboard_report))
}
