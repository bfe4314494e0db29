//! Drug catalog endpoints: CRUD, search, batches, stock alerts.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use pharma_core::validation::{validate_name, validate_price_cents, validate_search_query, validate_sku};
use pharma_core::{Drug, DrugBatch, DrugCategory};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ListQuery {
    search: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
struct DrugBody {
    sku: String,
    barcode: Option<String>,
    name: String,
    description: Option<String>,
    category: DrugCategory,
    price_cents: i64,
    cost_cents: Option<i64>,
    #[serde(default)]
    stock: i64,
    #[serde(default = "default_reorder_level")]
    reorder_level: i64,
    #[serde(default)]
    requires_prescription: bool,
}

fn default_reorder_level() -> i64 {
    10
}

impl DrugBody {
    fn validate(&self) -> ApiResult<()> {
        validate_sku(&self.sku)?;
        validate_name("name", &self.name)?;
        validate_price_cents(self.price_cents)?;
        Ok(())
    }
}

/// GET /api/drugs - list or search the catalog.
async fn list_drugs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Drug>>> {
    let drugs = match query.search.as_deref() {
        Some(q) => {
            let q = validate_search_query(q)?;
            state.db.drugs().search(&q, query.limit).await?
        }
        None => state.db.drugs().list(query.limit, query.offset).await?,
    };
    Ok(Json(drugs))
}

/// POST /api/drugs
async fn create_drug(
    State(state): State<AppState>,
    Json(body): Json<DrugBody>,
) -> ApiResult<(StatusCode, Json<Drug>)> {
    body.validate()?;

    let now = Utc::now();
    let drug = Drug {
        id: Uuid::new_v4().to_string(),
        sku: body.sku,
        barcode: body.barcode,
        name: body.name,
        description: body.description,
        category: body.category,
        price_cents: body.price_cents,
        cost_cents: body.cost_cents,
        stock: body.stock.max(0),
        reorder_level: body.reorder_level.max(0),
        requires_prescription: body.requires_prescription,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state.db.drugs().insert(&drug).await?;
    Ok((StatusCode::CREATED, Json(drug)))
}

/// GET /api/drugs/:id
async fn get_drug(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Drug>> {
    let drug = state
        .db
        .drugs()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Drug not found: {}", id)))?;
    Ok(Json(drug))
}

/// PATCH /api/drugs/:id
async fn update_drug(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<DrugBody>,
) -> ApiResult<Json<Drug>> {
    body.validate()?;

    let mut drug = state
        .db
        .drugs()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Drug not found: {}", id)))?;

    drug.sku = body.sku;
    drug.barcode = body.barcode;
    drug.name = body.name;
    drug.description = body.description;
    drug.category = body.category;
    drug.price_cents = body.price_cents;
    drug.cost_cents = body.cost_cents;
    drug.reorder_level = body.reorder_level.max(0);
    drug.requires_prescription = body.requires_prescription;

    state.db.drugs().update(&drug).await?;
    Ok(Json(drug))
}

/// DELETE /api/drugs/:id - soft delete, history stays intact.
async fn delete_drug(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.db.drugs().soft_delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/drugs/alerts/low-stock - active drugs at or below reorder level.
async fn low_stock(State(state): State<AppState>) -> ApiResult<Json<Vec<Drug>>> {
    Ok(Json(state.db.drugs().low_stock().await?))
}

#[derive(Debug, Deserialize)]
struct ExpiringQuery {
    /// Look-ahead window in days. Default: 90.
    #[serde(default = "default_expiry_days")]
    days: i64,
}

fn default_expiry_days() -> i64 {
    90
}

/// GET /api/drugs/expiring - batches expiring within the window.
async fn expiring(
    State(state): State<AppState>,
    Query(query): Query<ExpiringQuery>,
) -> ApiResult<Json<Vec<DrugBatch>>> {
    let cutoff = Utc::now().date_naive() + Duration::days(query.days.max(0));
    Ok(Json(state.db.drugs().expiring_batches(cutoff).await?))
}

/// GET /api/drugs/:id/batches
async fn list_batches(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<DrugBatch>>> {
    Ok(Json(state.db.drugs().list_batches(&id).await?))
}

#[derive(Debug, Deserialize)]
struct BatchBody {
    batch_number: String,
    quantity: i64,
    expiry_date: NaiveDate,
}

/// POST /api/drugs/:id/batches - receive a batch, bumping stock.
async fn add_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<BatchBody>,
) -> ApiResult<(StatusCode, Json<DrugBatch>)> {
    validate_name("batch_number", &body.batch_number)?;
    if body.quantity <= 0 {
        return Err(ApiError::bad_request("quantity must be positive"));
    }

    let batch = state
        .db
        .drugs()
        .add_batch(&id, &body.batch_number, body.quantity, body.expiry_date)
        .await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/drugs", get(list_drugs).post(create_drug))
        .route("/api/drugs/alerts/low-stock", get(low_stock))
        .route("/api/drugs/expiring", get(expiring))
        .route(
            "/api/drugs/:id",
            get(get_drug).patch(update_drug).delete(delete_drug),
        )
        .route("/api/drugs/:id/batches", get(list_batches).post(add_batch))
}
