//! Supplier directory endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use pharma_core::validation::validate_name;
use pharma_core::Supplier;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
struct SupplierBody {
    name: String,
    contact_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
}

/// GET /api/suppliers
async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Supplier>>> {
    Ok(Json(state.db.suppliers().list(query.limit, query.offset).await?))
}

/// POST /api/suppliers
async fn create_supplier(
    State(state): State<AppState>,
    Json(body): Json<SupplierBody>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    validate_name("name", &body.name)?;

    let now = Utc::now();
    let supplier = Supplier {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        contact_name: body.contact_name,
        email: body.email,
        phone: body.phone,
        address: body.address,
        created_at: now,
        updated_at: now,
    };

    state.db.suppliers().insert(&supplier).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// GET /api/suppliers/:id
async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Supplier>> {
    let supplier = state
        .db
        .suppliers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Supplier not found: {}", id)))?;
    Ok(Json(supplier))
}

/// PATCH /api/suppliers/:id
async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SupplierBody>,
) -> ApiResult<Json<Supplier>> {
    validate_name("name", &body.name)?;

    let mut supplier = state
        .db
        .suppliers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Supplier not found: {}", id)))?;

    supplier.name = body.name;
    supplier.contact_name = body.contact_name;
    supplier.email = body.email;
    supplier.phone = body.phone;
    supplier.address = body.address;
    supplier.updated_at = Utc::now();

    state.db.suppliers().update(&supplier).await?;
    Ok(Json(supplier))
}

/// DELETE /api/suppliers/:id - rejected while purchase orders reference it.
async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.suppliers().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/api/suppliers/:id",
            get(get_supplier).patch(update_supplier).delete(delete_supplier),
        )
}
