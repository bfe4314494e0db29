//! Purchase order endpoints: draft -> sent -> received, with stock
//! landing on receipt.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use pharma_core::validation::validate_quantity;
use pharma_core::{PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus};
use pharma_db::{NewPurchaseOrder, NewPurchaseOrderItem};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<PurchaseOrderStatus>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
struct OrderItemBody {
    drug_id: String,
    quantity: i64,
    unit_cost_cents: i64,
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    supplier_id: String,
    items: Vec<OrderItemBody>,
    expected_date: Option<NaiveDate>,
    notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct OrderDetail {
    #[serde(flatten)]
    order: PurchaseOrder,
    items: Vec<PurchaseOrderItem>,
}

/// GET /api/purchase-orders
async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<PurchaseOrder>>> {
    let orders = state
        .db
        .purchase_orders()
        .list(query.status, query.limit, query.offset)
        .await?;
    Ok(Json(orders))
}

/// POST /api/purchase-orders - always lands as a draft.
async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<OrderBody>,
) -> ApiResult<(StatusCode, Json<OrderDetail>)> {
    if body.items.is_empty() {
        return Err(ApiError::bad_request("Purchase order needs at least one item"));
    }

    state
        .db
        .suppliers()
        .get_by_id(&body.supplier_id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("Supplier not found: {}", body.supplier_id))
        })?;

    let mut items = Vec::with_capacity(body.items.len());
    for item in &body.items {
        validate_quantity(item.quantity)?;
        if item.unit_cost_cents < 0 {
            return Err(ApiError::bad_request("Unit cost must not be negative"));
        }
        // Name is frozen from the catalog at order time.
        let drug = state
            .db
            .drugs()
            .get_by_id(&item.drug_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Drug not found: {}", item.drug_id)))?;

        items.push(NewPurchaseOrderItem {
            drug_id: drug.id,
            name: drug.name,
            quantity: item.quantity,
            unit_cost_cents: item.unit_cost_cents,
        });
    }

    let order = state
        .db
        .purchase_orders()
        .create(NewPurchaseOrder {
            supplier_id: body.supplier_id,
            items,
            expected_date: body.expected_date,
            notes: body.notes,
        })
        .await?;

    let detail = load_detail(&state, &order.id).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// PATCH /api/purchase-orders/:id - drafts only; lines are replaced and
/// the total recomputed.
async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<OrderBody>,
) -> ApiResult<Json<OrderDetail>> {
    if body.items.is_empty() {
        return Err(ApiError::bad_request("Purchase order needs at least one item"));
    }

    let mut items = Vec::with_capacity(body.items.len());
    for item in &body.items {
        validate_quantity(item.quantity)?;
        if item.unit_cost_cents < 0 {
            return Err(ApiError::bad_request("Unit cost must not be negative"));
        }
        let drug = state
            .db
            .drugs()
            .get_by_id(&item.drug_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Drug not found: {}", item.drug_id)))?;

        items.push(NewPurchaseOrderItem {
            drug_id: drug.id,
            name: drug.name,
            quantity: item.quantity,
            unit_cost_cents: item.unit_cost_cents,
        });
    }

    state
        .db
        .purchase_orders()
        .update_draft(&id, &items, body.expected_date, body.notes)
        .await?;

    Ok(Json(load_detail(&state, &id).await?))
}

/// GET /api/purchase-orders/:id
async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderDetail>> {
    Ok(Json(load_detail(&state, &id).await?))
}

/// POST /api/purchase-orders/:id/send
async fn send_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderDetail>> {
    state.db.purchase_orders().mark_sent(&id).await?;
    Ok(Json(load_detail(&state, &id).await?))
}

/// POST /api/purchase-orders/:id/receive - books stock for every line.
async fn receive_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderDetail>> {
    state.db.purchase_orders().receive(&id).await?;
    Ok(Json(load_detail(&state, &id).await?))
}

/// POST /api/purchase-orders/:id/cancel
async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderDetail>> {
    state.db.purchase_orders().cancel(&id).await?;
    Ok(Json(load_detail(&state, &id).await?))
}

/// DELETE /api/purchase-orders/:id - drafts only.
async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.purchase_orders().delete_draft(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn load_detail(state: &AppState, id: &str) -> ApiResult<OrderDetail> {
    let order = state
        .db
        .purchase_orders()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Purchase order not found: {}", id)))?;
    let items = state.db.purchase_orders().get_items(id).await?;
    Ok(OrderDetail { order, items })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/purchase-orders", get(list_orders).post(create_order))
        .route(
            "/api/purchase-orders/:id",
            get(get_order).patch(update_order).delete(delete_order),
        )
        .route("/api/purchase-orders/:id/send", post(send_order))
        .route("/api/purchase-orders/:id/receive", post(receive_order))
        .route("/api/purchase-orders/:id/cancel", post(cancel_order))
}
