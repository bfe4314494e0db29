//! Customer directory endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use pharma_core::validation::{validate_name, validate_search_query};
use pharma_core::Customer;

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
struct CustomerBody {
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    insurance_provider: Option<String>,
    insurance_number: Option<String>,
}

impl CustomerBody {
    fn validate(&self) -> ApiResult<()> {
        validate_name("name", &self.name)?;
        Ok(())
    }
}

/// GET /api/customers
async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    let customers = match query.search.as_deref() {
        Some(q) if !q.trim().is_empty() => {
            let q = validate_search_query(q)?;
            state.db.customers().search(&q, query.limit).await?
        }
        _ => state.db.customers().list(query.limit, query.offset).await?,
    };
    Ok(Json(customers))
}

/// POST /api/customers
async fn create_customer(
    State(state): State<AppState>,
    Json(body): Json<CustomerBody>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    body.validate()?;

    let now = Utc::now();
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        email: body.email,
        phone: body.phone,
        address: body.address,
        insurance_provider: body.insurance_provider,
        insurance_number: body.insurance_number,
        created_at: now,
        updated_at: now,
    };

    state.db.customers().insert(&customer).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /api/customers/:id
async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    let customer = state
        .db
        .customers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Customer not found: {}", id)))?;
    Ok(Json(customer))
}

/// PATCH /api/customers/:id
async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CustomerBody>,
) -> ApiResult<Json<Customer>> {
    body.validate()?;

    let mut customer = state
        .db
        .customers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Customer not found: {}", id)))?;

    customer.name = body.name;
    customer.email = body.email;
    customer.phone = body.phone;
    customer.address = body.address;
    customer.insurance_provider = body.insurance_provider;
    customer.insurance_number = body.insurance_number;
    customer.updated_at = Utc::now();

    state.db.customers().update(&customer).await?;
    Ok(Json(customer))
}

/// DELETE /api/customers/:id
async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.customers().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list_customers).post(create_customer))
        .route(
            "/api/customers/:id",
            get(get_customer).patch(update_customer).delete(delete_customer),
        )
}
