//! Prescription endpoints.
//!
//! Medication lists are stored as a JSON document on the row and
//! returned structured in responses.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pharma_core::validation::validate_name;
use pharma_core::{Prescription, PrescriptionMedication, PrescriptionStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<PrescriptionStatus>,
    customer_id: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
struct PrescriptionBody {
    customer_id: String,
    prescriber_name: String,
    medications: Vec<PrescriptionMedication>,
    issued_date: Option<NaiveDate>,
    notes: Option<String>,
}

/// Prescription with the medication list parsed out of the row.
#[derive(Debug, Serialize)]
struct PrescriptionDto {
    #[serde(flatten)]
    prescription: Prescription,
    medications: Vec<PrescriptionMedication>,
}

impl PrescriptionDto {
    fn from_row(prescription: Prescription) -> ApiResult<Self> {
        let medications = prescription.medications().map_err(|err| {
            ApiError::internal(format!("Corrupt medication list: {}", err))
        })?;
        Ok(PrescriptionDto {
            prescription,
            medications,
        })
    }
}

/// GET /api/prescriptions
async fn list_prescriptions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<PrescriptionDto>>> {
    let rows = match query.customer_id.as_deref() {
        Some(customer_id) => state.db.prescriptions().list_for_customer(customer_id).await?,
        None => {
            state
                .db
                .prescriptions()
                .list(query.status, query.limit, query.offset)
                .await?
        }
    };

    rows.into_iter()
        .map(PrescriptionDto::from_row)
        .collect::<ApiResult<Vec<_>>>()
        .map(Json)
}

/// POST /api/prescriptions
async fn create_prescription(
    State(state): State<AppState>,
    Json(body): Json<PrescriptionBody>,
) -> ApiResult<(StatusCode, Json<PrescriptionDto>)> {
    validate_name("prescriber_name", &body.prescriber_name)?;
    if body.medications.is_empty() {
        return Err(ApiError::bad_request("Prescription needs at least one medication"));
    }

    state
        .db
        .customers()
        .get_by_id(&body.customer_id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("Customer not found: {}", body.customer_id))
        })?;

    let now = Utc::now();
    let prescription = Prescription {
        id: Uuid::new_v4().to_string(),
        customer_id: body.customer_id,
        prescriber_name: body.prescriber_name,
        status: PrescriptionStatus::Pending,
        medications_json: serde_json::to_string(&body.medications)
            .map_err(|err| ApiError::internal(format!("Medication encoding failed: {}", err)))?,
        issued_date: body.issued_date,
        notes: body.notes,
        created_at: now,
        updated_at: now,
    };

    state.db.prescriptions().insert(&prescription).await?;
    Ok((StatusCode::CREATED, Json(PrescriptionDto::from_row(prescription)?)))
}

/// GET /api/prescriptions/:id
async fn get_prescription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PrescriptionDto>> {
    Ok(Json(load(&state, &id).await?))
}

/// PATCH /api/prescriptions/:id - pending prescriptions only.
async fn update_prescription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PrescriptionBody>,
) -> ApiResult<Json<PrescriptionDto>> {
    validate_name("prescriber_name", &body.prescriber_name)?;
    if body.medications.is_empty() {
        return Err(ApiError::bad_request("Prescription needs at least one medication"));
    }

    let mut prescription = state
        .db
        .prescriptions()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Prescription not found: {}", id)))?;

    if prescription.status != PrescriptionStatus::Pending {
        return Err(ApiError::unprocessable(
            "Only pending prescriptions can be edited",
        ));
    }

    prescription.prescriber_name = body.prescriber_name;
    prescription.medications_json = serde_json::to_string(&body.medications)
        .map_err(|err| ApiError::internal(format!("Medication encoding failed: {}", err)))?;
    prescription.issued_date = body.issued_date;
    prescription.notes = body.notes;

    state.db.prescriptions().update(&prescription).await?;
    Ok(Json(load(&state, &id).await?))
}

/// POST /api/prescriptions/:id/fill
async fn fill_prescription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PrescriptionDto>> {
    transition(&state, &id, PrescriptionStatus::Filled).await
}

/// POST /api/prescriptions/:id/cancel
async fn cancel_prescription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PrescriptionDto>> {
    transition(&state, &id, PrescriptionStatus::Cancelled).await
}

/// DELETE /api/prescriptions/:id
async fn delete_prescription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.prescriptions().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pending is the only state that moves. Filled and cancelled are terminal.
async fn transition(
    state: &AppState,
    id: &str,
    target: PrescriptionStatus,
) -> ApiResult<Json<PrescriptionDto>> {
    let prescription = state
        .db
        .prescriptions()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Prescription not found: {}", id)))?;

    if prescription.status != PrescriptionStatus::Pending {
        return Err(ApiError::unprocessable(format!(
            "Prescription is not pending: {:?}",
            prescription.status
        )));
    }

    state.db.prescriptions().set_status(id, target).await?;
    Ok(Json(load(state, id).await?))
}

async fn load(state: &AppState, id: &str) -> ApiResult<PrescriptionDto> {
    let prescription = state
        .db
        .prescriptions()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Prescription not found: {}", id)))?;
    PrescriptionDto::from_row(prescription)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/prescriptions",
            get(list_prescriptions).post(create_prescription),
        )
        .route(
            "/api/prescriptions/:id",
            get(get_prescription)
                .patch(update_prescription)
                .delete(delete_prescription),
        )
        .route("/api/prescriptions/:id/fill", post(fill_prescription))
        .route("/api/prescriptions/:id/cancel", post(cancel_prescription))
}
