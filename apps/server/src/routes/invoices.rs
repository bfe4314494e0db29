//! Invoice endpoints: lifecycle, payments, refunds.
//!
//! ## Totals Discipline
//! Totals are never accepted from the client. Handlers snapshot prices
//! from the catalog, run the calculator in pharma-core, and store its
//! output. Editing a draft recomputes everything from the new lines.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use pharma_core::validation::{validate_line_count, validate_quantity};
use pharma_core::{
    compute_totals, Invoice, InvoiceItem, InvoiceTotals, Money, Payment, PaymentMethod,
    PaymentStatus, Rate, TotalsLine, TotalsParams,
};
use pharma_db::{NewInvoice, NewInvoiceItem, NewPayment};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// =============================================================================
// DTOs
// =============================================================================

/// Invoice plus the derived overdue decoration.
#[derive(Debug, Serialize)]
pub struct InvoiceDto {
    #[serde(flatten)]
    pub invoice: Invoice,
    /// Derived: unsettled and past due as of today. Never stored.
    pub overdue: bool,
}

impl InvoiceDto {
    pub fn decorate(invoice: Invoice) -> Self {
        let overdue = invoice.is_overdue(Utc::now().date_naive());
        InvoiceDto { invoice, overdue }
    }
}

/// Full invoice view: header, lines, payment history.
#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: InvoiceDto,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Deserialize)]
pub struct LineBody {
    pub drug_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceBody {
    pub customer_id: Option<String>,
    pub lines: Vec<LineBody>,
    /// Percentage discount, clamped into [0, 100].
    #[serde(default)]
    pub discount_percent: f64,
    /// Insurance coverage in cents, clamped non-negative.
    #[serde(default)]
    pub insurance_cents: i64,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub recurrence_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PaymentBody {
    method: PaymentMethod,
    amount_cents: i64,
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefundBody {
    amount_cents: i64,
    method: PaymentMethod,
    reference: Option<String>,
}

#[derive(Debug, Serialize)]
struct SettlementResponse {
    invoice: InvoiceDto,
    payment: Payment,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<PaymentStatus>,
    customer_id: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

// =============================================================================
// Line Assembly
// =============================================================================

/// Snapshot of client lines against the catalog: item inputs for storage
/// plus calculator lines, priced from the catalog, never from the client.
pub struct AssembledLines {
    pub items: Vec<NewInvoiceItem>,
    pub totals: InvoiceTotals,
    /// Whether any line requires a prescription (drives the dispensing fee).
    pub has_prescription_line: bool,
}

/// Resolves drug ids, validates quantities, and runs the calculator.
pub async fn assemble_lines(
    state: &AppState,
    lines: &[LineBody],
    discount_percent: f64,
    insurance_cents: i64,
) -> ApiResult<AssembledLines> {
    validate_line_count(lines.len())?;

    let mut items = Vec::with_capacity(lines.len());
    let mut calc_lines = Vec::with_capacity(lines.len());
    let mut has_prescription_line = false;

    for line in lines {
        validate_quantity(line.quantity)?;

        let drug = state
            .db
            .drugs()
            .get_by_id(&line.drug_id)
            .await?
            .filter(|d| d.is_active)
            .ok_or_else(|| ApiError::not_found(format!("Drug not found: {}", line.drug_id)))?;

        has_prescription_line |= drug.requires_prescription;

        calc_lines.push(TotalsLine::new(
            line.quantity,
            Money::from_cents(drug.price_cents),
            drug.category,
        ));
        items.push(NewInvoiceItem {
            drug_id: drug.id,
            sku: drug.sku,
            name: drug.name,
            category: drug.category,
            unit_price_cents: drug.price_cents,
            quantity: line.quantity,
        });
    }

    let config = &state.config;
    let mut params = TotalsParams {
        tax_rate: config.tax_rate(),
        discount: Rate::from_percent(discount_percent),
        dispensing_fee: if has_prescription_line {
            config.dispensing_fee()
        } else {
            Money::zero()
        },
        insurance_coverage: Money::from_cents(insurance_cents),
        tax_exempt_categories: Default::default(),
    };
    if config.prescription_tax_exempt {
        params
            .tax_exempt_categories
            .insert(pharma_core::DrugCategory::Prescription);
    }

    let totals = compute_totals(&calc_lines, &params);

    Ok(AssembledLines {
        items,
        totals,
        has_prescription_line,
    })
}

/// Resolves the optional customer, freezing the name onto the invoice.
pub async fn resolve_customer(
    state: &AppState,
    customer_id: &Option<String>,
) -> ApiResult<Option<String>> {
    match customer_id {
        None => Ok(None),
        Some(id) => {
            let customer = state
                .db
                .customers()
                .get_by_id(id)
                .await?
                .ok_or_else(|| ApiError::not_found(format!("Customer not found: {}", id)))?;
            Ok(Some(customer.name))
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/invoices
async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<InvoiceDto>>> {
    let invoices = state
        .db
        .invoices()
        .list(
            query.status,
            query.customer_id.as_deref(),
            query.limit,
            query.offset,
        )
        .await?;

    Ok(Json(invoices.into_iter().map(InvoiceDto::decorate).collect()))
}

/// GET /api/invoices/overdue
async fn list_overdue(State(state): State<AppState>) -> ApiResult<Json<Vec<InvoiceDto>>> {
    let today = Utc::now().date_naive();
    let invoices = state.db.invoices().list_overdue(today).await?;
    Ok(Json(invoices.into_iter().map(InvoiceDto::decorate).collect()))
}

/// GET /api/invoices/recurring
async fn list_recurring(State(state): State<AppState>) -> ApiResult<Json<Vec<InvoiceDto>>> {
    let invoices = state.db.invoices().list_recurring().await?;
    Ok(Json(invoices.into_iter().map(InvoiceDto::decorate).collect()))
}

/// POST /api/invoices - creates a draft billing invoice.
async fn create_invoice(
    State(state): State<AppState>,
    Json(body): Json<InvoiceBody>,
) -> ApiResult<(StatusCode, Json<InvoiceDetail>)> {
    let customer_name = resolve_customer(&state, &body.customer_id).await?;
    let assembled =
        assemble_lines(&state, &body.lines, body.discount_percent, body.insurance_cents).await?;

    let invoice = state
        .db
        .invoices()
        .create(NewInvoice {
            customer_id: body.customer_id,
            customer_name,
            items: assembled.items,
            totals: assembled.totals,
            due_date: body.due_date,
            notes: body.notes,
            recurrence_days: body.recurrence_days,
            finalize: false,
        })
        .await?;

    let detail = load_detail(&state, &invoice.id).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/invoices/:id
async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<InvoiceDetail>> {
    Ok(Json(load_detail(&state, &id).await?))
}

/// PATCH /api/invoices/:id - replaces a draft's lines, recomputing totals.
async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<InvoiceBody>,
) -> ApiResult<Json<InvoiceDetail>> {
    let assembled =
        assemble_lines(&state, &body.lines, body.discount_percent, body.insurance_cents).await?;

    state
        .db
        .invoices()
        .update_draft(&id, &assembled.items, &assembled.totals, body.due_date, body.notes)
        .await?;

    Ok(Json(load_detail(&state, &id).await?))
}

/// DELETE /api/invoices/:id - drafts only.
async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.invoices().delete_draft(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/invoices/:id/finalize - freeze lines and commit stock.
async fn finalize_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<InvoiceDto>> {
    let invoice = state.db.invoices().finalize(&id).await?;
    Ok(Json(InvoiceDto::decorate(invoice)))
}

/// GET /api/invoices/:id/payments
async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Payment>>> {
    Ok(Json(state.db.invoices().get_payments(&id).await?))
}

/// POST /api/invoices/:id/payments
///
/// Runs the payment state machine in a transaction. Overpayments come
/// back as 422 with nothing stored.
async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PaymentBody>,
) -> ApiResult<(StatusCode, Json<SettlementResponse>)> {
    let (invoice, payment) = state
        .db
        .invoices()
        .record_payment(
            &id,
            NewPayment {
                method: body.method,
                amount_cents: body.amount_cents,
                tendered_cents: None,
                change_cents: None,
                reference: body.reference,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SettlementResponse {
            invoice: InvoiceDto::decorate(invoice),
            payment,
        }),
    ))
}

/// POST /api/invoices/:id/refund - terminal, partial or full.
async fn refund_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RefundBody>,
) -> ApiResult<Json<SettlementResponse>> {
    let (invoice, payment) = state
        .db
        .invoices()
        .refund(&id, body.amount_cents, body.method, body.reference)
        .await?;

    Ok(Json(SettlementResponse {
        invoice: InvoiceDto::decorate(invoice),
        payment,
    }))
}

async fn load_detail(state: &AppState, id: &str) -> ApiResult<InvoiceDetail> {
    let invoice = state
        .db
        .invoices()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Invoice not found: {}", id)))?;

    let items = state.db.invoices().get_items(id).await?;
    let payments = state.db.invoices().get_payments(id).await?;

    Ok(InvoiceDetail {
        invoice: InvoiceDto::decorate(invoice),
        items,
        payments,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/invoices", get(list_invoices).post(create_invoice))
        .route("/api/invoices/overdue", get(list_overdue))
        .route("/api/invoices/recurring", get(list_recurring))
        .route(
            "/api/invoices/:id",
            get(get_invoice).patch(update_invoice).delete(delete_invoice),
        )
        .route("/api/invoices/:id/finalize", post(finalize_invoice))
        .route(
            "/api/invoices/:id/payments",
            get(list_payments).post(record_payment),
        )
        .route("/api/invoices/:id/refund", post(refund_invoice))
}
