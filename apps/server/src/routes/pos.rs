//! Point-of-sale checkout: one call that prices, commits stock, and
//! settles payment atomically.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use pharma_core::{change_due, Money, Payment, PaymentMethod};
use pharma_db::{NewInvoice, NewPayment};

use crate::error::ApiResult;
use crate::routes::invoices::{assemble_lines, resolve_customer, InvoiceDto, LineBody};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CheckoutBody {
    customer_id: Option<String>,
    lines: Vec<LineBody>,
    #[serde(default)]
    discount_percent: f64,
    #[serde(default)]
    insurance_cents: i64,
    method: PaymentMethod,
    /// Required for cash: change is computed server-side and the sale
    /// is rejected before any write if the cash does not cover it.
    cash_received_cents: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CheckoutResponse {
    invoice: InvoiceDto,
    payment: Option<Payment>,
    change_cents: i64,
}

/// POST /api/pos/checkout
async fn checkout(
    State(state): State<AppState>,
    Json(body): Json<CheckoutBody>,
) -> ApiResult<(StatusCode, Json<CheckoutResponse>)> {
    let customer_name = resolve_customer(&state, &body.customer_id).await?;
    let assembled =
        assemble_lines(&state, &body.lines, body.discount_percent, body.insurance_cents).await?;
    let grand_total = assembled.totals.grand_total;

    // Cash is checked before any write so a short drawer never touches stock.
    let (tendered, change) = match (body.method, body.cash_received_cents) {
        (PaymentMethod::Cash, received) => {
            let received = Money::from_cents(received.unwrap_or(0));
            let change = change_due(grand_total, received)?;
            (Some(received.cents()), Some(change.cents()))
        }
        _ => (None, None),
    };

    let invoice = state
        .db
        .invoices()
        .create(NewInvoice {
            customer_id: body.customer_id,
            customer_name,
            items: assembled.items,
            totals: assembled.totals,
            due_date: None,
            notes: None,
            recurrence_days: None,
            finalize: true,
        })
        .await?;

    // Fully-covered sales (insurance wiped the total) have nothing to settle.
    let (invoice, payment) = if grand_total.cents() > 0 {
        let (invoice, payment) = state
            .db
            .invoices()
            .record_payment(
                &invoice.id,
                NewPayment {
                    method: body.method,
                    amount_cents: grand_total.cents(),
                    tendered_cents: tendered,
                    change_cents: change,
                    reference: None,
                },
            )
            .await?;
        (invoice, Some(payment))
    } else {
        (invoice, None)
    };

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            invoice: InvoiceDto::decorate(invoice),
            payment,
            change_cents: change.unwrap_or(0),
        }),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/pos/checkout", post(checkout))
}
