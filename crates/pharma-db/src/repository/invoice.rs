//! # Invoice Repository
//!
//! Database operations for invoices, line items, payments, and refunds.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Invoice Lifecycle                                  │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create() → Invoice (draft or finalized at birth)               │
//! │         Items carry drug snapshots; totals come from the caller,       │
//! │         already computed by pharma-core.                               │
//! │                                                                         │
//! │  2. EDIT (drafts only)                                                 │
//! │     └── update_draft() → replaces items + totals wholesale             │
//! │                                                                         │
//! │  3. FINALIZE                                                           │
//! │     └── finalize() → decrements stock (guarded), freezes the lines     │
//! │                                                                         │
//! │  4. SETTLE                                                             │
//! │     └── record_payment() / refund()                                    │
//! │         One transaction: load → state machine → persist. The          │
//! │         paid <= total invariant is enforced by the machine and         │
//! │         double-checked by a CHECK constraint.                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharma_core::{
    CoreError, DrugCategory, Invoice, InvoiceItem, InvoiceTotals, Money, Payment, PaymentMethod,
    PaymentState, PaymentStatus,
};

// =============================================================================
// Input Types
// =============================================================================

/// A line to place on a new or edited invoice.
///
/// Snapshot fields (sku, name, category, unit price) are captured by the
/// caller from the catalog at the moment of sale.
#[derive(Debug, Clone)]
pub struct NewInvoiceItem {
    pub drug_id: String,
    pub sku: String,
    pub name: String,
    pub category: DrugCategory,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

/// Everything needed to create an invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub items: Vec<NewInvoiceItem>,
    /// Figures from the totals calculator; stored verbatim.
    pub totals: InvoiceTotals,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub recurrence_days: Option<i64>,
    /// POS checkouts finalize at birth; billing invoices start as drafts.
    pub finalize: bool,
}

/// A payment to record against an invoice.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub tendered_cents: Option<i64>,
    pub change_cents: Option<i64>,
    pub reference: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    /// Gets all items for an invoice, in insertion order.
    pub async fn get_items(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = ?1 ORDER BY created_at, id",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets all payments for an invoice. Refunds appear as negative rows.
    pub async fn get_payments(&self, invoice_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE invoice_id = ?1 ORDER BY created_at, id",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Lists invoices, newest first, optionally filtered.
    pub async fn list(
        &self,
        status: Option<PaymentStatus>,
        customer_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR customer_id = ?2)
            ORDER BY created_at DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(status)
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Lists unsettled invoices whose due date has passed.
    pub async fn list_overdue(&self, today: NaiveDate) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE status IN ('unpaid', 'partial')
              AND due_date IS NOT NULL
              AND due_date < ?1
            ORDER BY due_date ASC
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Lists recurring invoice templates.
    pub async fn list_recurring(&self) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE recurrence_days IS NOT NULL ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Creates an invoice with its line items in one transaction.
    ///
    /// Status comes from the payment state machine: a zero-total invoice
    /// is born Paid, anything else Unpaid. When `finalize` is set the
    /// stock decrement happens in the same transaction; a stock shortage
    /// rolls the whole invoice back.
    pub async fn create(&self, new: NewInvoice) -> DbResult<Invoice> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let invoice_number = next_invoice_number(&mut tx).await?;
        let total = new.totals.grand_total;
        let status = PaymentState::new(total).status();
        let finalized_at = if new.finalize { Some(now) } else { None };

        debug!(id = %id, invoice_number = %invoice_number, total = total.cents(), "Creating invoice");

        let invoice = Invoice {
            id: id.clone(),
            invoice_number,
            customer_id: new.customer_id,
            customer_name: new.customer_name,
            status,
            subtotal_cents: new.totals.subtotal.cents(),
            discount_cents: new.totals.discount_amount.cents(),
            dispensing_fee_cents: new.totals.dispensing_fee.cents(),
            tax_cents: new.totals.tax_amount.cents(),
            insurance_cents: new.totals.insurance_applied.cents(),
            total_cents: total.cents(),
            paid_cents: 0,
            due_date: new.due_date,
            notes: new.notes,
            recurrence_days: new.recurrence_days,
            created_at: now,
            updated_at: now,
            finalized_at,
        };

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, customer_id, customer_name, status,
                subtotal_cents, discount_cents, dispensing_fee_cents,
                tax_cents, insurance_cents, total_cents, paid_cents,
                due_date, notes, recurrence_days,
                created_at, updated_at, finalized_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15,
                ?16, ?17, ?18
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.customer_id)
        .bind(&invoice.customer_name)
        .bind(invoice.status)
        .bind(invoice.subtotal_cents)
        .bind(invoice.discount_cents)
        .bind(invoice.dispensing_fee_cents)
        .bind(invoice.tax_cents)
        .bind(invoice.insurance_cents)
        .bind(invoice.total_cents)
        .bind(invoice.paid_cents)
        .bind(invoice.due_date)
        .bind(&invoice.notes)
        .bind(invoice.recurrence_days)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .bind(invoice.finalized_at)
        .execute(&mut *tx)
        .await?;

        for item in &new.items {
            insert_item(&mut tx, &invoice.id, item, now).await?;
            if new.finalize {
                decrement_stock(&mut tx, &item.drug_id, item.quantity).await?;
            }
        }

        tx.commit().await?;

        Ok(invoice)
    }

    /// Replaces a draft invoice's lines and totals wholesale.
    ///
    /// Totals are recomputed by the caller from the new lines, never
    /// adjusted incrementally. Finalized invoices are frozen.
    pub async fn update_draft(
        &self,
        id: &str,
        items: &[NewInvoiceItem],
        totals: &InvoiceTotals,
        due_date: Option<NaiveDate>,
        notes: Option<String>,
    ) -> DbResult<Invoice> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))?;

        if !invoice.is_draft() {
            return Err(DbError::Domain(CoreError::InvalidStatus {
                entity: "Invoice".to_string(),
                status: "finalized".to_string(),
            }));
        }

        let total = totals.grand_total;
        let status = PaymentState::new(total).status();

        sqlx::query(
            r#"
            UPDATE invoices SET
                subtotal_cents = ?2,
                discount_cents = ?3,
                dispensing_fee_cents = ?4,
                tax_cents = ?5,
                insurance_cents = ?6,
                total_cents = ?7,
                status = ?8,
                due_date = ?9,
                notes = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(totals.subtotal.cents())
        .bind(totals.discount_amount.cents())
        .bind(totals.dispensing_fee.cents())
        .bind(totals.tax_amount.cents())
        .bind(totals.insurance_applied.cents())
        .bind(total.cents())
        .bind(status)
        .bind(due_date)
        .bind(&notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for item in items {
            insert_item(&mut tx, id, item, now).await?;
        }

        tx.commit().await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))
    }

    /// Finalizes a draft: decrements stock for every line (guarded) and
    /// freezes the invoice. A stock shortage rolls everything back.
    pub async fn finalize(&self, id: &str) -> DbResult<Invoice> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))?;

        if !invoice.is_draft() {
            return Err(DbError::Domain(CoreError::InvalidStatus {
                entity: "Invoice".to_string(),
                status: "finalized".to_string(),
            }));
        }

        let items = sqlx::query_as::<_, InvoiceItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = ?1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for item in &items {
            decrement_stock(&mut tx, &item.drug_id, item.quantity).await?;
        }

        sqlx::query("UPDATE invoices SET finalized_at = ?2, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))
    }

    /// Deletes a draft invoice and its lines. Finalized invoices are
    /// history and cannot be deleted.
    pub async fn delete_draft(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1 AND finalized_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice (draft)", id));
        }

        Ok(())
    }

    /// Records a payment through the state machine, in one transaction.
    ///
    /// ## Flow
    /// ```text
    /// BEGIN
    ///   load invoice              ← current total/paid/status
    ///   PaymentState::record_payment(amount)
    ///       ├── Err(Overpayment | InvalidAmount | InvalidStatus)
    ///       │       → ROLLBACK, nothing stored
    ///       └── Ok(new_status)
    ///   INSERT payment row
    ///   UPDATE invoice paid/status
    /// COMMIT
    /// ```
    pub async fn record_payment(
        &self,
        invoice_id: &str,
        new: NewPayment,
    ) -> DbResult<(Invoice, Payment)> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(invoice_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;

        let mut state = PaymentState::from_parts(
            Money::from_cents(invoice.total_cents),
            Money::from_cents(invoice.paid_cents),
            invoice.status,
        );

        let new_status = state
            .record_payment(Money::from_cents(new.amount_cents))
            .map_err(DbError::Domain)?;

        debug!(
            invoice_id = %invoice_id,
            amount = new.amount_cents,
            status = new_status.as_str(),
            "Recording payment"
        );

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.to_string(),
            method: new.method,
            amount_cents: new.amount_cents,
            tendered_cents: new.tendered_cents,
            change_cents: new.change_cents,
            reference: new.reference,
            created_at: now,
        };

        insert_payment(&mut tx, &payment).await?;

        sqlx::query(
            "UPDATE invoices SET paid_cents = ?2, status = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(invoice_id)
        .bind(state.paid().cents())
        .bind(new_status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let updated = self
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;

        Ok((updated, payment))
    }

    /// Refunds some or all of what was paid. Terminal: the invoice ends
    /// up Refunded regardless of the refund size.
    ///
    /// The refund is stored as a negative payment row so the payment
    /// history sums to `paid_cents`.
    pub async fn refund(
        &self,
        invoice_id: &str,
        amount_cents: i64,
        method: PaymentMethod,
        reference: Option<String>,
    ) -> DbResult<(Invoice, Payment)> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(invoice_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;

        let mut state = PaymentState::from_parts(
            Money::from_cents(invoice.total_cents),
            Money::from_cents(invoice.paid_cents),
            invoice.status,
        );

        let new_status = state
            .refund(Money::from_cents(amount_cents))
            .map_err(DbError::Domain)?;

        debug!(invoice_id = %invoice_id, amount = amount_cents, "Refunding");

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.to_string(),
            method,
            amount_cents: -amount_cents,
            tendered_cents: None,
            change_cents: None,
            reference,
            created_at: now,
        };

        insert_payment(&mut tx, &payment).await?;

        sqlx::query(
            "UPDATE invoices SET paid_cents = ?2, status = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(invoice_id)
        .bind(state.paid().cents())
        .bind(new_status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let updated = self
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;

        Ok((updated, payment))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Generates the next invoice number: `INV-YYYYMMDD-NNNN`.
///
/// The sequence is the per-day row count plus one, read inside the
/// caller's transaction so concurrent creations serialize on it.
async fn next_invoice_number(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
) -> DbResult<String> {
    let now = Utc::now();
    let date_part = now.format("%Y%m%d").to_string();
    let prefix = format!("INV-{}-%", date_part);

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE invoice_number LIKE ?1")
            .bind(&prefix)
            .fetch_one(&mut **tx)
            .await?;

    Ok(format!("INV-{}-{:04}", date_part, count + 1))
}

async fn insert_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    invoice_id: &str,
    item: &NewInvoiceItem,
    now: chrono::DateTime<Utc>,
) -> DbResult<()> {
    let line_total = item.unit_price_cents * item.quantity;

    sqlx::query(
        r#"
        INSERT INTO invoice_items (
            id, invoice_id, drug_id, sku, name, category,
            unit_price_cents, quantity, line_total_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(invoice_id)
    .bind(&item.drug_id)
    .bind(&item.sku)
    .bind(&item.name)
    .bind(item.category)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(line_total)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_payment(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    payment: &Payment,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, invoice_id, method, amount_cents,
            tendered_cents, change_cents, reference, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.invoice_id)
    .bind(payment.method)
    .bind(payment.amount_cents)
    .bind(payment.tendered_cents)
    .bind(payment.change_cents)
    .bind(&payment.reference)
    .bind(payment.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Guarded stock decrement: fails with InsufficientStock when the drug
/// does not have `quantity` on hand.
async fn decrement_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    drug_id: &str,
    quantity: i64,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE drugs SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(drug_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT sku, stock FROM drugs WHERE id = ?1")
                .bind(drug_id)
                .fetch_optional(&mut **tx)
                .await?;

        return match row {
            Some((sku, available)) => Err(DbError::Domain(CoreError::InsufficientStock {
                sku,
                available,
                requested: quantity,
            })),
            None => Err(DbError::not_found("Drug", drug_id)),
        };
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use pharma_core::{compute_totals, Drug, Rate, TotalsLine, TotalsParams};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_drug(db: &Database, sku: &str, price_cents: i64, stock: i64) -> Drug {
        let now = Utc::now();
        let drug = Drug {
            id: Uuid::new_v4().to_string(),
            sku: sku.to_string(),
            barcode: None,
            name: format!("Drug {}", sku),
            description: None,
            category: DrugCategory::OtcMedicine,
            price_cents,
            cost_cents: None,
            stock,
            reorder_level: 5,
            requires_prescription: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.drugs().insert(&drug).await.unwrap();
        drug
    }

    fn invoice_for(drug: &Drug, quantity: i64, finalize: bool) -> NewInvoice {
        let lines = vec![TotalsLine::new(
            quantity,
            Money::from_cents(drug.price_cents),
            drug.category,
        )];
        let totals = compute_totals(&lines, &TotalsParams::with_tax_rate(Rate::zero()));

        NewInvoice {
            customer_id: None,
            customer_name: None,
            items: vec![NewInvoiceItem {
                drug_id: drug.id.clone(),
                sku: drug.sku.clone(),
                name: drug.name.clone(),
                category: drug.category,
                unit_price_cents: drug.price_cents,
                quantity,
            }],
            totals,
            due_date: None,
            notes: None,
            recurrence_days: None,
            finalize,
        }
    }

    #[tokio::test]
    async fn test_checkout_decrements_stock_and_starts_unpaid() {
        let db = test_db().await;
        let drug = seed_drug(&db, "PARA-500", 1000, 10).await;

        let invoice = db.invoices().create(invoice_for(&drug, 3, true)).await.unwrap();
        assert_eq!(invoice.status, PaymentStatus::Unpaid);
        assert_eq!(invoice.total_cents, 3000);
        assert!(invoice.invoice_number.starts_with("INV-"));

        let remaining = db.drugs().get_by_id(&drug.id).await.unwrap().unwrap();
        assert_eq!(remaining.stock, 7);

        let items = db.invoices().get_items(&invoice.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].line_total_cents, 3000);
    }

    #[tokio::test]
    async fn test_stock_shortage_rolls_back_whole_invoice() {
        let db = test_db().await;
        let drug = seed_drug(&db, "AMOX-500", 1200, 2).await;

        let err = db.invoices().create(invoice_for(&drug, 5, true)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 2, .. })
        ));

        // Nothing was stored and stock is untouched.
        let unchanged = db.drugs().get_by_id(&drug.id).await.unwrap().unwrap();
        assert_eq!(unchanged.stock, 2);
        let invoices = db.invoices().list(None, None, 10, 0).await.unwrap();
        assert!(invoices.is_empty());
    }

    #[tokio::test]
    async fn test_payment_flow_partial_then_paid() {
        let db = test_db().await;
        let drug = seed_drug(&db, "IBU-200", 5000, 10).await;
        let invoice = db.invoices().create(invoice_for(&drug, 2, true)).await.unwrap();
        assert_eq!(invoice.total_cents, 10000);

        let pay = |amount: i64| NewPayment {
            method: PaymentMethod::Cash,
            amount_cents: amount,
            tendered_cents: None,
            change_cents: None,
            reference: None,
        };

        let (after_first, _) = db.invoices().record_payment(&invoice.id, pay(4000)).await.unwrap();
        assert_eq!(after_first.status, PaymentStatus::Partial);
        assert_eq!(after_first.paid_cents, 4000);

        let (after_second, _) = db.invoices().record_payment(&invoice.id, pay(6000)).await.unwrap();
        assert_eq!(after_second.status, PaymentStatus::Paid);
        assert_eq!(after_second.paid_cents, 10000);

        let payments = db.invoices().get_payments(&invoice.id).await.unwrap();
        assert_eq!(payments.len(), 2);
    }

    #[tokio::test]
    async fn test_overpayment_rejected_and_rolled_back() {
        let db = test_db().await;
        let drug = seed_drug(&db, "CET-10", 12500, 10).await;
        let invoice = db.invoices().create(invoice_for(&drug, 1, true)).await.unwrap();

        db.invoices()
            .record_payment(
                &invoice.id,
                NewPayment {
                    method: PaymentMethod::Cash,
                    amount_cents: 2500,
                    tendered_cents: None,
                    change_cents: None,
                    reference: None,
                },
            )
            .await
            .unwrap();

        let err = db
            .invoices()
            .record_payment(
                &invoice.id,
                NewPayment {
                    method: PaymentMethod::Card,
                    amount_cents: 15000,
                    tendered_cents: None,
                    change_cents: None,
                    reference: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Overpayment {
                attempted_cents: 15000,
                outstanding_cents: 10000,
            })
        ));

        // No payment row stored, invoice untouched.
        let unchanged = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(unchanged.paid_cents, 2500);
        assert_eq!(unchanged.status, PaymentStatus::Partial);
        assert_eq!(db.invoices().get_payments(&invoice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refund_is_terminal() {
        let db = test_db().await;
        let drug = seed_drug(&db, "LOR-10", 4000, 10).await;
        let invoice = db.invoices().create(invoice_for(&drug, 1, true)).await.unwrap();

        db.invoices()
            .record_payment(
                &invoice.id,
                NewPayment {
                    method: PaymentMethod::Cash,
                    amount_cents: 4000,
                    tendered_cents: None,
                    change_cents: None,
                    reference: None,
                },
            )
            .await
            .unwrap();

        let (refunded, row) = db
            .invoices()
            .refund(&invoice.id, 4000, PaymentMethod::Cash, None)
            .await
            .unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);
        assert_eq!(refunded.paid_cents, 0);
        assert_eq!(row.amount_cents, -4000);

        // No further payments accepted.
        let err = db
            .invoices()
            .record_payment(
                &invoice.id,
                NewPayment {
                    method: PaymentMethod::Cash,
                    amount_cents: 100,
                    tendered_cents: None,
                    change_cents: None,
                    reference: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn test_draft_edit_then_finalize() {
        let db = test_db().await;
        let drug = seed_drug(&db, "ASP-100", 500, 20).await;

        let invoice = db.invoices().create(invoice_for(&drug, 2, false)).await.unwrap();
        assert!(invoice.finalized_at.is_none());

        // Draft creation leaves stock alone.
        assert_eq!(db.drugs().get_by_id(&drug.id).await.unwrap().unwrap().stock, 20);

        // Replace the lines: 5 units instead of 2.
        let lines = vec![TotalsLine::new(5, Money::from_cents(500), drug.category)];
        let totals = compute_totals(&lines, &TotalsParams::with_tax_rate(Rate::zero()));
        let updated = db
            .invoices()
            .update_draft(
                &invoice.id,
                &[NewInvoiceItem {
                    drug_id: drug.id.clone(),
                    sku: drug.sku.clone(),
                    name: drug.name.clone(),
                    category: drug.category,
                    unit_price_cents: 500,
                    quantity: 5,
                }],
                &totals,
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.total_cents, 2500);

        let finalized = db.invoices().finalize(&invoice.id).await.unwrap();
        assert!(finalized.finalized_at.is_some());
        assert_eq!(db.drugs().get_by_id(&drug.id).await.unwrap().unwrap().stock, 15);

        // Frozen now: further edits rejected.
        let err = db
            .invoices()
            .update_draft(&invoice.id, &[], &totals, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn test_invoice_numbers_increment_per_day() {
        let db = test_db().await;
        let drug = seed_drug(&db, "VIT-C", 800, 50).await;

        let first = db.invoices().create(invoice_for(&drug, 1, true)).await.unwrap();
        let second = db.invoices().create(invoice_for(&drug, 1, true)).await.unwrap();

        assert!(first.invoice_number.ends_with("-0001"));
        assert!(second.invoice_number.ends_with("-0002"));
    }
}
