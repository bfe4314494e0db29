//! # Purchase Order Repository
//!
//! Restocking orders placed with suppliers.
//!
//! ## Status Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Draft ──► Sent ──► Received  (stock bumped in same transaction)      │
//! │     │        │                                                          │
//! │     └────────┴─────► Cancelled                                          │
//! │                                                                         │
//! │  Received and Cancelled are terminal.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharma_core::{CoreError, PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus};

/// A line for a new purchase order.
#[derive(Debug, Clone)]
pub struct NewPurchaseOrderItem {
    pub drug_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

/// Everything needed to create a purchase order.
#[derive(Debug, Clone)]
pub struct NewPurchaseOrder {
    pub supplier_id: String,
    pub items: Vec<NewPurchaseOrderItem>,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Repository for purchase order database operations.
#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    pool: SqlitePool,
}

impl PurchaseOrderRepository {
    /// Creates a new PurchaseOrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseOrderRepository { pool }
    }

    /// Gets a purchase order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PurchaseOrder>> {
        let order =
            sqlx::query_as::<_, PurchaseOrder>("SELECT * FROM purchase_orders WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(order)
    }

    /// Gets the lines of a purchase order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<PurchaseOrderItem>> {
        let items = sqlx::query_as::<_, PurchaseOrderItem>(
            "SELECT * FROM purchase_order_items WHERE purchase_order_id = ?1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists purchase orders, newest first, optionally filtered by status.
    pub async fn list(
        &self,
        status: Option<PurchaseOrderStatus>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<PurchaseOrder>> {
        let orders = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            SELECT * FROM purchase_orders
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Creates a draft purchase order with its lines in one transaction.
    pub async fn create(&self, new: NewPurchaseOrder) -> DbResult<PurchaseOrder> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let total_cents: i64 = new
            .items
            .iter()
            .map(|i| i.unit_cost_cents * i.quantity)
            .sum();

        let mut tx = self.pool.begin().await?;

        let order_number = next_order_number(&mut tx).await?;

        debug!(id = %id, order_number = %order_number, "Creating purchase order");

        let order = PurchaseOrder {
            id: id.clone(),
            order_number,
            supplier_id: new.supplier_id,
            status: PurchaseOrderStatus::Draft,
            total_cents,
            expected_date: new.expected_date,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, order_number, supplier_id, status, total_cents,
                expected_date, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.supplier_id)
        .bind(order.status)
        .bind(order.total_cents)
        .bind(order.expected_date)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &new.items {
            sqlx::query(
                r#"
                INSERT INTO purchase_order_items (
                    id, purchase_order_id, drug_id, name,
                    quantity, unit_cost_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&order.id)
            .bind(&item.drug_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit_cost_cents)
            .bind(item.unit_cost_cents * item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(order)
    }

    /// Replaces a draft order's lines and header fields, recomputing the
    /// cached total. Sent or later orders are frozen.
    pub async fn update_draft(
        &self,
        id: &str,
        items: &[NewPurchaseOrderItem],
        expected_date: Option<NaiveDate>,
        notes: Option<String>,
    ) -> DbResult<PurchaseOrder> {
        let now = Utc::now();

        let total_cents: i64 = items.iter().map(|i| i.unit_cost_cents * i.quantity).sum();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE purchase_orders
            SET total_cents = ?2, expected_date = ?3, notes = ?4, updated_at = ?5
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(id)
        .bind(total_cents)
        .bind(expected_date)
        .bind(&notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            self.reject_transition(id).await?;
            return Err(DbError::not_found("Purchase order", id));
        }

        sqlx::query("DELETE FROM purchase_order_items WHERE purchase_order_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO purchase_order_items (
                    id, purchase_order_id, drug_id, name,
                    quantity, unit_cost_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(id)
            .bind(&item.drug_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit_cost_cents)
            .bind(item.unit_cost_cents * item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase order", id))
    }

    /// Marks a draft order as sent to the supplier.
    pub async fn mark_sent(&self, id: &str) -> DbResult<()> {
        self.transition(id, PurchaseOrderStatus::Sent, &["draft"]).await
    }

    /// Cancels an order that has not been received yet.
    pub async fn cancel(&self, id: &str) -> DbResult<()> {
        self.transition(id, PurchaseOrderStatus::Cancelled, &["draft", "sent"])
            .await
    }

    /// Receives a sent order: marks it Received and bumps stock for every
    /// line, all in one transaction.
    pub async fn receive(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE purchase_orders SET status = 'received', updated_at = ?2
            WHERE id = ?1 AND status = 'sent'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Release the connection before the diagnostic lookup
            tx.rollback().await?;
            return self.reject_transition(id).await;
        }

        let items = sqlx::query_as::<_, PurchaseOrderItem>(
            "SELECT * FROM purchase_order_items WHERE purchase_order_id = ?1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for item in &items {
            sqlx::query("UPDATE drugs SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
                .bind(&item.drug_id)
                .bind(item.quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Deletes a draft order.
    pub async fn delete_draft(&self, id: &str) -> DbResult<()> {
        let result =
            sqlx::query("DELETE FROM purchase_orders WHERE id = ?1 AND status = 'draft'")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase order (draft)", id));
        }

        Ok(())
    }

    /// Guarded status update: only fires when the current status is in
    /// `allowed_from`.
    async fn transition(
        &self,
        id: &str,
        to: PurchaseOrderStatus,
        allowed_from: &[&str],
    ) -> DbResult<()> {
        let now = Utc::now();

        // allowed_from is a compile-time list of status literals
        let placeholders = allowed_from
            .iter()
            .map(|s| format!("'{}'", s))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE purchase_orders SET status = ?2, updated_at = ?3 \
             WHERE id = ?1 AND status IN ({})",
            placeholders
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(to)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return self.reject_transition(id).await;
        }

        Ok(())
    }

    /// Distinguishes "no such order" from "wrong status" for a failed
    /// guarded update.
    async fn reject_transition(&self, id: &str) -> DbResult<()> {
        match self.get_by_id(id).await? {
            Some(order) => Err(DbError::Domain(CoreError::InvalidStatus {
                entity: "Purchase order".to_string(),
                status: format!("{:?}", order.status).to_lowercase(),
            })),
            None => Err(DbError::not_found("Purchase order", id)),
        }
    }
}

/// Generates the next order number: `PO-YYYYMMDD-NNNN`.
async fn next_order_number(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>) -> DbResult<String> {
    let now = Utc::now();
    let date_part = now.format("%Y%m%d").to_string();
    let prefix = format!("PO-{}-%", date_part);

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM purchase_orders WHERE order_number LIKE ?1")
            .bind(&prefix)
            .fetch_one(&mut **tx)
            .await?;

    Ok(format!("PO-{}-{:04}", date_part, count + 1))
}

// =============================================================================
// Unit Tests
// =============================================================================
