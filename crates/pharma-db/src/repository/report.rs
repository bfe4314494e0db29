//! # Report Repository
//!
//! Read-only aggregate queries for the reporting endpoints. Figures come
//! straight from SQL aggregation over stored cents; nothing here mutates.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbResult;

// =============================================================================
// Report Rows
// =============================================================================

/// Sales aggregates over a closed date range.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SalesSummary {
    pub invoice_count: i64,
    /// Sum of invoice grand totals.
    pub revenue_cents: i64,
    /// Sum of recorded payments (net of refunds).
    pub collected_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
}

/// Current snapshot of the catalog.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InventorySummary {
    pub drug_count: i64,
    /// Sum of price * stock over active drugs.
    pub stock_value_cents: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
}

/// Purchasing aggregates over a closed date range.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PurchasesSummary {
    pub order_count: i64,
    pub total_cents: i64,
    pub received_count: i64,
    pub pending_count: i64,
}

/// Per-customer spend row for the top-customers report.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerSpend {
    pub customer_id: String,
    pub name: String,
    pub invoice_count: i64,
    pub total_cents: i64,
}

/// The numbers on the landing dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub today_invoice_count: i64,
    pub today_revenue_cents: i64,
    pub unpaid_count: i64,
    pub overdue_count: i64,
    pub low_stock_count: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for reporting aggregates.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Sales figures for finalized invoices created in `[from, to]`.
    pub async fn sales_summary(&self, from: NaiveDate, to: NaiveDate) -> DbResult<SalesSummary> {
        let summary = sqlx::query_as::<_, SalesSummary>(
            r#"
            SELECT
                COUNT(*) AS invoice_count,
                COALESCE(SUM(total_cents), 0) AS revenue_cents,
                COALESCE(SUM(paid_cents), 0) AS collected_cents,
                COALESCE(SUM(tax_cents), 0) AS tax_cents,
                COALESCE(SUM(discount_cents), 0) AS discount_cents
            FROM invoices
            WHERE finalized_at IS NOT NULL
              AND date(created_at) BETWEEN ?1 AND ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Snapshot of active catalog stock.
    pub async fn inventory_summary(&self) -> DbResult<InventorySummary> {
        let summary = sqlx::query_as::<_, InventorySummary>(
            r#"
            SELECT
                COUNT(*) AS drug_count,
                COALESCE(SUM(price_cents * stock), 0) AS stock_value_cents,
                COALESCE(SUM(CASE WHEN stock <= reorder_level THEN 1 ELSE 0 END), 0)
                    AS low_stock_count,
                COALESCE(SUM(CASE WHEN stock = 0 THEN 1 ELSE 0 END), 0)
                    AS out_of_stock_count
            FROM drugs
            WHERE is_active = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Purchasing figures for orders created in `[from, to]`.
    pub async fn purchases_summary(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<PurchasesSummary> {
        let summary = sqlx::query_as::<_, PurchasesSummary>(
            r#"
            SELECT
                COUNT(*) AS order_count,
                COALESCE(SUM(total_cents), 0) AS total_cents,
                COALESCE(SUM(CASE WHEN status = 'received' THEN 1 ELSE 0 END), 0)
                    AS received_count,
                COALESCE(SUM(CASE WHEN status IN ('draft', 'sent') THEN 1 ELSE 0 END), 0)
                    AS pending_count
            FROM purchase_orders
            WHERE date(created_at) BETWEEN ?1 AND ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Top customers by finalized invoice total, highest first.
    pub async fn top_customers(&self, limit: i64) -> DbResult<Vec<CustomerSpend>> {
        let rows = sqlx::query_as::<_, CustomerSpend>(
            r#"
            SELECT
                c.id AS customer_id,
                c.name AS name,
                COUNT(i.id) AS invoice_count,
                COALESCE(SUM(i.total_cents), 0) AS total_cents
            FROM customers c
            JOIN invoices i ON i.customer_id = c.id AND i.finalized_at IS NOT NULL
            GROUP BY c.id, c.name
            ORDER BY total_cents DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Dashboard numbers: today's trade plus open problems.
    pub async fn dashboard(&self, today: NaiveDate) -> DbResult<DashboardSummary> {
        let (today_invoice_count, today_revenue_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_cents), 0)
            FROM invoices
            WHERE finalized_at IS NOT NULL AND date(created_at) = ?1
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        let unpaid_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invoices WHERE status IN ('unpaid', 'partial')",
        )
        .fetch_one(&self.pool)
        .await?;

        let overdue_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM invoices
            WHERE status IN ('unpaid', 'partial')
              AND due_date IS NOT NULL AND due_date < ?1
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        let low_stock_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM drugs WHERE is_active = 1 AND stock <= reorder_level",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardSummary {
            today_invoice_count,
            today_revenue_cents,
            unpaid_count,
            overdue_count,
            low_stock_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    #[tokio::test]
    async fn test_empty_database_reports_zeroes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let today = Utc::now().date_naive();

        let sales = db.reports().sales_summary(today, today).await.unwrap();
        assert_eq!(sales.invoice_count, 0);
        assert_eq!(sales.revenue_cents, 0);

        let inventory = db.reports().inventory_summary().await.unwrap();
        assert_eq!(inventory.drug_count, 0);
        assert_eq!(inventory.stock_value_cents, 0);

        let dashboard = db.reports().dashboard(today).await.unwrap();
        assert_eq!(dashboard.today_invoice_count, 0);
        assert_eq!(dashboard.low_stock_count, 0);
    }
}
