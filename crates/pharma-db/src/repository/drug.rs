//! # Drug Repository
//!
//! Catalog operations: lookup, search, stock adjustment, batches.
//!
//! ## Stock Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Stock never goes negative.                                            │
//! │                                                                         │
//! │  Decrements use a guarded UPDATE:                                      │
//! │      UPDATE drugs SET stock = stock - ?                                │
//! │      WHERE id = ? AND stock >= ?                                       │
//! │                                                                         │
//! │  rows_affected == 0 → InsufficientStock, transaction rolls back.       │
//! │  Two concurrent checkouts of the last box: exactly one wins.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharma_core::{CoreError, Drug, DrugBatch};

/// Repository for drug catalog operations.
#[derive(Debug, Clone)]
pub struct DrugRepository {
    pool: SqlitePool,
}

impl DrugRepository {
    /// Creates a new DrugRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DrugRepository { pool }
    }

    /// Gets a drug by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Drug>> {
        let drug = sqlx::query_as::<_, Drug>("SELECT * FROM drugs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(drug)
    }

    /// Gets a drug by SKU (business identifier).
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Drug>> {
        let drug = sqlx::query_as::<_, Drug>("SELECT * FROM drugs WHERE sku = ?1")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(drug)
    }

    /// Searches active drugs by name, SKU, or barcode.
    ///
    /// Matching is case-insensitive substring (LIKE). Results are ordered
    /// by name, capped at `limit`.
    pub async fn search(&self, query: &str, limit: i64) -> DbResult<Vec<Drug>> {
        let pattern = format!("%{}%", query);

        let drugs = sqlx::query_as::<_, Drug>(
            r#"
            SELECT * FROM drugs
            WHERE is_active = 1
              AND (name LIKE ?1 OR sku LIKE ?1 OR barcode LIKE ?1)
            ORDER BY name
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(drugs)
    }

    /// Lists active drugs ordered by name.
    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<Drug>> {
        let drugs = sqlx::query_as::<_, Drug>(
            r#"
            SELECT * FROM drugs
            WHERE is_active = 1
            ORDER BY name
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(drugs)
    }

    /// Inserts a new drug.
    pub async fn insert(&self, drug: &Drug) -> DbResult<()> {
        debug!(id = %drug.id, sku = %drug.sku, "Inserting drug");

        sqlx::query(
            r#"
            INSERT INTO drugs (
                id, sku, barcode, name, description, category,
                price_cents, cost_cents, stock, reorder_level,
                requires_prescription, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&drug.id)
        .bind(&drug.sku)
        .bind(&drug.barcode)
        .bind(&drug.name)
        .bind(&drug.description)
        .bind(drug.category)
        .bind(drug.price_cents)
        .bind(drug.cost_cents)
        .bind(drug.stock)
        .bind(drug.reorder_level)
        .bind(drug.requires_prescription)
        .bind(drug.is_active)
        .bind(drug.created_at)
        .bind(drug.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates the editable fields of a drug.
    ///
    /// Stock is NOT updated here; use [`adjust_stock`](Self::adjust_stock)
    /// so the non-negative guard always applies.
    pub async fn update(&self, drug: &Drug) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE drugs SET
                sku = ?2,
                barcode = ?3,
                name = ?4,
                description = ?5,
                category = ?6,
                price_cents = ?7,
                cost_cents = ?8,
                reorder_level = ?9,
                requires_prescription = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&drug.id)
        .bind(&drug.sku)
        .bind(&drug.barcode)
        .bind(&drug.name)
        .bind(&drug.description)
        .bind(drug.category)
        .bind(drug.price_cents)
        .bind(drug.cost_cents)
        .bind(drug.reorder_level)
        .bind(drug.requires_prescription)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Drug", &drug.id));
        }

        Ok(())
    }

    /// Adjusts stock by `delta` (positive or negative).
    ///
    /// Decrements are guarded so stock never drops below zero; a failed
    /// guard surfaces as `InsufficientStock` with the current level.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<i64> {
        let now = Utc::now();

        let result = if delta < 0 {
            let need = -delta;
            sqlx::query(
                r#"
                UPDATE drugs SET stock = stock + ?2, updated_at = ?3
                WHERE id = ?1 AND stock >= ?4
                "#,
            )
            .bind(id)
            .bind(delta)
            .bind(now)
            .bind(need)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE drugs SET stock = stock + ?2, updated_at = ?3
                WHERE id = ?1
                "#,
            )
            .bind(id)
            .bind(delta)
            .bind(now)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            // Distinguish "no such drug" from "not enough stock"
            let drug = self
                .get_by_id(id)
                .await?
                .ok_or_else(|| DbError::not_found("Drug", id))?;
            return Err(DbError::Domain(CoreError::InsufficientStock {
                sku: drug.sku,
                available: drug.stock,
                requested: -delta,
            }));
        }

        let stock: i64 = sqlx::query_scalar("SELECT stock FROM drugs WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(stock)
    }

    /// Soft-deletes a drug (keeps invoice history intact).
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE drugs SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Drug", id));
        }

        Ok(())
    }

    /// Lists active drugs at or below their reorder level.
    pub async fn low_stock(&self) -> DbResult<Vec<Drug>> {
        let drugs = sqlx::query_as::<_, Drug>(
            r#"
            SELECT * FROM drugs
            WHERE is_active = 1 AND stock <= reorder_level
            ORDER BY stock ASC, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(drugs)
    }

    // =========================================================================
    // Batches
    // =========================================================================

    /// Lists batches for a drug, soonest expiry first.
    pub async fn list_batches(&self, drug_id: &str) -> DbResult<Vec<DrugBatch>> {
        let batches = sqlx::query_as::<_, DrugBatch>(
            r#"
            SELECT * FROM drug_batches
            WHERE drug_id = ?1
            ORDER BY expiry_date ASC
            "#,
        )
        .bind(drug_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Records a received batch and bumps the drug's stock in one
    /// transaction.
    pub async fn add_batch(
        &self,
        drug_id: &str,
        batch_number: &str,
        quantity: i64,
        expiry_date: NaiveDate,
    ) -> DbResult<DrugBatch> {
        let now = Utc::now();
        let batch = DrugBatch {
            id: Uuid::new_v4().to_string(),
            drug_id: drug_id.to_string(),
            batch_number: batch_number.to_string(),
            quantity,
            expiry_date,
            received_at: now,
        };

        debug!(drug_id = %drug_id, batch = %batch_number, quantity, "Adding batch");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO drug_batches (
                id, drug_id, batch_number, quantity, expiry_date, received_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.drug_id)
        .bind(&batch.batch_number)
        .bind(batch.quantity)
        .bind(batch.expiry_date)
        .bind(batch.received_at)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE drugs SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(drug_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Drug", drug_id));
        }

        tx.commit().await?;

        Ok(batch)
    }

    /// Lists batches expiring on or before `cutoff`, across all drugs.
    pub async fn expiring_batches(&self, cutoff: NaiveDate) -> DbResult<Vec<DrugBatch>> {
        let batches = sqlx::query_as::<_, DrugBatch>(
            r#"
            SELECT * FROM drug_batches
            WHERE expiry_date <= ?1 AND quantity > 0
            ORDER BY expiry_date ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use pharma_core::DrugCategory;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample_drug(sku: &str, stock: i64) -> Drug {
        let now = Utc::now();
        Drug {
            id: Uuid::new_v4().to_string(),
            sku: sku.to_string(),
            barcode: None,
            name: format!("Drug {}", sku),
            description: None,
            category: DrugCategory::OtcMedicine,
            price_cents: 999,
            cost_cents: Some(500),
            stock,
            reorder_level: 10,
            requires_prescription: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_search() {
        let db = test_db().await;
        let repo = db.drugs();

        let drug = sample_drug("PARA-500", 50);
        repo.insert(&drug).await.unwrap();

        let found = repo.search("PARA", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].sku, "PARA-500");

        let by_sku = repo.get_by_sku("PARA-500").await.unwrap().unwrap();
        assert_eq!(by_sku.id, drug.id);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = test_db().await;
        let repo = db.drugs();

        repo.insert(&sample_drug("IBU-200", 10)).await.unwrap();
        let err = repo.insert(&sample_drug("IBU-200", 5)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_stock_never_goes_negative() {
        let db = test_db().await;
        let repo = db.drugs();

        let drug = sample_drug("AMOX-500", 3);
        repo.insert(&drug).await.unwrap();

        // Decrement within stock succeeds
        let remaining = repo.adjust_stock(&drug.id, -2).await.unwrap();
        assert_eq!(remaining, 1);

        // Decrement past zero fails and leaves stock untouched
        let err = repo.adjust_stock(&drug.id, -2).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 1, .. })
        ));

        let unchanged = repo.get_by_id(&drug.id).await.unwrap().unwrap();
        assert_eq!(unchanged.stock, 1);
    }

    #[tokio::test]
    async fn test_low_stock_alert() {
        let db = test_db().await;
        let repo = db.drugs();

        repo.insert(&sample_drug("LOW-001", 5)).await.unwrap();
        repo.insert(&sample_drug("OK-001", 100)).await.unwrap();

        let low = repo.low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].sku, "LOW-001");
    }

    #[tokio::test]
    async fn test_batch_receipt_bumps_stock() {
        let db = test_db().await;
        let repo = db.drugs();

        let drug = sample_drug("CIP-250", 0);
        repo.insert(&drug).await.unwrap();

        let expiry = NaiveDate::from_ymd_opt(2027, 6, 30).unwrap();
        repo.add_batch(&drug.id, "LOT-42", 30, expiry).await.unwrap();

        let updated = repo.get_by_id(&drug.id).await.unwrap().unwrap();
        assert_eq!(updated.stock, 30);

        let batches = repo.list_batches(&drug.id).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].batch_number, "LOT-42");
    }
}
