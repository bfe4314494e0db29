//! # Prescription Repository
//!
//! Prescriptions on file for customers. The medication list is stored as
//! a JSON column (`medications_json`) and parsed on demand through
//! [`pharma_core::Prescription::medications`].

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use pharma_core::{Prescription, PrescriptionStatus};

/// Repository for prescription database operations.
#[derive(Debug, Clone)]
pub struct PrescriptionRepository {
    pool: SqlitePool,
}

impl PrescriptionRepository {
    /// Creates a new PrescriptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PrescriptionRepository { pool }
    }

    /// Gets a prescription by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Prescription>> {
        let prescription =
            sqlx::query_as::<_, Prescription>("SELECT * FROM prescriptions WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(prescription)
    }

    /// Lists prescriptions, newest first, optionally filtered by status.
    pub async fn list(
        &self,
        status: Option<PrescriptionStatus>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Prescription>> {
        let prescriptions = sqlx::query_as::<_, Prescription>(
            r#"
            SELECT * FROM prescriptions
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

        Ok(prescriptions)
    }

    /// Lists a customer's prescriptions, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Prescription>> {
        let prescriptions = sqlx::query_as::<_, Prescription>(
            "SELECT * FROM prescriptions WHERE customer_id = ?1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(prescriptions)
    }

    /// Inserts a new prescription.
    pub async fn insert(&self, prescription: &Prescription) -> DbResult<()> {
        debug!(
            id = %prescription.id,
            customer_id = %prescription.customer_id,
            "Inserting prescription"
        );

        sqlx::query(
            r#"
            INSERT INTO prescriptions (
                id, customer_id, prescriber_name, status, medications_json,
                issued_date, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&prescription.id)
        .bind(&prescription.customer_id)
        .bind(&prescription.prescriber_name)
        .bind(prescription.status)
        .bind(&prescription.medications_json)
        .bind(prescription.issued_date)
        .bind(&prescription.notes)
        .bind(prescription.created_at)
        .bind(prescription.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a prescription's content and status.
    pub async fn update(&self, prescription: &Prescription) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE prescriptions SET
                prescriber_name = ?2,
                status = ?3,
                medications_json = ?4,
                issued_date = ?5,
                notes = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&prescription.id)
        .bind(&prescription.prescriber_name)
        .bind(prescription.status)
        .bind(&prescription.medications_json)
        .bind(prescription.issued_date)
        .bind(&prescription.notes)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Prescription", &prescription.id));
        }

        Ok(())
    }

    /// Moves a prescription to a new status.
    pub async fn set_status(&self, id: &str, status: PrescriptionStatus) -> DbResult<()> {
        let now = Utc::now();

        let result =
            sqlx::query("UPDATE prescriptions SET status = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(status)
                .bind(now)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Prescription", id));
        }

        Ok(())
    }

    /// Deletes a prescription.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM prescriptions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Prescription", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use pharma_core::{Customer, PrescriptionMedication};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_insert_list_and_fill() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: "Sam Okafor".to_string(),
            email: None,
            phone: None,
            address: None,
            insurance_provider: None,
            insurance_number: None,
            created_at: now,
            updated_at: now,
        };
        db.customers().insert(&customer).await.unwrap();

        let meds = vec![PrescriptionMedication {
            drug_id: None,
            name: "Metformin 500mg".to_string(),
            dosage: "500mg".to_string(),
            frequency: "twice daily".to_string(),
            duration_days: Some(30),
            quantity: 60,
        }];
        let prescription = Prescription {
            id: Uuid::new_v4().to_string(),
            customer_id: customer.id.clone(),
            prescriber_name: "Dr. Lindqvist".to_string(),
            status: PrescriptionStatus::Pending,
            medications_json: serde_json::to_string(&meds).unwrap(),
            issued_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        let repo = db.prescriptions();
        repo.insert(&prescription).await.unwrap();

        let pending = repo.list(Some(PrescriptionStatus::Pending), 10, 0).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].medications().unwrap(), meds);

        repo.set_status(&prescription.id, PrescriptionStatus::Filled).await.unwrap();
        let filled = repo.get_by_id(&prescription.id).await.unwrap().unwrap();
        assert_eq!(filled.status, PrescriptionStatus::Filled);
    }
}
