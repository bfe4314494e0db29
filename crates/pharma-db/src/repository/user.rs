//! # User Repository
//!
//! Staff accounts for authentication. Password hashes are written here
//! but hashing/verification itself lives in the server's auth layer.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use pharma_core::User;

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets an active user by username (login lookup).
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = ?1 AND is_active = 1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Inserts a new user.
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id, username = %user.username, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, full_name, email, role, password_hash,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.role)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates profile fields (name, email).
    pub async fn update_profile(
        &self,
        id: &str,
        full_name: &str,
        email: Option<&str>,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE users SET full_name = ?2, email = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Replaces the stored password hash.
    pub async fn update_password_hash(&self, id: &str, password_hash: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Counts users. Used at startup to decide whether to seed an admin.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use pharma_core::UserRole;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_login_lookup_ignores_inactive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        let now = Utc::now();
        let mut user = User {
            id: Uuid::new_v4().to_string(),
            username: "asha".to_string(),
            full_name: "Asha Patel".to_string(),
            email: None,
            role: UserRole::Pharmacist,
            password_hash: "$argon2id$stub".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        repo.insert(&user).await.unwrap();
        assert!(repo.get_by_username("asha").await.unwrap().is_some());

        user.is_active = false;
        sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?1")
            .bind(&user.id)
            .execute(db.pool())
            .await
            .unwrap();
        assert!(repo.get_by_username("asha").await.unwrap().is_none());
    }
}
