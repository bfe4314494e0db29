//! # Pharmacy Server
//!
//! REST API over the pharmacy core and storage crates.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            pharma-server                                │
//! │                                                                         │
//! │   routes/ ──► handlers (axum) ──► pharma-db repositories ──► SQLite    │
//! │      │                                 │                                │
//! │      │                                 └──► pharma-core (totals,       │
//! │      │                                      payment state machine)     │
//! │      │                                                                  │
//! │      └── auth middleware (JWT bearer) on everything but                 │
//! │          /health and /api/auth/login                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use pharma_core::{User, UserRole};
use pharma_db::{Database, DbResult};

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use routes::build_app;

/// Seeds the default admin account on an empty user table.
///
/// The generated password is logged once at startup and must be changed
/// through the profile endpoint.
pub async fn seed_admin(db: &Database) -> DbResult<()> {
    if db.users().count().await? > 0 {
        return Ok(());
    }

    let password = Uuid::new_v4().to_string();
    let hash = auth::hash_password(&password)
        .map_err(|err| pharma_db::DbError::Internal(err.message))?;

    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4().to_string(),
        username: "admin".to_string(),
        full_name: "Administrator".to_string(),
        email: None,
        role: UserRole::Admin,
        password_hash: hash,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    db.users().insert(&admin).await?;

    info!("Seeded default admin user");
    warn!(username = "admin", password = %password, "First-run admin credentials, change the password immediately");

    Ok(())
}
