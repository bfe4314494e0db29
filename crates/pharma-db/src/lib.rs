//! # pharma-db: Database Layer for PharmaPOS
//!
//! SQLite persistence for the pharmacy management system.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           pharma-db                                     │
//! │                                                                         │
//! │  pharma-server handlers                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database ── drugs() ───────► DrugRepository                           │
//! │      │   ── invoices() ─────► InvoiceRepository                        │
//! │      │   ── customers() ────► CustomerRepository                       │
//! │      │   ── suppliers() ────► SupplierRepository                       │
//! │      │   ── purchase_orders()─► PurchaseOrderRepository                │
//! │      │   ── prescriptions() ─► PrescriptionRepository                  │
//! │      │   ── users() ────────► UserRepository                           │
//! │      │   ── reports() ──────► ReportRepository                         │
//! │      ▼                                                                 │
//! │  SqlitePool (WAL mode, embedded migrations)                            │
//! │                                                                         │
//! │  Domain rules (totals, payment state machine) live in pharma-core;    │
//! │  this crate applies them inside transactions so stored invariants     │
//! │  (paid <= total, stock >= 0) survive concurrent writers.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::customer::CustomerRepository;
pub use repository::drug::DrugRepository;
pub use repository::invoice::{InvoiceRepository, NewInvoice, NewInvoiceItem, NewPayment};
pub use repository::prescription::PrescriptionRepository;
pub use repository::purchase_order::{NewPurchaseOrder, NewPurchaseOrderItem, PurchaseOrderRepository};
pub use repository::report::{
    CustomerSpend, DashboardSummary, InventorySummary, PurchasesSummary, ReportRepository,
    SalesSummary,
};
pub use repository::supplier::SupplierRepository;
pub use repository::user::UserRepository;
