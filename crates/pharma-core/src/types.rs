//! # Domain Types
//!
//! Core domain types used throughout PharmaPOS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Drug        │   │    Invoice      │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  invoice_number │   │  invoice_id(FK) │       │
//! │  │  category       │   │  status         │   │  method         │       │
//! │  │  price_cents    │   │  total_cents    │   │  amount_cents   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Plus: DrugBatch, Customer, Supplier, PurchaseOrder, Prescription,     │
//! │  User. Statuses are closed enums, never open strings.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, invoice_number, order_number) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::payment::PaymentStatus;

// =============================================================================
// Drug Category
// =============================================================================

/// Classification of a sellable pharmacy item.
///
/// Categories drive tax exemption: when the tenant enables "prescription
/// tax exempt", lines in the [`DrugCategory::Prescription`] category are
/// excluded from the taxable base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DrugCategory {
    /// Prescription-only medicine.
    Prescription,
    /// Over-the-counter medicine.
    OtcMedicine,
    /// Vitamins and supplements.
    Supplement,
    /// Bandages, syringes, other supplies.
    MedicalSupply,
    /// Everything else sold at the counter.
    Other,
}

impl Default for DrugCategory {
    fn default() -> Self {
        DrugCategory::Other
    }
}

// =============================================================================
// Drug
// =============================================================================

/// A sellable pharmacy item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Drug {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Display name shown in search results and on invoices.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,

    /// Category tag, drives tax exemption rules.
    pub category: DrugCategory,

    /// Selling price in cents.
    pub price_cents: i64,

    /// Purchase cost in cents (for margin reporting).
    pub cost_cents: Option<i64>,

    /// Current stock level across all batches.
    pub stock: i64,

    /// Stock level at which the low-stock alert fires.
    pub reorder_level: i64,

    /// Whether a prescription must be on file to dispense.
    pub requires_prescription: bool,

    /// Soft-delete flag.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Drug {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether stock has fallen to or below the reorder level.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.reorder_level
    }

    /// Checks if the requested quantity can be dispensed.
    pub fn can_dispense(&self, quantity: i64) -> bool {
        self.is_active && self.stock >= quantity
    }
}

// =============================================================================
// Drug Batch
// =============================================================================

/// A received batch of a drug with its own expiry date.
///
/// Stock alerts and expiry reports work at batch granularity; the
/// `Drug.stock` field is the sum over non-expired batches.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DrugBatch {
    pub id: String,
    pub drug_id: String,
    /// Manufacturer batch/lot number.
    pub batch_number: String,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
    #[ts(as = "String")]
    pub received_at: DateTime<Utc>,
}

impl DrugBatch {
    /// Whether the batch has expired as of `today`.
    #[inline]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A pharmacy customer/patient.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Third-party insurance provider, if any.
    pub insurance_provider: Option<String>,
    pub insurance_number: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Supplier
// =============================================================================

/// A wholesale supplier for purchase orders.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Invoice
// =============================================================================

/// A customer invoice (or completed POS sale).
///
/// The invoice caches the figures produced by the totals calculator at
/// the moment it was last edited; they are recomputed from the line items
/// on every mutation, never incrementally adjusted. `status` and
/// `paid_cents` are maintained exclusively through the payment state
/// machine so that `paid_cents <= total_cents` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// Human-readable business identifier, e.g. `INV-20260830-0001`.
    pub invoice_number: String,
    pub customer_id: Option<String>,
    /// Customer name at time of issue (frozen).
    pub customer_name: Option<String>,
    pub status: PaymentStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub dispensing_fee_cents: i64,
    pub tax_cents: i64,
    pub insurance_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Recurring invoices are re-issued every `recurrence_days`.
    pub recurrence_days: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub finalized_at: Option<DateTime<Utc>>,
}

impl Invoice {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    /// Outstanding balance, floored at zero.
    #[inline]
    pub fn outstanding(&self) -> Money {
        (self.total() - self.paid()).clamp_non_negative()
    }

    /// Whether the invoice is still editable.
    ///
    /// Lines are frozen once the invoice is finalized.
    #[inline]
    pub fn is_draft(&self) -> bool {
        self.finalized_at.is_none()
    }

    /// Whether the invoice is recurring.
    #[inline]
    pub fn is_recurring(&self) -> bool {
        self.recurrence_days.is_some()
    }

    /// Derived display decoration: unsettled and past due.
    ///
    /// Overdue is never stored; a paid invoice with a past due date is
    /// simply paid.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_unsettled() && self.due_date.map(|d| today > d).unwrap_or(false)
    }
}

// =============================================================================
// Invoice Item
// =============================================================================

/// A line item on an invoice.
/// Uses snapshot pattern to freeze drug data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub drug_id: String,
    /// SKU at time of sale (frozen).
    pub sku: String,
    /// Drug name at time of sale (frozen).
    pub name: String,
    /// Category at time of sale, kept for tax-exemption recomputation.
    pub category: DrugCategory,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InvoiceItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash at the counter.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Third-party insurer settlement.
    Insurance,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment recorded against an invoice.
/// An invoice can have multiple payments (partial settlement).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    pub method: PaymentMethod,
    /// Amount applied to the invoice, in cents. Negative for refunds.
    pub amount_cents: i64,
    /// For cash: amount the customer handed over.
    pub tendered_cents: Option<i64>,
    /// For cash: change returned to the customer.
    pub change_cents: Option<i64>,
    /// External reference (card auth code, insurer claim id).
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Purchase Order
// =============================================================================

/// Status of a purchase order sent to a supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Draft,
    Sent,
    Received,
    Cancelled,
}

impl Default for PurchaseOrderStatus {
    fn default() -> Self {
        PurchaseOrderStatus::Draft
    }
}

/// A restocking order placed with a supplier.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrder {
    pub id: String,
    /// Business identifier, e.g. `PO-20260830-0001`.
    pub order_number: String,
    pub supplier_id: String,
    pub status: PurchaseOrderStatus,
    pub total_cents: i64,
    #[ts(as = "Option<String>")]
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line on a purchase order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrderItem {
    pub id: String,
    pub purchase_order_id: String,
    pub drug_id: String,
    /// Drug name at time of ordering (frozen).
    pub name: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub line_total_cents: i64,
}

// =============================================================================
// Prescription
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Pending,
    Filled,
    Cancelled,
}

/// A single medication on a prescription.
///
/// Stored on the prescription row as a JSON array; this struct is the
/// explicit contract for each element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PrescriptionMedication {
    pub drug_id: Option<String>,
    pub name: String,
    /// Free-text dosage, e.g. "500mg".
    pub dosage: String,
    /// Free-text frequency, e.g. "twice daily".
    pub frequency: String,
    pub duration_days: Option<i64>,
    pub quantity: i64,
}

/// A prescription on file for a customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Prescription {
    pub id: String,
    pub customer_id: String,
    pub prescriber_name: String,
    pub status: PrescriptionStatus,
    /// Medications serialized as JSON; parse with [`Prescription::medications`].
    pub medications_json: String,
    #[ts(as = "Option<String>")]
    pub issued_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    /// Parses the stored medication list.
    pub fn medications(&self) -> Result<Vec<PrescriptionMedication>, serde_json::Error> {
        serde_json::from_str(&self.medications_json)
    }
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Pharmacist,
    Cashier,
}

/// A staff user account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: UserRole,
    /// argon2 hash, never serialized to clients.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base_invoice(status: PaymentStatus) -> Invoice {
        Invoice {
            id: "inv-1".to_string(),
            invoice_number: "INV-0001".to_string(),
            customer_id: None,
            customer_name: None,
            status,
            subtotal_cents: 4599,
            discount_cents: 0,
            dispensing_fee_cents: 0,
            tax_cents: 0,
            insurance_cents: 0,
            total_cents: 4599,
            paid_cents: 0,
            due_date: NaiveDate::from_ymd_opt(2026, 1, 15),
            notes: None,
            recurrence_days: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            finalized_at: None,
        }
    }

    #[test]
    fn test_overdue_only_applies_to_unsettled() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();

        let unpaid = base_invoice(PaymentStatus::Unpaid);
        assert!(unpaid.is_overdue(today));

        let partial = base_invoice(PaymentStatus::Partial);
        assert!(partial.is_overdue(today));

        // Paid invoice with a past due date is paid, not overdue.
        let paid = base_invoice(PaymentStatus::Paid);
        assert!(!paid.is_overdue(today));

        let refunded = base_invoice(PaymentStatus::Refunded);
        assert!(!refunded.is_overdue(today));
    }

    #[test]
    fn test_not_overdue_before_due_date() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let unpaid = base_invoice(PaymentStatus::Unpaid);
        assert!(!unpaid.is_overdue(today));
    }

    #[test]
    fn test_outstanding_floors_at_zero() {
        let mut invoice = base_invoice(PaymentStatus::Paid);
        invoice.paid_cents = 4599;
        assert_eq!(invoice.outstanding().cents(), 0);

        invoice.paid_cents = 1000;
        assert_eq!(invoice.outstanding().cents(), 3599);
    }

    #[test]
    fn test_drug_low_stock() {
        let drug = Drug {
            id: "d-1".to_string(),
            sku: "AMOX-500".to_string(),
            barcode: None,
            name: "Amoxicillin 500mg".to_string(),
            description: None,
            category: DrugCategory::Prescription,
            price_cents: 1250,
            cost_cents: Some(700),
            stock: 5,
            reorder_level: 10,
            requires_prescription: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(drug.is_low_stock());
        assert!(drug.can_dispense(3));
        assert!(!drug.can_dispense(6));
    }

    #[test]
    fn test_prescription_medications_roundtrip() {
        let meds = vec![PrescriptionMedication {
            drug_id: Some("d-1".to_string()),
            name: "Amoxicillin 500mg".to_string(),
            dosage: "500mg".to_string(),
            frequency: "three times daily".to_string(),
            duration_days: Some(7),
            quantity: 21,
        }];
        let prescription = Prescription {
            id: "rx-1".to_string(),
            customer_id: "c-1".to_string(),
            prescriber_name: "Dr. Okafor".to_string(),
            status: PrescriptionStatus::Pending,
            medications_json: serde_json::to_string(&meds).unwrap(),
            issued_date: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(prescription.medications().unwrap(), meds);
    }
}
