//! # Repository Modules
//!
//! One repository per aggregate. Repositories own the SQL; callers get
//! typed rows from pharma-core and never see query strings.

pub mod customer;
pub mod drug;
pub mod invoice;
pub mod prescription;
pub mod purchase_order;
pub mod report;
pub mod supplier;
pub mod user;
