//! Domain layer for a store node.
//!
//! This crate provides the state primitives a node is built from:
//! - `ItemLedger`: per-item quantity/price with one reader/writer guard per ID
//! - `AccountBook`: customer budgets and purchase history
//! - `Waitlists`: FIFO of customers per out-of-stock item
//! - `AuditSink`: append-only outcome trail
//! - `Clock`: source of the current trade date

pub mod account;
pub mod audit;
pub mod clock;
pub mod error;
pub mod ledger;
pub mod waitlist;

pub use account::{AccountBook, CustomerAccount, Purchase};
pub use audit::{AuditEntry, AuditSink, FanoutAuditSink, MemoryAuditSink, TracingAuditSink};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, Result};
pub use ledger::{Item, ItemLedger, validate_item_name};
pub use waitlist::{WaitlistPosition, Waitlists};
