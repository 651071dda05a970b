//! Shared value types for the store node workspace.
//!
//! Every identifier that crosses a crate boundary is validated once, here,
//! when it is parsed. Downstream crates can rely on the grammar holding.

pub mod date;
pub mod error;
pub mod ids;
pub mod money;
pub mod types;

pub use date::TradeDate;
pub use error::IdError;
pub use ids::{CustomerId, ItemId, ManagerId, StoreCode};
pub use money::Money;
pub use types::TransactionId;
