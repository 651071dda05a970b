//! Domain error types.

use common::{IdError, ItemId, ManagerId, Money, StoreCode};
use thiserror::Error;

/// Validation and business-rule failures raised by store operations.
///
/// None of these leave partial state behind: every check runs before the
/// first mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// An identifier, amount or date failed to parse.
    #[error(transparent)]
    Id(#[from] IdError),

    /// The manager does not administer this store.
    #[error("Invalid manager ID: {manager} cannot manage store {store}")]
    InvalidManager { manager: ManagerId, store: StoreCode },

    /// Quantity must be positive.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: i64 },

    /// Prices cannot be negative.
    #[error("Invalid price: {price}")]
    InvalidPrice { price: Money },

    /// Item names must be non-empty and free of wire delimiters.
    #[error("Invalid item name: {name:?}")]
    InvalidItemName { name: String },

    /// The item belongs to another store.
    #[error("Item {item} does not belong to store {store}")]
    ForeignItem { item: ItemId, store: StoreCode },

    /// The item is not in this store's inventory.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// The item exists but has no stock left.
    #[error("Item {0} is out of stock")]
    OutOfStock(ItemId),

    /// Some stock exists, but less than requested.
    #[error("Insufficient quantity. Available: {available}, Requested: {requested}")]
    InsufficientStock { available: u32, requested: u32 },

    /// The customer's budget does not cover the cost.
    #[error("Insufficient budget. Available: {available}, Required: {required}")]
    InsufficientBudget { available: Money, required: Money },

    /// The customer already holds a purchase from this non-home store.
    #[error("Purchase limit exceeded: already purchased from store {store} (limit: 1 item per remote store)")]
    PurchaseLimit { store: StoreCode },

    /// No purchase of this item by this customer is on record.
    #[error("Purchase record not found for item {0}")]
    PurchaseNotFound(ItemId),

    /// The purchase is older than the return window.
    #[error("Return period expired ({window_days} days limit)")]
    ReturnWindowExpired { window_days: u64 },

    /// An item cannot be exchanged for itself.
    #[error("Cannot exchange item {0} for itself")]
    SameItem(ItemId),

    /// Waitlists only exist for items this store owns.
    #[error("Waitlist is only available for items of store {store}; {item} is not")]
    WaitlistForeignItem { item: ItemId, store: StoreCode },

    /// No pending exchange reservation matches the request.
    #[error("No pending reservation for item {0}")]
    NoReservation(ItemId),
}

impl DomainError {
    /// Stable error code carried in wire responses.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Id(_) => "INVALID_ID",
            DomainError::InvalidManager { .. } => "INVALID_MANAGER",
            DomainError::InvalidQuantity { .. } => "INVALID_QUANTITY",
            DomainError::InvalidPrice { .. } => "INVALID_PRICE",
            DomainError::InvalidItemName { .. } => "INVALID_ITEM_NAME",
            DomainError::ForeignItem { .. } => "FOREIGN_ITEM",
            DomainError::ItemNotFound(_) => "ITEM_NOT_FOUND",
            DomainError::OutOfStock(_) => "OUT_OF_STOCK",
            DomainError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            DomainError::InsufficientBudget { .. } => "INSUFFICIENT_BUDGET",
            DomainError::PurchaseLimit { .. } => "PURCHASE_LIMIT",
            DomainError::PurchaseNotFound(_) => "PURCHASE_NOT_FOUND",
            DomainError::ReturnWindowExpired { .. } => "RETURN_EXPIRED",
            DomainError::SameItem(_) => "SAME_ITEM",
            DomainError::WaitlistForeignItem { .. } => "FOREIGN_ITEM",
            DomainError::NoReservation(_) => "NO_RESERVATION",
        }
    }

    /// True for malformed input, as opposed to a rule the input broke.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::Id(_)
                | DomainError::InvalidManager { .. }
                | DomainError::InvalidQuantity { .. }
                | DomainError::InvalidPrice { .. }
                | DomainError::InvalidItemName { .. }
                | DomainError::ForeignItem { .. }
                | DomainError::SameItem(_)
                | DomainError::WaitlistForeignItem { .. }
        )
    }
}

/// Convenience type alias for domain results.
pub type Result<T> = std::result::Result<T, DomainError>;
