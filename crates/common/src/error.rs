use thiserror::Error;

/// Errors raised while parsing identifiers, amounts and dates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Store codes are exactly two uppercase ASCII letters.
    #[error("Invalid store code: {0}")]
    InvalidStoreCode(String),

    /// Item IDs are a store code followed by four digits.
    #[error("Invalid item ID: {0}")]
    InvalidItemId(String),

    /// Customer IDs are two letters, `U`, then four digits.
    #[error("Invalid customer ID: {0}")]
    InvalidCustomerId(String),

    /// Manager IDs are a store code, `M`, then four digits.
    #[error("Invalid manager ID: {0}")]
    InvalidManagerId(String),

    /// Dates are `ddMMyyyy`.
    #[error("Invalid date (expected ddMMyyyy): {0}")]
    InvalidDate(String),

    /// Amounts are decimal numbers with at most two fraction digits.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Transaction IDs are UUIDs.
    #[error("Invalid transaction ID: {0}")]
    InvalidTransactionId(String),
}
