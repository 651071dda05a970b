//! Store node error types.

use common::{IdError, StoreCode};
use domain::DomainError;
use saga::SagaError;
use thiserror::Error;
use wire::ChannelError;

/// Everything a client or peer operation on a store node can fail with.
///
/// `Display` is the outcome text returned to the caller and written to the
/// audit trail.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Validation or business-rule failure on this node.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A peer store answered and refused the request.
    #[error("Store {store} refused the request: {message}")]
    PeerRejected {
        store: StoreCode,
        code: Option<String>,
        message: String,
    },

    /// A peer store could not be reached or answered garbage.
    #[error("Communication with store failed: {0}")]
    Channel(#[from] ChannelError),

    /// A cross-store exchange did not complete.
    #[error("Exchange failed: {0}")]
    Exchange(#[from] SagaError),

    /// A peer request lacked a field its operation needs.
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

impl From<IdError> for StoreError {
    fn from(err: IdError) -> Self {
        StoreError::Domain(DomainError::Id(err))
    }
}

impl StoreError {
    /// Stable error code, as carried in wire responses.
    pub fn code(&self) -> &str {
        match self {
            StoreError::Domain(err) => err.code(),
            StoreError::PeerRejected { code, .. } => code.as_deref().unwrap_or("PEER_REJECTED"),
            StoreError::Channel(err) => err.code(),
            StoreError::Exchange(err) => err.code().unwrap_or("EXCHANGE_FAILED"),
            StoreError::MissingField(_) => wire::codes::MALFORMED,
        }
    }

    /// True for malformed input, as opposed to a rule the input broke.
    pub fn is_validation(&self) -> bool {
        match self {
            StoreError::Domain(err) => err.is_validation(),
            StoreError::MissingField(_) => true,
            _ => false,
        }
    }

    /// True if the failure came from the peer channel rather than a store.
    pub fn is_transport(&self) -> bool {
        match self {
            StoreError::Channel(_) => true,
            StoreError::Exchange(err) => err.is_transport(),
            _ => false,
        }
    }
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use common::ItemId;
    use std::time::Duration;

    #[test]
    fn test_codes_follow_the_source() {
        let item = ItemId::new("QC1001").unwrap();
        assert_eq!(
            StoreError::from(DomainError::ItemNotFound(item)).code(),
            "ITEM_NOT_FOUND"
        );
        assert_eq!(
            StoreError::from(IdError::InvalidCustomerId("x".into())).code(),
            "INVALID_ID"
        );

        let timeout = StoreError::from(ChannelError::Timeout {
            store: StoreCode::new("ON").unwrap(),
            after: Duration::from_secs(5),
        });
        assert_eq!(timeout.code(), "TIMEOUT");
        assert!(timeout.is_transport());

        let rejected = StoreError::PeerRejected {
            store: StoreCode::new("ON").unwrap(),
            code: None,
            message: "Item not found".into(),
        };
        assert_eq!(rejected.code(), "PEER_REJECTED");
        assert!(!rejected.is_transport());
    }

    #[test]
    fn test_validation_classification() {
        assert!(StoreError::MissingField("customerID").is_validation());
        assert!(StoreError::from(DomainError::InvalidQuantity { quantity: 0 }).is_validation());
        assert!(!StoreError::from(DomainError::OutOfStock(ItemId::new("QC1001").unwrap()))
            .is_validation());
    }
}
