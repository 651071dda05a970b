//! Wire and channel error types.

use std::time::Duration;

use common::StoreCode;
use thiserror::Error;

/// Errors raised while encoding or decoding a datagram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The record did not have the fixed number of fields.
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// The operation tag is not one this protocol knows.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// A field could not be parsed.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// A text field contains a delimiter and would corrupt the record.
    #[error("field {field} contains a delimiter character")]
    Delimiter { field: &'static str },

    /// The encoded record does not fit in one datagram.
    #[error("datagram of {len} bytes exceeds the {max} byte limit")]
    Oversized { len: usize, max: usize },

    /// The payload is not valid UTF-8.
    #[error("datagram is not valid UTF-8")]
    NotUtf8,
}

/// Transport failures of an outbound peer call.
///
/// These are distinct from a peer that answered with `success = false`.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No response arrived within the call timeout.
    #[error("request to store {store} timed out after {after:?}")]
    Timeout { store: StoreCode, after: Duration },

    /// The datagram could not be sent or the peer refused it.
    #[error("store {store} is unreachable: {source}")]
    Unreachable {
        store: StoreCode,
        #[source]
        source: std::io::Error,
    },

    /// The peer directory has no address for the store.
    #[error("unknown store: {0}")]
    UnknownStore(StoreCode),

    /// A response arrived but could not be decoded.
    #[error("malformed response from store {store}: {source}")]
    Malformed {
        store: StoreCode,
        #[source]
        source: WireError,
    },

    /// The request could not be encoded, so nothing was sent.
    #[error("request could not be encoded: {0}")]
    Encode(#[source] WireError),
}

impl ChannelError {
    /// True if the peer may have executed the request despite the failure.
    ///
    /// A timeout can hide a processed request whose answer was lost, and a
    /// malformed answer still proves the request was processed. Everything
    /// else failed before the peer could act.
    pub fn outcome_unknown(&self) -> bool {
        matches!(
            self,
            ChannelError::Timeout { .. } | ChannelError::Malformed { .. }
        )
    }

    /// Short machine-readable category, used for metrics and error codes.
    pub fn code(&self) -> &'static str {
        match self {
            ChannelError::Timeout { .. } => crate::codes::TIMEOUT,
            ChannelError::Unreachable { .. } => crate::codes::COMM_ERROR,
            ChannelError::UnknownStore(_) => crate::codes::UNKNOWN_STORE,
            ChannelError::Malformed { .. } => crate::codes::MALFORMED,
            ChannelError::Encode(_) => crate::codes::MALFORMED,
        }
    }
}

/// Convenience type alias for codec results.
pub type Result<T> = std::result::Result<T, WireError>;
