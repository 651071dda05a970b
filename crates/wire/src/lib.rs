//! Inter-node protocol for store nodes.
//!
//! Nodes talk to each other with single-datagram, pipe-delimited
//! request/response records over UDP. This crate provides:
//! - the record codec (`Request`, `Response`, `FoundItem`)
//! - the peer directory mapping store codes to endpoints
//! - the outbound client and inbound listener

pub mod channel;
pub mod codec;
pub mod directory;
pub mod error;

pub use channel::{DEFAULT_TIMEOUT, InboundHandler, PeerClient, UdpListener, UdpPeerClient};
pub use codec::{FoundItem, MAX_DATAGRAM_LEN, Operation, Request, Response};
pub use directory::PeerDirectory;
pub use error::{ChannelError, WireError};

/// Error codes produced by the transport itself rather than by a store.
pub mod codes {
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const COMM_ERROR: &str = "COMM_ERROR";
    pub const UNKNOWN_STORE: &str = "UNKNOWN_STORE";
    pub const MALFORMED: &str = "MALFORMED";
    pub const UNKNOWN_OP: &str = "UNKNOWN_OP";
    pub const PROCESSING_ERROR: &str = "PROCESSING_ERROR";
}
