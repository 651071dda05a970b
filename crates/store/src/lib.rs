//! Store node for the distributed retail inventory.
//!
//! A node owns one store's inventory, customer accounts and waitlists. It
//! serves:
//! - client operations (`StoreNode::add_item`, `purchase_item`, ...)
//! - peer requests arriving over the wire protocol (`InboundHandler`)
//! - cross-store exchanges, coordinated through the `saga` crate
//!
//! Peers are reached through a `wire::PeerClient`: UDP in production, or
//! [`LoopbackNetwork`] when several nodes share one process.

pub mod config;
pub mod error;
pub mod inbound;
pub mod loopback;
pub mod node;
pub mod outcome;
pub mod participant;

pub use config::{
    DEFAULT_BUDGET, DEFAULT_RESERVATION_TTL, MAX_ITEM_PRICE, NodeConfig, RETURN_WINDOW_DAYS,
};
pub use error::{Result, StoreError};
pub use loopback::LoopbackNetwork;
pub use node::StoreNode;
pub use outcome::{
    AddOutcome, ExchangeOutcome, FindOutcome, Inventory, PurchaseOutcome, RemoveOutcome,
    ReturnOutcome, WaitlistFill, WaitlistOutcome,
};
pub use participant::{LocalOldItemStore, OldItemLeg};
