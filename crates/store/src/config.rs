//! Node configuration.

use std::net::SocketAddr;
use std::time::Duration;

use common::{Money, StoreCode};
use wire::{DEFAULT_TIMEOUT, PeerDirectory};

/// Budget a customer starts with on first reference.
pub const DEFAULT_BUDGET: Money = Money::from_dollars(1000);

/// Highest unit price a manager may list an item at.
pub const MAX_ITEM_PRICE: Money = Money::from_dollars(1_000_000);

/// Days after purchase during which an item may be returned or exchanged.
pub const RETURN_WINDOW_DAYS: u64 = 30;

/// How long a prepared exchange may hold a unit before it is released.
pub const DEFAULT_RESERVATION_TTL: Duration = Duration::from_secs(60);

/// Immutable settings of one store node, fixed at construction.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub store_code: StoreCode,
    pub peers: PeerDirectory,
    pub peer_timeout: Duration,
    pub default_budget: Money,
    pub reservation_ttl: Duration,
    pub return_window_days: u64,
}

impl NodeConfig {
    /// Defaults for `store_code` against the standard three-store directory.
    pub fn new(store_code: StoreCode) -> Self {
        Self {
            store_code,
            peers: PeerDirectory::standard(),
            peer_timeout: DEFAULT_TIMEOUT,
            default_budget: DEFAULT_BUDGET,
            reservation_ttl: DEFAULT_RESERVATION_TTL,
            return_window_days: RETURN_WINDOW_DAYS,
        }
    }

    pub fn with_peers(mut self, peers: PeerDirectory) -> Self {
        self.peers = peers;
        self
    }

    pub fn with_peer_timeout(mut self, timeout: Duration) -> Self {
        self.peer_timeout = timeout;
        self
    }

    pub fn with_reservation_ttl(mut self, ttl: Duration) -> Self {
        self.reservation_ttl = ttl;
        self
    }

    /// Address this node's peer listener should bind, per the directory.
    pub fn listen_addr(&self) -> Option<SocketAddr> {
        self.peers.address(&self.store_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::new(StoreCode::new("ON").unwrap());
        assert_eq!(config.peer_timeout, Duration::from_secs(5));
        assert_eq!(config.default_budget, Money::from_cents(100_000));
        assert_eq!(config.return_window_days, 30);
        assert_eq!(config.listen_addr(), Some("127.0.0.1:8002".parse().unwrap()));
    }

    #[test]
    fn test_listen_addr_follows_directory() {
        let qc = StoreCode::new("QC").unwrap();
        let addr: SocketAddr = "127.0.0.1:40001".parse().unwrap();
        let config = NodeConfig::new(qc.clone())
            .with_peers(PeerDirectory::new([(qc, addr)]))
            .with_reservation_ttl(Duration::from_secs(5));
        assert_eq!(config.listen_addr(), Some(addr));
        assert_eq!(config.reservation_ttl, Duration::from_secs(5));
    }
}
