//! Static map from store code to UDP endpoint.

use std::net::{Ipv4Addr, SocketAddr};

use common::StoreCode;

/// Ports of the standard three-store deployment on one host.
const STANDARD_PORTS: [(&str, u16); 3] = [("QC", 8001), ("ON", 8002), ("BC", 8003)];

/// Where each store node listens for peer requests.
///
/// Order is preserved so fan-out operations query stores in a fixed order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerDirectory {
    entries: Vec<(StoreCode, SocketAddr)>,
}

impl PeerDirectory {
    /// Builds a directory from `(store, address)` pairs.
    ///
    /// A later entry for the same store replaces the earlier address.
    pub fn new(entries: impl IntoIterator<Item = (StoreCode, SocketAddr)>) -> Self {
        entries
            .into_iter()
            .fold(Self::default(), |directory, (store, addr)| {
                directory.with_address(store, addr)
            })
    }

    /// QC, ON and BC on localhost ports 8001 to 8003.
    pub fn standard() -> Self {
        Self::new(STANDARD_PORTS.into_iter().filter_map(|(code, port)| {
            StoreCode::new(code)
                .ok()
                .map(|store| (store, SocketAddr::from((Ipv4Addr::LOCALHOST, port))))
        }))
    }

    /// Sets or replaces the address of `store`.
    pub fn with_address(mut self, store: StoreCode, addr: SocketAddr) -> Self {
        match self.entries.iter_mut().find(|(code, _)| *code == store) {
            Some(entry) => entry.1 = addr,
            None => self.entries.push((store, addr)),
        }
        self
    }

    pub fn address(&self, store: &StoreCode) -> Option<SocketAddr> {
        self.entries
            .iter()
            .find(|(code, _)| code == store)
            .map(|(_, addr)| *addr)
    }

    pub fn contains(&self, store: &StoreCode) -> bool {
        self.address(store).is_some()
    }

    /// Every known store, in directory order.
    pub fn stores(&self) -> impl Iterator<Item = &StoreCode> {
        self.entries.iter().map(|(code, _)| code)
    }

    /// Every known store except `local`, in directory order.
    pub fn others<'a>(&'a self, local: &'a StoreCode) -> impl Iterator<Item = &'a StoreCode> {
        self.stores().filter(move |code| *code != local)
    }
}
