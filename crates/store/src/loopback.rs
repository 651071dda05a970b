//! In-process peer network.
//!
//! Routes peer calls straight to registered handlers while still passing
//! every request and response through the datagram codec. Tests use it to
//! run several nodes in one process and to inject transport faults.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use common::StoreCode;
use dashmap::DashMap;
use tracing::debug;
use wire::{ChannelError, InboundHandler, Operation, PeerClient, Request, Response};

/// Timeout reported for injected reply loss.
const SIMULATED_TIMEOUT: Duration = Duration::from_millis(50);

/// A [`PeerClient`] that delivers requests to handlers in this process.
///
/// Handlers are held weakly, so a node may own the network it is
/// registered on.
#[derive(Default)]
pub struct LoopbackNetwork {
    handlers: DashMap<StoreCode, Weak<dyn InboundHandler>>,
    unreachable: Mutex<HashSet<StoreCode>>,
    lost_replies: Mutex<HashSet<(StoreCode, Operation)>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes requests for `store` to `handler`.
    pub fn register<H: InboundHandler>(&self, store: StoreCode, handler: &Arc<H>) {
        let handler: Arc<dyn InboundHandler> = handler.clone();
        self.handlers.insert(store, Arc::downgrade(&handler));
    }

    /// Makes calls to `store` fail before delivery.
    pub fn set_unreachable(&self, store: &StoreCode, unreachable: bool) {
        let mut stores = self.unreachable.lock().unwrap_or_else(PoisonError::into_inner);
        if unreachable {
            stores.insert(store.clone());
        } else {
            stores.remove(store);
        }
    }

    /// Lets `store` process `operation` but drops its reply, so the caller
    /// sees a timeout.
    pub fn drop_replies(&self, store: &StoreCode, operation: Operation) {
        self.lost_replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((store.clone(), operation));
    }

    fn is_unreachable(&self, store: &StoreCode) -> bool {
        self.unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(store)
    }

    fn loses_reply(&self, store: &StoreCode, operation: Operation) -> bool {
        self.lost_replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(store.clone(), operation))
    }

    fn handler(&self, store: &StoreCode) -> Result<Arc<dyn InboundHandler>, ChannelError> {
        let handler = self
            .handlers
            .get(store)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ChannelError::UnknownStore(store.clone()))?;
        handler.upgrade().ok_or_else(|| refused(store))
    }
}

fn refused(store: &StoreCode) -> ChannelError {
    ChannelError::Unreachable {
        store: store.clone(),
        source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "store is offline"),
    }
}

#[async_trait]
impl PeerClient for LoopbackNetwork {
    async fn call(&self, store: &StoreCode, request: &Request) -> Result<Response, ChannelError> {
        let handler = self.handler(store)?;
        if self.is_unreachable(store) {
            return Err(refused(store));
        }

        let encoded = request.encode().map_err(ChannelError::Encode)?;
        let delivered = Request::decode(&encoded).map_err(|source| ChannelError::Malformed {
            store: store.clone(),
            source,
        })?;
        let response = handler.handle(delivered).await;

        if self.loses_reply(store, request.operation) {
            debug!(%store, operation = %request.operation, "dropping reply");
            return Err(ChannelError::Timeout {
                store: store.clone(),
                after: SIMULATED_TIMEOUT,
            });
        }
        let malformed = |source| ChannelError::Malformed {
            store: store.clone(),
            source,
        };
        let raw = response.encode().map_err(malformed)?;
        Response::decode(&raw).map_err(malformed)
    }
}
