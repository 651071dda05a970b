//! The old item's store: return and undo-return.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use common::{CustomerId, ItemId, StoreCode};
use wire::{PeerClient, Request};

use crate::error::SagaError;
use crate::exchange::{STEP_RETURN, STEP_UNDO_RETURN};
use crate::services::settle;

/// Participant that takes the exchanged item back.
#[async_trait]
pub trait OldItemStore: Send + Sync {
    /// Restocks one unit of `item`.
    async fn return_item(&self, customer: &CustomerId, item: &ItemId) -> Result<(), SagaError>;

    /// Takes back the unit restocked by [`OldItemStore::return_item`].
    async fn undo_return(&self, customer: &CustomerId, item: &ItemId) -> Result<(), SagaError>;
}

/// [`OldItemStore`] reached over the peer channel.
#[derive(Clone)]
pub struct RemoteOldItemStore {
    peers: Arc<dyn PeerClient>,
    store: StoreCode,
}

impl RemoteOldItemStore {
    pub fn new(peers: Arc<dyn PeerClient>, store: StoreCode) -> Self {
        Self { peers, store }
    }
}

#[async_trait]
impl OldItemStore for RemoteOldItemStore {
    async fn return_item(&self, customer: &CustomerId, item: &ItemId) -> Result<(), SagaError> {
        let wire = Request::exchange_return(customer.clone(), item.clone());
        settle(STEP_RETURN, self.peers.call(&self.store, &wire).await)?;
        Ok(())
    }

    async fn undo_return(&self, customer: &CustomerId, item: &ItemId) -> Result<(), SagaError> {
        let wire = Request::exchange_undo_return(customer.clone(), item.clone());
        settle(STEP_UNDO_RETURN, self.peers.call(&self.store, &wire).await)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryOldItemState {
    stock: HashMap<ItemId, u32>,
    fail_on_return: bool,
    fail_on_undo_return: bool,
}

/// In-memory old-item store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOldItemStore {
    state: Arc<RwLock<InMemoryOldItemState>>,
}

impl InMemoryOldItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> RwLockWriteGuard<'_, InMemoryOldItemState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stock(&self, item: ItemId, quantity: u32) {
        self.state().stock.insert(item, quantity);
    }

    pub fn quantity(&self, item: &ItemId) -> Option<u32> {
        self.state().stock.get(item).copied()
    }

    pub fn set_fail_on_return(&self, fail: bool) {
        self.state().fail_on_return = fail;
    }

    pub fn set_fail_on_undo_return(&self, fail: bool) {
        self.state().fail_on_undo_return = fail;
    }
}

#[async_trait]
impl OldItemStore for InMemoryOldItemStore {
    async fn return_item(&self, _customer: &CustomerId, item: &ItemId) -> Result<(), SagaError> {
        let mut state = self.state();
        if state.fail_on_return {
            return Err(SagaError::rejected(STEP_RETURN, "RETURN_FAILED", "Return refused"));
        }
        match state.stock.get_mut(item) {
            Some(quantity) => {
                *quantity = quantity.saturating_add(1);
                Ok(())
            }
            None => Err(SagaError::rejected(STEP_RETURN, "RETURN_FAILED", "Item not found")),
        }
    }

    async fn undo_return(&self, _customer: &CustomerId, item: &ItemId) -> Result<(), SagaError> {
        let mut state = self.state();
        if state.fail_on_undo_return {
            return Err(SagaError::rejected(
                STEP_UNDO_RETURN,
                "UNDO_FAILED",
                "Undo refused",
            ));
        }
        match state.stock.get_mut(item) {
            Some(quantity) if *quantity > 0 => {
                *quantity -= 1;
                Ok(())
            }
            _ => Err(SagaError::rejected(
                STEP_UNDO_RETURN,
                "UNDO_FAILED",
                "Nothing to undo",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_return_and_undo() {
        let store = InMemoryOldItemStore::new();
        let customer = CustomerId::new("QCU1111").unwrap();
        let item = ItemId::new("QC1001").unwrap();
        store.stock(item.clone(), 0);

        store.return_item(&customer, &item).await.unwrap();
        assert_eq!(store.quantity(&item), Some(1));
        store.undo_return(&customer, &item).await.unwrap();
        assert_eq!(store.quantity(&item), Some(0));

        let err = store.undo_return(&customer, &item).await.unwrap_err();
        assert_eq!(err.code(), Some("UNDO_FAILED"));
    }
}
