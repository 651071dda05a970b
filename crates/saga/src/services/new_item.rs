//! The new item's store: check, prepare, commit and rollback.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use common::{ItemId, Money, StoreCode, TransactionId};
use wire::{ChannelError, PeerClient, Request, WireError};

use crate::error::SagaError;
use crate::exchange::{
    ExchangeRequest, STEP_CHECK, STEP_COMMIT, STEP_PREPARE, STEP_ROLLBACK,
};
use crate::reservations::ReservationTable;
use crate::services::settle;

/// What a successful check reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Unit price of the new item.
    pub new_price: Money,
    /// Customer budget if the exchange went through now.
    pub projected_budget: Money,
}

/// Participant that owns the item being acquired.
#[async_trait]
pub trait NewItemStore: Send + Sync {
    /// Verifies stock, budget and purchase limit without mutating.
    async fn check(&self, request: &ExchangeRequest) -> Result<CheckOutcome, SagaError>;

    /// Takes one unit out of stock and records a reservation.
    async fn prepare(&self, request: &ExchangeRequest) -> Result<TransactionId, SagaError>;

    /// Consumes the reservation and returns the customer's new budget.
    async fn commit(&self, request: &ExchangeRequest) -> Result<Money, SagaError>;

    /// Releases the reservation, restocking its unit. A no-op if there is
    /// nothing to release.
    async fn rollback(&self, request: &ExchangeRequest) -> Result<(), SagaError>;
}

/// [`NewItemStore`] reached over the peer channel.
#[derive(Clone)]
pub struct RemoteNewItemStore {
    peers: Arc<dyn PeerClient>,
    store: StoreCode,
}

impl RemoteNewItemStore {
    pub fn new(peers: Arc<dyn PeerClient>, store: StoreCode) -> Self {
        Self { peers, store }
    }
}

#[async_trait]
impl NewItemStore for RemoteNewItemStore {
    async fn check(&self, request: &ExchangeRequest) -> Result<CheckOutcome, SagaError> {
        let wire = Request::exchange_check(
            request.customer.clone(),
            request.new_item.clone(),
            request.budget,
            request.old_item.clone(),
            request.old_price,
        );
        let response = settle(STEP_CHECK, self.peers.call(&self.store, &wire).await)?;
        Ok(CheckOutcome {
            new_price: response.item_price,
            projected_budget: response.new_budget,
        })
    }

    async fn prepare(&self, request: &ExchangeRequest) -> Result<TransactionId, SagaError> {
        let wire = Request::exchange_prepare(
            request.customer.clone(),
            request.new_item.clone(),
            request.budget,
            request.old_item.clone(),
            request.old_price,
        );
        let response = settle(STEP_PREPARE, self.peers.call(&self.store, &wire).await)?;
        // A success without an ID still took the unit, so it must read as
        // an unknown outcome to trigger the rollback.
        response
            .transaction_id
            .ok_or_else(|| SagaError::Transport {
                step: STEP_PREPARE,
                source: ChannelError::Malformed {
                    store: self.store.clone(),
                    source: WireError::InvalidField {
                        field: "transactionID",
                        reason: "missing from prepare response".to_string(),
                    },
                },
            })
    }

    async fn commit(&self, request: &ExchangeRequest) -> Result<Money, SagaError> {
        let wire = Request::exchange_commit(
            request.customer.clone(),
            request.new_item.clone(),
            request.budget,
            request.old_item.clone(),
            request.old_price,
        );
        let response = settle(STEP_COMMIT, self.peers.call(&self.store, &wire).await)?;
        Ok(response.new_budget)
    }

    async fn rollback(&self, request: &ExchangeRequest) -> Result<(), SagaError> {
        let wire = Request::exchange_rollback(
            request.customer.clone(),
            request.new_item.clone(),
            request.old_item.clone(),
        );
        settle(STEP_ROLLBACK, self.peers.call(&self.store, &wire).await)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNewItemState {
    stock: HashMap<ItemId, (u32, Money)>,
    fail_on_check: bool,
    fail_on_prepare: bool,
    fail_on_commit: bool,
    fail_on_rollback: bool,
    lost_replies: HashSet<&'static str>,
}

/// In-memory new-item store for testing.
#[derive(Debug, Clone)]
pub struct InMemoryNewItemStore {
    store: StoreCode,
    state: Arc<RwLock<InMemoryNewItemState>>,
    reservations: Arc<ReservationTable>,
}

impl InMemoryNewItemStore {
    pub fn new(store: StoreCode) -> Self {
        Self {
            store,
            state: Arc::default(),
            reservations: Arc::new(ReservationTable::new(Duration::from_secs(60))),
        }
    }

    fn state(&self) -> RwLockWriteGuard<'_, InMemoryNewItemState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stocks `quantity` units of `item` at `price`.
    pub fn stock(&self, item: ItemId, quantity: u32, price: Money) {
        self.state().stock.insert(item, (quantity, price));
    }

    pub fn quantity(&self, item: &ItemId) -> Option<u32> {
        self.state().stock.get(item).map(|(quantity, _)| *quantity)
    }

    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    pub fn set_fail_on_check(&self, fail: bool) {
        self.state().fail_on_check = fail;
    }

    pub fn set_fail_on_prepare(&self, fail: bool) {
        self.state().fail_on_prepare = fail;
    }

    pub fn set_fail_on_commit(&self, fail: bool) {
        self.state().fail_on_commit = fail;
    }

    pub fn set_fail_on_rollback(&self, fail: bool) {
        self.state().fail_on_rollback = fail;
    }

    /// Applies `step` but reports it as timed out.
    pub fn set_lose_reply(&self, step: &'static str, lose: bool) {
        let mut state = self.state();
        if lose {
            state.lost_replies.insert(step);
        } else {
            state.lost_replies.remove(step);
        }
    }

    fn reply<T>(&self, step: &'static str, lose: bool, value: T) -> Result<T, SagaError> {
        if lose {
            return Err(SagaError::Transport {
                step,
                source: ChannelError::Timeout {
                    store: self.store.clone(),
                    after: Duration::ZERO,
                },
            });
        }
        Ok(value)
    }
}

#[async_trait]
impl NewItemStore for InMemoryNewItemStore {
    async fn check(&self, request: &ExchangeRequest) -> Result<CheckOutcome, SagaError> {
        let (outcome, lose) = {
            let state = self.state();
            if state.fail_on_check {
                return Err(SagaError::rejected(STEP_CHECK, "CHECK_FAILED", "Check refused"));
            }
            let Some(&(quantity, price)) = state.stock.get(&request.new_item) else {
                return Err(SagaError::rejected(STEP_CHECK, "ITEM_NOT_FOUND", "Item not found"));
            };
            if quantity == 0 {
                return Err(SagaError::rejected(STEP_CHECK, "OUT_OF_STOCK", "Item is out of stock"));
            }
            let projected_budget = request.projected_budget(price);
            if projected_budget.is_negative() {
                return Err(SagaError::rejected(
                    STEP_CHECK,
                    "INSUFFICIENT_BUDGET",
                    "Insufficient budget",
                ));
            }
            (
                CheckOutcome {
                    new_price: price,
                    projected_budget,
                },
                state.lost_replies.contains(STEP_CHECK),
            )
        };
        self.reply(STEP_CHECK, lose, outcome)
    }

    async fn prepare(&self, request: &ExchangeRequest) -> Result<TransactionId, SagaError> {
        let lose = {
            let mut state = self.state();
            if state.fail_on_prepare {
                return Err(SagaError::rejected(STEP_PREPARE, "PREPARE_FAILED", "Prepare refused"));
            }
            match state.stock.get_mut(&request.new_item) {
                Some((quantity, _)) if *quantity > 0 => *quantity -= 1,
                _ => {
                    return Err(SagaError::rejected(
                        STEP_PREPARE,
                        "OUT_OF_STOCK",
                        "Item is out of stock",
                    ));
                }
            }
            state.lost_replies.contains(STEP_PREPARE)
        };
        let id = self.reservations.insert(
            request.customer.clone(),
            request.new_item.clone(),
            request.old_item.clone(),
        );
        self.reply(STEP_PREPARE, lose, id)
    }

    async fn commit(&self, request: &ExchangeRequest) -> Result<Money, SagaError> {
        let (price, lose) = {
            let state = self.state();
            if state.fail_on_commit {
                return Err(SagaError::rejected(STEP_COMMIT, "COMMIT_FAILED", "Commit refused"));
            }
            let price = state
                .stock
                .get(&request.new_item)
                .map(|(_, price)| *price)
                .unwrap_or_default();
            (price, state.lost_replies.contains(STEP_COMMIT))
        };
        if self
            .reservations
            .take_matching(&request.customer, &request.new_item)
            .is_none()
        {
            return Err(SagaError::rejected(
                STEP_COMMIT,
                "NO_RESERVATION",
                "No pending reservation",
            ));
        }
        self.reply(STEP_COMMIT, lose, request.projected_budget(price))
    }

    async fn rollback(&self, request: &ExchangeRequest) -> Result<(), SagaError> {
        let mut state = self.state();
        if state.fail_on_rollback {
            return Err(SagaError::rejected(STEP_ROLLBACK, "ROLLBACK_FAILED", "Rollback refused"));
        }
        if self
            .reservations
            .take_matching(&request.customer, &request.new_item)
            .is_some()
            && let Some((quantity, _)) = state.stock.get_mut(&request.new_item)
        {
            *quantity = quantity.saturating_add(1);
        }
        let lose = state.lost_replies.contains(STEP_ROLLBACK);
        drop(state);
        self.reply(STEP_ROLLBACK, lose, ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::CustomerId;

    fn request() -> ExchangeRequest {
        ExchangeRequest {
            customer: CustomerId::new("QCU1111").unwrap(),
            new_item: ItemId::new("BC1002").unwrap(),
            old_item: ItemId::new("QC1001").unwrap(),
            budget: Money::from_dollars(1000),
            old_price: Money::from_cents(599),
        }
    }

    fn store() -> InMemoryNewItemStore {
        let store = InMemoryNewItemStore::new(StoreCode::new("BC").unwrap());
        store.stock(ItemId::new("BC1002").unwrap(), 2, Money::from_cents(1000));
        store
    }

    #[tokio::test]
    async fn test_prepare_then_rollback_restores_stock() {
        let store = store();
        let request = request();
        let item = request.new_item.clone();

        store.prepare(&request).await.unwrap();
        assert_eq!(store.quantity(&item), Some(1));
        assert_eq!(store.reservation_count(), 1);

        store.rollback(&request).await.unwrap();
        assert_eq!(store.quantity(&item), Some(2));

        // A duplicate rollback finds nothing to release.
        store.rollback(&request).await.unwrap();
        assert_eq!(store.quantity(&item), Some(2));
    }

    #[tokio::test]
    async fn test_commit_requires_reservation() {
        let store = store();
        let err = store.commit(&request()).await.unwrap_err();
        assert_eq!(err.code(), Some("NO_RESERVATION"));

        store.prepare(&request()).await.unwrap();
        let budget = store.commit(&request()).await.unwrap();
        assert_eq!(budget, Money::from_cents(99_599));
        assert_eq!(store.reservation_count(), 0);
    }

    #[tokio::test]
    async fn test_lost_reply_still_applies() {
        let store = store();
        store.set_lose_reply(STEP_PREPARE, true);
        let err = store.prepare(&request()).await.unwrap_err();
        assert!(err.outcome_unknown());
        assert_eq!(store.quantity(&request().new_item), Some(1));
    }
}
