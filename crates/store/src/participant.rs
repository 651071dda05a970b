//! Ledger-side halves of the exchange steps.
//!
//! These run under the item's guard and are shared by the peer request
//! handler and by the local leg of an exchange this node coordinates.

use std::sync::Arc;

use async_trait::async_trait;
use common::{CustomerId, ItemId, Money, StoreCode, TransactionId};
use domain::{DomainError, Item, ItemLedger};
use saga::exchange::{STEP_RETURN, STEP_UNDO_RETURN};
use saga::{OldItemStore, RemoteOldItemStore, ReservationTable, SagaError};

/// Takes one unit of `item` and records a reservation for it.
pub(crate) fn reserve(
    ledger: &ItemLedger,
    reservations: &ReservationTable,
    customer: &CustomerId,
    item: &ItemId,
    old_item: &ItemId,
) -> Result<TransactionId, DomainError> {
    ledger.mutate(item, |slot| {
        let Some(current) = slot.as_mut() else {
            return Err(DomainError::ItemNotFound(item.clone()));
        };
        if !current.in_stock() {
            return Err(DomainError::OutOfStock(item.clone()));
        }
        current.quantity -= 1;
        Ok(reservations.insert(customer.clone(), item.clone(), old_item.clone()))
    })
}

/// Puts one reserved unit back on the shelf.
pub(crate) fn release(ledger: &ItemLedger, item: &ItemId) {
    ledger.mutate(item, |slot| {
        if let Some(current) = slot.as_mut() {
            current.quantity = current.quantity.saturating_add(1);
        }
    });
}

/// Restocks one unit of a returned item.
pub(crate) fn restock_returned(ledger: &ItemLedger, item: &ItemId) -> Result<Item, DomainError> {
    ledger.mutate(item, |slot| match slot.as_mut() {
        Some(current) => {
            current.quantity = current.quantity.saturating_add(1);
            Ok(current.clone())
        }
        None => Err(DomainError::ItemNotFound(item.clone())),
    })
}

/// Takes back the unit restocked by [`restock_returned`].
///
/// Stock already sold again is left at zero rather than driven negative.
pub(crate) fn unreturn(ledger: &ItemLedger, item: &ItemId) -> Result<Item, DomainError> {
    ledger.mutate(item, |slot| match slot.as_mut() {
        Some(current) => {
            current.quantity = current.quantity.saturating_sub(1);
            Ok(current.clone())
        }
        None => Err(DomainError::ItemNotFound(item.clone())),
    })
}

/// Budget after swapping an item paid `old_price` for one at `new_price`.
pub(crate) fn budget_after_swap(budget: Money, new_price: Money, old_price: Money) -> Money {
    budget - (new_price - old_price)
}

/// Old-item participant backed by this node's own ledger.
#[derive(Debug, Clone)]
pub struct LocalOldItemStore {
    ledger: ItemLedger,
}

impl LocalOldItemStore {
    pub fn new(ledger: ItemLedger) -> Self {
        Self { ledger }
    }
}

fn refused(step: &'static str, err: DomainError) -> SagaError {
    SagaError::rejected(step, err.code(), err.to_string())
}

#[async_trait]
impl OldItemStore for LocalOldItemStore {
    async fn return_item(&self, _customer: &CustomerId, item: &ItemId) -> Result<(), SagaError> {
        restock_returned(&self.ledger, item)
            .map(|_| ())
            .map_err(|e| refused(STEP_RETURN, e))
    }

    async fn undo_return(&self, _customer: &CustomerId, item: &ItemId) -> Result<(), SagaError> {
        unreturn(&self.ledger, item)
            .map(|_| ())
            .map_err(|e| refused(STEP_UNDO_RETURN, e))
    }
}

/// Where the old item goes back to: this node or its owning peer.
#[derive(Clone)]
pub enum OldItemLeg {
    Local(LocalOldItemStore),
    Remote(RemoteOldItemStore),
}

impl OldItemLeg {
    /// Picks the leg for an item owned by `owner`, as seen from `local`.
    pub fn for_owner(
        owner: &StoreCode,
        local: &StoreCode,
        ledger: &ItemLedger,
        peers: Arc<dyn wire::PeerClient>,
    ) -> Self {
        if owner == local {
            OldItemLeg::Local(LocalOldItemStore::new(ledger.clone()))
        } else {
            OldItemLeg::Remote(RemoteOldItemStore::new(peers, owner.clone()))
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, OldItemLeg::Local(_))
    }
}

#[async_trait]
impl OldItemStore for OldItemLeg {
    async fn return_item(&self, customer: &CustomerId, item: &ItemId) -> Result<(), SagaError> {
        match self {
            OldItemLeg::Local(store) => store.return_item(customer, item).await,
            OldItemLeg::Remote(store) => store.return_item(customer, item).await,
        }
    }

    async fn undo_return(&self, customer: &CustomerId, item: &ItemId) -> Result<(), SagaError> {
        match self {
            OldItemLeg::Local(store) => store.undo_return(customer, item).await,
            OldItemLeg::Remote(store) => store.undo_return(customer, item).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn id(s: &str) -> ItemId {
        ItemId::new(s).unwrap()
    }

    fn ledger_with(item: &str, quantity: u32) -> ItemLedger {
        let ledger = ItemLedger::new();
        ledger.mutate(&id(item), |slot| {
            *slot = Some(Item::new(id(item), "Tea", quantity, Money::from_cents(399)))
        });
        ledger
    }

    #[test]
    fn test_restock_saturates_at_max_quantity() {
        let ledger = ledger_with("BC1002", u32::MAX);

        release(&ledger, &id("BC1002"));
        assert_eq!(ledger.get(&id("BC1002")).unwrap().quantity, u32::MAX);
        let restocked = restock_returned(&ledger, &id("BC1002")).unwrap();
        assert_eq!(restocked.quantity, u32::MAX);
    }

    #[test]
    fn test_reserve_takes_one_unit_and_records_hold() {
        let ledger = ledger_with("BC1002", 1);
        let reservations = ReservationTable::new(Duration::from_secs(60));
        let customer = CustomerId::new("QCU1111").unwrap();

        reserve(&ledger, &reservations, &customer, &id("BC1002"), &id("QC1001")).unwrap();
        assert_eq!(ledger.get(&id("BC1002")).unwrap().quantity, 0);
        assert_eq!(reservations.len(), 1);

        let err = reserve(&ledger, &reservations, &customer, &id("BC1002"), &id("QC1001"))
            .unwrap_err();
        assert_eq!(err, DomainError::OutOfStock(id("BC1002")));
        assert_eq!(reservations.len(), 1);
    }

    #[test]
    fn test_unreturn_never_goes_negative() {
        let ledger = ledger_with("QC1001", 0);
        assert_eq!(unreturn(&ledger, &id("QC1001")).unwrap().quantity, 0);
        assert_eq!(restock_returned(&ledger, &id("QC1001")).unwrap().quantity, 1);
        assert!(restock_returned(&ledger, &id("QC1999")).is_err());
    }

    #[tokio::test]
    async fn test_local_leg_reports_missing_item_as_refusal() {
        let leg = LocalOldItemStore::new(ItemLedger::new());
        let customer = CustomerId::new("QCU1111").unwrap();
        let err = leg.return_item(&customer, &id("QC1001")).await.unwrap_err();
        assert_eq!(err.step(), "return");
        assert_eq!(err.code(), Some("ITEM_NOT_FOUND"));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_budget_after_swap() {
        assert_eq!(
            budget_after_swap(
                Money::from_cents(10_000),
                Money::from_cents(1_000),
                Money::from_cents(599)
            ),
            Money::from_cents(9_599)
        );
    }
}
