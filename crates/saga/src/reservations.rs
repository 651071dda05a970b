//! Stock holds created by PREPARE at the new item's store.
//!
//! A reservation represents one unit already taken out of the ledger. It is
//! consumed by COMMIT, undone by ROLLBACK, or evicted once idle for longer
//! than the table's TTL. The caller restocks for ROLLBACK and eviction.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use common::{CustomerId, ItemId, TransactionId};

/// One pending exchange hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: TransactionId,
    pub customer: CustomerId,
    pub new_item: ItemId,
    pub old_item: ItemId,
    pub created_at: Instant,
}

/// Pending reservations of one node, keyed by transaction ID.
#[derive(Debug)]
pub struct ReservationTable {
    entries: Mutex<HashMap<TransactionId, Reservation>>,
    ttl: Duration,
}

impl ReservationTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TransactionId, Reservation>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a hold and returns its fresh transaction ID.
    pub fn insert(&self, customer: CustomerId, new_item: ItemId, old_item: ItemId) -> TransactionId {
        self.insert_at(customer, new_item, old_item, Instant::now())
    }

    pub fn insert_at(
        &self,
        customer: CustomerId,
        new_item: ItemId,
        old_item: ItemId,
        created_at: Instant,
    ) -> TransactionId {
        let id = TransactionId::new();
        self.lock().insert(
            id,
            Reservation {
                id,
                customer,
                new_item,
                old_item,
                created_at,
            },
        );
        id
    }

    /// Removes and returns the oldest hold of `new_item` by `customer`.
    ///
    /// COMMIT and ROLLBACK carry no transaction ID on the wire, so they are
    /// matched by customer and item.
    pub fn take_matching(&self, customer: &CustomerId, new_item: &ItemId) -> Option<Reservation> {
        let mut entries = self.lock();
        let id = entries
            .values()
            .filter(|r| &r.customer == customer && &r.new_item == new_item)
            .min_by_key(|r| r.created_at)
            .map(|r| r.id)?;
        entries.remove(&id)
    }

    /// Removes and returns every hold idle for longer than the TTL at `now`.
    pub fn evict_expired_at(&self, now: Instant) -> Vec<Reservation> {
        let ttl = self.ttl;
        let mut entries = self.lock();
        let expired: Vec<TransactionId> = entries
            .values()
            .filter(|r| now.saturating_duration_since(r.created_at) > ttl)
            .map(|r| r.id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| entries.remove(&id))
            .collect()
    }

    pub fn evict_expired(&self) -> Vec<Reservation> {
        self.evict_expired_at(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(s: &str) -> CustomerId {
        CustomerId::new(s).unwrap()
    }

    fn item(s: &str) -> ItemId {
        ItemId::new(s).unwrap()
    }

    #[test]
    fn test_take_matching_returns_oldest_hold() {
        let table = ReservationTable::new(Duration::from_secs(60));
        let start = Instant::now();
        let later = table.insert_at(
            customer("QCU1111"),
            item("BC1002"),
            item("QC1001"),
            start + Duration::from_secs(5),
        );
        let earlier = table.insert_at(customer("QCU1111"), item("BC1002"), item("QC1003"), start);
        table.insert_at(customer("ONU2222"), item("BC1002"), item("ON1001"), start);

        assert_eq!(
            table.take_matching(&customer("QCU1111"), &item("BC1002")).map(|r| r.id),
            Some(earlier)
        );
        assert_eq!(
            table.take_matching(&customer("QCU1111"), &item("BC1002")).map(|r| r.id),
            Some(later)
        );
        assert!(table.take_matching(&customer("QCU1111"), &item("BC1002")).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_evict_expired_only_removes_idle_holds() {
        let table = ReservationTable::new(Duration::from_secs(60));
        let start = Instant::now();
        table.insert_at(customer("QCU1111"), item("BC1001"), item("QC1001"), start);
        table.insert_at(
            customer("QCU1111"),
            item("BC1002"),
            item("QC1001"),
            start + Duration::from_secs(30),
        );

        assert!(table.evict_expired_at(start + Duration::from_secs(60)).is_empty());
        let evicted = table.evict_expired_at(start + Duration::from_secs(61));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].new_item, item("BC1001"));
        assert_eq!(table.len(), 1);
    }
}
