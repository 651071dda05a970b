//! Per-item inventory state and the exclusive regions that guard it.
//!
//! Every item ID maps to one slot: a reader/writer lock around
//! `Option<Item>`. The slot is the guard and the state at once, so the
//! single-item operations and the exchange participant paths all serialize
//! on the same lock for a given ID.
//!
//! Slots are created on first reference and never removed. The map can only
//! grow to the size of the item-ID space (`<store><4 digits>`, 10 000 per
//! store), which bounds it.

use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use common::{ItemId, Money};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// An inventory item as held by its owning store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub quantity: u32,
    pub price: Money,
}

impl Item {
    /// Creates a new item.
    pub fn new(id: ItemId, name: impl Into<String>, quantity: u32, price: Money) -> Self {
        Self {
            id,
            name: name.into(),
            quantity,
            price,
        }
    }

    /// True if at least one unit is available.
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.id,
            self.name,
            self.quantity,
            self.price.to_decimal()
        )
    }
}

/// Item names travel inside wire records, so they may not contain the
/// record, field or list delimiters.
pub fn validate_item_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains(['|', ',', ';', '\n', '\r']) {
        return Err(DomainError::InvalidItemName {
            name: name.to_string(),
        });
    }
    Ok(())
}

type Slot = Arc<RwLock<Option<Item>>>;

/// Concurrent item table keyed by item ID.
///
/// Cloning shares the underlying table.
#[derive(Debug, Clone, Default)]
pub struct ItemLedger {
    slots: Arc<DashMap<ItemId, Slot>>,
}

impl ItemLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the guard for `id`, inserting an empty slot if absent.
    ///
    /// The map entry is released before the caller locks the slot.
    fn slot(&self, id: &ItemId) -> Slot {
        self.slots.entry(id.clone()).or_default().clone()
    }

    /// Returns a snapshot of the item, if it exists.
    pub fn get(&self, id: &ItemId) -> Option<Item> {
        self.read(id, |item| item.cloned())
    }

    /// Runs `f` under shared access to the item.
    pub fn read<R>(&self, id: &ItemId, f: impl FnOnce(Option<&Item>) -> R) -> R {
        let slot = self.slot(id);
        let guard = slot.read().unwrap_or_else(PoisonError::into_inner);
        f(guard.as_ref())
    }

    /// Runs `f` under exclusive access to the item's slot.
    ///
    /// `f` may create the item by filling an empty slot.
    pub fn mutate<R>(&self, id: &ItemId, f: impl FnOnce(&mut Option<Item>) -> R) -> R {
        let slot = self.slot(id);
        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Runs `f` with exclusive access to two distinct items.
    ///
    /// Guards are always taken in ascending ID order so two callers naming
    /// the same pair in opposite order cannot deadlock. `f` receives the
    /// slots in argument order regardless of locking order.
    pub fn mutate_pair<R>(
        &self,
        first: &ItemId,
        second: &ItemId,
        f: impl FnOnce(&mut Option<Item>, &mut Option<Item>) -> R,
    ) -> Result<R> {
        if first == second {
            return Err(DomainError::SameItem(first.clone()));
        }
        let first_slot = self.slot(first);
        let second_slot = self.slot(second);

        let (mut first_guard, mut second_guard) = if first < second {
            let a = write(&first_slot);
            let b = write(&second_slot);
            (a, b)
        } else {
            let b = write(&second_slot);
            let a = write(&first_slot);
            (a, b)
        };
        Ok(f(&mut first_guard, &mut second_guard))
    }

    /// IDs of every item that currently exists, in ascending order.
    pub fn item_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.slots.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids.retain(|id| self.read(id, |item| item.is_some()));
        ids
    }

    /// Per-item snapshots taken one shared guard at a time.
    ///
    /// This is not a consistent global snapshot: writers may interleave
    /// between items.
    pub fn snapshot(&self) -> Vec<Item> {
        let mut ids: Vec<ItemId> = self.slots.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.get(&id)).collect()
    }

    /// Number of guards ever created, including those for absent items.
    pub fn guard_count(&self) -> usize {
        self.slots.len()
    }
}

fn write(slot: &Slot) -> RwLockWriteGuard<'_, Option<Item>> {
    slot.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn id(s: &str) -> ItemId {
        ItemId::new(s).unwrap()
    }

    fn coffee() -> Item {
        Item::new(id("QC1001"), "Coffee", 10, Money::from_cents(599))
    }

    #[test]
    fn test_mutate_creates_and_updates() {
        let ledger = ItemLedger::new();
        ledger.mutate(&id("QC1001"), |slot| *slot = Some(coffee()));
        ledger.mutate(&id("QC1001"), |slot| {
            if let Some(item) = slot {
                item.quantity -= 2;
            }
        });
        assert_eq!(ledger.get(&id("QC1001")).unwrap().quantity, 8);
    }

    #[test]
    fn test_get_missing_item_creates_guard_but_no_item() {
        let ledger = ItemLedger::new();
        assert!(ledger.get(&id("QC9999")).is_none());
        assert_eq!(ledger.guard_count(), 1);
        assert!(ledger.item_ids().is_empty());
    }

    #[test]
    fn test_snapshot_is_sorted_and_skips_empty_slots() {
        let ledger = ItemLedger::new();
        for (raw, name) in [("QC1003", "Sugar"), ("QC1001", "Coffee")] {
            ledger.mutate(&id(raw), |slot| {
                *slot = Some(Item::new(id(raw), name, 1, Money::from_cents(100)))
            });
        }
        let _ = ledger.get(&id("QC1002"));
        let names: Vec<_> = ledger.snapshot().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Coffee", "Sugar"]);
    }

    #[test]
    fn test_mutate_pair_passes_slots_in_argument_order() {
        let ledger = ItemLedger::new();
        ledger.mutate(&id("QC1001"), |slot| *slot = Some(coffee()));
        let names = ledger
            .mutate_pair(&id("QC2000"), &id("QC1001"), |high, low| {
                (high.is_some(), low.as_ref().map(|i| i.name.clone()))
            })
            .unwrap();
        assert_eq!(names, (false, Some("Coffee".to_string())));
    }

    #[test]
    fn test_mutate_pair_rejects_same_item() {
        let ledger = ItemLedger::new();
        let result = ledger.mutate_pair(&id("QC1001"), &id("QC1001"), |_, _| ());
        assert_eq!(result, Err(DomainError::SameItem(id("QC1001"))));
    }

    #[test]
    fn test_opposite_order_pairs_do_not_deadlock() {
        let ledger = ItemLedger::new();
        let a = id("QC1001");
        let b = id("QC1002");
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let ledger = ledger.clone();
                let (x, y) = if n % 2 == 0 {
                    (a.clone(), b.clone())
                } else {
                    (b.clone(), a.clone())
                };
                thread::spawn(move || {
                    for _ in 0..200 {
                        ledger
                            .mutate_pair(&x, &y, |_, _| thread::sleep(Duration::from_micros(10)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
