//! FIFO queues of customers waiting for out-of-stock items.

use std::collections::VecDeque;

use common::{CustomerId, ItemId};
use dashmap::DashMap;

/// Outcome of joining a waitlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitlistPosition {
    /// 1-based position in the queue.
    pub position: usize,
    /// False if the customer was already queued for the item.
    pub newly_added: bool,
}

/// Per-item waitlists. A customer appears at most once per item.
#[derive(Debug, Default)]
pub struct Waitlists {
    queues: DashMap<ItemId, VecDeque<CustomerId>>,
}

impl Waitlists {
    /// Creates an empty set of waitlists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `customer` unless already queued; returns the position.
    pub fn join(&self, item: &ItemId, customer: &CustomerId) -> WaitlistPosition {
        let mut queue = self.queues.entry(item.clone()).or_default();
        if let Some(index) = queue.iter().position(|c| c == customer) {
            return WaitlistPosition {
                position: index + 1,
                newly_added: false,
            };
        }
        queue.push_back(customer.clone());
        WaitlistPosition {
            position: queue.len(),
            newly_added: true,
        }
    }

    /// Dequeues the customer who joined earliest.
    pub fn pop(&self, item: &ItemId) -> Option<CustomerId> {
        self.queues.get_mut(item).and_then(|mut queue| queue.pop_front())
    }

    /// Customers queued for `item`, in join order.
    pub fn waiting(&self, item: &ItemId) -> Vec<CustomerId> {
        self.queues
            .get(item)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Queue length for `item`.
    pub fn len(&self, item: &ItemId) -> usize {
        self.queues.get(item).map(|queue| queue.len()).unwrap_or(0)
    }
}
