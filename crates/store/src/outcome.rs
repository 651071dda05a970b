//! Typed results of client operations.
//!
//! Each outcome renders, via `Display`, the text shown to the customer or
//! manager and recorded in the audit trail.

use std::fmt;

use common::{CustomerId, ItemId, Money, StoreCode};
use domain::Item;
use saga::SagaId;
use serde::Serialize;

/// Result of restocking or creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    /// The item right after the add, before any waitlist purchase.
    pub item: Item,
    pub created: bool,
    /// The waitlisted customer served by this restock, if any.
    pub waitlist: Option<WaitlistFill>,
}

/// One waitlisted customer dequeued by a restock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitlistFill {
    pub customer: CustomerId,
    pub purchased: bool,
    /// Outcome text of the purchase attempted on the customer's behalf.
    pub outcome: String,
}

impl fmt::Display for AddOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.created {
            write!(f, "Item added successfully")?;
        } else {
            write!(f, "Item quantity updated. New quantity: {}", self.item.quantity)?;
        }
        match &self.waitlist {
            Some(fill) if fill.purchased => {
                write!(f, ". Waitlisted customer {} received one unit", fill.customer)
            }
            Some(fill) => write!(
                f,
                ". Waitlisted customer {} could not be served: {}",
                fill.customer, fill.outcome
            ),
            None => Ok(()),
        }
    }
}

/// Result of taking stock out of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveOutcome {
    pub item: Item,
    /// True if the request removed all remaining stock.
    pub cleared: bool,
}

impl fmt::Display for RemoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cleared {
            write!(f, "Item quantity set to 0. Item remains in inventory for waitlist.")
        } else {
            write!(f, "Item quantity reduced. New quantity: {}", self.item.quantity)
        }
    }
}

/// Per-item listing of a store's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub store: StoreCode,
    pub items: Vec<Item>,
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Store {} Inventory:", self.store)?;
        for item in &self.items {
            write!(f, "\n{item}")?;
        }
        Ok(())
    }
}

/// Result of a purchase request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PurchaseOutcome {
    Purchased {
        item: ItemId,
        quantity: u32,
        total: Money,
        remaining_budget: Money,
    },
    /// The item exists but has no stock; the customer may join its waitlist.
    WaitlistOffer { item: ItemId },
}

impl PurchaseOutcome {
    pub fn is_purchased(&self) -> bool {
        matches!(self, PurchaseOutcome::Purchased { .. })
    }
}

impl fmt::Display for PurchaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseOutcome::Purchased {
                item,
                quantity,
                total,
                remaining_budget,
            } => write!(
                f,
                "Purchase successful! Bought {quantity} x {item} for {total}. Remaining budget: {remaining_budget}"
            ),
            PurchaseOutcome::WaitlistOffer { item } => {
                write!(f, "Item {item} is out of stock. Join the waitlist?")
            }
        }
    }
}

/// Result of a name search across all stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindOutcome {
    pub name: String,
    /// Local matches first, then each peer's in directory order.
    pub items: Vec<Item>,
    /// Peers that did not answer; their stock is missing from `items`.
    pub unreachable: Vec<StoreCode>,
}

impl fmt::Display for FindOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            return write!(f, "No items found with name: {}", self.name);
        }
        write!(f, "Found items:")?;
        for item in &self.items {
            write!(f, "\n{item}")?;
        }
        Ok(())
    }
}

/// Result of returning a purchased item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnOutcome {
    pub item: ItemId,
    pub refund: Money,
    pub budget: Money,
}

impl fmt::Display for ReturnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Return successful. Refunded: {}", self.refund)
    }
}

/// Result of swapping a held item for another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeOutcome {
    pub new_item: ItemId,
    pub old_item: ItemId,
    /// Amount charged; negative when the customer was refunded.
    pub difference: Money,
    pub budget: Money,
    /// Set for cross-store exchanges.
    pub saga_id: Option<SagaId>,
}

impl fmt::Display for ExchangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.difference.is_positive() {
            write!(f, "Exchange successful. Paid {}", self.difference)
        } else {
            write!(f, "Exchange successful. Refunded {}", self.difference.abs())
        }
    }
}

/// Result of joining an item's waitlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitlistOutcome {
    pub item: ItemId,
    pub position: usize,
    pub newly_added: bool,
}

impl fmt::Display for WaitlistOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.newly_added {
            write!(f, "Added to waitlist for {}. Position: {}", self.item, self.position)
        } else {
            write!(
                f,
                "Already in waitlist for this item. Position: {}",
                self.position
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, name: &str, quantity: u32, cents: i64) -> Item {
        Item::new(ItemId::new(id).unwrap(), name, quantity, Money::from_cents(cents))
    }

    #[test]
    fn test_inventory_lists_one_item_per_line() {
        let inventory = Inventory {
            store: StoreCode::new("QC").unwrap(),
            items: vec![item("QC1001", "Coffee", 10, 599), item("QC1003", "Sugar", 0, 250)],
        };
        assert_eq!(
            inventory.to_string(),
            "Store QC Inventory:\nQC1001 Coffee 10 5.99\nQC1003 Sugar 0 2.50"
        );
    }

    #[test]
    fn test_empty_find_is_distinct() {
        let mut outcome = FindOutcome {
            name: "tea".into(),
            items: Vec::new(),
            unreachable: Vec::new(),
        };
        assert_eq!(outcome.to_string(), "No items found with name: tea");

        outcome.items.push(item("ON1002", "Tea", 4, 399));
        assert_eq!(outcome.to_string(), "Found items:\nON1002 Tea 4 3.99");
    }

    #[test]
    fn test_purchase_texts() {
        let purchased = PurchaseOutcome::Purchased {
            item: ItemId::new("QC1001").unwrap(),
            quantity: 2,
            total: Money::from_cents(1_198),
            remaining_budget: Money::from_cents(98_802),
        };
        assert_eq!(
            purchased.to_string(),
            "Purchase successful! Bought 2 x QC1001 for $11.98. Remaining budget: $988.02"
        );
        let offer = PurchaseOutcome::WaitlistOffer {
            item: ItemId::new("QC5001").unwrap(),
        };
        assert!(!offer.is_purchased());
        assert!(offer.to_string().contains("QC5001"));
    }

    #[test]
    fn test_exchange_text_shows_refund_as_positive() {
        let outcome = ExchangeOutcome {
            new_item: ItemId::new("QC1002").unwrap(),
            old_item: ItemId::new("QC1001").unwrap(),
            difference: Money::from_cents(-200),
            budget: Money::from_cents(99_000),
            saga_id: None,
        };
        assert_eq!(outcome.to_string(), "Exchange successful. Refunded $2.00");
    }
}
