//! Cross-store exchange saga constants and parameters.

use common::{CustomerId, ItemId, Money};

/// The saga type identifier for a cross-store exchange.
pub const SAGA_TYPE: &str = "CrossStoreExchange";

/// Step name: feasibility check at the new item's store.
pub const STEP_CHECK: &str = "check";

/// Step name: reserve one unit of the new item.
pub const STEP_PREPARE: &str = "prepare";

/// Step name: restock the old item at its owner.
pub const STEP_RETURN: &str = "return";

/// Step name: finalize the reservation and settle the budget.
pub const STEP_COMMIT: &str = "commit";

/// Compensation for [`STEP_PREPARE`].
pub const STEP_ROLLBACK: &str = "rollback";

/// Compensation for [`STEP_RETURN`].
pub const STEP_UNDO_RETURN: &str = "undo_return";

/// Parameters of one cross-store exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    pub customer: CustomerId,
    pub new_item: ItemId,
    pub old_item: ItemId,
    /// The customer's budget as tracked by the initiating node.
    pub budget: Money,
    /// What the customer paid for the old item.
    pub old_price: Money,
}

impl ExchangeRequest {
    /// Budget after swapping items at `new_price`.
    pub fn projected_budget(&self, new_price: Money) -> Money {
        self.budget - (new_price - self.old_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projected_budget_charges_the_difference() {
        let request = ExchangeRequest {
            customer: CustomerId::new("QCU1111").unwrap(),
            new_item: ItemId::new("BC1002").unwrap(),
            old_item: ItemId::new("QC1001").unwrap(),
            budget: Money::from_cents(98_802),
            old_price: Money::from_cents(599),
        };
        assert_eq!(
            request.projected_budget(Money::from_cents(1_000)),
            Money::from_cents(98_401)
        );
        // A cheaper item refunds the difference.
        assert_eq!(
            request.projected_budget(Money::from_cents(399)),
            Money::from_cents(99_002)
        );
    }
}
