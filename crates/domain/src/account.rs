//! Customer budgets and purchase history.
//!
//! Each node tracks only the customers it has serviced itself; there is no
//! shared registry. Accounts are sharded by the map but have no lock of
//! their own, so two concurrent operations for the same customer on
//! different items may interleave their budget updates.

use common::{CustomerId, ItemId, Money, StoreCode, TradeDate};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// One held, unreturned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub customer: CustomerId,
    pub item: ItemId,
    pub date: TradeDate,
    /// Total paid, which for multi-unit purchases is price × quantity.
    pub price: Money,
}

impl Purchase {
    /// Creates a new purchase record.
    pub fn new(customer: CustomerId, item: ItemId, date: TradeDate, price: Money) -> Self {
        Self {
            customer,
            item,
            date,
            price,
        }
    }

    /// True if the item may still be returned or exchanged on `on`.
    pub fn can_return(&self, on: TradeDate, window_days: u64) -> bool {
        self.date.within_days(on, window_days)
    }
}

/// Budget and ordered purchase list of one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAccount {
    pub id: CustomerId,
    pub budget: Money,
    pub purchases: Vec<Purchase>,
}

impl CustomerAccount {
    fn new(id: CustomerId, budget: Money) -> Self {
        Self {
            id,
            budget,
            purchases: Vec::new(),
        }
    }
}

/// All customer accounts known to one node.
#[derive(Debug)]
pub struct AccountBook {
    accounts: DashMap<CustomerId, CustomerAccount>,
    default_budget: Money,
}

impl AccountBook {
    /// Creates an empty book whose accounts start at `default_budget`.
    pub fn new(default_budget: Money) -> Self {
        Self {
            accounts: DashMap::new(),
            default_budget,
        }
    }

    /// Opens the account on first reference and returns the current budget.
    pub fn ensure(&self, customer: &CustomerId) -> Money {
        self.accounts
            .entry(customer.clone())
            .or_insert_with(|| CustomerAccount::new(customer.clone(), self.default_budget))
            .budget
    }

    /// Current budget, if the customer has an account here.
    pub fn budget(&self, customer: &CustomerId) -> Option<Money> {
        self.accounts.get(customer).map(|account| account.budget)
    }

    /// Snapshot of the whole account.
    pub fn account(&self, customer: &CustomerId) -> Option<CustomerAccount> {
        self.accounts.get(customer).map(|account| account.clone())
    }

    /// Snapshot of the customer's purchases in the order they were made.
    pub fn purchases(&self, customer: &CustomerId) -> Vec<Purchase> {
        self.accounts
            .get(customer)
            .map(|account| account.purchases.clone())
            .unwrap_or_default()
    }

    /// First purchase of `item` by `customer`.
    pub fn find_purchase(&self, customer: &CustomerId, item: &ItemId) -> Option<Purchase> {
        self.accounts.get(customer).and_then(|account| {
            account
                .purchases
                .iter()
                .find(|p| &p.item == item && &p.customer == customer)
                .cloned()
        })
    }

    /// True if any recorded purchase has an item ID prefixed by `store`.
    ///
    /// Matches by prefix over the whole history, so a record for an item
    /// that was later exchanged away at another node still counts.
    pub fn has_purchase_from(&self, customer: &CustomerId, store: &StoreCode) -> bool {
        self.accounts
            .get(customer)
            .map(|account| account.purchases.iter().any(|p| p.item.belongs_to(store)))
            .unwrap_or(false)
    }

    /// Foreign-purchase limit: one active purchase per non-home store.
    ///
    /// Purchases from the customer's home store are unrestricted.
    pub fn can_purchase_from(&self, customer: &CustomerId, store: &StoreCode) -> bool {
        customer.home_store() == *store || !self.has_purchase_from(customer, store)
    }

    /// Debits `amount` if the budget covers it, returning the new budget.
    ///
    /// On refusal returns the available budget.
    pub fn try_debit(&self, customer: &CustomerId, amount: Money) -> Result<Money, Money> {
        let mut account = self.entry(customer);
        if account.budget < amount {
            return Err(account.budget);
        }
        account.budget -= amount;
        Ok(account.budget)
    }

    /// Adds `delta` (which may be negative) to the budget and returns it.
    pub fn adjust(&self, customer: &CustomerId, delta: Money) -> Money {
        let mut account = self.entry(customer);
        account.budget += delta;
        account.budget
    }

    /// Overwrites the tracked budget.
    pub fn set_budget(&self, customer: &CustomerId, budget: Money) {
        self.entry(customer).budget = budget;
    }

    /// Appends a purchase to the customer's history.
    pub fn record_purchase(&self, purchase: Purchase) {
        self.entry(&purchase.customer).purchases.push(purchase);
    }

    /// Removes one record equal to `purchase`. False if none matched.
    pub fn remove_purchase(&self, purchase: &Purchase) -> bool {
        let Some(mut account) = self.accounts.get_mut(&purchase.customer) else {
            return false;
        };
        match account.purchases.iter().position(|p| p == purchase) {
            Some(index) => {
                account.purchases.remove(index);
                true
            }
            None => false,
        }
    }

    /// Swaps `old` for `new` in place. False if `old` is no longer held.
    pub fn replace_purchase(&self, old: &Purchase, new: Purchase) -> bool {
        let Some(mut account) = self.accounts.get_mut(&old.customer) else {
            return false;
        };
        match account.purchases.iter().position(|p| p == old) {
            Some(index) => {
                account.purchases.remove(index);
                account.purchases.push(new);
                true
            }
            None => false,
        }
    }

    /// Number of accounts opened on this node.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True if no account has been opened yet.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn entry(
        &self,
        customer: &CustomerId,
    ) -> dashmap::mapref::one::RefMut<'_, CustomerId, CustomerAccount> {
        self.accounts
            .entry(customer.clone())
            .or_insert_with(|| CustomerAccount::new(customer.clone(), self.default_budget))
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

    fn date(s: &str) -> TradeDate {
        TradeDate::parse(s).unwrap()
    }

    fn store(s: &str) -> StoreCode {
        StoreCode::new(s).unwrap()
    }

    #[test]
    fn test_ensure_opens_with_default_budget_once() {
        let book = AccountBook::new(Money::from_dollars(1000));
        let qc = customer("QCU1111");
        assert_eq!(book.budget(&qc), None);
        assert_eq!(book.ensure(&qc), Money::from_dollars(1000));
        book.adjust(&qc, Money::from_cents(-1198));
        assert_eq!(book.ensure(&qc), Money::from_cents(98802));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_try_debit_never_goes_negative() {
        let book = AccountBook::new(Money::from_dollars(10));
        let qc = customer("QCU1111");
        assert_eq!(book.try_debit(&qc, Money::from_dollars(4)), Ok(Money::from_dollars(6)));
        assert_eq!(book.try_debit(&qc, Money::from_dollars(7)), Err(Money::from_dollars(6)));
        assert_eq!(book.budget(&qc), Some(Money::from_dollars(6)));
    }

    #[test]
    fn test_can_return_boundary() {
        let purchase = Purchase::new(
            customer("QCU1111"),
            item("QC1001"),
            date("01012025"),
            Money::from_cents(599),
        );
        assert!(purchase.can_return(date("31012025"), 30));
        assert!(!purchase.can_return(date("01022025"), 30));
    }

    #[test]
    fn test_foreign_limit_exempts_home_store() {
        let book = AccountBook::new(Money::from_dollars(1000));
        let qc = customer("QCU1111");
        for raw in ["QC1001", "QC1002"] {
            book.record_purchase(Purchase::new(
                qc.clone(),
                item(raw),
                date("01012025"),
                Money::from_cents(100),
            ));
        }
        assert!(book.can_purchase_from(&qc, &store("QC")));
        assert!(book.can_purchase_from(&qc, &store("ON")));

        book.record_purchase(Purchase::new(
            qc.clone(),
            item("ON1001"),
            date("01012025"),
            Money::from_cents(100),
        ));
        assert!(!book.can_purchase_from(&qc, &store("ON")));
        assert!(book.can_purchase_from(&qc, &store("BC")));
    }

    #[test]
    fn test_remove_and_replace_purchase() {
        let book = AccountBook::new(Money::from_dollars(1000));
        let qc = customer("QCU1111");
        let old = Purchase::new(qc.clone(), item("QC1001"), date("01012025"), Money::from_cents(599));
        book.record_purchase(old.clone());

        let new = Purchase::new(qc.clone(), item("QC1002"), date("02012025"), Money::from_cents(399));
        assert!(book.replace_purchase(&old, new.clone()));
        assert!(!book.replace_purchase(&old, new.clone()));
        assert_eq!(book.find_purchase(&qc, &item("QC1002")), Some(new.clone()));

        assert!(book.remove_purchase(&new));
        assert!(!book.remove_purchase(&new));
        assert!(book.purchases(&qc).is_empty());
    }
}
