//! Peer-facing side of a store node.

use async_trait::async_trait;
use common::{CustomerId, ItemId, Money, TradeDate};
use domain::{DomainError, Purchase};
use tracing::{debug, info};
use wire::{FoundItem, InboundHandler, Operation, Request, Response};

use crate::error::{Result, StoreError};
use crate::node::StoreNode;
use crate::participant;

fn required<T: Clone>(value: &Option<T>, field: &'static str) -> Result<T> {
    value.clone().ok_or(StoreError::MissingField(field))
}

fn customer_of(request: &Request) -> Result<CustomerId> {
    required(&request.customer_id, "customerID")
}

fn item_of(request: &Request) -> Result<ItemId> {
    required(&request.item_id, "itemID")
}

fn old_item_of(request: &Request) -> Result<ItemId> {
    required(&request.old_item_id, "oldItemID")
}

fn describe(request: &Request) -> String {
    let field = |value: Option<String>| value.unwrap_or_default();
    format!(
        "{},{},{},{},{}",
        field(request.item_id.as_ref().map(ToString::to_string)),
        field(request.old_item_id.as_ref().map(ToString::to_string)),
        request.quantity,
        request.budget.to_decimal(),
        field(request.item_name.clone()),
    )
}

#[async_trait]
impl InboundHandler for StoreNode {
    async fn handle(&self, request: Request) -> Response {
        let operation = request.operation;
        debug!(%operation, "serving peer request");
        let result = match operation {
            Operation::Purchase => self.serve_purchase(&request),
            Operation::Find => self.serve_find(&request),
            Operation::ExchangeCheck => self.serve_check(&request),
            Operation::ExchangePrepare => self.serve_prepare(&request),
            Operation::ExchangeCommit => self.serve_commit(&request),
            Operation::ExchangeRollback => self.serve_rollback(&request),
            Operation::ExchangeReturn => self.serve_return(&request),
            Operation::ExchangeUndoReturn => self.serve_undo_return(&request),
        };
        let response = match result {
            Ok(response) => response,
            Err(e) => Response::failure(e.to_string(), e.code()),
        };

        let actor = request
            .customer_id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        self.record(
            &format!("PEER_{operation}"),
            &actor,
            describe(&request),
            response.message.clone(),
            response.success,
        );
        response
    }
}

impl StoreNode {
    /// Sells to a customer of another store against the budget it declared.
    fn serve_purchase(&self, request: &Request) -> Result<Response> {
        let customer = customer_of(request)?;
        let item = item_of(request)?;
        self.ensure_local(&item)?;
        let quantity = request.quantity;
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity: 0 }.into());
        }
        let date = request.date.unwrap_or_else(|| self.clock.today());
        let new_budget = self.sell_to_peer(&customer, &item, quantity, date, request.budget)?;
        Ok(Response::ok("Purchase successful").with_budget(new_budget))
    }

    fn sell_to_peer(
        &self,
        customer: &CustomerId,
        item: &ItemId,
        quantity: u32,
        date: TradeDate,
        budget: Money,
    ) -> Result<Money> {
        let store = self.store_code();
        let new_budget = self.ledger.mutate(item, |slot| -> domain::Result<Money> {
            let current = slot
                .as_mut()
                .ok_or_else(|| DomainError::ItemNotFound(item.clone()))?;
            if current.quantity < quantity {
                return Err(DomainError::InsufficientStock {
                    available: current.quantity,
                    requested: quantity,
                });
            }
            let total = current.price.checked_multiply(quantity).ok_or(
                DomainError::InsufficientBudget {
                    available: budget,
                    required: Money::MAX,
                },
            )?;
            if budget < total {
                return Err(DomainError::InsufficientBudget {
                    available: budget,
                    required: total,
                });
            }
            if !self.accounts.can_purchase_from(customer, store) {
                return Err(DomainError::PurchaseLimit {
                    store: store.clone(),
                });
            }
            current.quantity -= quantity;
            self.accounts
                .record_purchase(Purchase::new(customer.clone(), item.clone(), date, total));
            Ok(budget - total)
        })?;
        Ok(new_budget)
    }

    fn serve_find(&self, request: &Request) -> Result<Response> {
        let name = required(&request.item_name, "itemName")?;
        let items = self
            .find_local(&name)
            .into_iter()
            .map(|item| FoundItem {
                id: item.id,
                name: item.name,
                quantity: item.quantity,
                price: item.price,
            })
            .collect();
        Ok(Response::ok("Items found").with_items(items))
    }

    /// Read-only: stock, budget and purchase limit for the new item.
    fn serve_check(&self, request: &Request) -> Result<Response> {
        let customer = customer_of(request)?;
        let item = item_of(request)?;
        self.ensure_local(&item)?;

        let (price, in_stock) = self
            .ledger
            .read(&item, |current| current.map(|i| (i.price, i.in_stock())))
            .ok_or_else(|| DomainError::ItemNotFound(item.clone()))?;
        if !in_stock {
            return Err(DomainError::OutOfStock(item).into());
        }
        let difference = price - request.old_item_price;
        if difference.is_positive() && request.budget < difference {
            return Err(DomainError::InsufficientBudget {
                available: request.budget,
                required: difference,
            }
            .into());
        }
        let store = self.store_code();
        if !self.accounts.can_purchase_from(&customer, store) {
            return Err(DomainError::PurchaseLimit {
                store: store.clone(),
            }
            .into());
        }
        Ok(Response::ok("Exchange check passed")
            .with_budget(participant::budget_after_swap(
                request.budget,
                price,
                request.old_item_price,
            ))
            .with_item_price(price))
    }

    fn serve_prepare(&self, request: &Request) -> Result<Response> {
        let customer = customer_of(request)?;
        let item = item_of(request)?;
        let old_item = old_item_of(request)?;
        self.ensure_local(&item)?;
        self.evict_idle_reservations();

        let id = participant::reserve(
            &self.ledger,
            &self.reservations,
            &customer,
            &item,
            &old_item,
        )?;
        info!(transaction_id = %id, %customer, %item, "unit reserved for exchange");
        Ok(Response::ok("Item reserved").with_transaction(id))
    }

    fn serve_commit(&self, request: &Request) -> Result<Response> {
        let customer = customer_of(request)?;
        let item = item_of(request)?;
        self.ensure_local(&item)?;

        let price = self
            .ledger
            .read(&item, |current| current.map(|i| i.price))
            .ok_or_else(|| DomainError::ItemNotFound(item.clone()))?;
        let reservation = self
            .reservations
            .take_matching(&customer, &item)
            .ok_or_else(|| DomainError::NoReservation(item.clone()))?;
        info!(transaction_id = %reservation.id, %customer, %item, "exchange committed");
        Ok(Response::ok("Exchange committed")
            .with_budget(participant::budget_after_swap(
                request.budget,
                price,
                request.old_item_price,
            ))
            .with_transaction(reservation.id))
    }

    /// Releases the oldest matching reservation. Repeating it is harmless.
    fn serve_rollback(&self, request: &Request) -> Result<Response> {
        let customer = customer_of(request)?;
        let item = item_of(request)?;
        self.ensure_local(&item)?;

        match self.reservations.take_matching(&customer, &item) {
            Some(reservation) => {
                participant::release(&self.ledger, &item);
                info!(transaction_id = %reservation.id, %customer, %item, "exchange rolled back");
                Ok(Response::ok("Exchange rolled back").with_transaction(reservation.id))
            }
            None => Ok(Response::ok("Nothing to roll back")),
        }
    }

    fn serve_return(&self, request: &Request) -> Result<Response> {
        let item = item_of(request)?;
        self.ensure_local(&item)?;
        participant::restock_returned(&self.ledger, &item)?;
        Ok(Response::ok("Item returned"))
    }

    fn serve_undo_return(&self, request: &Request) -> Result<Response> {
        let item = item_of(request)?;
        self.ensure_local(&item)?;
        participant::unreturn(&self.ledger, &item)?;
        Ok(Response::ok("Return undone"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use common::StoreCode;

    use super::*;
    use crate::config::NodeConfig;
    use crate::loopback::LoopbackNetwork;

    fn node() -> StoreNode {
        let node = StoreNode::new(
            NodeConfig::new(StoreCode::new("BC").unwrap())
                .with_reservation_ttl(Duration::from_secs(30)),
            Arc::new(LoopbackNetwork::new()),
        );
        node.seed_sample_inventory().unwrap();
        node
    }

    fn id(s: &str) -> ItemId {
        ItemId::new(s).unwrap()
    }

    fn customer() -> CustomerId {
        CustomerId::new("QCU1111").unwrap()
    }

    fn prepare() -> Request {
        Request::exchange_prepare(
            customer(),
            id("BC1002"),
            Money::from_dollars(1000),
            id("QC1001"),
            Money::from_cents(599),
        )
    }

    #[tokio::test]
    async fn test_peer_purchase_uses_declared_budget() {
        let node = node();
        let request = Request::purchase(
            customer(),
            id("BC1001"),
            TradeDate::parse("01012025").unwrap(),
            Money::from_dollars(20),
            2,
        );

        let response = node.handle(request.clone()).await;
        assert!(response.success);
        assert_eq!(response.new_budget, Money::from_cents(802));
        assert_eq!(node.item(&id("BC1001")).unwrap().quantity, 8);
        // Recorded here, so the one-per-store limit holds.
        let again = node.handle(request).await;
        assert!(!again.success);
        assert_eq!(again.error_code.as_deref(), Some("PURCHASE_LIMIT"));
    }

    #[tokio::test]
    async fn test_peer_purchase_with_overflowing_total_is_refused() {
        let node = node();
        node.ledger.mutate(&id("BC7000"), |slot| {
            *slot = Some(domain::Item::new(
                id("BC7000"),
                "Gold Bar",
                5,
                Money::from_cents(i64::MAX / 2),
            ));
        });
        let request = Request::purchase(
            customer(),
            id("BC7000"),
            TradeDate::parse("01012025").unwrap(),
            Money::MAX,
            3,
        );

        let response = node.handle(request).await;
        assert!(!response.success);
        assert_eq!(response.error_code.as_deref(), Some("INSUFFICIENT_BUDGET"));
        assert_eq!(node.item(&id("BC7000")).unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_peer_purchase_of_empty_item_is_a_failure() {
        let node = node();
        node.handle(Request::purchase(
            CustomerId::new("BCU0001").unwrap(),
            id("BC1003"),
            TradeDate::parse("01012025").unwrap(),
            Money::from_dollars(1000),
            20,
        ))
        .await;

        let response = node
            .handle(Request::purchase(
                customer(),
                id("BC1003"),
                TradeDate::parse("01012025").unwrap(),
                Money::from_dollars(1000),
                1,
            ))
            .await;
        assert!(!response.success);
        assert_eq!(response.error_code.as_deref(), Some("INSUFFICIENT_STOCK"));
    }

    #[tokio::test]
    async fn test_find_matches_case_insensitively_and_skips_empty() {
        let node = node();
        let response = node.handle(Request::find(customer(), "tEa")).await;
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].id, id("BC1002"));

        let response = node.handle(Request::find(customer(), "milk")).await;
        assert!(response.success);
        assert!(response.items.is_empty());
    }

    #[tokio::test]
    async fn test_check_reports_price_and_projected_budget() {
        let node = node();
        let response = node
            .handle(Request::exchange_check(
                customer(),
                id("BC1001"),
                Money::from_dollars(100),
                id("QC1002"),
                Money::from_cents(399),
            ))
            .await;
        assert!(response.success);
        assert_eq!(response.item_price, Money::from_cents(599));
        assert_eq!(response.new_budget, Money::from_cents(9_800));
        assert_eq!(node.item(&id("BC1001")).unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_check_refuses_short_budget() {
        let node = node();
        let response = node
            .handle(Request::exchange_check(
                customer(),
                id("BC1001"),
                Money::from_cents(100),
                id("QC1003"),
                Money::from_cents(250),
            ))
            .await;
        assert!(!response.success);
        assert_eq!(response.error_code.as_deref(), Some("INSUFFICIENT_BUDGET"));
    }

    #[tokio::test]
    async fn test_prepare_commit_consumes_reservation() {
        let node = node();
        let prepared = node.handle(prepare()).await;
        assert!(prepared.success);
        assert!(prepared.transaction_id.is_some());
        assert_eq!(node.item(&id("BC1002")).unwrap().quantity, 14);
        assert_eq!(node.pending_reservations(), 1);

        let commit = Request::exchange_commit(
            customer(),
            id("BC1002"),
            Money::from_dollars(1000),
            id("QC1001"),
            Money::from_cents(599),
        );
        let committed = node.handle(commit.clone()).await;
        assert!(committed.success);
        assert_eq!(committed.new_budget, Money::from_cents(100_200));
        assert_eq!(committed.transaction_id, prepared.transaction_id);
        assert_eq!(node.pending_reservations(), 0);
        assert_eq!(node.item(&id("BC1002")).unwrap().quantity, 14);

        let repeated = node.handle(commit).await;
        assert_eq!(repeated.error_code.as_deref(), Some("NO_RESERVATION"));
    }

    #[tokio::test]
    async fn test_duplicate_rollback_restocks_once() {
        let node = node();
        node.handle(prepare()).await;
        let rollback = Request::exchange_rollback(customer(), id("BC1002"), id("QC1001"));

        assert!(node.handle(rollback.clone()).await.success);
        assert!(node.handle(rollback).await.success);
        assert_eq!(node.item(&id("BC1002")).unwrap().quantity, 15);
    }

    #[tokio::test]
    async fn test_idle_reservation_is_evicted_and_restocked() {
        let node = node();
        node.handle(prepare()).await;

        assert_eq!(node.evict_idle_reservations_at(Instant::now()), 0);
        let later = Instant::now() + Duration::from_secs(31);
        assert_eq!(node.evict_idle_reservations_at(later), 1);
        assert_eq!(node.item(&id("BC1002")).unwrap().quantity, 15);
        assert_eq!(node.pending_reservations(), 0);
    }

    #[tokio::test]
    async fn test_return_and_undo_return() {
        let node = node();
        let returned = node
            .handle(Request::exchange_return(customer(), id("BC1003")))
            .await;
        assert!(returned.success);
        assert_eq!(node.item(&id("BC1003")).unwrap().quantity, 21);

        let undone = node
            .handle(Request::exchange_undo_return(customer(), id("BC1003")))
            .await;
        assert!(undone.success);
        assert_eq!(node.item(&id("BC1003")).unwrap().quantity, 20);

        let missing = node
            .handle(Request::exchange_return(customer(), id("BC9999")))
            .await;
        assert_eq!(missing.error_code.as_deref(), Some("ITEM_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_foreign_items_are_refused() {
        let node = node();
        let response = node
            .handle(Request::exchange_return(customer(), id("QC1001")))
            .await;
        assert!(!response.success);
        assert_eq!(response.error_code.as_deref(), Some("FOREIGN_ITEM"));
    }

    #[tokio::test]
    async fn test_missing_fields_are_reported() {
        let node = node();
        let mut request = prepare();
        request.old_item_id = None;
        let response = node.handle(request).await;
        assert!(!response.success);
        assert_eq!(response.message, "Missing field: oldItemID");
        assert_eq!(response.error_code.as_deref(), Some("MALFORMED"));
        assert_eq!(node.item(&id("BC1002")).unwrap().quantity, 15);
    }
}
