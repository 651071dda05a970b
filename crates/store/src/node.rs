//! The store node: local operations and the client side of peer calls.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use common::{CustomerId, ItemId, ManagerId, Money, StoreCode, TradeDate};
use domain::{
    AccountBook, AuditEntry, AuditSink, Clock, DomainError, Item, ItemLedger, Purchase,
    SystemClock, TracingAuditSink, Waitlists, validate_item_name,
};
use futures_util::future::join_all;
use saga::{
    ExchangeCoordinator, ExchangeRequest, RemoteNewItemStore, ReservationTable, SagaInstance,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wire::{PeerClient, Request};

use crate::config::{MAX_ITEM_PRICE, NodeConfig};
use crate::error::{Result, StoreError};
use crate::outcome::{
    AddOutcome, ExchangeOutcome, FindOutcome, Inventory, PurchaseOutcome, RemoveOutcome,
    ReturnOutcome, WaitlistFill, WaitlistOutcome,
};
use crate::participant::{self, OldItemLeg};

/// Saga records kept for inspection, oldest dropped first.
const SAGA_LOG_CAPACITY: usize = 64;

/// Items every store starts with when seeded: suffix, name, quantity, cents.
const SAMPLE_ITEMS: [(u16, &str, u32, i64); 3] = [
    (1001, "Coffee", 10, 599),
    (1002, "Tea", 15, 399),
    (1003, "Sugar", 20, 250),
];

/// One running store.
///
/// Owns the item ledger, customer accounts, waitlists and pending exchange
/// reservations of its store code. Every public operation validates its
/// input before touching state, records its outcome in the audit sink and
/// counts it in `store_operations_total`.
pub struct StoreNode {
    config: NodeConfig,
    pub(crate) ledger: ItemLedger,
    pub(crate) accounts: AccountBook,
    waitlists: Waitlists,
    pub(crate) reservations: ReservationTable,
    peers: Arc<dyn PeerClient>,
    pub(crate) clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
    sagas: Mutex<VecDeque<SagaInstance>>,
}

impl StoreNode {
    /// Creates an empty store reaching its peers through `peers`.
    pub fn new(config: NodeConfig, peers: Arc<dyn PeerClient>) -> Self {
        Self {
            accounts: AccountBook::new(config.default_budget),
            reservations: ReservationTable::new(config.reservation_ttl),
            ledger: ItemLedger::new(),
            waitlists: Waitlists::new(),
            peers,
            clock: Arc::new(SystemClock),
            audit: Arc::new(TracingAuditSink),
            sagas: Mutex::new(VecDeque::new()),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// The two-letter code of this store.
    pub fn store_code(&self) -> &StoreCode {
        &self.config.store_code
    }

    pub fn item(&self, id: &ItemId) -> Option<Item> {
        self.ledger.get(id)
    }

    pub fn budget(&self, customer: &CustomerId) -> Option<Money> {
        self.accounts.budget(customer)
    }

    pub fn purchases(&self, customer: &CustomerId) -> Vec<Purchase> {
        self.accounts.purchases(customer)
    }

    pub fn waitlist(&self, item: &ItemId) -> Vec<CustomerId> {
        self.waitlists.waiting(item)
    }

    pub fn pending_reservations(&self) -> usize {
        self.reservations.len()
    }

    /// Records of the most recent cross-store exchanges this node ran.
    pub fn recent_sagas(&self) -> Vec<SagaInstance> {
        self.saga_log().iter().cloned().collect()
    }

    /// Stocks the three sample items, leaving existing items untouched.
    pub fn seed_sample_inventory(&self) -> Result<Vec<Item>> {
        let mut seeded = Vec::with_capacity(SAMPLE_ITEMS.len());
        for (suffix, name, quantity, cents) in SAMPLE_ITEMS {
            let id = ItemId::new(format!("{}{suffix}", self.config.store_code))?;
            let item = self.ledger.mutate(&id, |slot| {
                slot.get_or_insert_with(|| {
                    Item::new(id.clone(), name, quantity, Money::from_cents(cents))
                })
                .clone()
            });
            seeded.push(item);
        }
        info!(store = %self.config.store_code, items = seeded.len(), "sample inventory seeded");
        Ok(seeded)
    }

    /// Adds `quantity` units of `item`, creating it on first add.
    ///
    /// Name and price are fixed when the item is created; later adds only
    /// raise the quantity. Afterwards one waitlisted customer, if any, is
    /// served a one-unit purchase.
    #[tracing::instrument(skip(self), fields(store = %self.config.store_code))]
    pub fn add_item(
        &self,
        manager: &ManagerId,
        item: &ItemId,
        name: &str,
        quantity: u32,
        price: Money,
    ) -> Result<AddOutcome> {
        let result = self.add_item_inner(manager, item, name, quantity, price);
        self.audit_result(
            "ADD_ITEM",
            manager.as_str(),
            format!("{item},{name},{quantity},{}", price.to_decimal()),
            &result,
        );
        result
    }

    fn add_item_inner(
        &self,
        manager: &ManagerId,
        item: &ItemId,
        name: &str,
        quantity: u32,
        price: Money,
    ) -> Result<AddOutcome> {
        self.authorize(manager)?;
        self.ensure_local(item)?;
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity: 0 }.into());
        }
        if price.is_negative() || price > MAX_ITEM_PRICE {
            return Err(DomainError::InvalidPrice { price }.into());
        }
        validate_item_name(name)?;

        let (snapshot, created) =
            self.ledger
                .mutate(item, |slot| -> domain::Result<(Item, bool)> {
                    if let Some(existing) = slot.as_mut() {
                        existing.quantity = existing.quantity.checked_add(quantity).ok_or(
                            DomainError::InvalidQuantity {
                                quantity: i64::from(quantity),
                            },
                        )?;
                        return Ok((existing.clone(), false));
                    }
                    let fresh = Item::new(item.clone(), name.trim(), quantity, price);
                    *slot = Some(fresh.clone());
                    Ok((fresh, true))
                })?;

        let waitlist = self.drain_waitlist(item);
        Ok(AddOutcome {
            item: snapshot,
            created,
            waitlist,
        })
    }

    /// Serves the first waitlisted customer of `item` if it has stock.
    ///
    /// A customer whose purchase fails is not queued again.
    fn drain_waitlist(&self, item: &ItemId) -> Option<WaitlistFill> {
        if !self.ledger.read(item, |current| current.is_some_and(Item::in_stock)) {
            return None;
        }
        let customer = self.waitlists.pop(item)?;
        let today = self.clock.today();
        self.accounts.ensure(&customer);
        let result = self.purchase_local(&customer, item, 1, today);
        self.audit_result(
            "WAITLIST_PURCHASE",
            customer.as_str(),
            format!("{item},1,{today}"),
            &result,
        );
        let purchased = matches!(&result, Ok(outcome) if outcome.is_purchased());
        let outcome = match &result {
            Ok(outcome) => outcome.to_string(),
            Err(e) => e.to_string(),
        };
        info!(%item, %customer, purchased, "waitlisted customer served");
        Some(WaitlistFill {
            customer,
            purchased,
            outcome,
        })
    }

    /// Takes up to `quantity` units out of stock. The item stays listed.
    #[tracing::instrument(skip(self), fields(store = %self.config.store_code))]
    pub fn remove_item(
        &self,
        manager: &ManagerId,
        item: &ItemId,
        quantity: u32,
    ) -> Result<RemoveOutcome> {
        let result = self.remove_item_inner(manager, item, quantity);
        self.audit_result(
            "REMOVE_ITEM",
            manager.as_str(),
            format!("{item},{quantity}"),
            &result,
        );
        result
    }

    fn remove_item_inner(
        &self,
        manager: &ManagerId,
        item: &ItemId,
        quantity: u32,
    ) -> Result<RemoveOutcome> {
        self.authorize(manager)?;
        self.ensure_local(item)?;
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity: 0 }.into());
        }
        let outcome = self.ledger.mutate(item, |slot| -> domain::Result<RemoveOutcome> {
            let current = slot
                .as_mut()
                .ok_or_else(|| DomainError::ItemNotFound(item.clone()))?;
            let cleared = quantity >= current.quantity;
            current.quantity = current.quantity.saturating_sub(quantity);
            Ok(RemoveOutcome {
                item: current.clone(),
                cleared,
            })
        })?;
        Ok(outcome)
    }

    /// Lists every item, one shared guard at a time.
    #[tracing::instrument(skip(self), fields(store = %self.config.store_code))]
    pub fn list_item_availability(&self, manager: &ManagerId) -> Result<Inventory> {
        let result = self.authorize(manager).map(|()| Inventory {
            store: self.config.store_code.clone(),
            items: self.ledger.snapshot(),
        });
        self.audit_result("LIST_ITEMS", manager.as_str(), String::new(), &result);
        result
    }

    /// Buys `quantity` units of `item`, here or at its owning store.
    #[tracing::instrument(skip(self), fields(store = %self.config.store_code))]
    pub async fn purchase_item(
        &self,
        customer: &CustomerId,
        item: &ItemId,
        quantity: u32,
        date: TradeDate,
    ) -> Result<PurchaseOutcome> {
        let local = item.belongs_to(&self.config.store_code);
        let result = if quantity == 0 {
            Err(DomainError::InvalidQuantity { quantity: 0 }.into())
        } else {
            self.accounts.ensure(customer);
            if local {
                self.purchase_local(customer, item, quantity, date)
            } else {
                self.purchase_remote(customer, item, quantity, date).await
            }
        };
        self.audit_result(
            if local { "PURCHASE" } else { "REMOTE_PURCHASE" },
            customer.as_str(),
            format!("{item},{quantity},{date}"),
            &result,
        );
        result
    }

    fn purchase_local(
        &self,
        customer: &CustomerId,
        item: &ItemId,
        quantity: u32,
        date: TradeDate,
    ) -> Result<PurchaseOutcome> {
        let store = &self.config.store_code;
        let outcome = self.ledger.mutate(item, |slot| -> domain::Result<PurchaseOutcome> {
            let current = slot
                .as_mut()
                .ok_or_else(|| DomainError::ItemNotFound(item.clone()))?;
            if !current.in_stock() {
                return Ok(PurchaseOutcome::WaitlistOffer { item: item.clone() });
            }
            if current.quantity < quantity {
                return Err(DomainError::InsufficientStock {
                    available: current.quantity,
                    requested: quantity,
                });
            }
            let available = self.accounts.ensure(customer);
            let total = current.price.checked_multiply(quantity).ok_or(
                DomainError::InsufficientBudget {
                    available,
                    required: Money::MAX,
                },
            )?;
            if available < total {
                return Err(DomainError::InsufficientBudget {
                    available,
                    required: total,
                });
            }
            if !self.accounts.can_purchase_from(customer, store) {
                return Err(DomainError::PurchaseLimit {
                    store: store.clone(),
                });
            }
            let remaining_budget = self
                .accounts
                .try_debit(customer, total)
                .map_err(|available| DomainError::InsufficientBudget {
                    available,
                    required: total,
                })?;
            current.quantity -= quantity;
            self.accounts.record_purchase(Purchase::new(
                customer.clone(),
                item.clone(),
                date,
                total,
            ));
            Ok(PurchaseOutcome::Purchased {
                item: item.clone(),
                quantity,
                total,
                remaining_budget,
            })
        })?;
        Ok(outcome)
    }

    /// Forwards the purchase to the item's owner with the tracked budget,
    /// then debits by the price the owner implied.
    async fn purchase_remote(
        &self,
        customer: &CustomerId,
        item: &ItemId,
        quantity: u32,
        date: TradeDate,
    ) -> Result<PurchaseOutcome> {
        let owner = item.store();
        let budget = self.accounts.ensure(customer);
        let request = Request::purchase(customer.clone(), item.clone(), date, budget, quantity);
        let response = self.peers.call(&owner, &request).await?;
        if !response.success {
            return Err(StoreError::PeerRejected {
                store: owner,
                code: response.error_code,
                message: response.message,
            });
        }
        let total = budget - response.new_budget;
        let remaining_budget = self.accounts.adjust(customer, -total);
        self.accounts
            .record_purchase(Purchase::new(customer.clone(), item.clone(), date, total));
        Ok(PurchaseOutcome::Purchased {
            item: item.clone(),
            quantity,
            total,
            remaining_budget,
        })
    }

    /// Looks for in-stock items called `name` here and at every peer.
    ///
    /// Peers are queried concurrently; a peer that fails is listed in
    /// [`FindOutcome::unreachable`] instead of failing the search.
    #[tracing::instrument(skip(self), fields(store = %self.config.store_code))]
    pub async fn find_item(&self, customer: &CustomerId, name: &str) -> Result<FindOutcome> {
        let result = self.find_item_inner(customer, name).await;
        self.audit_result("FIND_ITEM", customer.as_str(), name.to_string(), &result);
        result
    }

    async fn find_item_inner(&self, customer: &CustomerId, name: &str) -> Result<FindOutcome> {
        validate_item_name(name)?;
        let name = name.trim();
        let mut items = self.find_local(name);

        let others: Vec<StoreCode> = self
            .config
            .peers
            .others(&self.config.store_code)
            .cloned()
            .collect();
        let request = Request::find(customer.clone(), name);
        let responses = join_all(others.iter().map(|store| self.peers.call(store, &request))).await;

        let mut unreachable = Vec::new();
        for (store, response) in others.into_iter().zip(responses) {
            match response {
                Ok(response) if response.success => {
                    items.extend(
                        response
                            .items
                            .into_iter()
                            .map(|found| Item::new(found.id, found.name, found.quantity, found.price)),
                    );
                }
                Ok(response) => {
                    warn!(%store, reason = %response.message, "peer refused find");
                    unreachable.push(store);
                }
                Err(e) => {
                    warn!(%store, error = %e, "peer find failed");
                    unreachable.push(store);
                }
            }
        }
        Ok(FindOutcome {
            name: name.to_string(),
            items,
            unreachable,
        })
    }

    /// In-stock local items whose name matches, ignoring case.
    pub(crate) fn find_local(&self, name: &str) -> Vec<Item> {
        let needle = name.trim().to_lowercase();
        self.ledger
            .snapshot()
            .into_iter()
            .filter(|item| item.in_stock() && item.name.to_lowercase() == needle)
            .collect()
    }

    /// Gives back a purchased item within the return window.
    ///
    /// Local items are restocked; items bought from a peer are only
    /// refunded.
    #[tracing::instrument(skip(self), fields(store = %self.config.store_code))]
    pub fn return_item(
        &self,
        customer: &CustomerId,
        item: &ItemId,
        date: TradeDate,
    ) -> Result<ReturnOutcome> {
        let result = self.return_item_inner(customer, item, date);
        self.audit_result(
            "RETURN",
            customer.as_str(),
            format!("{item},{date}"),
            &result,
        );
        result
    }

    fn return_item_inner(
        &self,
        customer: &CustomerId,
        item: &ItemId,
        date: TradeDate,
    ) -> Result<ReturnOutcome> {
        let window_days = self.config.return_window_days;
        let purchase = self
            .accounts
            .find_purchase(customer, item)
            .ok_or_else(|| DomainError::PurchaseNotFound(item.clone()))?;
        if !purchase.can_return(date, window_days) {
            return Err(DomainError::ReturnWindowExpired { window_days }.into());
        }

        let refund = || -> domain::Result<Money> {
            if !self.accounts.remove_purchase(&purchase) {
                return Err(DomainError::PurchaseNotFound(item.clone()));
            }
            Ok(self.accounts.adjust(customer, purchase.price))
        };
        let budget = if item.belongs_to(&self.config.store_code) {
            self.ledger.mutate(item, |slot| -> domain::Result<Money> {
                let budget = refund()?;
                if let Some(current) = slot.as_mut() {
                    current.quantity = current.quantity.saturating_add(1);
                }
                Ok(budget)
            })?
        } else {
            refund()?
        };
        Ok(ReturnOutcome {
            item: item.clone(),
            refund: purchase.price,
            budget,
        })
    }

    /// Swaps the held `old_item` for one unit of `new_item`.
    ///
    /// If this store owns the new item the swap happens under both item
    /// guards; otherwise it runs as a saga against the new item's store.
    #[tracing::instrument(skip(self), fields(store = %self.config.store_code))]
    pub async fn exchange_item(
        &self,
        customer: &CustomerId,
        new_item: &ItemId,
        old_item: &ItemId,
    ) -> Result<ExchangeOutcome> {
        let result = self.exchange_item_inner(customer, new_item, old_item).await;
        self.audit_result(
            "EXCHANGE",
            customer.as_str(),
            format!("{new_item},{old_item}"),
            &result,
        );
        result
    }

    async fn exchange_item_inner(
        &self,
        customer: &CustomerId,
        new_item: &ItemId,
        old_item: &ItemId,
    ) -> Result<ExchangeOutcome> {
        if new_item == old_item {
            return Err(DomainError::SameItem(new_item.clone()).into());
        }
        let old = self
            .accounts
            .find_purchase(customer, old_item)
            .ok_or_else(|| DomainError::PurchaseNotFound(old_item.clone()))?;
        let today = self.clock.today();
        let window_days = self.config.return_window_days;
        if !old.can_return(today, window_days) {
            return Err(DomainError::ReturnWindowExpired { window_days }.into());
        }

        if new_item.belongs_to(&self.config.store_code) {
            self.exchange_local(customer, new_item, &old, today)
        } else {
            self.exchange_remote(customer, new_item, &old, today).await
        }
    }

    fn exchange_local(
        &self,
        customer: &CustomerId,
        new_item: &ItemId,
        old: &Purchase,
        today: TradeDate,
    ) -> Result<ExchangeOutcome> {
        let store = &self.config.store_code;
        let old_is_local = old.item.belongs_to(store);

        let outcome = self
            .ledger
            .mutate_pair(
                new_item,
                &old.item,
                |new_slot, old_slot| -> domain::Result<ExchangeOutcome> {
                    let new = new_slot
                        .as_mut()
                        .ok_or_else(|| DomainError::ItemNotFound(new_item.clone()))?;
                    if !new.in_stock() {
                        return Err(DomainError::OutOfStock(new_item.clone()));
                    }
                    let difference = new.price - old.price;
                    let budget = self.accounts.ensure(customer);
                    if difference.is_positive() && budget < difference {
                        return Err(DomainError::InsufficientBudget {
                            available: budget,
                            required: difference,
                        });
                    }
                    if !old_is_local && !self.accounts.can_purchase_from(customer, store) {
                        return Err(DomainError::PurchaseLimit {
                            store: store.clone(),
                        });
                    }

                    let replacement =
                        Purchase::new(customer.clone(), new_item.clone(), today, new.price);
                    if !self.accounts.replace_purchase(old, replacement) {
                        return Err(DomainError::PurchaseNotFound(old.item.clone()));
                    }
                    if old_is_local && let Some(returned) = old_slot.as_mut() {
                        returned.quantity = returned.quantity.saturating_add(1);
                    }
                    new.quantity -= 1;
                    let budget = self.accounts.adjust(customer, -difference);
                    Ok(ExchangeOutcome {
                        new_item: new_item.clone(),
                        old_item: old.item.clone(),
                        difference,
                        budget,
                        saga_id: None,
                    })
                },
            )
            .and_then(|outcome| outcome)?;
        Ok(outcome)
    }

    async fn exchange_remote(
        &self,
        customer: &CustomerId,
        new_item: &ItemId,
        old: &Purchase,
        today: TradeDate,
    ) -> Result<ExchangeOutcome> {
        let budget = self.accounts.ensure(customer);
        let request = ExchangeRequest {
            customer: customer.clone(),
            new_item: new_item.clone(),
            old_item: old.item.clone(),
            budget,
            old_price: old.price,
        };
        let coordinator = ExchangeCoordinator::new(
            RemoteNewItemStore::new(Arc::clone(&self.peers), new_item.store()),
            OldItemLeg::for_owner(
                &old.item.store(),
                &self.config.store_code,
                &self.ledger,
                Arc::clone(&self.peers),
            ),
        );

        let report = coordinator.run(&request).await;
        let saga_id = report.saga.id();
        self.remember_saga(report.saga);
        let new_budget = report.result?;

        let difference = budget - new_budget;
        let replacement = Purchase::new(
            customer.clone(),
            new_item.clone(),
            today,
            difference + old.price,
        );
        if !self.accounts.replace_purchase(old, replacement.clone()) {
            warn!(%customer, old_item = %old.item, "old purchase vanished during exchange");
            self.accounts.record_purchase(replacement);
        }
        let budget = self.accounts.adjust(customer, -difference);
        Ok(ExchangeOutcome {
            new_item: new_item.clone(),
            old_item: old.item.clone(),
            difference,
            budget,
            saga_id,
        })
    }

    /// Queues `customer` for a restock of `item`.
    #[tracing::instrument(skip(self), fields(store = %self.config.store_code))]
    pub fn add_to_waitlist(&self, customer: &CustomerId, item: &ItemId) -> Result<WaitlistOutcome> {
        let result = if item.belongs_to(&self.config.store_code) {
            let joined = self.waitlists.join(item, customer);
            Ok(WaitlistOutcome {
                item: item.clone(),
                position: joined.position,
                newly_added: joined.newly_added,
            })
        } else {
            Err(DomainError::WaitlistForeignItem {
                item: item.clone(),
                store: self.config.store_code.clone(),
            }
            .into())
        };
        self.audit_result("WAITLIST", customer.as_str(), item.to_string(), &result);
        result
    }

    /// Releases reservations idle past the TTL, restocking their units.
    pub fn evict_idle_reservations(&self) -> usize {
        self.evict_idle_reservations_at(Instant::now())
    }

    pub fn evict_idle_reservations_at(&self, now: Instant) -> usize {
        let expired = self.reservations.evict_expired_at(now);
        for reservation in &expired {
            participant::release(&self.ledger, &reservation.new_item);
            warn!(
                transaction_id = %reservation.id,
                customer = %reservation.customer,
                item = %reservation.new_item,
                "idle reservation evicted"
            );
        }
        if !expired.is_empty() {
            metrics::counter!("reservations_evicted_total").increment(expired.len() as u64);
        }
        expired.len()
    }

    /// Runs [`StoreNode::evict_idle_reservations`] every `every` until the
    /// node is dropped.
    pub fn spawn_reservation_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let node = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(node) = node.upgrade() else {
                    debug!("store node dropped, reservation sweeper stopping");
                    break;
                };
                node.evict_idle_reservations();
            }
        })
    }

    fn authorize(&self, manager: &ManagerId) -> Result<()> {
        if manager.manages(&self.config.store_code) {
            Ok(())
        } else {
            Err(DomainError::InvalidManager {
                manager: manager.clone(),
                store: self.config.store_code.clone(),
            }
            .into())
        }
    }

    pub(crate) fn ensure_local(&self, item: &ItemId) -> Result<()> {
        if item.belongs_to(&self.config.store_code) {
            Ok(())
        } else {
            Err(DomainError::ForeignItem {
                item: item.clone(),
                store: self.config.store_code.clone(),
            }
            .into())
        }
    }

    fn saga_log(&self) -> std::sync::MutexGuard<'_, VecDeque<SagaInstance>> {
        self.sagas.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remember_saga(&self, saga: SagaInstance) {
        let mut log = self.saga_log();
        if log.len() == SAGA_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(saga);
    }

    fn audit_result<T: fmt::Display>(
        &self,
        operation: &str,
        actor: &str,
        params: String,
        result: &Result<T>,
    ) {
        match result {
            Ok(outcome) => self.record(operation, actor, params, outcome.to_string(), true),
            Err(e) => self.record(operation, actor, params, e.to_string(), false),
        }
    }

    /// Writes one audit entry and counts the operation.
    pub(crate) fn record(
        &self,
        operation: &str,
        actor: &str,
        params: String,
        outcome: String,
        success: bool,
    ) {
        let label = if success { "success" } else { "failure" };
        metrics::counter!(
            "store_operations_total",
            "operation" => operation.to_string(),
            "outcome" => label
        )
        .increment(1);
        self.audit
            .record(AuditEntry::now(operation, actor, params, outcome));
    }
}

impl fmt::Debug for StoreNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreNode")
            .field("store", &self.config.store_code)
            .field("items", &self.ledger.item_ids().len())
            .field("accounts", &self.accounts.len())
            .field("reservations", &self.reservations.len())
            .finish()
    }
}
