//! Client operation endpoints.
//!
//! Each handler parses identifiers, calls the matching `StoreNode`
//! operation and returns its outcome together with the outcome text.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{CustomerId, ItemId, ManagerId, Money, TradeDate};
use domain::{AuditEntry, MemoryAuditSink, Purchase};
use saga::SagaInstance;
use serde::{Deserialize, Serialize};
use store::{
    AddOutcome, ExchangeOutcome, FindOutcome, Inventory, PurchaseOutcome, RemoveOutcome,
    ReturnOutcome, StoreNode, WaitlistOutcome,
};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
#[derive(Clone)]
pub struct AppState {
    pub node: Arc<StoreNode>,
    /// In-memory copy of the node's audit trail.
    pub audit: Arc<MemoryAuditSink>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub manager_id: String,
    pub item_id: String,
    pub name: String,
    pub quantity: u32,
    pub price_cents: i64,
}

#[derive(Deserialize)]
pub struct RemoveItemRequest {
    pub manager_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct ManagerQuery {
    pub manager_id: String,
}

#[derive(Deserialize)]
pub struct PurchaseRequest {
    pub customer_id: String,
    pub item_id: String,
    pub quantity: u32,
    /// `ddMMyyyy`.
    pub date: String,
}

#[derive(Deserialize)]
pub struct FindQuery {
    pub customer_id: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct ReturnRequest {
    pub customer_id: String,
    pub item_id: String,
    pub date: String,
}

#[derive(Deserialize)]
pub struct ExchangeRequest {
    pub customer_id: String,
    pub new_item_id: String,
    pub old_item_id: String,
}

#[derive(Deserialize)]
pub struct WaitlistRequest {
    pub customer_id: String,
    pub item_id: String,
}

// -- Response types --

/// An operation outcome and the text shown for it.
#[derive(Serialize)]
pub struct OutcomeResponse<T> {
    pub message: String,
    pub outcome: T,
}

impl<T: std::fmt::Display> OutcomeResponse<T> {
    fn wrap(outcome: T) -> Json<Self> {
        Json(Self {
            message: outcome.to_string(),
            outcome,
        })
    }
}

#[derive(Serialize)]
pub struct CustomerResponse {
    pub customer_id: CustomerId,
    pub budget: Option<Money>,
    pub purchases: Vec<Purchase>,
}

#[derive(Serialize)]
pub struct SagaStatusResponse {
    pub saga_id: Option<String>,
    pub state: String,
    pub finished: bool,
    pub customer_id: Option<String>,
    pub new_item_id: Option<String>,
    pub old_item_id: Option<String>,
    pub completed_steps: Vec<String>,
    pub compensated_steps: Vec<String>,
    pub failed_compensations: Vec<String>,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
}

impl From<&SagaInstance> for SagaStatusResponse {
    fn from(saga: &SagaInstance) -> Self {
        Self {
            saga_id: saga.id().map(|id| id.to_string()),
            state: saga.state().to_string(),
            finished: saga.state().is_terminal(),
            customer_id: saga.customer().map(ToString::to_string),
            new_item_id: saga.new_item().map(ToString::to_string),
            old_item_id: saga.old_item().map(ToString::to_string),
            completed_steps: saga.completed_steps().to_vec(),
            compensated_steps: saga.compensated_steps().to_vec(),
            failed_compensations: saga.failed_compensations().to_vec(),
            transaction_id: saga.transaction_id().map(|id| id.to_string()),
            failure_reason: saga.failure_reason().map(str::to_string),
        }
    }
}

fn trade_date(raw: &str) -> Result<TradeDate, ApiError> {
    TradeDate::parse(raw).map_err(|e| ApiError::BadRequest(format!("Invalid date: {e}")))
}

// -- Handlers --

/// POST /items: create an item or add stock to it.
#[tracing::instrument(skip(state, req))]
pub async fn add_item(
    State(state): State<AppState>,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<OutcomeResponse<AddOutcome>>), ApiError> {
    let manager = ManagerId::new(req.manager_id)?;
    let item = ItemId::new(req.item_id)?;
    let outcome = state.node.add_item(
        &manager,
        &item,
        &req.name,
        req.quantity,
        Money::from_cents(req.price_cents),
    )?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, OutcomeResponse::wrap(outcome)))
}

/// POST /items/{id}/remove: take stock out of an item.
#[tracing::instrument(skip(state, req))]
pub async fn remove_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Json(req): Json<RemoveItemRequest>,
) -> Result<Json<OutcomeResponse<RemoveOutcome>>, ApiError> {
    let manager = ManagerId::new(req.manager_id)?;
    let item = ItemId::new(item_id)?;
    let outcome = state.node.remove_item(&manager, &item, req.quantity)?;
    Ok(OutcomeResponse::wrap(outcome))
}

/// GET /items?manager_id=: list every item of this store.
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ManagerQuery>,
) -> Result<Json<OutcomeResponse<Inventory>>, ApiError> {
    let manager = ManagerId::new(query.manager_id)?;
    let inventory = state.node.list_item_availability(&manager)?;
    Ok(OutcomeResponse::wrap(inventory))
}

/// GET /items/search?customer_id=&name=: find items by name in every store.
#[tracing::instrument(skip(state, query))]
pub async fn find_item(
    State(state): State<AppState>,
    Query(query): Query<FindQuery>,
) -> Result<Json<OutcomeResponse<FindOutcome>>, ApiError> {
    let customer = CustomerId::new(query.customer_id)?;
    let outcome = state.node.find_item(&customer, &query.name).await?;
    Ok(OutcomeResponse::wrap(outcome))
}

/// POST /purchases: buy an item from this or another store.
#[tracing::instrument(skip(state, req))]
pub async fn purchase(
    State(state): State<AppState>,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<OutcomeResponse<PurchaseOutcome>>, ApiError> {
    let customer = CustomerId::new(req.customer_id)?;
    let item = ItemId::new(req.item_id)?;
    let date = trade_date(&req.date)?;
    let outcome = state
        .node
        .purchase_item(&customer, &item, req.quantity, date)
        .await?;
    Ok(OutcomeResponse::wrap(outcome))
}

/// POST /returns: return a purchased item.
#[tracing::instrument(skip(state, req))]
pub async fn return_item(
    State(state): State<AppState>,
    Json(req): Json<ReturnRequest>,
) -> Result<Json<OutcomeResponse<ReturnOutcome>>, ApiError> {
    let customer = CustomerId::new(req.customer_id)?;
    let item = ItemId::new(req.item_id)?;
    let date = trade_date(&req.date)?;
    let outcome = state.node.return_item(&customer, &item, date)?;
    Ok(OutcomeResponse::wrap(outcome))
}

/// POST /exchanges: swap a held item for another.
#[tracing::instrument(skip(state, req))]
pub async fn exchange(
    State(state): State<AppState>,
    Json(req): Json<ExchangeRequest>,
) -> Result<Json<OutcomeResponse<ExchangeOutcome>>, ApiError> {
    let customer = CustomerId::new(req.customer_id)?;
    let new_item = ItemId::new(req.new_item_id)?;
    let old_item = ItemId::new(req.old_item_id)?;
    let outcome = state
        .node
        .exchange_item(&customer, &new_item, &old_item)
        .await?;
    Ok(OutcomeResponse::wrap(outcome))
}

/// POST /waitlist: queue for an out-of-stock item.
pub async fn join_waitlist(
    State(state): State<AppState>,
    Json(req): Json<WaitlistRequest>,
) -> Result<Json<OutcomeResponse<WaitlistOutcome>>, ApiError> {
    let customer = CustomerId::new(req.customer_id)?;
    let item = ItemId::new(req.item_id)?;
    let outcome = state.node.add_to_waitlist(&customer, &item)?;
    Ok(OutcomeResponse::wrap(outcome))
}

/// GET /customers/{id}: budget and purchase history as tracked here.
pub async fn customer(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let customer = CustomerId::new(customer_id)?;
    Ok(Json(CustomerResponse {
        budget: state.node.budget(&customer),
        purchases: state.node.purchases(&customer),
        customer_id: customer,
    }))
}

/// GET /sagas: recent cross-store exchanges run by this node.
pub async fn sagas(State(state): State<AppState>) -> Json<Vec<SagaStatusResponse>> {
    Json(
        state
            .node
            .recent_sagas()
            .iter()
            .map(SagaStatusResponse::from)
            .collect(),
    )
}

/// GET /audit/{actor}: audit entries of one manager or customer.
pub async fn audit(
    State(state): State<AppState>,
    Path(actor): Path<String>,
) -> Json<Vec<AuditEntry>> {
    Json(state.audit.entries_for(&actor))
}
