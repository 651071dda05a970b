//! Saga pattern implementation for cross-store exchanges.
//!
//! An exchange swaps an item the customer holds (owned by store O) for an
//! item owned by another store N. The saga follows these steps:
//! 1. Check feasibility at N
//! 2. Prepare: reserve one unit at N
//! 3. Return the old item to O
//! 4. Commit the reservation at N
//!
//! If a step fails, previously completed steps are compensated in reverse
//! order. The participant side keeps its holds in a [`ReservationTable`].

pub mod aggregate;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod exchange;
pub mod reservations;
pub mod services;
pub mod state;

pub use aggregate::{SagaId, SagaInstance};
pub use coordinator::{ExchangeCoordinator, ExchangeReport};
pub use error::{Result, SagaError};
pub use events::SagaEvent;
pub use exchange::ExchangeRequest;
pub use reservations::{Reservation, ReservationTable};
pub use services::{
    CheckOutcome, InMemoryNewItemStore, InMemoryOldItemStore, NewItemStore, OldItemStore,
    RemoteNewItemStore, RemoteOldItemStore,
};
pub use state::SagaState;
