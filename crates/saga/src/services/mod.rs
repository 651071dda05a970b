//! Exchange participants: the store holding the new item and the store
//! that owns the old item.

pub mod new_item;
pub mod old_item;

pub use new_item::{CheckOutcome, InMemoryNewItemStore, NewItemStore, RemoteNewItemStore};
pub use old_item::{InMemoryOldItemStore, OldItemStore, RemoteOldItemStore};

use wire::{ChannelError, Response};

use crate::error::SagaError;

/// Turns a peer call into a step result: transport failures and negative
/// answers both become errors tagged with `step`.
pub(crate) fn settle(
    step: &'static str,
    result: Result<Response, ChannelError>,
) -> Result<Response, SagaError> {
    match result {
        Ok(response) if response.success => Ok(response),
        Ok(response) => Err(SagaError::StepFailed {
            step,
            code: response.error_code,
            reason: response.message,
        }),
        Err(source) => Err(SagaError::Transport { step, source }),
    }
}
