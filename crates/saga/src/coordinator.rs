//! Coordinator for the cross-store exchange saga.

use std::time::Instant;

use common::Money;
use tracing::{error, info, warn};

use crate::aggregate::{SagaId, SagaInstance};
use crate::error::SagaError;
use crate::events::SagaEvent;
use crate::exchange::{
    self, ExchangeRequest, STEP_CHECK, STEP_COMMIT, STEP_PREPARE, STEP_RETURN, STEP_ROLLBACK,
    STEP_UNDO_RETURN,
};
use crate::services::{NewItemStore, OldItemStore};

/// Outcome of one saga run together with its record.
#[derive(Debug)]
pub struct ExchangeReport {
    pub saga: SagaInstance,
    /// The customer's budget as settled by the commit step.
    pub result: Result<Money, SagaError>,
}

/// Drives CHECK → PREPARE → RETURN → COMMIT against the two participants.
///
/// Each step is attempted once. On failure, completed steps are undone in
/// reverse order: ROLLBACK undoes PREPARE, UNDO_RETURN undoes RETURN. A
/// PREPARE whose answer was lost is rolled back as well, since the unit
/// may have been taken; a RETURN whose answer was lost is not undone.
pub struct ExchangeCoordinator<N, O>
where
    N: NewItemStore,
    O: OldItemStore,
{
    new_store: N,
    old_store: O,
}

impl<N, O> ExchangeCoordinator<N, O>
where
    N: NewItemStore,
    O: OldItemStore,
{
    pub fn new(new_store: N, old_store: O) -> Self {
        Self {
            new_store,
            old_store,
        }
    }

    /// Runs one exchange to completion or compensation.
    #[tracing::instrument(
        skip(self, request),
        fields(
            saga_type = exchange::SAGA_TYPE,
            customer = %request.customer,
            new_item = %request.new_item,
            old_item = %request.old_item
        )
    )]
    pub async fn run(&self, request: &ExchangeRequest) -> ExchangeReport {
        let start = Instant::now();
        let mut saga = SagaInstance::default();
        saga.apply(SagaEvent::exchange_started(
            SagaId::new(),
            exchange::SAGA_TYPE,
            request.customer.clone(),
            request.new_item.clone(),
            request.old_item.clone(),
        ));

        let result = self.execute(&mut saga, request).await;

        let outcome = match &result {
            Ok(_) => "completed",
            Err(SagaError::CompensationFailed { .. }) => "compensation_failed",
            Err(_) => "failed",
        };
        let duration = start.elapsed().as_secs_f64();
        metrics::counter!("exchange_saga_total", "outcome" => outcome).increment(1);
        metrics::histogram!("exchange_saga_duration_seconds").record(duration);

        ExchangeReport { saga, result }
    }

    async fn execute(
        &self,
        saga: &mut SagaInstance,
        request: &ExchangeRequest,
    ) -> Result<Money, SagaError> {
        // 1. Check: read-only, no isolation from later steps
        begin(saga, STEP_CHECK);
        let checked = match self.new_store.check(request).await {
            Ok(checked) => checked,
            Err(e) => return Err(self.fail(saga, request, e).await),
        };
        saga.apply(SagaEvent::step_completed(
            STEP_CHECK,
            None,
            Some(checked.projected_budget),
        ));

        // 2. Prepare: re-checks under the new item's guard
        begin(saga, STEP_PREPARE);
        let transaction_id = match self.new_store.prepare(request).await {
            Ok(id) => id,
            Err(e) => return Err(self.fail(saga, request, e).await),
        };
        saga.apply(SagaEvent::step_completed(
            STEP_PREPARE,
            Some(transaction_id),
            None,
        ));

        // 3. Return the old item
        begin(saga, STEP_RETURN);
        if let Err(e) = self
            .old_store
            .return_item(&request.customer, &request.old_item)
            .await
        {
            return Err(self.fail(saga, request, e).await);
        }
        saga.apply(SagaEvent::step_completed(STEP_RETURN, None, None));

        // 4. Commit
        begin(saga, STEP_COMMIT);
        let new_budget = match self.new_store.commit(request).await {
            Ok(budget) => budget,
            Err(e) => return Err(self.fail(saga, request, e).await),
        };
        saga.apply(SagaEvent::step_completed(
            STEP_COMMIT,
            None,
            Some(new_budget),
        ));
        saga.apply(SagaEvent::saga_completed());

        info!(
            saga_id = ?saga.id(),
            %transaction_id,
            %new_budget,
            "exchange saga completed"
        );
        Ok(new_budget)
    }

    /// Records the failure, compensates, and returns the error to report.
    async fn fail(
        &self,
        saga: &mut SagaInstance,
        request: &ExchangeRequest,
        error: SagaError,
    ) -> SagaError {
        let failed_step = error.step();
        saga.apply(SagaEvent::step_failed(failed_step, error.to_string()));

        let mut to_undo: Vec<String> = saga.completed_steps().to_vec();
        if failed_step == STEP_PREPARE && error.outcome_unknown() {
            to_undo.push(STEP_PREPARE.to_string());
        }
        let compensations: Vec<&'static str> = to_undo
            .iter()
            .rev()
            .filter_map(|step| match step.as_str() {
                STEP_PREPARE => Some(STEP_ROLLBACK),
                STEP_RETURN => Some(STEP_UNDO_RETURN),
                _ => None,
            })
            .collect();

        let mut compensation_error = None;
        if !compensations.is_empty() {
            saga.apply(SagaEvent::compensation_started(failed_step));
        }
        for step in compensations {
            let result = match step {
                STEP_ROLLBACK => self.new_store.rollback(request).await,
                _ => {
                    self.old_store
                        .undo_return(&request.customer, &request.old_item)
                        .await
                }
            };
            match result {
                Ok(()) => saga.apply(SagaEvent::compensation_step_completed(step)),
                Err(e) => {
                    error!(step, error = %e, "compensation step failed");
                    saga.apply(SagaEvent::compensation_step_failed(step, e.to_string()));
                    compensation_error.get_or_insert((step, e));
                }
            }
        }

        let reported = match compensation_error {
            Some((step, e)) => SagaError::CompensationFailed {
                step,
                reason: format!("{error}; {e}"),
            },
            None => error,
        };
        saga.apply(SagaEvent::saga_failed(reported.to_string()));
        warn!(
            saga_id = ?saga.id(),
            step = failed_step,
            reason = %reported,
            "exchange saga failed"
        );
        reported
    }
}

fn begin(saga: &mut SagaInstance, step: &'static str) {
    info!(step, "saga step started");
    saga.apply(SagaEvent::step_started(step));
}
