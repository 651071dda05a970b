//! Saga instance record.

use common::{CustomerId, ItemId, Money, TransactionId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::SagaEvent;
use crate::state::SagaState;

/// Identifier of one saga run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SagaId(Uuid);

impl SagaId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SagaId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SagaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of one exchange saga, rebuilt by applying its events in order.
///
/// Tracks completed steps and the context they produced (transaction ID,
/// budgets) so the coordinator knows what to compensate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SagaInstance {
    id: Option<SagaId>,
    saga_type: String,
    customer: Option<CustomerId>,
    new_item: Option<ItemId>,
    old_item: Option<ItemId>,
    state: SagaState,
    current_step: usize,
    completed_steps: Vec<String>,
    compensated_steps: Vec<String>,
    failed_compensations: Vec<String>,
    transaction_id: Option<TransactionId>,
    /// Last budget reported by a participant.
    new_budget: Option<Money>,
    failure_reason: Option<String>,
    #[serde(skip)]
    history: Vec<SagaEvent>,
}

impl SagaInstance {
    pub fn apply(&mut self, event: SagaEvent) {
        self.history.push(event.clone());
        match event {
            SagaEvent::ExchangeStarted(data) => {
                self.id = Some(data.saga_id);
                self.saga_type = data.saga_type;
                self.customer = Some(data.customer);
                self.new_item = Some(data.new_item);
                self.old_item = Some(data.old_item);
                self.state = SagaState::Running;
            }
            SagaEvent::StepStarted(_) => {
                self.current_step += 1;
            }
            SagaEvent::StepCompleted(data) => {
                self.completed_steps.push(data.step_name);
                if let Some(id) = data.transaction_id {
                    self.transaction_id = Some(id);
                }
                if let Some(budget) = data.new_budget {
                    self.new_budget = Some(budget);
                }
            }
            SagaEvent::StepFailed(data) => {
                self.failure_reason = Some(data.error);
            }
            SagaEvent::CompensationStarted(_) => {
                self.state = SagaState::Compensating;
            }
            SagaEvent::CompensationStepCompleted(data) => {
                self.compensated_steps.push(data.step_name);
            }
            SagaEvent::CompensationStepFailed(data) => {
                self.failed_compensations.push(data.step_name);
            }
            SagaEvent::SagaCompleted(_) => {
                self.state = SagaState::Completed;
            }
            SagaEvent::SagaFailed(data) => {
                self.state = SagaState::Failed;
                self.failure_reason = Some(data.reason);
            }
        }
    }

    pub fn id(&self) -> Option<SagaId> {
        self.id
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn saga_type(&self) -> &str {
        &self.saga_type
    }

    pub fn customer(&self) -> Option<&CustomerId> {
        self.customer.as_ref()
    }

    pub fn new_item(&self) -> Option<&ItemId> {
        self.new_item.as_ref()
    }

    pub fn old_item(&self) -> Option<&ItemId> {
        self.old_item.as_ref()
    }

    /// Number of steps started so far.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn completed_steps(&self) -> &[String] {
        &self.completed_steps
    }

    /// Compensating calls that succeeded, in the order they ran.
    pub fn compensated_steps(&self) -> &[String] {
        &self.compensated_steps
    }

    /// Compensating calls that failed. Non-empty means the stores may
    /// disagree and need manual attention.
    pub fn failed_compensations(&self) -> &[String] {
        &self.failed_compensations
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    pub fn new_budget(&self) -> Option<Money> {
        self.new_budget
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Every applied event, oldest first.
    pub fn history(&self) -> &[SagaEvent] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange;

    fn started(saga_id: SagaId) -> SagaEvent {
        SagaEvent::exchange_started(
            saga_id,
            exchange::SAGA_TYPE,
            CustomerId::new("QCU1111").unwrap(),
            ItemId::new("BC1002").unwrap(),
            ItemId::new("QC1001").unwrap(),
        )
    }

    #[test]
    fn test_default_saga_instance() {
        let saga = SagaInstance::default();
        assert!(saga.id().is_none());
        assert_eq!(saga.state(), SagaState::NotStarted);
        assert!(saga.completed_steps().is_empty());
    }

    #[test]
    fn test_apply_step_lifecycle() {
        let mut saga = SagaInstance::default();
        let saga_id = SagaId::new();
        saga.apply(started(saga_id));
        assert_eq!(saga.id(), Some(saga_id));
        assert_eq!(saga.state(), SagaState::Running);
        assert_eq!(saga.old_item().map(ItemId::as_str), Some("QC1001"));

        let tx = TransactionId::new();
        for (step, tx, budget) in [
            (exchange::STEP_CHECK, None, Some(Money::from_cents(99_400))),
            (exchange::STEP_PREPARE, Some(tx), None),
            (exchange::STEP_RETURN, None, None),
            (exchange::STEP_COMMIT, None, Some(Money::from_cents(99_400))),
        ] {
            saga.apply(SagaEvent::step_started(step));
            saga.apply(SagaEvent::step_completed(step, tx, budget));
        }
        saga.apply(SagaEvent::saga_completed());

        assert_eq!(saga.current_step(), 4);
        assert_eq!(
            saga.completed_steps(),
            &["check", "prepare", "return", "commit"]
        );
        assert_eq!(saga.transaction_id(), Some(tx));
        assert_eq!(saga.new_budget(), Some(Money::from_cents(99_400)));
        assert_eq!(saga.state(), SagaState::Completed);
        assert_eq!(saga.history().len(), 10);
    }

    #[test]
    fn test_apply_failure_and_compensation() {
        let mut saga = SagaInstance::default();
        saga.apply(started(SagaId::new()));
        saga.apply(SagaEvent::step_started(exchange::STEP_PREPARE));
        saga.apply(SagaEvent::step_completed(
            exchange::STEP_PREPARE,
            Some(TransactionId::new()),
            None,
        ));
        saga.apply(SagaEvent::step_started(exchange::STEP_RETURN));
        saga.apply(SagaEvent::step_failed(exchange::STEP_RETURN, "Return failed"));
        assert_eq!(saga.failure_reason(), Some("Return failed"));

        saga.apply(SagaEvent::compensation_started(exchange::STEP_RETURN));
        assert_eq!(saga.state(), SagaState::Compensating);
        saga.apply(SagaEvent::compensation_step_failed(
            exchange::STEP_ROLLBACK,
            "timed out",
        ));
        // Compensation failures do not stop the chain.
        assert_eq!(saga.state(), SagaState::Compensating);
        assert_eq!(saga.failed_compensations(), &["rollback"]);

        saga.apply(SagaEvent::saga_failed("Return failed"));
        assert_eq!(saga.state(), SagaState::Failed);
    }

    #[test]
    fn test_serialization_skips_history() {
        let mut saga = SagaInstance::default();
        let saga_id = SagaId::new();
        saga.apply(started(saga_id));

        let json = serde_json::to_string(&saga).unwrap();
        let deserialized: SagaInstance = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.id(), Some(saga_id));
        assert_eq!(deserialized.state(), SagaState::Running);
        assert!(deserialized.history().is_empty());
    }
}
