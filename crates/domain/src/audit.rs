//! Append-only audit trail of every operation outcome.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One audited operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    /// Operation name, e.g. `PURCHASE` or `PEER_EXCHANGE_PREPARE`.
    pub operation: String,
    /// Manager or customer ID that triggered the operation.
    pub actor: String,
    /// Comma-joined parameters.
    pub params: String,
    /// Outcome text shown to the caller, success or failure.
    pub outcome: String,
}

impl AuditEntry {
    /// Creates an entry stamped with the current time.
    pub fn now(
        operation: impl Into<String>,
        actor: impl Into<String>,
        params: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            at: Utc::now(),
            operation: operation.into(),
            actor: actor.into(),
            params: params.into(),
            outcome: outcome.into(),
        }
    }
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    /// Appends one entry. Must not fail the audited operation.
    fn record(&self, entry: AuditEntry);
}

/// Writes entries as structured `tracing` events on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "audit",
            operation = %entry.operation,
            actor = %entry.actor,
            params = %entry.params,
            outcome = %entry.outcome,
            "operation audited"
        );
    }
}

/// Keeps a separate append-only log per actor in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    logs: Arc<RwLock<HashMap<String, Vec<AuditEntry>>>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries recorded for `actor`, oldest first.
    pub fn entries_for(&self, actor: &str) -> Vec<AuditEntry> {
        self.logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(actor)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of entries across all actors.
    pub fn len(&self) -> usize {
        self.logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        self.logs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(entry.actor.clone())
            .or_default()
            .push(entry);
    }
}

/// Forwards every entry to each inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanoutAuditSink {
    /// Creates a fan-out over `sinks`.
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }
}

impl AuditSink for FanoutAuditSink {
    fn record(&self, entry: AuditEntry) {
        for sink in &self.sinks {
            sink.record(entry.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_separates_actors() {
        let sink = MemoryAuditSink::new();
        sink.record(AuditEntry::now("PURCHASE", "QCU1111", "QC1001,2,01012025", "ok"));
        sink.record(AuditEntry::now("ADD_ITEM", "QCM0001", "QC1001", "ok"));
        sink.record(AuditEntry::now("RETURN", "QCU1111", "QC1001,02012025", "ok"));

        let customer = sink.entries_for("QCU1111");
        assert_eq!(customer.len(), 2);
        assert_eq!(customer[0].operation, "PURCHASE");
        assert_eq!(customer[1].operation, "RETURN");
        assert_eq!(sink.entries_for("QCM0001").len(), 1);
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = MemoryAuditSink::new();
        let second = MemoryAuditSink::new();
        let fanout = FanoutAuditSink::new(vec![
            Arc::new(first.clone()),
            Arc::new(second.clone()),
            Arc::new(TracingAuditSink),
        ]);
        fanout.record(AuditEntry::now("FIND_ITEM", "QCU1111", "coffee", "Found 1 items"));
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }
}
