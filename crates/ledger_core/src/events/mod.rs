use crate::config::Config;
use crate::error::LedgerError;
use crate::model::{Principal, ProofId, TaskId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};

mod json_lines;
pub use json_lines::JsonLinesSink;

const DISABLE_EVENTS_ENV_VAR: &str = "PROOF_LEDGER_DISABLE_EVENTS";

/// Notification produced by a committed ledger transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    TaskCreated {
        task_id: TaskId,
        creator: Principal,
        title: String,
        #[serde(with = "time::serde::rfc3339")]
        deadline: OffsetDateTime,
    },
    ProofSubmitted {
        proof_id: ProofId,
        task_id: TaskId,
        submitter: Principal,
        evidence_hash: String,
    },
    ProofVerified {
        proof_id: ProofId,
        task_id: TaskId,
        verifier: Principal,
        is_approved: bool,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaskCreated { .. } => "task_created",
            Self::ProofSubmitted { .. } => "proof_submitted",
            Self::ProofVerified { .. } => "proof_verified",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn publish(&self, event: &LedgerEvent) -> Result<(), LedgerError>;
}

pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _event: &LedgerEvent) -> Result<(), LedgerError> {
        Ok(())
    }
}

/// Writes every event to the `tracing` pipeline at info level.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &LedgerEvent) -> Result<(), LedgerError> {
        let payload = serde_json::to_string(event)?;
        info!(target: "ledger_core::events", kind = event.kind(), %payload, "ledger event");
        Ok(())
    }
}

#[derive(Debug)]
pub struct DispatchFailure {
    pub event: LedgerEvent,
    pub error: LedgerError,
}

#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub delivered: Vec<LedgerEvent>,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Hands committed events to `sink` in order.
///
/// A failed delivery is recorded and logged; the remaining events are still
/// offered to the sink.
pub fn dispatch(sink: &dyn EventSink, events: Vec<LedgerEvent>) -> DispatchOutcome {
    let mut outcome = DispatchOutcome::default();

    for event in events {
        match sink.publish(&event) {
            Ok(()) => outcome.delivered.push(event),
            Err(error) => {
                warn!(kind = event.kind(), code = error.code(), %error, "event delivery failed");
                outcome.failures.push(DispatchFailure { event, error });
            }
        }
    }

    outcome
}

pub fn sink_from_config(config: &Config) -> Box<dyn EventSink> {
    if std::env::var(DISABLE_EVENTS_ENV_VAR).is_ok() {
        return Box::new(NoopSink);
    }

    match config.event_log_path.as_deref() {
        Some(path) => Box::new(JsonLinesSink::new(path)),
        None => Box::new(TracingSink),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::{LedgerEvent, dispatch};
    use crate::model::Principal;
    use time::macros::datetime;

    fn created(task_id: u64) -> LedgerEvent {
        LedgerEvent::TaskCreated {
            task_id,
            creator: Principal::from("alice"),
            title: "Write report".to_string(),
            deadline: datetime!(2026-01-01 00:00 UTC),
        }
    }

    fn verified() -> LedgerEvent {
        LedgerEvent::ProofVerified {
            proof_id: 1,
            task_id: 1,
            verifier: Principal::from("alice"),
            is_approved: true,
        }
    }

    #[test]
    fn event_json_is_tagged_by_kind() {
        let json = serde_json::to_value(created(1)).unwrap();
        assert_eq!(json["type"], "task_created");
        assert_eq!(json["creator"], "alice");
        assert_eq!(json["deadline"], "2026-01-01T00:00:00Z");
    }

    #[test]
    fn dispatch_keeps_order_and_collects_failures() {
        let sink = RecordingSink {
            fail_on: vec!["proof_verified"],
            ..RecordingSink::default()
        };

        let outcome = dispatch(&sink, vec![created(1), verified(), created(2)]);

        assert!(!outcome.is_clean());
        assert_eq!(outcome.delivered, vec![created(1), created(2)]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].event, verified());
        assert_eq!(outcome.failures[0].error.code(), "io_error");
        assert_eq!(sink.recorded(), vec![created(1), created(2)]);
    }
}
