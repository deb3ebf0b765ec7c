use crate::error::LedgerError;
use crate::events::{self, DispatchOutcome, EventSink};
use crate::ledger::Ledger;
use crate::model::{Principal, ProofId, TaskId};
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;

/// A ledger that many threads can drive.
///
/// Each mutation runs under the write lock from validation through event
/// delivery, so mutations are totally ordered and readers never see a
/// half-applied transition.
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
    sink: Arc<dyn EventSink>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger, sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
            sink,
        }
    }

    /// Applies `operation` and delivers the events it committed, including
    /// those of earlier steps when a later step inside `operation` fails.
    pub fn transact<T>(
        &self,
        operation: impl FnOnce(&mut Ledger) -> Result<T, LedgerError>,
    ) -> Result<(T, DispatchOutcome), LedgerError> {
        let mut ledger = self
            .inner
            .write()
            .map_err(|_| LedgerError::invalid_data("ledger lock poisoned"))?;
        let result = operation(&mut ledger);
        let outcome = events::dispatch(self.sink.as_ref(), ledger.drain_events());
        result.map(|value| (value, outcome))
    }

    pub fn read<T>(
        &self,
        query: impl FnOnce(&Ledger) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let ledger = self
            .inner
            .read()
            .map_err(|_| LedgerError::invalid_data("ledger lock poisoned"))?;
        query(&ledger)
    }

    pub fn create_task(
        &self,
        title: &str,
        description: &str,
        deadline: OffsetDateTime,
        completion_criteria: &str,
        caller: &Principal,
        now: OffsetDateTime,
    ) -> Result<TaskId, LedgerError> {
        self.transact(|ledger| {
            ledger.create_task(title, description, deadline, completion_criteria, caller, now)
        })
        .map(|(id, _)| id)
    }

    pub fn submit_proof(
        &self,
        task_id: TaskId,
        proof_data: &str,
        evidence_hash: &str,
        caller: &Principal,
        now: OffsetDateTime,
    ) -> Result<ProofId, LedgerError> {
        self.transact(|ledger| ledger.submit_proof(task_id, proof_data, evidence_hash, caller, now))
            .map(|(id, _)| id)
    }

    pub fn verify_completion(
        &self,
        proof_id: ProofId,
        is_approved: bool,
        remarks: &str,
        caller: &Principal,
        now: OffsetDateTime,
    ) -> Result<(), LedgerError> {
        self.transact(|ledger| ledger.verify_completion(proof_id, is_approved, remarks, caller, now))
            .map(|_| ())
    }

    pub fn deactivate_task(&self, task_id: TaskId, caller: &Principal) -> Result<(), LedgerError> {
        self.transact(|ledger| ledger.deactivate_task(task_id, caller))
            .map(|_| ())
    }

    pub fn snapshot(&self) -> Result<Ledger, LedgerError> {
        self.read(|ledger| Ok(ledger.clone()))
    }
}
