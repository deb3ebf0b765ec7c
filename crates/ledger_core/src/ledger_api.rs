use crate::config::{self, Config};
use crate::error::LedgerError;
use crate::events::{self, DispatchOutcome, EventSink};
use crate::ledger::{Counters, Ledger};
use crate::model::{CompletionProof, Principal, ProofId, Task, TaskId};
use crate::storage::json_store;
use crate::storage::lock::StoreLock;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::warn;

/// Result of a mutation that reached the store.
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    pub dispatch: DispatchOutcome,
}

/// Where the host keeps the ledger and where notifications go.
pub struct HostContext {
    pub store_path: PathBuf,
    pub sink: Box<dyn EventSink>,
}

impl HostContext {
    pub fn from_config(config: &Config) -> Result<Self, LedgerError> {
        Ok(Self {
            store_path: json_store::store_path_with(config.store_path.as_deref())?,
            sink: events::sink_from_config(config),
        })
    }

    pub fn from_environment() -> Result<Self, LedgerError> {
        let load = config::load_config_with_fallback();
        if let Some(err) = &load.error {
            warn!(code = err.code(), %err, "config not loaded; using defaults");
        }
        Self::from_config(&load.config)
    }
}

pub fn create_task(
    title: &str,
    description: &str,
    deadline: OffsetDateTime,
    completion_criteria: &str,
    caller: &Principal,
) -> Result<Committed<TaskId>, LedgerError> {
    let host = HostContext::from_environment()?;
    create_task_with_path(
        &host.store_path,
        host.sink.as_ref(),
        title,
        description,
        deadline,
        completion_criteria,
        caller,
        OffsetDateTime::now_utc(),
    )
}

pub fn submit_proof(
    task_id: TaskId,
    proof_data: &str,
    evidence_hash: &str,
    caller: &Principal,
) -> Result<Committed<ProofId>, LedgerError> {
    let host = HostContext::from_environment()?;
    submit_proof_with_path(
        &host.store_path,
        host.sink.as_ref(),
        task_id,
        proof_data,
        evidence_hash,
        caller,
        OffsetDateTime::now_utc(),
    )
}

pub fn verify_completion(
    proof_id: ProofId,
    is_approved: bool,
    remarks: &str,
    caller: &Principal,
) -> Result<Committed<()>, LedgerError> {
    let host = HostContext::from_environment()?;
    verify_completion_with_path(
        &host.store_path,
        host.sink.as_ref(),
        proof_id,
        is_approved,
        remarks,
        caller,
        OffsetDateTime::now_utc(),
    )
}

pub fn deactivate_task(task_id: TaskId, caller: &Principal) -> Result<Committed<()>, LedgerError> {
    let host = HostContext::from_environment()?;
    deactivate_task_with_path(&host.store_path, host.sink.as_ref(), task_id, caller)
}

pub fn get_task(task_id: TaskId) -> Result<Task, LedgerError> {
    get_task_with_path(&current_store_path()?, task_id)
}

pub fn get_proof(proof_id: ProofId) -> Result<CompletionProof, LedgerError> {
    get_proof_with_path(&current_store_path()?, proof_id)
}

pub fn get_task_proofs(task_id: TaskId) -> Result<Vec<ProofId>, LedgerError> {
    get_task_proofs_with_path(&current_store_path()?, task_id)
}

pub fn get_user_tasks(principal: &Principal) -> Result<Vec<TaskId>, LedgerError> {
    get_user_tasks_with_path(&current_store_path()?, principal)
}

pub fn get_user_proofs(principal: &Principal) -> Result<Vec<ProofId>, LedgerError> {
    get_user_proofs_with_path(&current_store_path()?, principal)
}

pub fn get_user_completion_count(principal: &Principal) -> Result<u64, LedgerError> {
    get_user_completion_count_with_path(&current_store_path()?, principal)
}

pub fn get_counters() -> Result<Counters, LedgerError> {
    get_counters_with_path(&current_store_path()?)
}

pub fn is_task_active(task_id: TaskId) -> Result<bool, LedgerError> {
    is_task_active_with_path(&current_store_path()?, task_id, OffsetDateTime::now_utc())
}

fn current_store_path() -> Result<PathBuf, LedgerError> {
    Ok(HostContext::from_environment()?.store_path)
}

/// Reads the snapshot under a shared lock. A store that does not exist yet
/// reads as an empty ledger and is left untouched on disk.
fn load_current_with_path(path: &Path) -> Result<Ledger, LedgerError> {
    if !path.exists() {
        return Ok(Ledger::new());
    }
    let _guard = StoreLock::shared(path)?;
    json_store::load_ledger(path)
}

fn get_task_with_path(path: &Path, task_id: TaskId) -> Result<Task, LedgerError> {
    load_current_with_path(path)?.get_task(task_id).cloned()
}

fn get_proof_with_path(path: &Path, proof_id: ProofId) -> Result<CompletionProof, LedgerError> {
    load_current_with_path(path)?.get_proof(proof_id).cloned()
}

fn get_task_proofs_with_path(path: &Path, task_id: TaskId) -> Result<Vec<ProofId>, LedgerError> {
    Ok(load_current_with_path(path)?.get_task_proofs(task_id)?.to_vec())
}

fn get_user_tasks_with_path(path: &Path, principal: &Principal) -> Result<Vec<TaskId>, LedgerError> {
    Ok(load_current_with_path(path)?.get_user_tasks(principal).to_vec())
}

fn get_user_proofs_with_path(
    path: &Path,
    principal: &Principal,
) -> Result<Vec<ProofId>, LedgerError> {
    Ok(load_current_with_path(path)?.get_user_proofs(principal).to_vec())
}

fn get_user_completion_count_with_path(
    path: &Path,
    principal: &Principal,
) -> Result<u64, LedgerError> {
    Ok(load_current_with_path(path)?.get_user_completion_count(principal))
}

fn get_counters_with_path(path: &Path) -> Result<Counters, LedgerError> {
    Ok(load_current_with_path(path)?.get_counters())
}

fn is_task_active_with_path(
    path: &Path,
    task_id: TaskId,
    now: OffsetDateTime,
) -> Result<bool, LedgerError> {
    load_current_with_path(path)?.is_task_active(task_id, now)
}

/// Load, apply, save, then notify, all under the store's exclusive lock so
/// notifications leave in commit order. Nothing is written and nothing is
/// published when `apply` fails.
fn commit<T>(
    path: &Path,
    sink: &dyn EventSink,
    apply: impl FnOnce(&mut Ledger) -> Result<T, LedgerError>,
) -> Result<Committed<T>, LedgerError> {
    let _guard = StoreLock::exclusive(path)?;
    let mut ledger = json_store::load_ledger(path)?;
    let value = apply(&mut ledger)?;
    let pending = ledger.drain_events();
    json_store::save_ledger(path, &ledger)?;

    Ok(Committed {
        value,
        dispatch: events::dispatch(sink, pending),
    })
}

#[allow(clippy::too_many_arguments)]
fn create_task_with_path(
    path: &Path,
    sink: &dyn EventSink,
    title: &str,
    description: &str,
    deadline: OffsetDateTime,
    completion_criteria: &str,
    caller: &Principal,
    now: OffsetDateTime,
) -> Result<Committed<TaskId>, LedgerError> {
    commit(path, sink, |ledger| {
        ledger.create_task(title, description, deadline, completion_criteria, caller, now)
    })
}

fn submit_proof_with_path(
    path: &Path,
    sink: &dyn EventSink,
    task_id: TaskId,
    proof_data: &str,
    evidence_hash: &str,
    caller: &Principal,
    now: OffsetDateTime,
) -> Result<Committed<ProofId>, LedgerError> {
    commit(path, sink, |ledger| {
        ledger.submit_proof(task_id, proof_data, evidence_hash, caller, now)
    })
}

fn verify_completion_with_path(
    path: &Path,
    sink: &dyn EventSink,
    proof_id: ProofId,
    is_approved: bool,
    remarks: &str,
    caller: &Principal,
    now: OffsetDateTime,
) -> Result<Committed<()>, LedgerError> {
    commit(path, sink, |ledger| {
        ledger.verify_completion(proof_id, is_approved, remarks, caller, now)
    })
}

fn deactivate_task_with_path(
    path: &Path,
    sink: &dyn EventSink,
    task_id: TaskId,
    caller: &Principal,
) -> Result<Committed<()>, LedgerError> {
    commit(path, sink, |ledger| ledger.deactivate_task(task_id, caller))
}
