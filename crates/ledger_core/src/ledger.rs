//! Task and completion-proof state machine.
//!
//! Every mutating operation validates all of its preconditions before it
//! touches any state, so a rejected call leaves the ledger exactly as it was.
//! Committed transitions append their notification to an outbox that the host
//! drains once the new state is durable.

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::index::Indices;
use crate::model::{CompletionProof, Principal, ProofId, Task, TaskId, Verification};
use time::OffsetDateTime;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    tasks: Vec<Task>,
    proofs: Vec<CompletionProof>,
    indices: Indices,
    outbox: Vec<LedgerEvent>,
}

/// Number of tasks and proofs ever created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub total_tasks: u64,
    pub total_proofs: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from its primary records.
    ///
    /// Records must be in id order with dense ids starting at 1, and must
    /// satisfy the same invariants the operations enforce.
    pub fn from_records(
        tasks: Vec<Task>,
        proofs: Vec<CompletionProof>,
    ) -> Result<Self, LedgerError> {
        for (position, task) in tasks.iter().enumerate() {
            if task.id != position as u64 + 1 {
                return Err(LedgerError::invalid_data(format!(
                    "task id {} stored at position {}",
                    task.id,
                    position + 1
                )));
            }
            if task.title.is_empty() {
                return Err(LedgerError::invalid_data(format!("task {} has no title", task.id)));
            }
            if task.deadline <= task.created_at {
                return Err(LedgerError::invalid_data(format!(
                    "task {} deadline is not after its creation time",
                    task.id
                )));
            }
        }

        for (position, proof) in proofs.iter().enumerate() {
            if proof.id != position as u64 + 1 {
                return Err(LedgerError::invalid_data(format!(
                    "proof id {} stored at position {}",
                    proof.id,
                    position + 1
                )));
            }
            let task = lookup(&tasks, proof.task_id).ok_or_else(|| {
                LedgerError::invalid_data(format!(
                    "proof {} references missing task {}",
                    proof.id, proof.task_id
                ))
            })?;
            if proof.proof_data.is_empty() || proof.evidence_hash.is_empty() {
                return Err(LedgerError::invalid_data(format!(
                    "proof {} is missing its data or evidence hash",
                    proof.id
                )));
            }
            if proof.submitted_at > task.deadline {
                return Err(LedgerError::invalid_data(format!(
                    "proof {} was submitted after the deadline of task {}",
                    proof.id, task.id
                )));
            }
            if let Some(verification) = &proof.verification {
                if verification.verified_by != task.creator {
                    return Err(LedgerError::invalid_data(format!(
                        "proof {} verified by someone other than the task creator",
                        proof.id
                    )));
                }
                if verification.verified_at < proof.submitted_at {
                    return Err(LedgerError::invalid_data(format!(
                        "proof {} verified before it was submitted",
                        proof.id
                    )));
                }
            }
        }

        let indices = Indices::rebuild(&tasks, &proofs);
        Ok(Self {
            tasks,
            proofs,
            indices,
            outbox: Vec::new(),
        })
    }

    pub fn create_task(
        &mut self,
        title: &str,
        description: &str,
        deadline: OffsetDateTime,
        completion_criteria: &str,
        caller: &Principal,
        now: OffsetDateTime,
    ) -> Result<TaskId, LedgerError> {
        if title.is_empty() {
            return Err(rejected("create_task", LedgerError::invalid_input("title is required")));
        }
        if deadline <= now {
            return Err(rejected(
                "create_task",
                LedgerError::invalid_deadline("deadline must be in the future"),
            ));
        }

        let id = self.tasks.len() as u64 + 1;
        let task = Task {
            id,
            creator: caller.clone(),
            title: title.to_string(),
            description: description.to_string(),
            completion_criteria: completion_criteria.to_string(),
            deadline,
            is_active: true,
            created_at: now,
        };

        self.indices.record_task(&task);
        self.outbox.push(LedgerEvent::TaskCreated {
            task_id: id,
            creator: caller.clone(),
            title: task.title.clone(),
            deadline,
        });
        self.tasks.push(task);

        info!(task_id = id, creator = %caller, "task created");
        Ok(id)
    }

    pub fn submit_proof(
        &mut self,
        task_id: TaskId,
        proof_data: &str,
        evidence_hash: &str,
        caller: &Principal,
        now: OffsetDateTime,
    ) -> Result<ProofId, LedgerError> {
        self.check_submission(task_id, proof_data, evidence_hash, now)
            .map_err(|err| rejected("submit_proof", err))?;

        let id = self.proofs.len() as u64 + 1;
        let proof = CompletionProof {
            id,
            task_id,
            submitter: caller.clone(),
            proof_data: proof_data.to_string(),
            evidence_hash: evidence_hash.to_string(),
            submitted_at: now,
            verification: None,
        };

        self.indices.record_proof(&proof);
        self.outbox.push(LedgerEvent::ProofSubmitted {
            proof_id: id,
            task_id,
            submitter: caller.clone(),
            evidence_hash: proof.evidence_hash.clone(),
        });
        self.proofs.push(proof);

        info!(proof_id = id, task_id, submitter = %caller, "proof submitted");
        Ok(id)
    }

    fn check_submission(
        &self,
        task_id: TaskId,
        proof_data: &str,
        evidence_hash: &str,
        now: OffsetDateTime,
    ) -> Result<(), LedgerError> {
        let task = self.get_task(task_id)?;
        if !task.is_active {
            return Err(LedgerError::task_inactive(format!("task {task_id} is inactive")));
        }
        if now > task.deadline {
            return Err(LedgerError::deadline_passed(format!(
                "task {task_id} stopped accepting proofs at its deadline"
            )));
        }
        if proof_data.is_empty() {
            return Err(LedgerError::invalid_input("proof data is required"));
        }
        if evidence_hash.is_empty() {
            return Err(LedgerError::invalid_input("evidence hash is required"));
        }
        Ok(())
    }

    /// Records the creator's verdict on a proof.
    ///
    /// Only the creator of the proof's task may verify. A creator verifying a
    /// proof they submitted themselves passes that check; the ledger does not
    /// forbid self-verification. There is no deadline on verification.
    ///
    /// `verified_at` never precedes the proof's `submitted_at`; an earlier
    /// `now` is raised to the submission time.
    pub fn verify_completion(
        &mut self,
        proof_id: ProofId,
        is_approved: bool,
        remarks: &str,
        caller: &Principal,
        now: OffsetDateTime,
    ) -> Result<(), LedgerError> {
        let position = self
            .check_verification(proof_id, caller)
            .map_err(|err| rejected("verify_completion", err))?;

        let proof = &mut self.proofs[position];
        proof.verification = Some(Verification {
            verified_by: caller.clone(),
            verified_at: now.max(proof.submitted_at),
            remarks: remarks.to_string(),
            approved: is_approved,
        });
        let task_id = proof.task_id;

        if is_approved {
            self.indices.record_approval(&proof.submitter);
        }
        self.outbox.push(LedgerEvent::ProofVerified {
            proof_id,
            task_id,
            verifier: caller.clone(),
            is_approved,
        });

        info!(proof_id, task_id, verifier = %caller, approved = is_approved, "proof verified");
        Ok(())
    }

    fn check_verification(
        &self,
        proof_id: ProofId,
        caller: &Principal,
    ) -> Result<usize, LedgerError> {
        let proof = self.get_proof(proof_id)?;
        let task = self.get_task(proof.task_id)?;
        if &task.creator != caller {
            return Err(LedgerError::unauthorized(format!(
                "only the creator of task {} can verify proof {proof_id}",
                task.id
            )));
        }
        if proof.is_verified() {
            return Err(LedgerError::already_verified(format!(
                "proof {proof_id} is already verified"
            )));
        }
        Ok(position(proof_id))
    }

    /// Closes a task to new proofs. Repeated calls by the creator are accepted
    /// and change nothing further.
    pub fn deactivate_task(&mut self, task_id: TaskId, caller: &Principal) -> Result<(), LedgerError> {
        let task = self
            .get_task(task_id)
            .map_err(|err| rejected("deactivate_task", err))?;
        if &task.creator != caller {
            return Err(rejected(
                "deactivate_task",
                LedgerError::unauthorized(format!("only the creator can deactivate task {task_id}")),
            ));
        }

        let task = &mut self.tasks[position(task_id)];
        if task.is_active {
            task.is_active = false;
            info!(task_id, creator = %caller, "task deactivated");
        }
        Ok(())
    }

    pub fn get_task(&self, task_id: TaskId) -> Result<&Task, LedgerError> {
        lookup(&self.tasks, task_id)
            .ok_or_else(|| LedgerError::not_found(format!("task {task_id} not found")))
    }

    pub fn get_proof(&self, proof_id: ProofId) -> Result<&CompletionProof, LedgerError> {
        lookup(&self.proofs, proof_id)
            .ok_or_else(|| LedgerError::not_found(format!("proof {proof_id} not found")))
    }

    /// Proof ids submitted against `task_id`, in submission order.
    pub fn get_task_proofs(&self, task_id: TaskId) -> Result<&[ProofId], LedgerError> {
        self.get_task(task_id)?;
        Ok(self.indices.task_proofs(task_id))
    }

    pub fn get_user_tasks(&self, principal: &Principal) -> &[TaskId] {
        self.indices.user_tasks(principal)
    }

    pub fn get_user_proofs(&self, principal: &Principal) -> &[ProofId] {
        self.indices.user_proofs(principal)
    }

    pub fn get_user_completion_count(&self, principal: &Principal) -> u64 {
        self.indices.completion_count(principal)
    }

    pub fn get_counters(&self) -> Counters {
        Counters {
            total_tasks: self.tasks.len() as u64,
            total_proofs: self.proofs.len() as u64,
        }
    }

    pub fn is_task_active(&self, task_id: TaskId, now: OffsetDateTime) -> Result<bool, LedgerError> {
        Ok(self.get_task(task_id)?.accepts_proofs_at(now))
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn proofs(&self) -> &[CompletionProof] {
        &self.proofs
    }

    pub fn indices(&self) -> &Indices {
        &self.indices
    }

    pub fn pending_events(&self) -> &[LedgerEvent] {
        &self.outbox
    }

    /// Takes the notifications of every transition committed since the last drain.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.outbox)
    }
}

trait Record {
    fn record_id(&self) -> u64;
}

impl Record for Task {
    fn record_id(&self) -> u64 {
        self.id
    }
}

impl Record for CompletionProof {
    fn record_id(&self) -> u64 {
        self.id
    }
}

// Ids are dense from 1, so id n lives at index n - 1.
fn position(id: u64) -> usize {
    (id - 1) as usize
}

fn lookup<T: Record>(records: &[T], id: u64) -> Option<&T> {
    let index = usize::try_from(id.checked_sub(1)?).ok()?;
    records.get(index).filter(|record| record.record_id() == id)
}

fn rejected(operation: &'static str, err: LedgerError) -> LedgerError {
    debug!(operation, code = err.code(), reason = err.message(), "operation rejected");
    err
}
