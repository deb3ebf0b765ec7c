use crate::model::{CompletionProof, Principal, ProofId, Task, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lookup tables derived from the task and proof records.
///
/// Every sequence is append-only and kept in id order, so the whole structure
/// can be rebuilt from the primary records at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indices {
    #[serde(default)]
    pub task_proofs: BTreeMap<TaskId, Vec<ProofId>>,
    #[serde(default)]
    pub user_tasks: BTreeMap<Principal, Vec<TaskId>>,
    #[serde(default)]
    pub user_proofs: BTreeMap<Principal, Vec<ProofId>>,
    #[serde(default)]
    pub completion_counts: BTreeMap<Principal, u64>,
}

impl Indices {
    pub fn rebuild(tasks: &[Task], proofs: &[CompletionProof]) -> Self {
        let mut indices = Self::default();
        for task in tasks {
            indices.record_task(task);
        }
        for proof in proofs {
            indices.record_proof(proof);
            if proof.verification.as_ref().is_some_and(|v| v.approved) {
                indices.record_approval(&proof.submitter);
            }
        }
        indices
    }

    pub(crate) fn record_task(&mut self, task: &Task) {
        self.user_tasks
            .entry(task.creator.clone())
            .or_default()
            .push(task.id);
    }

    pub(crate) fn record_proof(&mut self, proof: &CompletionProof) {
        self.task_proofs
            .entry(proof.task_id)
            .or_default()
            .push(proof.id);
        self.user_proofs
            .entry(proof.submitter.clone())
            .or_default()
            .push(proof.id);
    }

    pub(crate) fn record_approval(&mut self, submitter: &Principal) {
        *self.completion_counts.entry(submitter.clone()).or_insert(0) += 1;
    }

    pub fn task_proofs(&self, task_id: TaskId) -> &[ProofId] {
        self.task_proofs.get(&task_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn user_tasks(&self, principal: &Principal) -> &[TaskId] {
        self.user_tasks.get(principal).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn user_proofs(&self, principal: &Principal) -> &[ProofId] {
        self.user_proofs.get(principal).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn completion_count(&self, principal: &Principal) -> u64 {
        self.completion_counts.get(principal).copied().unwrap_or(0)
    }
}
