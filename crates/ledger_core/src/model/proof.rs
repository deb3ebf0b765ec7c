use super::{Principal, ProofId, TaskId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Outcome recorded by the task creator. Written once, never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub verified_by: Principal,
    #[serde(with = "time::serde::rfc3339")]
    pub verified_at: OffsetDateTime,
    pub remarks: String,
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionProof {
    pub id: ProofId,
    pub task_id: TaskId,
    pub submitter: Principal,
    pub proof_data: String,
    pub evidence_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    #[serde(default)]
    pub verification: Option<Verification>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofStatus {
    Pending,
    Approved,
    Rejected,
}

impl CompletionProof {
    pub fn is_verified(&self) -> bool {
        self.verification.is_some()
    }

    pub fn verified_by(&self) -> Option<&Principal> {
        self.verification.as_ref().map(|v| &v.verified_by)
    }

    pub fn verified_at(&self) -> Option<OffsetDateTime> {
        self.verification.as_ref().map(|v| v.verified_at)
    }

    pub fn remarks(&self) -> Option<&str> {
        self.verification.as_ref().map(|v| v.remarks.as_str())
    }

    pub fn status(&self) -> ProofStatus {
        match &self.verification {
            None => ProofStatus::Pending,
            Some(v) if v.approved => ProofStatus::Approved,
            Some(_) => ProofStatus::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CompletionProof, ProofStatus, Verification};
    use crate::model::Principal;
    use time::macros::datetime;

    fn pending() -> CompletionProof {
        CompletionProof {
            id: 1,
            task_id: 1,
            submitter: Principal::from("bob"),
            proof_data: "report.pdf".to_string(),
            evidence_hash: "0xabc".to_string(),
            submitted_at: datetime!(2025-12-20 00:00 UTC),
            verification: None,
        }
    }

    #[test]
    fn pending_proof_has_no_verification_fields() {
        let proof = pending();
        assert!(!proof.is_verified());
        assert_eq!(proof.status(), ProofStatus::Pending);
        assert_eq!(proof.verified_by(), None);
        assert_eq!(proof.verified_at(), None);
        assert_eq!(proof.remarks(), None);
    }

    #[test]
    fn status_reflects_verification_outcome() {
        let mut proof = pending();
        proof.verification = Some(Verification {
            verified_by: Principal::from("alice"),
            verified_at: datetime!(2025-12-21 00:00 UTC),
            remarks: "missing pages".to_string(),
            approved: false,
        });

        assert!(proof.is_verified());
        assert_eq!(proof.status(), ProofStatus::Rejected);
        assert_eq!(proof.remarks(), Some("missing pages"));
    }

    #[test]
    fn proof_json_uses_rfc3339_timestamps() {
        let json = serde_json::to_value(pending()).unwrap();
        assert_eq!(json["submitted_at"], "2025-12-20T00:00:00Z");
        assert!(json["verification"].is_null());
    }
}
