pub mod config;
pub mod error;
pub mod events;
pub mod index;
pub mod ledger;
pub mod ledger_api;
pub mod logging;
pub mod model;
pub mod shared;
pub mod storage;

pub use error::LedgerError;
pub use ledger::{Counters, Ledger};
pub use model::{CompletionProof, Principal, ProofId, ProofStatus, Task, TaskId};

#[cfg(test)]
mod tests {
    use crate::error::LedgerError;
    use crate::model::{Principal, Task};
    use time::macros::datetime;

    #[test]
    fn task_has_required_fields() {
        let task = Task {
            id: 1,
            creator: Principal::from("alice"),
            title: "demo".to_string(),
            description: String::new(),
            completion_criteria: String::new(),
            deadline: datetime!(2025-12-21 00:00 UTC),
            is_active: true,
            created_at: datetime!(2025-12-20 00:00 UTC),
        };

        assert_eq!(task.id, 1);
        assert_eq!(task.creator.as_str(), "alice");
        assert!(task.accepts_proofs_at(datetime!(2025-12-21 00:00 UTC)));
        assert!(!task.accepts_proofs_at(datetime!(2025-12-21 00:00:01 UTC)));
    }

    #[test]
    fn ledger_error_exposes_code() {
        let err = LedgerError::invalid_input("missing title");
        assert_eq!(err.code(), "invalid_input");
    }
}
