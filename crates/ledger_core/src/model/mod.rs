mod principal;
mod proof;
mod task;

pub use principal::Principal;
pub use proof::{CompletionProof, ProofStatus, Verification};
pub use task::Task;

/// Sequential task identifier, starting at 1.
pub type TaskId = u64;

/// Sequential proof identifier, starting at 1. Independent of [`TaskId`].
pub type ProofId = u64;
