use super::{Principal, TaskId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub creator: Principal,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completion_criteria: String,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Task {
    /// Whether a proof submitted at `now` would be accepted.
    pub fn accepts_proofs_at(&self, now: OffsetDateTime) -> bool {
        self.is_active && now <= self.deadline
    }
}
