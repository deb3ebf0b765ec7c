use thiserror::Error;

/// Failure kinds surfaced by the ledger.
///
/// The first seven variants are deterministic precondition failures that the
/// caller can correct. `InvalidData` and `Io` come from the host environment
/// (snapshot files, configuration).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid_input - {0}")]
    InvalidInput(String),
    #[error("invalid_deadline - {0}")]
    InvalidDeadline(String),
    #[error("not_found - {0}")]
    NotFound(String),
    #[error("task_inactive - {0}")]
    TaskInactive(String),
    #[error("deadline_passed - {0}")]
    DeadlinePassed(String),
    #[error("unauthorized - {0}")]
    Unauthorized(String),
    #[error("already_verified - {0}")]
    AlreadyVerified(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    #[error("io_error - {0}")]
    Io(String),
}

impl LedgerError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_deadline<M: Into<String>>(message: M) -> Self {
        Self::InvalidDeadline(message.into())
    }

    pub fn not_found<M: Into<String>>(message: M) -> Self {
        Self::NotFound(message.into())
    }

    pub fn task_inactive<M: Into<String>>(message: M) -> Self {
        Self::TaskInactive(message.into())
    }

    pub fn deadline_passed<M: Into<String>>(message: M) -> Self {
        Self::DeadlinePassed(message.into())
    }

    pub fn unauthorized<M: Into<String>>(message: M) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn already_verified<M: Into<String>>(message: M) -> Self {
        Self::AlreadyVerified(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidDeadline(_) => "invalid_deadline",
            Self::NotFound(_) => "not_found",
            Self::TaskInactive(_) => "task_inactive",
            Self::DeadlinePassed(_) => "deadline_passed",
            Self::Unauthorized(_) => "unauthorized",
            Self::AlreadyVerified(_) => "already_verified",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(message)
            | Self::InvalidDeadline(message)
            | Self::NotFound(message)
            | Self::TaskInactive(message)
            | Self::DeadlinePassed(message)
            | Self::Unauthorized(message)
            | Self::AlreadyVerified(message)
            | Self::InvalidData(message)
            | Self::Io(message) => message,
        }
    }

    /// True for caller-correctable precondition failures of ledger operations.
    pub fn is_domain(&self) -> bool {
        !matches!(self, Self::InvalidData(_) | Self::Io(_))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_data(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::LedgerError;

    #[test]
    fn display_prefixes_code() {
        let err = LedgerError::not_found("task 7 not found");
        assert_eq!(err.to_string(), "not_found - task 7 not found");
        assert_eq!(err.message(), "task 7 not found");
    }

    #[test]
    fn environment_errors_are_not_domain_errors() {
        assert!(LedgerError::unauthorized("nope").is_domain());
        assert!(LedgerError::already_verified("proof 1").is_domain());
        assert!(!LedgerError::io("disk full").is_domain());
        assert!(!LedgerError::invalid_data("bad snapshot").is_domain());
    }

    #[test]
    fn io_errors_convert_with_io_code() {
        let err: LedgerError = std::io::Error::other("boom").into();
        assert_eq!(err.code(), "io_error");
    }
}
