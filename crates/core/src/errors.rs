use thiserror::Error;

/// Conflict reasons surfaced to callers as typed data rather than message
/// text, so the transport layer can phrase each one for the end user.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConflictKind {
    #[error("slot is already at capacity")]
    SlotFull,
    #[error("user already holds a claim on this slot")]
    DuplicateClaim,
    #[error("a slot already exists at this instant")]
    DuplicateInstant,
    #[error("capacity {requested} is below the current claim count {current}")]
    CapacityBelowCount { requested: u32, current: u32 },
    #[error("user is already an admin")]
    AlreadyAdmin,
}

/// Error taxonomy of the core. Every operation recovers low-level store
/// failures at its boundary and returns one of these; raw sqlx errors do
/// not cross into the transport layer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Conflict(#[from] ConflictKind),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("transient store failure: {0}")]
    TransientStore(String),
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),
}

impl CoreError {
    /// Only transient store failures may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConflictKind, CoreError};

    #[test]
    fn only_transient_store_failures_are_retryable() {
        assert!(CoreError::TransientStore("database is locked".to_string()).is_retryable());
        assert!(!CoreError::NotFound("slot").is_retryable());
        assert!(!CoreError::from(ConflictKind::SlotFull).is_retryable());
        assert!(!CoreError::PermissionDenied("admin only").is_retryable());
    }

    #[test]
    fn capacity_conflict_carries_counts() {
        let error = CoreError::from(ConflictKind::CapacityBelowCount { requested: 2, current: 3 });
        assert_eq!(error.to_string(), "capacity 2 is below the current claim count 3");
    }
}
