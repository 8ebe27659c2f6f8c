use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Error enumeration for repository failures shared by every persistence port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record was modified concurrently")]
    StaleVersion,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("operation cancelled")]
    Cancelled,
}

/// Per-request handle threaded through every collaborator call so callers can abort work.
///
/// Cloning shares the underlying flag; cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    cancelled: Arc<AtomicBool>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fail fast with [`RepositoryError::Cancelled`] once the context has been cancelled.
    pub fn check(&self) -> Result<(), RepositoryError> {
        if self.is_cancelled() {
            Err(RepositoryError::Cancelled)
        } else {
            Ok(())
        }
    }
}
