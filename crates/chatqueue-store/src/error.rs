//! Store errors.

use thiserror::Error;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure.
    #[error("{0}")]
    Backend(String),
}

/// Which store operation failed. Each kind is independently reportable;
/// a failure in one never blocks the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Load,
    Save,
    Migrate,
}

impl StoreError {
    /// Whether this is the "extension context invalidated" class of error
    /// raised when the host page outlives an extension reload. These are
    /// suppressed entirely rather than reported.
    pub fn is_context_invalidated(&self) -> bool {
        let message = self.to_string().to_ascii_lowercase();
        message.contains("context invalidated")
            || message.contains("receiving end does not exist")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_invalidated_detection() {
        let err = StoreError::Backend("Extension context invalidated.".to_string());
        assert!(err.is_context_invalidated());

        let err = StoreError::Backend("The receiving end does not exist".to_string());
        assert!(err.is_context_invalidated());

        let err = StoreError::Backend("quota exceeded".to_string());
        assert!(!err.is_context_invalidated());
    }
}
