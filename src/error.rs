//! Error types for the document cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::store::StoreError;

// == Cache Error Enum ==
/// Unified error type for the cache facade.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Construction options failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A caller-supplied argument was unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying document store reported a failure
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

// == Result Type Alias ==
/// Convenience Result type for the cache facade.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_conversion() {
        let store_err = StoreError::new("connection reset");
        let err: CacheError = store_err.into();
        assert!(matches!(err, CacheError::Store(_)));
    }

    #[test]
    fn test_error_display() {
        let err = CacheError::InvalidConfig("ttl must be a finite number".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: ttl must be a finite number"
        );
    }
}
