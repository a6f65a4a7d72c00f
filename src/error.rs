//! Error types

use thiserror::Error;

/// Invalid [`Options`](crate::Options), reported before anything is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("requests_per_duration is {requests} but no positive duration was given")]
    RateWithoutDuration { requests: usize },

    #[error("a rate window needs a positive request count and a positive duration")]
    IncompleteWindow,
}

/// An item was requested from a drained [`WorkSource`](crate::WorkSource).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("work source has no more items")]
pub struct SourceExhausted;

/// Why a dispatch settled without results.
#[derive(Debug, Error)]
pub enum DispatchError<E> {
    #[error("invalid dispatch options: {0}")]
    Config(#[from] ConfigError),

    /// The worker failed on the item drawn at position `index`.
    #[error("worker failed on item {index}")]
    Worker {
        index: usize,
        #[source]
        source: E,
    },

    #[error("internal error: {0}")]
    SourceExhausted(#[from] SourceExhausted),
}

impl<E> DispatchError<E> {
    /// Draw-order index of the failed item, if a worker failed.
    pub fn index(&self) -> Option<usize> {
        match self {
            DispatchError::Worker { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Borrow the worker's own error.
    pub fn worker_error(&self) -> Option<&E> {
        match self {
            DispatchError::Worker { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Unwrap the worker's own error, untouched.
    pub fn into_worker_error(self) -> Option<E> {
        match self {
            DispatchError::Worker { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, DispatchError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;

    use super::*;

    #[test]
    fn test_worker_error_accessors() {
        let err: DispatchError<io::Error> = DispatchError::Worker {
            index: 2,
            source: io::Error::new(io::ErrorKind::Other, "boom"),
        };
        assert_eq!(err.index(), Some(2));
        assert_eq!(err.to_string(), "worker failed on item 2");
        assert_eq!(err.source().map(|e| e.to_string()), Some("boom".to_string()));
        assert!(!err.is_config());
        assert_eq!(err.worker_error().map(|e| e.to_string()), Some("boom".to_string()));
        assert_eq!(err.into_worker_error().map(|e| e.kind()), Some(io::ErrorKind::Other));
    }

    #[test]
    fn test_config_error_display() {
        let err: DispatchError<io::Error> = ConfigError::RateWithoutDuration { requests: 5 }.into();
        assert!(err.is_config());
        assert_eq!(err.index(), None);
        assert!(err.worker_error().is_none());
        let expected = concat!(
            "invalid dispatch options: ",
            "requests_per_duration is 5 but no positive duration was given",
        );
        assert_eq!(err.to_string(), expected);
    }
}
