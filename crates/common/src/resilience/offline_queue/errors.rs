use thiserror::Error;

use crate::error::{CommonError, ErrorSeverity};
use crate::{impl_error_classification, impl_error_conversion};

/// Offline queue errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("Offline queue is at maximum capacity ({0})")]
    CapacityExceeded(usize),
}

impl_error_conversion!(QueueError, Common);

impl_error_classification!(QueueError, Common,
    Self::CapacityExceeded(_) => {
        retryable: true,  // Frees up once a drain runs
        severity: ErrorSeverity::Warning,
        critical: false,
    },
);

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
