//! Errors surfaced by the coaching handlers.

use thiserror::Error;

use crate::domain::foundation::ValidationError;
use crate::ports::StateStoreError;

/// Failure of a coaching command. Generation problems never appear here;
/// they are absorbed into fallback replies.
#[derive(Debug, Error)]
pub enum CoachingError {
    #[error("State store error: {0}")]
    Store(#[from] StateStoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}
