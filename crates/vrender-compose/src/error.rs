//! Compose error types.

use thiserror::Error;
use vrender_models::ValidationError;

pub type ComposeResult<T> = Result<T, ComposeError>;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Too many combinations: {count} exceeds the limit of {limit}")]
    TooManyCombinations { count: usize, limit: usize },
}
