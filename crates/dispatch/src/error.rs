//! Dispatch error types.

use thiserror::Error;

use fahrplan_core::TaskToken;

use crate::types::TaskStatus;

/// Errors surfaced by task manager operations.
///
/// Everything here is recoverable and reported synchronously at the call
/// site; the manager never retries on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The token is absent from the registry.
    #[error("unknown task token {0}")]
    UnknownToken(TaskToken),

    /// The entry exists but is not in a state the operation accepts.
    #[error("task {token} is in state {status:?}")]
    WrongState { token: TaskToken, status: TaskStatus },
}
