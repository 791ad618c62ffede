use ge2d_queue::{ContextId, QueueError};
use thiserror::Error;

/// Convenience result alias for manager operations.
pub type EngineResult<T, E = EngineError> = Result<T, E>;

/// Errors surfaced by the manager.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A queue operation failed.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The context is not registered with this manager.
    #[error("{0} is not registered")]
    UnknownContext(ContextId),

    /// The dispatcher thread could not be spawned.
    #[error("failed to spawn dispatcher thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// [`crate::Manager::start`] was called twice.
    #[error("dispatcher already running")]
    AlreadyRunning,

    /// The dispatcher was never started or has already stopped.
    #[error("dispatcher not running")]
    NotRunning,
}
