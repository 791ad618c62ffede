use ge2d_queue::QueueError;
use thiserror::Error;

/// Convenience result alias for command generation.
pub type GenResult<T, E = GenError> = Result<T, E>;

/// Errors surfaced while building or queueing drawing commands.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GenError {
    /// Queueing the built command failed.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// A surface description cannot be programmed.
    #[error("invalid surface: {0}")]
    InvalidSurface(&'static str),

    /// The pixel format code has bits the accelerator does not understand.
    #[error("unsupported pixel format {0:#x}")]
    UnsupportedFormat(u32),
}
