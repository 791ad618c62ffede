use crate::worker::WorkerState;
use serde::Serialize;

/// Diagnostic view of a [`crate::Manager`].
///
/// `pending` and `free` describe the executing context only and are `None`
/// when the dispatcher is between contexts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Dispatcher run state.
    pub state: WorkerState,
    /// Executing context id.
    pub current: Option<u32>,
    /// Most recently drained context id.
    pub last: Option<u32>,
    /// Registered contexts.
    pub contexts: usize,
    /// Commands waiting in the executing context.
    pub pending: Option<usize>,
    /// Free slots of the executing context.
    pub free: Option<usize>,
    /// Commands written to the accelerator so far.
    pub dispatched: u64,
    /// Hardware timeouts recovered so far.
    pub hw_timeouts: u64,
}
