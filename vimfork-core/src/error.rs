//! Error taxonomy for the fork orchestration and the management-client
//! boundary it drives.

use std::time::Duration;

/// Failures surfaced at the management-client boundary.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum VimError {
    /// No inventory object matches the requested name.
    #[error("no virtual machine named {name:?} in inventory")]
    NotFound { name: String },

    /// More than one inventory object matches the requested name.
    #[error("{count} virtual machines named {name:?} in inventory")]
    AmbiguousName { name: String, count: usize },

    /// Inventory lookup failed for a reason other than the name itself.
    #[error("inventory lookup failed: {0}")]
    LookupFailed(String),

    /// The endpoint reported a SOAP fault.
    #[error("remote fault: {0}")]
    Fault(String),

    /// The HTTP exchange with the endpoint failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    Protocol(String),

    /// The endpoint URL could not be parsed.
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
}

/// Failure of a submitted remote task, observed by its wait.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TaskError {
    /// The task could not be submitted at all.
    #[error("task submission failed: {0}")]
    Submit(#[source] VimError),

    /// The task ran to a terminal state and reported a fault.
    #[error("remote task failed: {0}")]
    Fault(String),

    /// Reading the task state failed before a terminal state was seen.
    #[error("reading task state failed: {0}")]
    Read(#[source] VimError),

    /// The wait was cancelled from outside.
    #[error("task wait cancelled")]
    Cancelled,
}

/// Outcome of the bounded quiescence wait.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QuiesceError {
    /// The flag never read true within the deadline.
    #[error("parent did not quiesce within {0:?}")]
    Timeout(Duration),

    /// A flag read failed before the deadline.
    #[error("reading quiescence flag failed: {0}")]
    Read(#[source] VimError),

    /// The wait was cancelled from outside.
    #[error("quiescence wait cancelled")]
    Cancelled,
}

/// Failure of one step of the fork procedure.
///
/// Each variant names the step that failed and carries the underlying
/// remote error so callers can report both.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ForkError {
    /// Reading the parent's power state failed.
    #[error("reading power state of {name:?}: {source}")]
    PowerStateRead {
        name: String,
        #[source]
        source: VimError,
    },

    /// The power-on task for the parent was not submitted or did not
    /// complete successfully.
    #[error("powering on parent {name:?}: {source}")]
    PowerOnFailed {
        name: String,
        #[source]
        source: TaskError,
    },

    /// Reading the parent's quiescence flag failed.
    #[error("reading quiescence flag of {name:?}: {source}")]
    QuiesceRead {
        name: String,
        #[source]
        source: VimError,
    },

    /// Marking the parent as forkable failed.
    #[error("enabling fork parent on {name:?}: {source}")]
    EnableForkParentFailed {
        name: String,
        #[source]
        source: TaskError,
    },

    /// The quiesce-trigger script could not be started in the guest.
    #[error("starting quiesce script {script:?} in guest of {name:?}: {source}")]
    GuestScriptFailed {
        name: String,
        script: String,
        #[source]
        source: VimError,
    },

    /// The parent never reported itself quiesced within the deadline.
    #[error("parent {name:?} did not quiesce within {waited:?}")]
    QuiesceTimeout { name: String, waited: Duration },

    /// The copy-on-write fork task was not submitted or reported a fault
    /// (name collisions surface here as whatever the remote reports).
    #[error("creating fork child {child:?} from {name:?}: {source}")]
    ForkCreateFailed {
        name: String,
        child: String,
        #[source]
        source: TaskError,
    },

    /// The freshly created child could not be resolved by name.
    #[error("resolving child {child:?} after fork: {source}")]
    ChildLookupFailed {
        child: String,
        #[source]
        source: VimError,
    },

    /// The child's power-on task was not submitted or did not complete
    /// successfully.
    #[error("powering on child {child:?}: {source}")]
    ChildPowerOnFailed {
        child: String,
        #[source]
        source: TaskError,
    },

    /// The fork was cancelled from outside during a blocking wait.
    #[error("fork cancelled")]
    Cancelled,
}
