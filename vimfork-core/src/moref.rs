use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference to an object managed by the remote hypervisor endpoint.
///
/// The server identifies every inventory object (virtual machines, folders,
/// tasks, ...) by a type name plus an opaque value, e.g.
/// `VirtualMachine:vm-1234`. The reference carries no session of its own and
/// is only meaningful against the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedObjectRef {
    /// Server-side type name, e.g. `VirtualMachine` or `Task`.
    pub kind: String,

    /// Opaque identifier within that type, e.g. `vm-1234`.
    pub value: String,
}

impl ManagedObjectRef {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ManagedObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Handle to an asynchronous operation submitted to the remote endpoint.
///
/// Returned immediately on submission and consumed exactly once by a wait.
/// Not `Clone`: a handle cannot be waited on twice.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle(ManagedObjectRef);

impl TaskHandle {
    #[must_use]
    pub fn new(moref: ManagedObjectRef) -> Self {
        Self(moref)
    }

    /// The remote task object this handle tracks.
    #[must_use]
    pub fn moref(&self) -> &ManagedObjectRef {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
