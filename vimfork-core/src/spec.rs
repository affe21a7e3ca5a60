use serde::{Deserialize, Serialize};

/// Parameters for one fork request.
///
/// Immutable; constructed once per request by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateChildSpec {
    /// Inventory name of the child VM to create.
    pub name: String,

    /// Guest path of the script that brings the parent to a fork-safe
    /// state (flushed caches, consistent filesystem) and requests
    /// quiescence.
    pub script: String,

    /// Whether the child survives independently of the parent's continued
    /// existence.
    pub persistent: bool,
}

/// Credential used to start programs inside the parent guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestCredentials {
    pub username: String,
    pub password: String,
}

impl GuestCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// A program invocation inside the guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestProgramSpec {
    /// Absolute guest path of the program to run.
    pub program_path: String,

    /// Argument string passed to the program, empty by default.
    pub arguments: String,
}

impl GuestProgramSpec {
    pub fn new(program_path: impl Into<String>) -> Self {
        Self {
            program_path: program_path.into(),
            arguments: String::new(),
        }
    }
}
