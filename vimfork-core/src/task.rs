use serde::{Deserialize, Serialize};

/// State of a submitted remote task, mirroring the endpoint's
/// `TaskInfoState` plus the fault text a failed task carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Queued,
    Running,
    Success,
    /// Terminal failure; carries the remote fault detail.
    Error(String),
}

impl TaskStatus {
    /// Build a status from the wire `info.state` string and the optional
    /// fault message that accompanies an `error` state.
    #[must_use]
    pub fn parse(state: &str, fault: Option<String>) -> Option<Self> {
        match state {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "error" => Some(Self::Error(
                fault.unwrap_or_else(|| "task failed without fault detail".to_owned()),
            )),
            _ => None,
        }
    }

    /// Whether the task has reached a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error(_))
    }
}
