//! Completion wait for submitted remote tasks.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use vimfork_core::{TaskError, TaskHandle, TaskStatus};

use crate::client::VimClient;

/// Cadence for polling a task's state.
pub const TASK_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Block until `task` reaches a terminal state.
///
/// Consumes the handle; a task is waited on exactly once. The first state
/// read happens immediately, then once per [`TASK_POLL_INTERVAL`].
///
/// # Errors
/// [`TaskError::Fault`] with the remote fault detail if the task failed,
/// [`TaskError::Read`] if a state read fails first, and
/// [`TaskError::Cancelled`] promptly when `cancel` fires mid-wait.
pub async fn await_task<C>(
    client: &C,
    task: TaskHandle,
    cancel: &CancellationToken,
) -> Result<(), TaskError>
where
    C: VimClient + ?Sized,
{
    let mut ticker = tokio::time::interval(TASK_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TaskError::Cancelled),
            _ = ticker.tick() => {
                match client.task_status(&task).await.map_err(TaskError::Read)? {
                    TaskStatus::Success => {
                        tracing::debug!(task = %task, "task completed");
                        return Ok(());
                    }
                    TaskStatus::Error(fault) => {
                        tracing::debug!(task = %task, %fault, "task failed");
                        return Err(TaskError::Fault(fault));
                    }
                    TaskStatus::Queued | TaskStatus::Running => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use vimfork_core::{ManagedObjectRef, VimError};

    use super::*;
    use crate::mock::MockVim;

    fn handle() -> TaskHandle {
        TaskHandle::new(ManagedObjectRef::new("Task", "task-1"))
    }

    #[tokio::test]
    async fn success_after_running_states() {
        let mock = MockVim::new();
        mock.push_task_status(Ok(TaskStatus::Running));
        mock.push_task_status(Ok(TaskStatus::Success));
        let cancel = CancellationToken::new();

        let result = await_task(&mock, handle(), &cancel).await;
        assert!(result.is_ok(), "running then success must resolve Ok");
    }

    #[tokio::test]
    async fn fault_carries_remote_detail() {
        let mock = MockVim::new();
        mock.push_task_status(Ok(TaskStatus::Error("out of disk".to_owned())));
        let cancel = CancellationToken::new();

        match await_task(&mock, handle(), &cancel).await {
            Err(TaskError::Fault(detail)) => assert_eq!(detail, "out of disk"),
            other => panic!("expected Fault, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_failure_surfaces_before_terminal_state() {
        let mock = MockVim::new();
        mock.push_task_status(Err(VimError::Transport("connection reset".to_owned())));
        let cancel = CancellationToken::new();

        match await_task(&mock, handle(), &cancel).await {
            Err(TaskError::Read(_)) => {}
            other => panic!("expected Read, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_wins_over_pending_polls() {
        let mock = MockVim::new();
        // Never reaches a terminal state.
        mock.push_task_status(Ok(TaskStatus::Running));
        mock.push_task_status(Ok(TaskStatus::Running));
        let cancel = CancellationToken::new();

        let cancel_after = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel_after.cancel();
        });

        match await_task(&mock, handle(), &cancel).await {
            Err(TaskError::Cancelled) => {}
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }
}
