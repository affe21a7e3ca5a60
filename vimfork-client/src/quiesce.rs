//! Bounded wait for a parent VM to report itself quiesced.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use vimfork_core::{ManagedObjectRef, QuiesceError};

use crate::client::VimClient;

/// Cadence for reading the quiescence flag.
pub const QUIESCE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long a parent gets to reach quiescence, measured from poll start.
pub const QUIESCE_DEADLINE: Duration = Duration::from_secs(30);

/// Poll the quiesced-fork-parent flag until it reads true.
///
/// Three outcomes race independently, whichever fires first: a read that
/// observes `true` wins immediately (the very first cadence tick included),
/// the deadline ends the wait with [`QuiesceError::Timeout`], and `cancel`
/// ends it with [`QuiesceError::Cancelled`]. An absent flag reads as
/// not-yet-quiesced. The deadline holds regardless of `cancel`; the wait
/// never overruns it by more than one `interval`.
///
/// # Errors
/// [`QuiesceError::Read`] if a flag read fails before the deadline.
pub async fn await_quiescence<C>(
    client: &C,
    vm: &ManagedObjectRef,
    interval: Duration,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<(), QuiesceError>
where
    C: VimClient + ?Sized,
{
    let end = tokio::time::Instant::now() + deadline;
    let mut ticker =
        tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(QuiesceError::Cancelled),
            () = tokio::time::sleep_until(end) => return Err(QuiesceError::Timeout(deadline)),
            _ = ticker.tick() => {
                let quiesced = client
                    .quiesced_fork_parent(vm)
                    .await
                    .map_err(QuiesceError::Read)?
                    .unwrap_or(false);
                if quiesced {
                    tracing::debug!(vm = %vm, "parent is quiesced");
                    return Ok(());
                }
            }
        }
    }
}
