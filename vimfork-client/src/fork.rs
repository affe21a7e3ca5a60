//! The fork procedure: the sequence of remote operations that turns a
//! running parent VM into a running copy-on-write child.
//!
//! Forking one VM is a pipeline with a hard dependency on guest-level
//! quiescence before the fork-create call means anything; the steps run
//! strictly in order, each remote effect complete before the next begins.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use vimfork_core::{
    CreateChildSpec, ForkError, GuestCredentials, GuestProgramSpec, QuiesceError, TaskError,
    TaskHandle, VimError, VirtualMachine,
};

use crate::client::VimClient;
use crate::quiesce::{await_quiescence, QUIESCE_DEADLINE, QUIESCE_POLL_INTERVAL};
use crate::task::await_task;

/// Guest credential baked into the parent images this tool forks.
pub const DEFAULT_GUEST_USERNAME: &str = "vmkite";
pub const DEFAULT_GUEST_PASSWORD: &str = "vmkite";

/// Drives the fork procedure against a [`VimClient`].
///
/// One orchestrator serves any number of sequential fork requests; it holds
/// no per-request state. The skip-if-already-quiesced branch lets the same
/// parent source multiple forks without re-running the guest script.
pub struct ForkOrchestrator<C: VimClient> {
    client: C,
    guest_auth: GuestCredentials,
    quiesce_interval: Duration,
    quiesce_deadline: Duration,
}

impl<C: VimClient> ForkOrchestrator<C> {
    #[must_use]
    pub fn new(client: C) -> Self {
        Self {
            client,
            guest_auth: GuestCredentials::new(DEFAULT_GUEST_USERNAME, DEFAULT_GUEST_PASSWORD),
            quiesce_interval: QUIESCE_POLL_INTERVAL,
            quiesce_deadline: QUIESCE_DEADLINE,
        }
    }

    /// Replace the guest credential used to start the quiesce script.
    #[must_use]
    pub fn with_guest_credentials(mut self, auth: GuestCredentials) -> Self {
        self.guest_auth = auth;
        self
    }

    /// Override the quiescence poll timing.
    #[must_use]
    pub fn with_quiesce_timing(mut self, interval: Duration, deadline: Duration) -> Self {
        self.quiesce_interval = interval;
        self.quiesce_deadline = deadline;
        self
    }

    /// The underlying client, e.g. for resolving VMs.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fork `vm` into a new child per `spec`.
    ///
    /// Each step's remote effect is complete, not merely submitted, before
    /// the next step begins. Nothing is retried; every task failure is
    /// immediately fatal.
    ///
    /// # Errors
    /// One [`ForkError`] variant per failed step; cancellation during any
    /// blocking wait surfaces as [`ForkError::Cancelled`].
    pub async fn fork(
        &self,
        vm: &VirtualMachine,
        spec: &CreateChildSpec,
        cancel: &CancellationToken,
    ) -> Result<(), ForkError> {
        self.ensure_powered_on(vm, cancel).await?;

        let quiesced = self
            .client
            .quiesced_fork_parent(&vm.moref)
            .await
            .map_err(|source| ForkError::QuiesceRead {
                name: vm.name.clone(),
                source,
            })?
            .unwrap_or(false);

        if quiesced {
            debug!(vm = %vm.name, "parent already quiesced, skipping preparation");
        } else {
            self.prepare_parent(vm, spec, cancel).await?;
        }

        info!(vm = %vm.name, child = %spec.name, persistent = spec.persistent, "creating fork child");
        self.run_task(
            self.client
                .create_fork_child(&vm.moref, &spec.name, spec.persistent)
                .await,
            cancel,
        )
        .await
        .map_err(|e| {
            step_error(e, |source| ForkError::ForkCreateFailed {
                name: vm.name.clone(),
                child: spec.name.clone(),
                source,
            })
        })?;

        // The fork task yields no object reference, only completion; the
        // child must be re-resolved by name.
        let child = self
            .client
            .find_vm(&spec.name)
            .await
            .map_err(|source| ForkError::ChildLookupFailed {
                child: spec.name.clone(),
                source,
            })?;

        info!(child = %child.name, moref = %child.moref, "powering on fork child");
        self.run_task(self.client.power_on(&child.moref).await, cancel)
            .await
            .map_err(|e| {
                step_error(e, |source| ForkError::ChildPowerOnFailed {
                    child: child.name.clone(),
                    source,
                })
            })?;

        info!(vm = %vm.name, child = %child.name, "fork complete");
        Ok(())
    }

    async fn ensure_powered_on(
        &self,
        vm: &VirtualMachine,
        cancel: &CancellationToken,
    ) -> Result<(), ForkError> {
        let state = self
            .client
            .power_state(&vm.moref)
            .await
            .map_err(|source| ForkError::PowerStateRead {
                name: vm.name.clone(),
                source,
            })?;
        debug!(vm = %vm.name, ?state, "parent power state");
        if state.is_on() {
            return Ok(());
        }

        info!(vm = %vm.name, "powering on parent");
        self.run_task(self.client.power_on(&vm.moref).await, cancel)
            .await
            .map_err(|e| {
                step_error(e, |source| ForkError::PowerOnFailed {
                    name: vm.name.clone(),
                    source,
                })
            })
    }

    /// Enable fork parenting, trigger the guest quiesce script, and wait
    /// for the parent to report itself quiesced.
    async fn prepare_parent(
        &self,
        vm: &VirtualMachine,
        spec: &CreateChildSpec,
        cancel: &CancellationToken,
    ) -> Result<(), ForkError> {
        info!(vm = %vm.name, "enabling fork parent");
        self.run_task(self.client.enable_fork_parent(&vm.moref).await, cancel)
            .await
            .map_err(|e| {
                step_error(e, |source| ForkError::EnableForkParentFailed {
                    name: vm.name.clone(),
                    source,
                })
            })?;

        info!(vm = %vm.name, script = %spec.script, "starting quiesce script in guest");
        let program = GuestProgramSpec::new(&spec.script);
        let pid = self
            .client
            .start_guest_program(&vm.moref, &self.guest_auth, &program)
            .await
            .map_err(|source| ForkError::GuestScriptFailed {
                name: vm.name.clone(),
                script: spec.script.clone(),
                source,
            })?;
        debug!(vm = %vm.name, pid, "quiesce script started");

        await_quiescence(
            &self.client,
            &vm.moref,
            self.quiesce_interval,
            self.quiesce_deadline,
            cancel,
        )
        .await
        .map_err(|e| match e {
            QuiesceError::Timeout(waited) => ForkError::QuiesceTimeout {
                name: vm.name.clone(),
                waited,
            },
            QuiesceError::Read(source) => ForkError::QuiesceRead {
                name: vm.name.clone(),
                source,
            },
            QuiesceError::Cancelled => ForkError::Cancelled,
            _ => unreachable!("QuiesceError variants are exhaustively handled above"),
        })
    }

    /// Wait on a freshly submitted task, folding submission failure into
    /// the same error type as the wait.
    async fn run_task(
        &self,
        submitted: Result<TaskHandle, VimError>,
        cancel: &CancellationToken,
    ) -> Result<(), TaskError> {
        match submitted {
            Ok(task) => await_task(&self.client, task, cancel).await,
            Err(e) => Err(TaskError::Submit(e)),
        }
    }
}

/// Cancellation is never attributed to the step it interrupted.
fn step_error(e: TaskError, wrap: impl FnOnce(TaskError) -> ForkError) -> ForkError {
    match e {
        TaskError::Cancelled => ForkError::Cancelled,
        other => wrap(other),
    }
}
