//! Management-client boundary.
//!
//! Everything the fork orchestration needs from the remote hypervisor
//! endpoint, one typed method per capability, so the orchestrator can be
//! driven against a test double as easily as against the SOAP client.

use async_trait::async_trait;

use vimfork_core::{
    GuestCredentials, GuestProgramSpec, ManagedObjectRef, PowerState, TaskHandle, TaskStatus,
    VimError, VirtualMachine,
};

/// Operations the fork orchestration requires from the hypervisor
/// management endpoint.
///
/// Asynchronous remote operations follow a submit/wait split: submission
/// returns a [`TaskHandle`] immediately, completion is observed separately
/// by polling [`VimClient::task_status`] (see [`crate::task::await_task`]).
/// This keeps submission and completion-waiting independently testable.
#[async_trait]
pub trait VimClient: Send + Sync {
    /// Resolve a virtual machine by inventory name.
    ///
    /// Resolution is idempotent: a stable name yields a stable reference
    /// for the lifetime of the session.
    ///
    /// # Errors
    /// [`VimError::NotFound`] if nothing matches,
    /// [`VimError::AmbiguousName`] if the name is not unique,
    /// [`VimError::LookupFailed`] for other resolution failures.
    async fn find_vm(&self, name: &str) -> Result<VirtualMachine, VimError>;

    /// Read the VM's current power state from its runtime summary.
    ///
    /// # Errors
    /// Propagates transport and protocol failures from the endpoint.
    async fn power_state(&self, vm: &ManagedObjectRef) -> Result<PowerState, VimError>;

    /// Read the quiesced-fork-parent flag from the VM's runtime summary.
    ///
    /// `None` means the property is absent on this endpoint; callers treat
    /// that the same as `Some(false)`.
    ///
    /// # Errors
    /// Propagates transport and protocol failures from the endpoint.
    async fn quiesced_fork_parent(
        &self,
        vm: &ManagedObjectRef,
    ) -> Result<Option<bool>, VimError>;

    /// Submit a power-on task for the VM.
    ///
    /// # Errors
    /// Returns the submission failure; task outcome is observed separately.
    async fn power_on(&self, vm: &ManagedObjectRef) -> Result<TaskHandle, VimError>;

    /// Submit the task that marks the VM as a fork parent.
    ///
    /// # Errors
    /// Returns the submission failure; task outcome is observed separately.
    async fn enable_fork_parent(&self, vm: &ManagedObjectRef) -> Result<TaskHandle, VimError>;

    /// Submit the copy-on-write fork task.
    ///
    /// # Errors
    /// Returns the submission failure; task outcome is observed separately.
    async fn create_fork_child(
        &self,
        vm: &ManagedObjectRef,
        name: &str,
        persistent: bool,
    ) -> Result<TaskHandle, VimError>;

    /// Read the current state of a submitted task.
    ///
    /// # Errors
    /// Propagates transport and protocol failures from the endpoint.
    async fn task_status(&self, task: &TaskHandle) -> Result<TaskStatus, VimError>;

    /// Start a program inside the VM's guest, returning its pid.
    ///
    /// # Errors
    /// Propagates guest-authentication and transport failures.
    async fn start_guest_program(
        &self,
        vm: &ManagedObjectRef,
        auth: &GuestCredentials,
        program: &GuestProgramSpec,
    ) -> Result<i64, VimError>;
}
