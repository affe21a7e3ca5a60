//! Scripted [`VimClient`] double for orchestration tests.
//!
//! Responses are queues popped per call; an empty queue falls back to a
//! benign default (powered on, not quiesced, tasks succeed) so tests only
//! script the readings they care about.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use vimfork_core::{
    GuestCredentials, GuestProgramSpec, ManagedObjectRef, PowerState, TaskHandle, TaskStatus,
    VimError, VirtualMachine,
};

use crate::client::VimClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    FindVm(String),
    PowerState,
    QuiescedForkParent,
    /// Carries the moref value so parent and child power-ons are
    /// distinguishable.
    PowerOn(String),
    EnableForkParent,
    CreateForkChild { name: String, persistent: bool },
    TaskStatus,
    StartGuestProgram { program: String },
}

#[derive(Default)]
pub(crate) struct MockVim {
    calls: Mutex<Vec<Call>>,
    power_states: Mutex<VecDeque<Result<PowerState, VimError>>>,
    quiesced: Mutex<VecDeque<Result<Option<bool>, VimError>>>,
    task_statuses: Mutex<VecDeque<Result<TaskStatus, VimError>>>,
    submit_errors: Mutex<VecDeque<VimError>>,
    start_program_errors: Mutex<VecDeque<VimError>>,
    task_counter: Mutex<u32>,
}

impl MockVim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_power_state(&self, r: Result<PowerState, VimError>) {
        self.power_states.lock().expect("mock state").push_back(r);
    }

    pub fn push_quiesced(&self, r: Result<Option<bool>, VimError>) {
        self.quiesced.lock().expect("mock state").push_back(r);
    }

    pub fn push_task_status(&self, r: Result<TaskStatus, VimError>) {
        self.task_statuses.lock().expect("mock state").push_back(r);
    }

    /// Fail the next task submission (power-on, enable-fork-parent or
    /// create-fork-child, whichever comes first).
    pub fn fail_next_submit(&self, e: VimError) {
        self.submit_errors.lock().expect("mock state").push_back(e);
    }

    pub fn fail_next_start_program(&self, e: VimError) {
        self.start_program_errors
            .lock()
            .expect("mock state")
            .push_back(e);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("mock state").clone()
    }

    pub fn quiesced_reads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == Call::QuiescedForkParent)
            .count()
    }

    /// Task submissions seen so far, across all three task methods.
    pub fn submissions(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::PowerOn(_) | Call::EnableForkParent | Call::CreateForkChild { .. }
                )
            })
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("mock state").push(call);
    }

    fn next_task(&self) -> Result<TaskHandle, VimError> {
        if let Some(e) = self.submit_errors.lock().expect("mock state").pop_front() {
            return Err(e);
        }
        let mut counter = self.task_counter.lock().expect("mock state");
        *counter += 1;
        Ok(TaskHandle::new(ManagedObjectRef::new(
            "Task",
            format!("task-{}", *counter),
        )))
    }
}

#[async_trait]
impl VimClient for MockVim {
    async fn find_vm(&self, name: &str) -> Result<VirtualMachine, VimError> {
        self.record(Call::FindVm(name.to_owned()));
        Ok(VirtualMachine::new(
            name,
            ManagedObjectRef::new("VirtualMachine", "vm-child"),
        ))
    }

    async fn power_state(&self, _vm: &ManagedObjectRef) -> Result<PowerState, VimError> {
        self.record(Call::PowerState);
        self.power_states
            .lock()
            .expect("mock state")
            .pop_front()
            .unwrap_or(Ok(PowerState::PoweredOn))
    }

    async fn quiesced_fork_parent(
        &self,
        _vm: &ManagedObjectRef,
    ) -> Result<Option<bool>, VimError> {
        self.record(Call::QuiescedForkParent);
        self.quiesced
            .lock()
            .expect("mock state")
            .pop_front()
            .unwrap_or(Ok(Some(false)))
    }

    async fn power_on(&self, vm: &ManagedObjectRef) -> Result<TaskHandle, VimError> {
        self.record(Call::PowerOn(vm.value.clone()));
        self.next_task()
    }

    async fn enable_fork_parent(&self, _vm: &ManagedObjectRef) -> Result<TaskHandle, VimError> {
        self.record(Call::EnableForkParent);
        self.next_task()
    }

    async fn create_fork_child(
        &self,
        _vm: &ManagedObjectRef,
        name: &str,
        persistent: bool,
    ) -> Result<TaskHandle, VimError> {
        self.record(Call::CreateForkChild {
            name: name.to_owned(),
            persistent,
        });
        self.next_task()
    }

    async fn task_status(&self, _task: &TaskHandle) -> Result<TaskStatus, VimError> {
        self.record(Call::TaskStatus);
        self.task_statuses
            .lock()
            .expect("mock state")
            .pop_front()
            .unwrap_or(Ok(TaskStatus::Success))
    }

    async fn start_guest_program(
        &self,
        _vm: &ManagedObjectRef,
        _auth: &GuestCredentials,
        program: &GuestProgramSpec,
    ) -> Result<i64, VimError> {
        self.record(Call::StartGuestProgram {
            program: program.program_path.clone(),
        });
        if let Some(e) = self
            .start_program_errors
            .lock()
            .expect("mock state")
            .pop_front()
        {
            return Err(e);
        }
        Ok(4242)
    }
}
