//! Core types for the vimfork VM fork orchestrator.
//!
//! Defines the fundamental domain types: managed object references, the
//! virtual machine handle, the fork request spec, task states, and the
//! error taxonomy shared by the client and the CLI.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod moref;
pub mod spec;
pub mod task;
pub mod vm;

pub use error::{ForkError, QuiesceError, TaskError, VimError};
pub use moref::{ManagedObjectRef, TaskHandle};
pub use spec::{CreateChildSpec, GuestCredentials, GuestProgramSpec};
pub use task::TaskStatus;
pub use vm::{PowerState, VirtualMachine};
