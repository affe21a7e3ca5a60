//! Management client and fork orchestration for vimfork.
//!
//! Talks to a vCenter/ESX SOAP endpoint, resolves virtual machines by name,
//! and drives the copy-on-write fork procedure: ensure the parent runs,
//! quiesce it, `CreateForkChild`, then power on the child.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod client;
pub mod fork;
pub mod quiesce;
pub mod soap;
pub mod task;
#[doc(hidden)]
pub mod xml;

#[cfg(test)]
pub(crate) mod mock;

pub use client::VimClient;
pub use fork::ForkOrchestrator;
pub use quiesce::{await_quiescence, QUIESCE_DEADLINE, QUIESCE_POLL_INTERVAL};
pub use soap::SoapClient;
pub use task::{await_task, TASK_POLL_INTERVAL};
