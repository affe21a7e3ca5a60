use serde::{Deserialize, Serialize};

use crate::ManagedObjectRef;

/// A virtual machine resolved from the remote inventory.
///
/// Only meaningful within the lifetime of the session that resolved it;
/// never reused across sessions. Runtime state (power state, quiescence
/// flag) is always re-fetched from the remote system, never cached here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct VirtualMachine {
    /// Inventory name the VM was resolved by.
    pub name: String,

    /// Server-side reference to the VM object.
    pub moref: ManagedObjectRef,
}

impl VirtualMachine {
    #[must_use]
    pub fn new(name: impl Into<String>, moref: ManagedObjectRef) -> Self {
        Self {
            name: name.into(),
            moref,
        }
    }
}

/// Power state of a virtual machine, as reported by its runtime summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
}

impl PowerState {
    /// Parse the wire representation (`poweredOn`, `poweredOff`,
    /// `suspended`). Unknown strings yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "poweredOn" => Some(Self::PoweredOn),
            "poweredOff" => Some(Self::PoweredOff),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_on(self) -> bool {
        self == Self::PoweredOn
    }
}
