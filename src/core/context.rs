//! Call context passed into every state-changing operation.

use serde::{Deserialize, Serialize};

use crate::utils::crypto::Address;

/// Authenticated caller and the host's current time (unix seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Identity the host authenticated for this call
    pub caller: Address,
    /// Current time in seconds
    pub timestamp: u64,
}

impl CallContext {
    /// Create a new call context
    pub fn new(caller: Address, timestamp: u64) -> Self {
        Self { caller, timestamp }
    }

    /// Same time, different caller
    pub fn as_caller(&self, caller: Address) -> Self {
        Self { caller, ..*self }
    }
}
