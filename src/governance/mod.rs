//! Governance for the Gembites protocol.
//!
//! Economic parameters are adjusted by the governor owner, rate-limited by a
//! per-parameter cooldown.

pub mod governor;
pub mod parameters;

pub use governor::*;
pub use parameters::*;
