//! Protocol module - Core state machine and orchestration.
//!
//! [`state_machine::Protocol`] wires the pool, games, randomness consumer and
//! governor into one owned deployment and records [`events::ProtocolEvent`]s.

pub mod events;
pub mod state_machine;

pub use events::*;
pub use state_machine::*;
