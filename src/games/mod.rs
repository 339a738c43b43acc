//! Game modules.
//!
//! - Generic bet lifecycle ([`module::GameModule`])
//! - DiceRoll rules

pub mod dice;
pub mod module;

pub use dice::*;
pub use module::*;
