//! Liquidity pool for the Gembites protocol.
//!
//! - Share-based staking ledger
//! - Game authorization with an approval cooldown
//! - Bet escrow, liability reservation and settlement

pub mod liquidity_pool;
pub mod registry;
pub mod shares;

pub use liquidity_pool::*;
pub use registry::*;
pub use shares::*;
