//! Randomness for game rounds.
//!
//! - Request/fulfillment bookkeeping on the consumer side
//! - The outgoing oracle capability
//! - Manual and signature-based reference oracles
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut oracle = SigningOracle::new(KeyPair::generate());
//! let id = protocol.play(&mut oracle, &ctx, dice)?;
//! for f in oracle.drain_fulfillments() {
//!     protocol.on_fulfilled(&oracle_ctx, f.request_id, f.value)?;
//! }
//! ```

pub mod consumer;
pub mod sources;

pub use consumer::*;
pub use sources::*;
