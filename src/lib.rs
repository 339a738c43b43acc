//! # Gembites Protocol
//!
//! A wagering protocol where players bet a fungible token against a single
//! shared liquidity pool. Game outcomes are resolved by an external randomness
//! oracle and economic parameters are tuned through rate-limited governance.
//!
//! ## Architecture
//!
//! - **Core**: Token ledger, call context and deployment configuration
//! - **Pool**: Staking shares, game authorization, escrow and settlement
//! - **Games**: Generic bet lifecycle and the DiceRoll rules
//! - **Oracle**: Randomness requests and reference oracles
//! - **Governance**: Bounded parameters with a per-parameter cooldown
//! - **Protocol**: The owned deployment that wires everything together
//!
//! ## Example
//!
//! ```rust,ignore
//! use gembites::prelude::*;
//!
//! let mut protocol = Protocol::new(ProtocolConfig::default(), admin, oracle.address())?;
//! let dice = protocol.dice_address();
//!
//! protocol.bet(&player_ctx, dice, 40, TokenAmount::from_tokens(100))?;
//! let id = protocol.play(&mut oracle, &player_ctx, dice)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod error;
pub mod games;
pub mod governance;
pub mod monitoring;
pub mod oracle;
pub mod pool;
pub mod protocol;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::{DiceParams, GovernanceParams, PoolParams, ProtocolConfig},
        context::CallContext,
        token::{Token, TokenAmount, TokenLedger},
    };
    pub use crate::error::{Error, Result};
    pub use crate::games::{
        dice::DiceRoll,
        module::{BetStatus, GameModule, GameRules, Outcome},
    };
    pub use crate::governance::{governor::ParameterGovernor, parameters::Parameter};
    pub use crate::oracle::{
        consumer::{RandomWord, RandomnessConsumer},
        sources::{ManualOracle, RandomnessOracle, SigningOracle},
    };
    pub use crate::pool::liquidity_pool::LiquidityPool;
    pub use crate::protocol::{events::ProtocolEvent, state_machine::Protocol};
    pub use crate::utils::crypto::{Address, Hash, KeyPair, RequestId};
}

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name
pub const PROTOCOL_NAME: &str = "Gembites";
