//! Error types for the Gembites protocol.
//!
//! Every public operation either completes or fails with one of these variants
//! before touching any state, so callers can resubmit with corrected inputs.

use thiserror::Error;

/// Result type alias for Gembites operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Gembites protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Token Ledger Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Caller's external balance cannot cover the amount
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Required amount in base units
        required: u128,
        /// Available amount in base units
        available: u128,
    },

    /// Spender was not granted a large enough allowance
    #[error("Insufficient allowance: required {required}, approved {approved}")]
    InsufficientAllowance {
        /// Required amount in base units
        required: u128,
        /// Currently approved amount in base units
        approved: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Liquidity Pool Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Withdrawal exceeds the staker's current claim
    #[error("Over-withdrawal: requested {requested}, claim {claim}")]
    OverWithdrawal {
        /// Requested amount
        requested: u128,
        /// Staker's current claim on pool assets
        claim: u128,
    },

    /// Pool cannot cover the liability without breaking solvency
    #[error("Insufficient pool liquidity: required {required}, free {available}")]
    InsufficientLiquidity {
        /// Liquidity required
        required: u128,
        /// Free liquidity in the pool
        available: u128,
    },

    /// Game already left the Unregistered state
    #[error("Game already registered: {0}")]
    AlreadyRegistered(String),

    /// Game was never registered with the pool
    #[error("Game not registered: {0}")]
    GameNotRegistered(String),

    /// Requested authorization transition is not allowed
    #[error("Invalid game transition for {game}: {from} -> {to}")]
    InvalidGameTransition {
        /// Game address
        game: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Time-locked transition attempted before its window opened
    #[error("Cooldown not elapsed: {remaining}s remaining")]
    CooldownNotElapsed {
        /// Seconds until the transition becomes available
        remaining: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Game Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Game module is not deployed in this protocol instance
    #[error("Unknown game: {0}")]
    UnknownGame(String),

    /// Bet amount outside [min bet, exposure cap]
    #[error("Bet amount {amount} out of range [{min}, {max}]")]
    BetOutOfRange {
        /// Requested bet amount
        amount: u128,
        /// Governor minimum bet
        min: u128,
        /// Pool exposure cap
        max: u128,
    },

    /// Player already has a placed bet in this game
    #[error("Already betted: {0}")]
    AlreadyBetted(String),

    /// Chosen number outside the game's range
    #[error("Number {number} out of range [{min}, {max}]")]
    NumberOutOfRange {
        /// Chosen number
        number: u32,
        /// Lowest allowed number
        min: u32,
        /// Highest allowed number
        max: u32,
    },

    /// Player has no placed bet to play
    #[error("No active bet for {0}")]
    NoActiveBet(String),

    /// Player's round is already waiting for the oracle
    #[error("Round for {0} is awaiting randomness")]
    AwaitingRandomness(String),

    /// Round has not been pending long enough to be cancelled
    #[error("Round not stalled: {remaining}s until it may be cancelled")]
    RoundNotStalled {
        /// Seconds until the round may be cancelled
        remaining: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Randomness Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Fulfillment for a request id this consumer never issued
    #[error("Unknown randomness request: {0}")]
    UnknownRequest(String),

    /// Second fulfillment for the same request
    #[error("Randomness request already fulfilled: {0}")]
    AlreadyFulfilled(String),

    /// Fulfillment for a request voided by administrative recovery
    #[error("Randomness request cancelled: {0}")]
    RequestCancelled(String),

    // ═══════════════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Caller is not allowed to perform this action
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Cryptographic operation failed
    #[error("Crypto error in {operation}: {details}")]
    CryptoError {
        /// Operation that failed
        operation: String,
        /// Error details
        details: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Amount is zero
    #[error("Amount cannot be zero")]
    ZeroAmount,

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Underflow in calculation
    #[error("Arithmetic underflow in {operation}")]
    Underflow {
        /// Operation that underflowed
        operation: String,
    },

    /// Invariant violation detected
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // ═══════════════════════════════════════════════════════════════════
    // Serialization / IO Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if resubmitting with corrected inputs (or later) can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InsufficientBalance { .. }
                | Error::InsufficientAllowance { .. }
                | Error::InsufficientLiquidity { .. }
                | Error::BetOutOfRange { .. }
                | Error::NumberOutOfRange { .. }
                | Error::CooldownNotElapsed { .. }
                | Error::RoundNotStalled { .. }
                | Error::OverWithdrawal { .. }
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::InvariantViolation(_) | Error::Overflow { .. } | Error::Underflow { .. }
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Token errors: 1xxx
            Error::InsufficientBalance { .. } => 1001,
            Error::InsufficientAllowance { .. } => 1002,

            // Pool errors: 2xxx
            Error::OverWithdrawal { .. } => 2001,
            Error::InsufficientLiquidity { .. } => 2002,
            Error::AlreadyRegistered(_) => 2003,
            Error::GameNotRegistered(_) => 2004,
            Error::InvalidGameTransition { .. } => 2005,
            Error::CooldownNotElapsed { .. } => 2006,

            // Game errors: 3xxx
            Error::UnknownGame(_) => 3001,
            Error::BetOutOfRange { .. } => 3002,
            Error::AlreadyBetted(_) => 3003,
            Error::NumberOutOfRange { .. } => 3004,
            Error::NoActiveBet(_) => 3005,
            Error::AwaitingRandomness(_) => 3006,
            Error::RoundNotStalled { .. } => 3007,

            // Randomness errors: 4xxx
            Error::UnknownRequest(_) => 4001,
            Error::AlreadyFulfilled(_) => 4002,
            Error::RequestCancelled(_) => 4003,

            // Authorization errors: 5xxx
            Error::Unauthorized(_) => 5001,
            Error::CryptoError { .. } => 5002,

            // Validation errors: 6xxx
            Error::InvalidParameter { .. } => 6001,
            Error::ZeroAmount => 6002,
            Error::Overflow { .. } => 6003,
            Error::Underflow { .. } => 6004,
            Error::InvariantViolation(_) => 6005,

            // Serialization errors: 7xxx
            Error::Serialization(_) => 7001,
            Error::Deserialization(_) => 7002,
            Error::Io(_) => 7003,
            Error::Config(_) => 7004,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
