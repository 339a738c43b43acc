//! Protocol constants and magic numbers.
//!
//! All protocol-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Wagering token decimals
pub const TOKEN_DECIMALS: u32 = 18;

/// Base units per whole token (10^18)
pub const TOKEN_BASE_UNIT: u128 = 1_000_000_000_000_000_000;

/// Default genesis supply minted to the administrative identity (1 billion tokens)
pub const DEFAULT_GENESIS_SUPPLY: u128 = 1_000_000_000 * TOKEN_BASE_UNIT;

// ═══════════════════════════════════════════════════════════════════════════════
// POOL CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Basis points divisor (10000 = 100%)
pub const BPS_DIVISOR: u128 = 10_000;

/// Default per-bet exposure cap - 1% of the pool balance (100 basis points)
pub const DEFAULT_EXPOSURE_CAP_BPS: u128 = 100;

/// Maximum configurable exposure cap - 10% of the pool balance
pub const MAX_EXPOSURE_CAP_BPS: u128 = 1_000;

/// Default waiting period between game registration and approval - 24 hours
pub const DEFAULT_GAME_APPROVAL_COOLDOWN_SECS: u64 = 24 * 3600;

// ═══════════════════════════════════════════════════════════════════════════════
// DICE ROLL CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Faces of the dice; the roll lands in 1..=DICE_SIDES
pub const DICE_SIDES: u32 = 100;

/// Lowest number a player may choose
pub const DICE_MIN_NUMBER: u32 = 1;

/// Highest number a player may choose
pub const DICE_MAX_NUMBER: u32 = 50;

/// Payout numerator; gross payout is stake * 98 / number (2% house edge)
pub const DICE_PAYOUT_NUMERATOR: u128 = 98;

// ═══════════════════════════════════════════════════════════════════════════════
// GOVERNANCE CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default minimum time between changes of the same parameter - 1 hour
pub const DEFAULT_PARAMETER_COOLDOWN_SECS: u64 = 3600;

/// Default minimum bet - 25 tokens
pub const DEFAULT_MIN_BET: u128 = 25 * TOKEN_BASE_UNIT;

/// Default time after which a round without fulfillment may be cancelled - 24 hours
pub const DEFAULT_ROUND_TIMEOUT_SECS: u64 = 24 * 3600;

/// Maximum entries retained in the parameter change history
pub const MAX_PARAMETER_HISTORY: usize = 100;

// ═══════════════════════════════════════════════════════════════════════════════
// CRYPTOGRAPHIC CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of a public key in bytes (compressed secp256k1)
pub const PUBKEY_LENGTH: usize = 33;

/// Length of a signature in bytes
pub const SIGNATURE_LENGTH: usize = 64;

/// Length of a hash in bytes (SHA256)
pub const HASH_LENGTH: usize = 32;

/// Length of an account address in bytes
pub const ADDRESS_LENGTH: usize = 20;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exposure_constants() {
        assert!(DEFAULT_EXPOSURE_CAP_BPS <= MAX_EXPOSURE_CAP_BPS);
        assert!(MAX_EXPOSURE_CAP_BPS < BPS_DIVISOR);
    }

    #[test]
    fn test_dice_constants() {
        assert!(DICE_MIN_NUMBER <= DICE_MAX_NUMBER);
        assert!(DICE_MAX_NUMBER < DICE_SIDES);
        // Every winning choice must pay out at least the stake
        assert!(DICE_PAYOUT_NUMERATOR >= DICE_MAX_NUMBER as u128);
    }

    #[test]
    fn test_token_units() {
        assert_eq!(TOKEN_BASE_UNIT, 10u128.pow(TOKEN_DECIMALS));
        assert!(DEFAULT_MIN_BET < DEFAULT_GENESIS_SUPPLY);
    }
}
