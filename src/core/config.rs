//! Protocol configuration.
//!
//! Deployment-time settings for every component. Values that governance may
//! later adjust (minimum bet, round timeout) only seed the governor here.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::token::TokenAmount;
use crate::error::{Error, Result};
use crate::utils::constants::*;

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Liquidity pool settings (fixed at deployment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Maximum single-bet stake as basis points of the pool balance
    pub exposure_cap_bps: u128,

    /// Seconds a registered game waits before it may be approved
    pub game_approval_cooldown_secs: u64,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            exposure_cap_bps: DEFAULT_EXPOSURE_CAP_BPS,
            game_approval_cooldown_secs: DEFAULT_GAME_APPROVAL_COOLDOWN_SECS,
        }
    }
}

/// Governor settings and initial parameter values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Minimum seconds between two changes of the same parameter
    pub parameter_cooldown_secs: u64,

    /// Initial minimum bet
    pub min_bet: TokenAmount,

    /// Initial seconds before an unfulfilled round may be cancelled
    pub round_timeout_secs: u64,

    /// Change history entries kept in memory
    pub max_history: usize,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            parameter_cooldown_secs: DEFAULT_PARAMETER_COOLDOWN_SECS,
            min_bet: TokenAmount::from_base(DEFAULT_MIN_BET),
            round_timeout_secs: DEFAULT_ROUND_TIMEOUT_SECS,
            max_history: MAX_PARAMETER_HISTORY,
        }
    }
}

/// DiceRoll rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceParams {
    /// Faces of the dice
    pub sides: u32,
    /// Lowest number a player may pick
    pub min_number: u32,
    /// Highest number a player may pick
    pub max_number: u32,
    /// Payout numerator (gross payout = stake * numerator / number)
    pub payout_numerator: u128,
}

impl Default for DiceParams {
    fn default() -> Self {
        Self {
            sides: DICE_SIDES,
            min_number: DICE_MIN_NUMBER,
            max_number: DICE_MAX_NUMBER,
            payout_numerator: DICE_PAYOUT_NUMERATOR,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete deployment configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Protocol version
    pub version: String,

    /// Token supply minted to the administrative identity at construction
    pub genesis_supply: TokenAmount,

    /// Liquidity pool settings
    pub pool: PoolParams,

    /// Governor settings
    pub governance: GovernanceParams,

    /// DiceRoll rules
    pub dice: DiceParams,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            genesis_supply: TokenAmount::from_base(DEFAULT_GENESIS_SUPPLY),
            pool: PoolParams::default(),
            governance: GovernanceParams::default(),
            dice: DiceParams::default(),
        }
    }
}

impl ProtocolConfig {
    /// Create with a custom approval cooldown (for testing)
    pub fn with_game_cooldown(mut self, secs: u64) -> Self {
        self.pool.game_approval_cooldown_secs = secs;
        self
    }

    /// Create with a custom exposure cap (for testing)
    pub fn with_exposure_cap_bps(mut self, bps: u128) -> Self {
        self.pool.exposure_cap_bps = bps;
        self
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| Error::Deserialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate settings are consistent
    pub fn validate(&self) -> Result<()> {
        if self.pool.exposure_cap_bps == 0 || self.pool.exposure_cap_bps > MAX_EXPOSURE_CAP_BPS {
            return Err(Error::Config(format!(
                "exposure cap must be in 1..={} bps",
                MAX_EXPOSURE_CAP_BPS
            )));
        }
        if self.dice.min_number == 0 || self.dice.min_number > self.dice.max_number {
            return Err(Error::Config("dice number range is empty".into()));
        }
        if self.dice.max_number >= self.dice.sides {
            return Err(Error::Config("dice max number must be below the number of sides".into()));
        }
        // payout_numerator == sides is a fair game with no house edge
        if self.dice.payout_numerator < self.dice.max_number as u128
            || self.dice.payout_numerator >= self.dice.sides as u128
        {
            return Err(Error::Config(
                "payout numerator must be at least max number and below sides".into(),
            ));
        }
        if self.governance.min_bet.is_zero() {
            return Err(Error::Config("minimum bet cannot be zero".into()));
        }
        if self.governance.max_history == 0 {
            return Err(Error::Config("parameter history must keep at least one entry".into()));
        }
        if self.genesis_supply.is_zero() {
            return Err(Error::Config("genesis supply cannot be zero".into()));
        }
        Ok(())
    }
}
