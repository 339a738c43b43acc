//! Protocol parameters that can be changed through the governor.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::core::config::GovernanceParams;
use crate::error::{Error, Result};
use crate::utils::constants::TOKEN_BASE_UNIT;

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Parameters that can be modified by the governor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Parameter {
    /// Smallest accepted stake (token base units)
    MinBet,
    /// Seconds after which an unfulfilled round may be cancelled
    RoundTimeout,
}

impl Parameter {
    /// All parameters
    pub const ALL: [Parameter; 2] = [Parameter::MinBet, Parameter::RoundTimeout];

    /// Get parameter name
    pub fn name(&self) -> &'static str {
        match self {
            Self::MinBet => "min_bet",
            Self::RoundTimeout => "round_timeout",
        }
    }

    /// Get parameter description
    pub fn description(&self) -> &'static str {
        match self {
            Self::MinBet => "Minimum stake accepted by every game",
            Self::RoundTimeout => "Seconds before a round without randomness may be cancelled",
        }
    }

    /// Get valid range for parameter (min, max)
    pub fn bounds(&self) -> (u128, u128) {
        match self {
            Self::MinBet => (1, 1_000_000 * TOKEN_BASE_UNIT), // up to 1M tokens
            Self::RoundTimeout => (60, 30 * 86_400),           // 1 minute to 30 days
        }
    }

    /// Validate a parameter value
    pub fn validate(&self, value: u128) -> Result<()> {
        let (min, max) = self.bounds();

        if value < min || value > max {
            return Err(Error::InvalidParameter {
                name: self.name().into(),
                reason: format!("value {} outside bounds [{}, {}]", value, min, max),
            });
        }

        Ok(())
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "min_bet" | "minbet" => Ok(Self::MinBet),
            "round_timeout" | "roundtimeout" => Ok(Self::RoundTimeout),
            other => Err(Error::InvalidParameter {
                name: "parameter".into(),
                reason: format!("unknown parameter '{}'", other),
            }),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETER STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Current value of a parameter and when it last changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterEntry {
    /// Parameter
    pub parameter: Parameter,
    /// Current value
    pub value: u128,
    /// Time of the last accepted change (None if never changed)
    pub last_changed_at: Option<u64>,
}

/// Parameter values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterStore {
    entries: HashMap<Parameter, ParameterEntry>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::from_config(&GovernanceParams::default())
    }
}

impl ParameterStore {
    /// Seed the store from deployment settings
    pub fn from_config(params: &GovernanceParams) -> Self {
        let mut store = Self {
            entries: HashMap::new(),
        };
        store.seed(Parameter::MinBet, params.min_bet.base());
        store.seed(Parameter::RoundTimeout, params.round_timeout_secs as u128);
        store
    }

    fn seed(&mut self, parameter: Parameter, value: u128) {
        self.entries.insert(
            parameter,
            ParameterEntry {
                parameter,
                value,
                last_changed_at: None,
            },
        );
    }

    /// Get parameter value
    pub fn get(&self, parameter: Parameter) -> u128 {
        self.entry(parameter).value
    }

    /// Get the full entry
    pub fn entry(&self, parameter: Parameter) -> ParameterEntry {
        self.entries.get(&parameter).copied().unwrap_or(ParameterEntry {
            parameter,
            value: parameter.bounds().0,
            last_changed_at: None,
        })
    }

    /// Record an accepted change
    pub(crate) fn record(&mut self, parameter: Parameter, value: u128, now: u64) {
        self.entries.insert(
            parameter,
            ParameterEntry {
                parameter,
                value,
                last_changed_at: Some(now),
            },
        );
    }

    /// All entries in declaration order
    pub fn all(&self) -> Vec<ParameterEntry> {
        Parameter::ALL.iter().map(|p| self.entry(*p)).collect()
    }
}
