//! Parameter governor with a per-parameter cooldown.
//!
//! Each parameter may change at most once per cooldown window. A parameter that
//! has never been changed may be changed immediately.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::core::config::GovernanceParams;
use crate::core::context::CallContext;
use crate::error::{Error, Result};
use crate::governance::parameters::{Parameter, ParameterEntry, ParameterStore};
use crate::utils::crypto::Address;

/// A change accepted by the governor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterChange {
    /// Parameter changed
    pub parameter: Parameter,
    /// Value before the change
    pub old_value: u128,
    /// Value after the change
    pub new_value: u128,
    /// Who made the change
    pub changed_by: Address,
    /// When the change was made
    pub changed_at: u64,
}

/// Time-locked parameter governor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterGovernor {
    owner: Address,
    cooldown_secs: u64,
    store: ParameterStore,
    history: VecDeque<ParameterChange>,
    max_history: usize,
}

impl ParameterGovernor {
    /// Create a governor owned by `owner`
    pub fn new(owner: Address, params: &GovernanceParams) -> Self {
        Self {
            owner,
            cooldown_secs: params.parameter_cooldown_secs,
            store: ParameterStore::from_config(params),
            history: VecDeque::new(),
            max_history: params.max_history,
        }
    }

    /// Governor owner
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Minimum seconds between changes of one parameter
    pub fn cooldown_secs(&self) -> u64 {
        self.cooldown_secs
    }

    /// Current value of `parameter`
    pub fn get(&self, parameter: Parameter) -> u128 {
        self.store.get(parameter)
    }

    /// Current entry of `parameter`
    pub fn entry(&self, parameter: Parameter) -> ParameterEntry {
        self.store.entry(parameter)
    }

    /// All current entries
    pub fn parameters(&self) -> Vec<ParameterEntry> {
        self.store.all()
    }

    /// Seconds until `parameter` may change again (0 when it may change now)
    pub fn remaining_cooldown(&self, parameter: Parameter, now: u64) -> u64 {
        match self.store.entry(parameter).last_changed_at {
            None => 0,
            Some(at) => at.saturating_add(self.cooldown_secs).saturating_sub(now),
        }
    }

    /// Set `parameter` to `value` (owner only)
    pub fn set_parameter(
        &mut self,
        ctx: &CallContext,
        parameter: Parameter,
        value: u128,
    ) -> Result<ParameterChange> {
        if ctx.caller != self.owner {
            return Err(Error::Unauthorized("only the governor owner may set parameters".into()));
        }
        parameter.validate(value)?;

        let remaining = self.remaining_cooldown(parameter, ctx.timestamp);
        if remaining > 0 {
            debug!(%parameter, remaining, "Parameter change rejected by cooldown");
            return Err(Error::CooldownNotElapsed { remaining });
        }

        let change = ParameterChange {
            parameter,
            old_value: self.store.get(parameter),
            new_value: value,
            changed_by: ctx.caller,
            changed_at: ctx.timestamp,
        };
        self.store.record(parameter, value, ctx.timestamp);

        self.history.push_back(change);
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }

        info!(%parameter, old = change.old_value, new = value, "Parameter changed");
        Ok(change)
    }

    /// Accepted changes, oldest first
    pub fn history(&self) -> impl Iterator<Item = &ParameterChange> {
        self.history.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::TOKEN_BASE_UNIT;

    const HOUR: u64 = 3_600;

    fn owner() -> Address {
        Address::derive("owner")
    }

    fn governor() -> ParameterGovernor {
        ParameterGovernor::new(owner(), &GovernanceParams::default())
    }

    #[test]
    fn test_first_change_is_immediate() {
        let mut gov = governor();
        let change = gov
            .set_parameter(&CallContext::new(owner(), 0), Parameter::MinBet, 10 * TOKEN_BASE_UNIT)
            .unwrap();
        assert_eq!(change.old_value, 25 * TOKEN_BASE_UNIT);
        assert_eq!(gov.get(Parameter::MinBet), 10 * TOKEN_BASE_UNIT);
    }

    #[test]
    fn test_cooldown_boundary() {
        let mut gov = governor();
        gov.set_parameter(&CallContext::new(owner(), 1_000), Parameter::MinBet, 10)
            .unwrap();

        let err = gov
            .set_parameter(&CallContext::new(owner(), 1_000 + HOUR - 1), Parameter::MinBet, 20)
            .unwrap_err();
        assert_eq!(err, Error::CooldownNotElapsed { remaining: 1 });
        assert_eq!(gov.get(Parameter::MinBet), 10);

        gov.set_parameter(&CallContext::new(owner(), 1_000 + HOUR), Parameter::MinBet, 20)
            .unwrap();
        assert_eq!(gov.get(Parameter::MinBet), 20);
    }

    #[test]
    fn test_cooldown_is_per_parameter() {
        let mut gov = governor();
        gov.set_parameter(&CallContext::new(owner(), 0), Parameter::MinBet, 10)
            .unwrap();
        gov.set_parameter(&CallContext::new(owner(), 1), Parameter::RoundTimeout, 600)
            .unwrap();
        assert_eq!(gov.remaining_cooldown(Parameter::MinBet, 1), HOUR - 1);
    }

    #[test]
    fn test_owner_only() {
        let mut gov = governor();
        let err = gov
            .set_parameter(&CallContext::new(Address::derive("mallory"), 0), Parameter::MinBet, 1)
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_out_of_bounds_does_not_start_cooldown() {
        let mut gov = governor();
        assert!(gov
            .set_parameter(&CallContext::new(owner(), 0), Parameter::RoundTimeout, 1)
            .is_err());
        assert_eq!(gov.remaining_cooldown(Parameter::RoundTimeout, 0), 0);
    }

    #[test]
    fn test_history_is_bounded() {
        let params = GovernanceParams {
            max_history: 2,
            parameter_cooldown_secs: 0,
            ..GovernanceParams::default()
        };
        let mut gov = ParameterGovernor::new(owner(), &params);
        for (t, v) in [(0u64, 10u128), (1, 11), (2, 12)] {
            gov.set_parameter(&CallContext::new(owner(), t), Parameter::MinBet, v)
                .unwrap();
        }
        let values: Vec<u128> = gov.history().map(|c| c.new_value).collect();
        assert_eq!(values, vec![11, 12]);
    }
}
