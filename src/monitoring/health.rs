//! Protocol health checks.
//!
//! Derives a [`HealthReport`] from a deployment's current state: pool solvency,
//! outstanding randomness requests and free liquidity.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::warn;

use crate::core::token::{TokenAmount, TokenLedger};
use crate::protocol::state_machine::Protocol;
use crate::utils::constants::BPS_DIVISOR;
use crate::utils::crypto::RequestId;
use crate::utils::math::mul_div;

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH STATUS
// ═══════════════════════════════════════════════════════════════════════════════

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Operating normally
    Healthy,
    /// Needs attention, still safe
    Degraded,
    /// Accounting broken
    Critical,
}

impl HealthStatus {
    /// Get display string
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Degraded => "DEGRADED",
            HealthStatus::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Areas a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthComponent {
    /// Pool accounting against the ledger
    Solvency,
    /// Outstanding randomness requests
    Randomness,
    /// Capital available to back new bets
    Liquidity,
}

impl HealthComponent {
    /// Get description
    pub fn description(&self) -> &'static str {
        match self {
            HealthComponent::Solvency => "Pool balance, escrow and reservation accounting",
            HealthComponent::Randomness => "Requests awaiting the oracle",
            HealthComponent::Liquidity => "Free liquidity relative to pool balance",
        }
    }
}

/// Result for a single component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component
    pub component: HealthComponent,
    /// Status
    pub status: HealthStatus,
    /// Human-readable finding
    pub detail: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH REPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Worst component status
    pub status: HealthStatus,
    /// Component results
    pub components: Vec<ComponentCheck>,
    /// Requests still pending
    pub pending_requests: u64,
    /// Pending requests older than the round timeout
    pub stalled_requests: Vec<RequestId>,
    /// Whether the solvency check passed
    pub solvent: bool,
    /// Timestamp when computed
    pub timestamp: u64,
}

impl HealthReport {
    /// Whether new bets can safely be taken
    pub fn is_operational(&self) -> bool {
        self.status != HealthStatus::Critical
    }

    /// Components that are not healthy
    pub fn degraded_components(&self) -> Vec<&ComponentCheck> {
        self.components
            .iter()
            .filter(|c| c.status != HealthStatus::Healthy)
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH CHECKER
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration for health checker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckerConfig {
    /// Pending requests tolerated before degradation
    pub max_pending_requests: u64,
    /// Free liquidity below this share of the balance (bps) degrades
    pub min_free_liquidity_bps: u128,
    /// Reports kept in history
    pub max_history: usize,
}

impl Default for HealthCheckerConfig {
    fn default() -> Self {
        Self {
            max_pending_requests: 100,
            min_free_liquidity_bps: 5_000, // 50%
            max_history: 1_000,
        }
    }
}

/// Computes protocol health
#[derive(Debug)]
pub struct HealthChecker {
    config: HealthCheckerConfig,
    history: VecDeque<(u64, HealthStatus)>,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new(HealthCheckerConfig::default())
    }
}

impl HealthChecker {
    /// Create new health checker
    pub fn new(config: HealthCheckerConfig) -> Self {
        Self {
            config,
            history: VecDeque::new(),
        }
    }

    /// Check `protocol` at time `now`
    pub fn check<L: TokenLedger>(&mut self, protocol: &Protocol<L>, now: u64) -> HealthReport {
        let solvency = protocol.verify_solvency();
        let solvent = solvency.is_ok();
        let solvency_check = ComponentCheck {
            component: HealthComponent::Solvency,
            status: if solvent { HealthStatus::Healthy } else { HealthStatus::Critical },
            detail: match solvency {
                Ok(()) => "accounting consistent".to_string(),
                Err(e) => e.to_string(),
            },
        };

        let timeout = protocol.round_timeout();
        let pending = protocol.consumer().pending_requests();
        let stalled_requests: Vec<RequestId> = pending
            .iter()
            .filter(|r| r.age(now) >= timeout)
            .map(|r| r.id)
            .collect();
        let pending_count = pending.len() as u64;
        let randomness_check = if !stalled_requests.is_empty() {
            ComponentCheck {
                component: HealthComponent::Randomness,
                status: HealthStatus::Degraded,
                detail: format!(
                    "{} request(s) unfulfilled for at least {}s",
                    stalled_requests.len(),
                    timeout
                ),
            }
        } else if pending_count > self.config.max_pending_requests {
            ComponentCheck {
                component: HealthComponent::Randomness,
                status: HealthStatus::Degraded,
                detail: format!("{} requests pending", pending_count),
            }
        } else {
            ComponentCheck {
                component: HealthComponent::Randomness,
                status: HealthStatus::Healthy,
                detail: format!("{} requests pending", pending_count),
            }
        };

        let liquidity_check = self.check_liquidity(protocol.pool().balance(), protocol.pool().free_liquidity());

        let components = vec![solvency_check, randomness_check, liquidity_check];
        let status = components
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        if status != HealthStatus::Healthy {
            warn!(%status, stalled = stalled_requests.len(), solvent, "Protocol health degraded");
        }

        self.history.push_back((now, status));
        while self.history.len() > self.config.max_history {
            self.history.pop_front();
        }

        HealthReport {
            status,
            components,
            pending_requests: pending_count,
            stalled_requests,
            solvent,
            timestamp: now,
        }
    }

    fn check_liquidity(&self, balance: TokenAmount, free: TokenAmount) -> ComponentCheck {
        if balance.is_zero() {
            return ComponentCheck {
                component: HealthComponent::Liquidity,
                status: HealthStatus::Degraded,
                detail: "pool holds no capital".to_string(),
            };
        }
        let free_bps = mul_div(free.base(), BPS_DIVISOR, balance.base()).unwrap_or(0);
        let status = if free_bps < self.config.min_free_liquidity_bps {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        ComponentCheck {
            component: HealthComponent::Liquidity,
            status,
            detail: format!("{} free ({} bps of balance)", free.to_string_formatted(), free_bps),
        }
    }

    /// Statuses of past checks, oldest first
    pub fn history(&self) -> impl Iterator<Item = &(u64, HealthStatus)> {
        self.history.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProtocolConfig;
    use crate::core::context::CallContext;
    use crate::oracle::sources::ManualOracle;
    use crate::utils::crypto::Address;

    const DAY: u64 = 86_400;

    fn admin() -> Address {
        Address::derive("admin")
    }

    fn deployed() -> Protocol {
        let mut protocol = Protocol::new(ProtocolConfig::default(), admin(), Address::derive("oracle")).unwrap();
        let ctx = CallContext::new(admin(), 0);
        let pool = protocol.pool().address();
        let dice = protocol.dice_address();
        protocol.transfer(&ctx, pool, TokenAmount::from_tokens(100_000)).unwrap();
        protocol.register_game_for_approval(&ctx, dice).unwrap();
        protocol
            .set_game_approval(&CallContext::new(admin(), DAY), dice, true)
            .unwrap();
        protocol
    }

    #[test]
    fn test_empty_pool_is_degraded() {
        let protocol = Protocol::new(ProtocolConfig::default(), admin(), Address::derive("oracle")).unwrap();
        let report = HealthChecker::default().check(&protocol, 0);
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(report.solvent);
        assert!(report.is_operational());
    }

    #[test]
    fn test_funded_pool_is_healthy() {
        let protocol = deployed();
        let report = HealthChecker::default().check(&protocol, DAY);
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.degraded_components().is_empty());
    }

    #[test]
    fn test_stalled_request_reported() {
        let mut protocol = deployed();
        let player = Address::derive("alice");
        let dice = protocol.dice_address();
        let amount = TokenAmount::from_tokens(100);
        protocol
            .transfer(&CallContext::new(admin(), DAY), player, amount)
            .unwrap();
        let ctx = CallContext::new(player, DAY);
        protocol.approve(&ctx, dice, amount).unwrap();
        protocol.bet(&ctx, dice, 40, amount).unwrap();
        let mut oracle = ManualOracle::new(Address::derive("oracle"));
        let id = protocol.play(&mut oracle, &ctx, dice).unwrap();

        let mut checker = HealthChecker::default();
        let fresh = checker.check(&protocol, DAY + 1);
        assert_eq!(fresh.pending_requests, 1);
        assert!(fresh.stalled_requests.is_empty());

        let late = checker.check(&protocol, DAY + protocol.round_timeout());
        assert_eq!(late.stalled_requests, vec![id]);
        assert_eq!(late.status, HealthStatus::Degraded);
        assert_eq!(checker.history().count(), 2);
    }
}
