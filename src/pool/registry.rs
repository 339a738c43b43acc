//! Game authorization registry.
//!
//! A game may draw on pool liquidity only once approved, and approval is only
//! possible after a waiting period that starts when the game registers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::utils::crypto::Address;

/// Authorization state of a game module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    /// Never registered
    Unregistered,
    /// Registered and waiting for the cooldown to pass
    PendingApproval {
        /// Registration time
        registered_at: u64,
    },
    /// Authorized to escrow and settle bets
    Approved {
        /// Approval time
        approved_at: u64,
    },
    /// Deauthorized
    Revoked {
        /// Revocation time
        revoked_at: u64,
    },
}

impl GameStatus {
    /// Short status name
    pub fn name(&self) -> &'static str {
        match self {
            GameStatus::Unregistered => "unregistered",
            GameStatus::PendingApproval { .. } => "pending_approval",
            GameStatus::Approved { .. } => "approved",
            GameStatus::Revoked { .. } => "revoked",
        }
    }

    /// Whether the game may move pool funds
    pub fn is_approved(&self) -> bool {
        matches!(self, GameStatus::Approved { .. })
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of an approval call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalChange {
    /// Status changed to the contained value
    Changed(GameStatus),
    /// Game was already in the requested state
    Unchanged,
}

/// Registry of game statuses with the approval cooldown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRegistry {
    cooldown_secs: u64,
    games: HashMap<Address, GameStatus>,
}

impl GameRegistry {
    /// Create a registry with the given approval cooldown
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown_secs,
            games: HashMap::new(),
        }
    }

    /// Approval cooldown in seconds
    pub fn cooldown_secs(&self) -> u64 {
        self.cooldown_secs
    }

    /// Current status of `game`
    pub fn status(&self, game: &Address) -> GameStatus {
        self.games.get(game).copied().unwrap_or(GameStatus::Unregistered)
    }

    /// Whether `game` is approved
    pub fn is_approved(&self, game: &Address) -> bool {
        self.status(game).is_approved()
    }

    /// Addresses of all approved games
    pub fn approved_games(&self) -> Vec<Address> {
        let mut games: Vec<Address> = self
            .games
            .iter()
            .filter(|(_, s)| s.is_approved())
            .map(|(a, _)| *a)
            .collect();
        games.sort();
        games
    }

    /// Unregistered -> PendingApproval
    pub fn register(&mut self, game: Address, now: u64) -> Result<GameStatus> {
        match self.status(&game) {
            GameStatus::Unregistered => {
                let status = GameStatus::PendingApproval { registered_at: now };
                self.games.insert(game, status);
                Ok(status)
            }
            _ => Err(Error::AlreadyRegistered(game.to_hex())),
        }
    }

    /// Apply an approval decision
    pub fn set_approval(&mut self, game: Address, approved: bool, now: u64) -> Result<ApprovalChange> {
        let current = self.status(&game);
        let next = match (current, approved) {
            (GameStatus::Unregistered, _) => {
                return Err(Error::GameNotRegistered(game.to_hex()));
            }
            (GameStatus::PendingApproval { registered_at }, true) => {
                let ready_at = registered_at.saturating_add(self.cooldown_secs);
                if now < ready_at {
                    return Err(Error::CooldownNotElapsed {
                        remaining: ready_at - now,
                    });
                }
                GameStatus::Approved { approved_at: now }
            }
            (GameStatus::Approved { .. }, true) | (GameStatus::Revoked { .. }, false) => {
                return Ok(ApprovalChange::Unchanged);
            }
            (GameStatus::Revoked { .. }, true) => {
                return Err(Error::InvalidGameTransition {
                    game: game.to_hex(),
                    from: current.name().into(),
                    to: "approved".into(),
                });
            }
            (GameStatus::PendingApproval { .. }, false) | (GameStatus::Approved { .. }, false) => {
                GameStatus::Revoked { revoked_at: now }
            }
        };
        self.games.insert(game, next);
        Ok(ApprovalChange::Changed(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    fn game() -> Address {
        Address::derive("dice")
    }

    #[test]
    fn test_register_once() {
        let mut registry = GameRegistry::new(DAY);
        registry.register(game(), 10).unwrap();
        assert_eq!(registry.status(&game()), GameStatus::PendingApproval { registered_at: 10 });
        assert!(matches!(registry.register(game(), 11), Err(Error::AlreadyRegistered(_))));
    }

    #[test]
    fn test_approval_cooldown_boundary() {
        let mut registry = GameRegistry::new(DAY);
        registry.register(game(), 1_000).unwrap();

        let err = registry.set_approval(game(), true, 1_000 + DAY - 1).unwrap_err();
        assert_eq!(err, Error::CooldownNotElapsed { remaining: 1 });

        let change = registry.set_approval(game(), true, 1_000 + DAY).unwrap();
        assert_eq!(change, ApprovalChange::Changed(GameStatus::Approved { approved_at: 1_000 + DAY }));
        assert!(registry.is_approved(&game()));
    }

    #[test]
    fn test_reapprove_is_noop() {
        let mut registry = GameRegistry::new(0);
        registry.register(game(), 0).unwrap();
        registry.set_approval(game(), true, 0).unwrap();
        assert_eq!(registry.set_approval(game(), true, 5).unwrap(), ApprovalChange::Unchanged);
        assert_eq!(registry.status(&game()), GameStatus::Approved { approved_at: 0 });
    }

    #[test]
    fn test_revoke_without_cooldown() {
        let mut registry = GameRegistry::new(DAY);
        registry.register(game(), 0).unwrap();
        registry.set_approval(game(), false, 1).unwrap();
        assert_eq!(registry.status(&game()), GameStatus::Revoked { revoked_at: 1 });
        assert_eq!(registry.set_approval(game(), false, 2).unwrap(), ApprovalChange::Unchanged);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut registry = GameRegistry::new(0);
        assert!(matches!(
            registry.set_approval(game(), true, 0),
            Err(Error::GameNotRegistered(_))
        ));

        registry.register(game(), 0).unwrap();
        registry.set_approval(game(), false, 0).unwrap();
        assert!(matches!(
            registry.set_approval(game(), true, 10),
            Err(Error::InvalidGameTransition { .. })
        ));
        assert!(matches!(registry.register(game(), 10), Err(Error::AlreadyRegistered(_))));
    }

    #[test]
    fn test_approved_games_listing() {
        let mut registry = GameRegistry::new(0);
        let other = Address::derive("coinflip");
        registry.register(game(), 0).unwrap();
        registry.register(other, 0).unwrap();
        registry.set_approval(game(), true, 0).unwrap();

        assert_eq!(registry.approved_games(), vec![game()]);
    }
}
