//! CLI Commands.
//!
//! Library side of every `gembites` subcommand. The binary parses arguments,
//! builds one of these and renders the [`CommandOutput`].

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use super::{CliApp, CliError, CliResult, CommandOutput, Executable};
use crate::core::config::ProtocolConfig;
use crate::core::context::CallContext;
use crate::core::token::{Token, TokenAmount};
use crate::error::{Error, Result};
use crate::governance::parameters::{Parameter, ParameterStore};
use crate::monitoring::health::{HealthChecker, HealthStatus};
use crate::oracle::sources::{verify_fulfillment, RandomnessOracle, SigningOracle};
use crate::protocol::state_machine::Protocol;
use crate::utils::crypto::{Address, KeyPair, PrivateKey};

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND ENUM
// ═══════════════════════════════════════════════════════════════════════════════

/// All available commands
#[derive(Debug, Clone)]
pub enum Command {
    /// Create the data directory and default configuration
    Init(InitCommand),
    /// Show governed parameters
    Params(ParamsCommand),
    /// Key management
    Keys(KeysCommand),
    /// Health of a saved snapshot
    Health(HealthCommand),
}

// ═══════════════════════════════════════════════════════════════════════════════
// INIT COMMAND
// ═══════════════════════════════════════════════════════════════════════════════

/// Initialize the data directory
#[derive(Debug, Clone)]
pub struct InitCommand {
    /// Overwrite an existing configuration
    pub force: bool,
}

impl Executable for InitCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let config = app.config();
        config.validate()?;

        let cli_path = config.config_path();
        if cli_path.exists() && !self.force {
            return Err(CliError::InvalidArgument(format!(
                "already initialized at {}, use --force to overwrite",
                config.data_dir.display()
            )));
        }

        config.save(&cli_path)?;
        let protocol_path = config.protocol_config_path();
        ProtocolConfig::default().save(&protocol_path)?;

        let keypair = KeyPair::generate();
        let key_file = KeyFile::new(&keypair);
        key_file.save(&config.key_path())?;

        info!(data_dir = %config.data_dir.display(), "Configuration initialized");
        Ok(CommandOutput::success_with_data(
            "Configuration initialized",
            serde_json::json!({
                "data_dir": config.data_dir.display().to_string(),
                "protocol_config": protocol_path.display().to_string(),
                "admin_address": key_file.address,
            }),
        ))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMS COMMAND
// ═══════════════════════════════════════════════════════════════════════════════

/// Show governed parameters and deployment settings
#[derive(Debug, Clone, Default)]
pub struct ParamsCommand;

/// One row of the parameter listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRow {
    /// Parameter name
    pub name: String,
    /// Current value, human-readable
    pub value: String,
    /// Lower bound, human-readable
    pub min: String,
    /// Upper bound, human-readable
    pub max: String,
    /// Description
    pub description: String,
}

impl ParamsCommand {
    /// Rows for the configured parameters
    pub fn rows(config: &ProtocolConfig) -> Vec<ParameterRow> {
        let store = ParameterStore::from_config(&config.governance);
        Parameter::ALL
            .iter()
            .map(|p| {
                let (min, max) = p.bounds();
                ParameterRow {
                    name: p.name().to_string(),
                    value: display_parameter(*p, store.get(*p)),
                    min: display_parameter(*p, min),
                    max: display_parameter(*p, max),
                    description: p.description().to_string(),
                }
            })
            .collect()
    }
}

impl Executable for ParamsCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let config = app.config().load_protocol_config()?;
        let rows = Self::rows(&config);
        Ok(CommandOutput::success_with_data(
            "Parameters loaded",
            serde_json::json!({
                "parameters": rows,
                "parameter_cooldown_secs": config.governance.parameter_cooldown_secs,
                "game_approval_cooldown_secs": config.pool.game_approval_cooldown_secs,
                "exposure_cap_bps": config.pool.exposure_cap_bps.to_string(),
            }),
        ))
    }
}

fn display_parameter(parameter: Parameter, value: u128) -> String {
    match parameter {
        Parameter::MinBet => TokenAmount::from_base(value).to_string_formatted(),
        Parameter::RoundTimeout => {
            if value % 3_600 == 0 {
                format!("{}s ({}h)", value, value / 3_600)
            } else {
                format!("{}s", value)
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEYS COMMAND
// ═══════════════════════════════════════════════════════════════════════════════

/// Key command variants
#[derive(Debug, Clone)]
pub enum KeysCommand {
    /// Generate a new key pair
    Generate {
        /// Write it to the data directory
        save: bool,
        /// Overwrite an existing key file
        force: bool,
    },
    /// Show the saved key's identity
    Show,
}

/// Key file stored in the data directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFile {
    /// Private key (hex)
    pub private_key: String,
    /// Compressed public key (hex)
    pub public_key: String,
    /// Derived address (hex)
    pub address: String,
    /// Creation time (RFC 3339)
    pub created_at: String,
}

impl KeyFile {
    /// Describe `keypair`
    pub fn new(keypair: &KeyPair) -> Self {
        Self {
            private_key: keypair.private_key().to_hex(),
            public_key: keypair.public_key().to_hex(),
            address: keypair.address().to_hex(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Key pair described by this file
    pub fn keypair(&self) -> Result<KeyPair> {
        let keypair = KeyPair::from_private(PrivateKey::from_hex(&self.private_key)?);
        if keypair.address().to_hex() != self.address {
            return Err(Error::CryptoError {
                operation: "load_key".into(),
                details: "address does not match private key".into(),
            });
        }
        Ok(keypair)
    }

    /// Read from `path`
    pub fn load(path: &std::path::Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| CliError::NotFound(format!("no key file at {}", path.display())))?;
        serde_json::from_str(&content).map_err(|e| CliError::Config(e.to_string()))
    }

    /// Write to `path`
    pub fn save(&self, path: &std::path::Path) -> CliResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| CliError::Execution(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Executable for KeysCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        match self {
            KeysCommand::Generate { save, force } => {
                let keypair = KeyPair::generate();
                let key_file = KeyFile::new(&keypair);
                let data = serde_json::json!({
                    "address": key_file.address,
                    "public_key": key_file.public_key,
                });

                if *save {
                    let path = app.config().key_path();
                    if path.exists() && !force {
                        return Err(CliError::InvalidArgument(format!(
                            "key file {} exists, use --force to overwrite",
                            path.display()
                        )));
                    }
                    key_file.save(&path)?;
                    return Ok(CommandOutput::success_with_data(
                        format!("Key saved to {}", path.display()),
                        data,
                    ));
                }
                Ok(CommandOutput::success_with_data("Key generated (not saved)", data)
                    .with_warning("Pass --save to keep this key"))
            }
            KeysCommand::Show => {
                let key_file = KeyFile::load(&app.config().key_path())?;
                let keypair = key_file.keypair()?;
                Ok(CommandOutput::success_with_data(
                    "Key loaded",
                    serde_json::json!({
                        "address": keypair.address().to_hex(),
                        "public_key": keypair.public_key().to_hex(),
                        "created_at": key_file.created_at,
                    }),
                ))
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH COMMAND
// ═══════════════════════════════════════════════════════════════════════════════

/// Check the health of a saved snapshot
#[derive(Debug, Clone)]
pub struct HealthCommand {
    /// Snapshot written by `simulate --snapshot`
    pub snapshot: PathBuf,
    /// Evaluation time (defaults to now)
    pub at: Option<u64>,
}

impl Executable for HealthCommand {
    fn execute(&self, _app: &CliApp) -> CliResult<CommandOutput> {
        let bytes = std::fs::read(&self.snapshot)
            .map_err(|_| CliError::NotFound(format!("no snapshot at {}", self.snapshot.display())))?;
        let protocol = Protocol::<Token>::from_bytes(&bytes)?;

        let now = self
            .at
            .unwrap_or_else(|| u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0));
        let report = HealthChecker::default().check(&protocol, now);

        let data = serde_json::to_value(&report).map_err(|e| CliError::Execution(e.to_string()))?;
        let mut output = if report.is_operational() {
            CommandOutput::success_with_data(format!("Protocol is {}", report.status), data)
        } else {
            CommandOutput {
                data: Some(data),
                ..CommandOutput::error(format!("Protocol is {}", report.status))
            }
        };
        for component in report.degraded_components() {
            output = output.with_warning(format!("{:?}: {}", component.component, component.detail));
        }
        Ok(output)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIMULATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Inputs of a seeded simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// RNG and identity seed
    pub seed: u64,
    /// Number of players
    pub players: u32,
    /// Rounds each player attempts
    pub rounds: u32,
    /// Whole tokens donated to the house reserve
    pub pool_funding: u128,
    /// Whole tokens the admin stakes
    pub stake: u128,
    /// Whole tokens each player starts with
    pub player_balance: u128,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            seed: 42,
            players: 4,
            rounds: 25,
            pool_funding: 100_000,
            stake: 1_000,
            player_balance: 10_000,
        }
    }
}

/// Outcome of a simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Seed used
    pub seed: u64,
    /// Rounds run
    pub rounds: u32,
    /// Bets placed and settled
    pub bets_settled: u64,
    /// Bets skipped (balance, range or liquidity)
    pub bets_skipped: u64,
    /// Rounds won by players
    pub wins: u64,
    /// Rounds lost by players
    pub losses: u64,
    /// Total staked by players
    pub total_wagered: String,
    /// Total paid to players
    pub total_paid: String,
    /// Pool balance after setup
    pub pool_balance_start: String,
    /// Pool balance at the end
    pub pool_balance_end: String,
    /// Admin's staked claim at the end
    pub staker_claim_end: String,
    /// Events recorded
    pub events_recorded: usize,
    /// Digest over all events
    pub event_digest: String,
    /// Final state hash
    pub state_hash: String,
    /// Final health
    pub health: HealthStatus,
}

/// Seconds between simulated rounds
const ROUND_INTERVAL_SECS: u64 = 60;

/// Run a seeded end-to-end simulation with a signing oracle
///
/// `on_round` is called after every completed round with its 1-based index.
pub fn run_simulation(
    config: ProtocolConfig,
    params: &SimulationParams,
    mut on_round: impl FnMut(u32),
) -> Result<(Protocol, SimulationReport)> {
    let seed_bytes = params.seed.to_be_bytes();
    let admin = KeyPair::from_seed(&[b"admin".as_slice(), &seed_bytes].concat())?;
    let mut oracle = SigningOracle::new(KeyPair::from_seed(&[b"oracle".as_slice(), &seed_bytes].concat())?);
    let oracle_address = oracle.address();
    let admin_address = admin.address();
    let cooldown = config.pool.game_approval_cooldown_secs;
    let (min_number, max_number) = (config.dice.min_number, config.dice.max_number);

    let mut protocol = Protocol::new(config, admin_address, oracle_address)?;
    let dice = protocol.dice_address();
    let pool = protocol.pool().address();

    // Setup: fund, register, approve after the cooldown, stake
    let setup = CallContext::new(admin_address, 0);
    protocol.transfer(&setup, pool, TokenAmount::from_tokens(params.pool_funding))?;
    protocol.register_game_for_approval(&setup, dice)?;

    let mut now = cooldown;
    let admin_ctx = CallContext::new(admin_address, now);
    protocol.set_game_approval(&admin_ctx, dice, true)?;
    if params.stake > 0 {
        let stake = TokenAmount::from_tokens(params.stake);
        protocol.approve(&admin_ctx, pool, stake)?;
        protocol.stake(&admin_ctx, stake)?;
    }

    let players: Vec<Address> = (0..params.players)
        .map(|i| Address::derive(&format!("sim-player-{}-{}", params.seed, i)))
        .collect();
    for player in &players {
        protocol.transfer(&admin_ctx, *player, TokenAmount::from_tokens(params.player_balance))?;
    }
    let pool_balance_start = protocol.pool().balance();

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut report = SimulationReport {
        seed: params.seed,
        rounds: params.rounds,
        bets_settled: 0,
        bets_skipped: 0,
        wins: 0,
        losses: 0,
        total_wagered: String::new(),
        total_paid: String::new(),
        pool_balance_start: pool_balance_start.to_string_formatted(),
        pool_balance_end: String::new(),
        staker_claim_end: String::new(),
        events_recorded: 0,
        event_digest: String::new(),
        state_hash: String::new(),
        health: HealthStatus::Healthy,
    };
    let mut wagered = TokenAmount::ZERO;
    let mut paid = TokenAmount::ZERO;

    for round in 1..=params.rounds {
        now += ROUND_INTERVAL_SECS;

        for player in &players {
            let ctx = CallContext::new(*player, now);
            let min = protocol.min_bet();
            let max = protocol.pool().exposure_cap().min(protocol.balance_of(player));
            if max < min {
                report.bets_skipped += 1;
                continue;
            }
            let amount = TokenAmount::from_base(rng.gen_range(min.base()..=max.base()));
            let number = rng.gen_range(min_number..=max_number);

            protocol.approve(&ctx, dice, amount)?;
            match protocol.bet(&ctx, dice, number, amount) {
                Ok(()) => {}
                Err(Error::InsufficientLiquidity { .. }) | Err(Error::BetOutOfRange { .. }) => {
                    report.bets_skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
            protocol.play(&mut oracle, &ctx, dice)?;
            wagered = wagered.saturating_add(amount);
        }

        let oracle_ctx = CallContext::new(oracle_address, now + 1);
        for fulfillment in oracle.drain_fulfillments() {
            if !verify_fulfillment(oracle.public_key(), &fulfillment) {
                return Err(Error::CryptoError {
                    operation: "verify_fulfillment".into(),
                    details: format!("bad signature for {}", fulfillment.request_id),
                });
            }
            let resolution = protocol.on_fulfilled(&oracle_ctx, fulfillment.request_id, fulfillment.value)?;
            report.bets_settled += 1;
            if resolution.outcome.won {
                report.wins += 1;
                paid = paid.saturating_add(resolution.outcome.payout);
            } else {
                report.losses += 1;
            }
        }

        debug!(round, settled = report.bets_settled, "Simulation round complete");
        on_round(round);
    }

    protocol.verify_solvency()?;
    let health = HealthChecker::default().check(&protocol, now + 1);
    let events = protocol.take_events();

    report.total_wagered = wagered.to_string_formatted();
    report.total_paid = paid.to_string_formatted();
    report.pool_balance_end = protocol.pool().balance().to_string_formatted();
    report.staker_claim_end = protocol.pool().claim_of(&admin_address)?.to_string_formatted();
    report.events_recorded = events.len();
    report.event_digest = events.digest().to_hex();
    report.state_hash = protocol.state_hash().to_hex();
    report.health = health.status;

    info!(
        seed = params.seed,
        settled = report.bets_settled,
        wins = report.wins,
        losses = report.losses,
        "Simulation finished"
    );
    Ok((protocol, report))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
