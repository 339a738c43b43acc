//! Gembites Protocol CLI
//!
//! Command-line interface for configuring, simulating and inspecting a
//! Gembites deployment.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};

use gembites::cli::{
    run_simulation, CliApp, CliConfig, Command, HealthCommand, InitCommand, KeysCommand, OutputFormat,
    ParamsCommand, SimulationParams,
};

/// Gembites Protocol CLI - wagering against a shared liquidity pool
#[derive(Parser)]
#[command(name = "gembites")]
#[command(author = "Gembites Team")]
#[command(version = gembites::VERSION)]
#[command(about = "Command-line interface for the Gembites protocol", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to data directory
    #[arg(short, long, env = "GEMBITES_DATA_DIR", default_value = "~/.gembites")]
    data_dir: PathBuf,

    /// Output format (text, json, json-pretty, table)
    #[arg(short, long, env = "GEMBITES_OUTPUT", default_value = "text")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and an admin key
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show governed parameters
    Params,

    /// Run a seeded simulation against a fresh deployment
    Simulate {
        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of players
        #[arg(long, default_value = "4")]
        players: u32,

        /// Rounds per player
        #[arg(long, default_value = "25")]
        rounds: u32,

        /// Whole tokens donated to the pool
        #[arg(long, default_value = "100000")]
        funding: u128,

        /// Write the final state to this file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Key management
    #[command(subcommand)]
    Keys(KeysCommands),

    /// Check the health of a saved snapshot
    Health {
        /// Snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Evaluation time in seconds (defaults to now)
        #[arg(long)]
        at: Option<u64>,
    },
}

#[derive(Subcommand)]
enum KeysCommands {
    /// Generate a new keypair
    Generate {
        /// Save to the data directory
        #[arg(short, long)]
        save: bool,

        /// Overwrite an existing key
        #[arg(short, long)]
        force: bool,
    },

    /// Show the saved key
    Show,
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let term = Term::stdout();
    if let Err(e) = run_command(&cli, &term) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    let mut config = CliConfig::from_env();
    config.data_dir = expand_path(&cli.data_dir)?;
    config.output_format = cli.output;
    if cli.no_color {
        config.color = false;
    }
    let app = CliApp::new(config).with_verbose(cli.verbose);

    let command = match &cli.command {
        Commands::Init { force } => Command::Init(InitCommand { force: *force }),
        Commands::Params => return cmd_params(&app),
        Commands::Simulate {
            seed,
            players,
            rounds,
            funding,
            snapshot,
        } => {
            let params = SimulationParams {
                seed: *seed,
                players: *players,
                rounds: *rounds,
                pool_funding: *funding,
                ..SimulationParams::default()
            };
            return cmd_simulate(&app, &params, snapshot.as_deref(), term);
        }
        Commands::Keys(KeysCommands::Generate { save, force }) => Command::Keys(KeysCommand::Generate {
            save: *save,
            force: *force,
        }),
        Commands::Keys(KeysCommands::Show) => Command::Keys(KeysCommand::Show),
        Commands::Health { snapshot, at } => Command::Health(HealthCommand {
            snapshot: expand_path(snapshot)?,
            at: *at,
        }),
    };

    let output = app.execute(&command)?;
    output.render(app.output());
    if !output.success {
        anyhow::bail!("{}", output.message);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_params(app: &CliApp) -> anyhow::Result<()> {
    let config = app.config().load_protocol_config()?;
    let formatter = app.output();

    if formatter.format().is_json() {
        let output = app.execute(&Command::Params(ParamsCommand))?;
        output.render(formatter);
        return Ok(());
    }

    formatter.section("Governed parameters");
    let rows: Vec<Vec<String>> = ParamsCommand::rows(&config)
        .into_iter()
        .map(|r| vec![r.name, r.value, r.min, r.max, r.description])
        .collect();
    formatter.table(&["name", "value", "min", "max", "description"], &rows);

    formatter.section("Deployment");
    formatter.kv(
        "parameter cooldown",
        &format!("{}s", config.governance.parameter_cooldown_secs),
    );
    formatter.kv(
        "game approval cooldown",
        &format!("{}s", config.pool.game_approval_cooldown_secs),
    );
    formatter.kv("exposure cap", &format!("{} bps", config.pool.exposure_cap_bps));
    Ok(())
}

fn cmd_simulate(
    app: &CliApp,
    params: &SimulationParams,
    snapshot: Option<&Path>,
    term: &Term,
) -> anyhow::Result<()> {
    let config = app.config().load_protocol_config()?;
    let json = app.output().format().is_json();

    if !json {
        let _ = term.write_line(&format!(
            "{} Simulating {} players over {} rounds (seed {})",
            style("→").cyan(),
            params.players,
            params.rounds,
            params.seed
        ));
    }

    let progress = if json {
        ProgressBar::hidden()
    } else {
        create_progress(u64::from(params.rounds))
    };
    let (protocol, report) = run_simulation(config, params, |_| progress.inc(1))?;
    progress.finish_and_clear();

    if let Some(path) = snapshot {
        let path = expand_path(path)?;
        std::fs::write(&path, protocol.to_bytes()?)?;
        if !json {
            let _ = term.write_line(&format!(
                "{} Snapshot written to {}",
                style("✓").green(),
                path.display()
            ));
        }
    }

    app.output().data(&report);
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn expand_path(path: &Path) -> anyhow::Result<PathBuf> {
    let path_str = path.to_string_lossy();
    if path_str.starts_with('~') {
        let home = std::env::var("HOME")?;
        Ok(PathBuf::from(path_str.replacen('~', &home, 1)))
    } else {
        Ok(path.to_path_buf())
    }
}

fn create_progress(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(progress_style) = ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos}/{len} rounds") {
        bar.set_style(progress_style);
    }
    bar
}
