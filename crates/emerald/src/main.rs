//! emerald: drive Pokemon Emerald rollouts from the command line
//!
//! ```text
//! emerald rollout --port 9999 --episodes 3 --steps 500 --seed 7
//! emerald rollout --stub --action-space multi-binary --json
//! ```

mod rollout;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use eg_bridge::stub::StubEmulator;
use eg_bridge::{BridgeTransport, EmeraldEnv, EnvConfig};
use eg_core::ActionSpace;

use crate::rollout::{EpisodeSummary, RolloutConfig, run_rollout};

#[derive(Parser, Debug)]
#[command(name = "emerald", version, about = "Pokemon Emerald RL bridge tools")]
struct Cli {
    /// Log every step at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play episodes with a seeded random policy
    Rollout(RolloutArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SpaceArg {
    Discrete,
    MultiBinary,
}

impl From<SpaceArg> for ActionSpace {
    fn from(arg: SpaceArg) -> Self {
        match arg {
            SpaceArg::Discrete => ActionSpace::Discrete,
            SpaceArg::MultiBinary => ActionSpace::MultiBinary,
        }
    }
}

#[derive(clap::Args, Debug)]
struct RolloutArgs {
    /// JSON environment config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bridge host, overrides the config
    #[arg(long)]
    host: Option<String>,

    /// Bridge port, overrides the config
    #[arg(long)]
    port: Option<u16>,

    #[arg(long, default_value_t = 1)]
    episodes: u32,

    /// Steps per episode
    #[arg(long, default_value_t = 1000)]
    steps: u64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, value_enum)]
    action_space: Option<SpaceArg>,

    /// Log progress every N steps (0 disables)
    #[arg(long, default_value_t = 100)]
    report_interval: u64,

    /// Run against the in-process stub emulator instead of a bridge
    #[arg(long)]
    stub: bool,

    /// Print summaries as JSON lines
    #[arg(long)]
    json: bool,
}

impl RolloutArgs {
    fn env_config(&self) -> Result<EnvConfig> {
        let mut config = match &self.config {
            Some(path) => EnvConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => EnvConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(space) = self.action_space {
            config.action_space = space.into();
        }
        Ok(config)
    }

    fn rollout_config(&self, verbose: bool) -> RolloutConfig {
        RolloutConfig {
            episodes: self.episodes,
            steps_per_episode: self.steps,
            seed: self.seed,
            report_interval: self.report_interval,
            verbose,
        }
    }
}

fn print_summaries(summaries: &[EpisodeSummary], json: bool) -> Result<()> {
    for summary in summaries {
        if json {
            println!("{}", serde_json::to_string(summary)?);
        } else {
            println!("{}", summary.summary());
        }
    }
    if !json && !summaries.is_empty() {
        let mean = summaries.iter().map(|s| s.total_reward).sum::<f64>() / summaries.len() as f64;
        println!("Mean reward over {} episodes: {:.2}", summaries.len(), mean);
    }
    Ok(())
}

fn rollout<T: BridgeTransport>(
    mut env: EmeraldEnv<T>,
    config: &RolloutConfig,
) -> Result<Vec<EpisodeSummary>> {
    let summaries = run_rollout(&mut env, config);
    env.close();
    Ok(summaries?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Rollout(args) => {
            let env_config = args.env_config()?;
            let config = args.rollout_config(cli.verbose);

            let summaries = if args.stub {
                let rom = env_config.rom_path.clone().unwrap_or_default();
                let env = EmeraldEnv::in_process(StubEmulator::new(), rom, env_config.action_space);
                rollout(env, &config)?
            } else {
                tracing::info!(addr = %env_config.bridge_addr(), "connecting to bridge");
                let env = EmeraldEnv::from_config(&env_config);
                rollout(env, &config)
                    .with_context(|| format!("Rollout against {} failed", env_config.bridge_addr()))?
            };

            print_summaries(&summaries, args.json)?;
        }
    }

    Ok(())
}
