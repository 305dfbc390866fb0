//! Random-policy rollouts
//!
//! Drives an `EmeraldEnv` for a number of fixed-length episodes with a
//! seeded uniform policy and collects one summary per episode.

use eg_bridge::{BridgeTransport, EmeraldEnv, Result};
use eg_core::buttons::NUM_BUTTONS;
use eg_core::{Action, ActionSpace};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Rollout settings
#[derive(Debug, Clone)]
pub struct RolloutConfig {
    pub episodes: u32,
    pub steps_per_episode: u64,
    pub seed: u64,
    /// Log progress every this many steps, 0 disables
    pub report_interval: u64,
    pub verbose: bool,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            episodes: 1,
            steps_per_episode: 1000,
            seed: 42,
            report_interval: 100,
            verbose: false,
        }
    }
}

/// Uniform random policy over an action space
pub struct RandomPolicy {
    space: ActionSpace,
    rng: ChaCha8Rng,
}

impl RandomPolicy {
    pub fn new(space: ActionSpace, seed: u64) -> Self {
        Self {
            space,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn sample(&mut self) -> Action {
        match self.space {
            ActionSpace::Discrete => Action::Discrete(self.rng.gen_range(0..self.space.n() as i64)),
            ActionSpace::MultiBinary => {
                let mut bits = [0u8; NUM_BUTTONS];
                for bit in bits.iter_mut() {
                    *bit = self.rng.gen_range(0..=1);
                }
                Action::MultiBinary(bits)
            }
        }
    }
}

/// Outcome of one episode
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub episode: u32,
    pub steps: u64,
    pub total_reward: f64,
    pub badges: u32,
    pub money: u32,
    pub map_id: u8,
}

impl EpisodeSummary {
    pub fn summary(&self) -> String {
        format!(
            "Episode {}: {} steps, reward={:.2}, badges={}, money={}, map={}",
            self.episode, self.steps, self.total_reward, self.badges, self.money, self.map_id
        )
    }
}

/// Run one episode: reset, then `steps` random actions
pub fn run_episode<T: BridgeTransport>(
    env: &mut EmeraldEnv<T>,
    policy: &mut RandomPolicy,
    episode: u32,
    config: &RolloutConfig,
) -> Result<EpisodeSummary> {
    env.reset()?;
    let mut summary = EpisodeSummary {
        episode,
        ..EpisodeSummary::default()
    };

    for _ in 0..config.steps_per_episode {
        let step = env.step(policy.sample())?;
        summary.steps = step.info.frame;
        summary.total_reward = step.info.episode_reward;

        if config.report_interval > 0 && summary.steps % config.report_interval == 0 {
            tracing::info!(
                episode,
                step = summary.steps,
                reward = summary.total_reward,
                "progress"
            );
        }
        if config.verbose && step.reward.abs() > 1.0 {
            tracing::info!(episode, step = summary.steps, reward = step.reward, "large reward");
        }
    }

    if let Some(snapshot) = env.snapshot() {
        summary.badges = snapshot.badge_count();
        summary.money = snapshot.money;
        summary.map_id = snapshot.map_id;
    }
    Ok(summary)
}

/// Run every configured episode on `env`
pub fn run_rollout<T: BridgeTransport>(
    env: &mut EmeraldEnv<T>,
    config: &RolloutConfig,
) -> Result<Vec<EpisodeSummary>> {
    let mut policy = RandomPolicy::new(env.action_space(), config.seed);
    let mut summaries = Vec::with_capacity(config.episodes as usize);

    for episode in 1..=config.episodes {
        let summary = run_episode(env, &mut policy, episode, config)?;
        tracing::info!("{}", summary.summary());
        summaries.push(summary);
    }
    Ok(summaries)
}
