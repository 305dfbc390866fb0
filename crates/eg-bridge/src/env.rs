//! Episode controller
//!
//! `EmeraldEnv` exposes the gym-style `reset` / `step` / `close` contract on
//! top of any `BridgeTransport`. Rewards come from game memory read after
//! every step, not from the bridge reply.

use eg_core::observation::{self, Observation};
use eg_core::{Action, ActionSpace, Buttons, RewardBreakdown, RewardState, Snapshot, read_snapshot};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::EnvConfig;
use crate::error::{BridgeError, Result};
use crate::host::EmulatorHost;
use crate::protocol::{Command, Response};
use crate::transport::{BridgeTransport, ConnectionState, InProcessTransport, LineTransport, TransportBus};

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
    /// Created, never reset
    Idle,
    /// Between steps
    Ready,
    /// A step is in flight
    Stepping,
    Closed,
}

/// Per-call info record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepInfo {
    /// Steps taken in this episode
    pub frame: u64,
    /// Reward accumulated over this episode
    pub episode_reward: f64,
    /// Mask sent with the step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Buttons>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_terms: Option<RewardBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    /// Reward reported by the bridge, not used for learning
    pub bridge_reward: f64,
    /// Episode end reported by the bridge, not used for termination
    pub bridge_done: bool,
    /// Bridge info map, passed through untouched
    pub bridge_info: Map<String, Value>,
}

impl StepInfo {
    fn from_response(response: Response) -> Self {
        Self {
            bridge_reward: response.reward,
            bridge_done: response.done,
            bridge_info: response.info,
            ..Self::default()
        }
    }
}

/// Result of one step
#[derive(Debug, Clone)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    /// Always false: episode length is up to the caller
    pub terminated: bool,
    /// Always false: episode length is up to the caller
    pub truncated: bool,
    pub info: StepInfo,
}

/// Gym-style environment over a bridge transport
pub struct EmeraldEnv<T: BridgeTransport> {
    transport: T,
    action_space: ActionSpace,
    state: EnvState,
    rewards: RewardState,
    frame: u64,
    last_observation: Observation,
    last_snapshot: Option<Snapshot>,
}

impl EmeraldEnv<LineTransport> {
    /// Environment talking to the bridge process described by `config`.
    /// Nothing is opened until the first `reset`.
    pub fn from_config(config: &EnvConfig) -> Self {
        let transport = LineTransport::with_timeout(config.bridge_addr(), config.connect_timeout());
        Self::new(transport, config.action_space)
    }
}

impl<H: EmulatorHost> EmeraldEnv<InProcessTransport<H>> {
    /// Environment running `host` in this process
    pub fn in_process(host: H, rom_path: impl Into<String>, action_space: ActionSpace) -> Self {
        Self::new(InProcessTransport::new(host, rom_path), action_space)
    }
}

impl<T: BridgeTransport> EmeraldEnv<T> {
    pub fn new(transport: T, action_space: ActionSpace) -> Self {
        Self {
            transport,
            action_space,
            state: EnvState::Idle,
            rewards: RewardState::new(),
            frame: 0,
            last_observation: observation::blank(),
            last_snapshot: None,
        }
    }

    /// Start a new episode
    pub fn reset(&mut self) -> Result<(Observation, StepInfo)> {
        self.check_open()?;

        let response = self.exchange(&Command::Reset)?;
        let observation = response.observation();

        self.rewards.reset();
        self.frame = 0;
        self.last_snapshot = None;
        self.last_observation = observation.clone();
        self.state = EnvState::Ready;
        tracing::info!("episode reset");

        let info = StepInfo {
            frame: self.frame,
            episode_reward: self.rewards.cumulative(),
            ..StepInfo::from_response(response)
        };
        Ok((observation, info))
    }

    /// Apply `action` for one frame
    pub fn step(&mut self, action: Action) -> Result<StepResult> {
        match self.state {
            EnvState::Closed => return Err(BridgeError::Closed),
            EnvState::Idle => return Err(BridgeError::NotReset),
            EnvState::Ready | EnvState::Stepping => {}
        }
        let buttons = action.buttons_in(self.action_space)?;

        self.state = EnvState::Stepping;
        let result = self.run_step(buttons);
        if self.state == EnvState::Stepping {
            self.state = EnvState::Ready;
        }
        result
    }

    fn run_step(&mut self, buttons: Buttons) -> Result<StepResult> {
        let response = self.exchange(&Command::step(buttons))?;
        let observation = response.observation();

        let read = read_snapshot(&mut TransportBus(&mut self.transport), self.frame + 1);
        let snapshot = read.inspect_err(|err| self.note_failure(err))?;
        let terms = self.rewards.update(snapshot);
        let reward = terms.total();
        self.frame += 1;

        tracing::debug!(
            frame = self.frame,
            reward,
            badges = terms.badges,
            money = terms.money,
            hp = terms.hp,
            exploration = terms.exploration,
            "step"
        );

        self.last_observation = observation.clone();
        self.last_snapshot = Some(snapshot);

        let info = StepInfo {
            frame: self.frame,
            episode_reward: self.rewards.cumulative(),
            buttons: Some(buttons),
            reward_terms: Some(terms),
            snapshot: Some(snapshot),
            ..StepInfo::from_response(response)
        };

        Ok(StepResult {
            observation,
            reward,
            terminated: false,
            truncated: false,
            info,
        })
    }

    /// Release the connection. Safe to call at any time, any number of times.
    pub fn close(&mut self) {
        if self.state != EnvState::Closed {
            self.transport.close();
            self.state = EnvState::Closed;
        }
    }

    /// Last observation returned by `reset` or `step`
    pub fn render(&self) -> &Observation {
        &self.last_observation
    }

    pub fn read_memory(&mut self, addr: u32) -> Result<u8> {
        self.check_open()?;
        self.transport
            .read_byte(addr)
            .inspect_err(|err| self.note_failure(err))
    }

    pub fn write_memory(&mut self, addr: u32, value: u8) -> Result<()> {
        self.check_open()?;
        self.transport
            .write_byte(addr, value)
            .inspect_err(|err| self.note_failure(err))
    }

    /// Snapshot taken by the last step
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn episode_reward(&self) -> f64 {
        self.rewards.cumulative()
    }

    pub fn action_space(&self) -> ActionSpace {
        self.action_space
    }

    pub fn state(&self) -> EnvState {
        self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn check_open(&self) -> Result<()> {
        if self.state == EnvState::Closed {
            return Err(BridgeError::Closed);
        }
        Ok(())
    }

    fn exchange(&mut self, command: &Command) -> Result<Response> {
        self.transport
            .send(command)
            .inspect_err(|err| self.note_failure(err))
    }

    // A connection lost mid-call closes the environment for good
    fn note_failure(&mut self, err: &BridgeError) {
        if self.transport.state() == ConnectionState::Closed {
            tracing::warn!("bridge connection lost: {err}");
            self.state = EnvState::Closed;
        }
    }
}

impl<T: BridgeTransport> Drop for EmeraldEnv<T> {
    fn drop(&mut self) {
        self.close();
    }
}
