//! Core of the Pokemon Emerald gym bridge
//!
//! Everything in this crate is transport-agnostic:
//!
//! - `buttons`: action codec (multi-binary / discrete actions to GBA key masks)
//! - `observation`: screen payload decoding into a fixed `160x240x3` grid
//! - `memory`: fixed-address game state extraction into a `Snapshot`
//! - `reward`: reward shaping between two consecutive snapshots

pub mod buttons;
pub mod memory;
pub mod observation;
pub mod reward;

pub use buttons::{Action, ActionError, ActionSpace, Button, Buttons};
pub use memory::{MemoryBus, Snapshot, read_snapshot};
pub use observation::{OBS_HEIGHT, OBS_LEN, OBS_SHAPE, OBS_WIDTH, Observation, ObservationError, ObsPayload};
pub use reward::{RewardBreakdown, RewardState, shape_reward};
