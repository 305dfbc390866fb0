//! Action codec
//!
//! Converts policy actions into the 8-bit GBA key mask sent to the bridge.
//! Two action spaces are supported and a session only ever uses one of them:
//!
//! - multi-binary: eight 0/1 flags in `A, B, UP, DOWN, LEFT, RIGHT, START, SELECT` order
//! - discrete: `0` for no input, `1..=8` for a single button in the same order
//!
//! Both directions go through the static tables below.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

bitflags! {
    /// GBA key mask as consumed by `emu_step`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u8 {
        const A = 0x01;
        const B = 0x02;
        const SELECT = 0x04;
        const START = 0x08;
        const RIGHT = 0x10;
        const LEFT = 0x20;
        const UP = 0x40;
        const DOWN = 0x80;
    }
}

// Serialized as the raw mask byte
impl Serialize for Buttons {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Buttons {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(Buttons::from_bits_truncate(bits))
    }
}

/// A single GBA button, named as on the wire (`"A"`, `"UP"`, ...)
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum Button {
    A = 0,
    B = 1,
    Up = 2,
    Down = 3,
    Left = 4,
    Right = 5,
    Start = 6,
    Select = 7,
}

/// Number of buttons, and length of a multi-binary action
pub const NUM_BUTTONS: usize = 8;

/// Positional order of the multi-binary flags. Discrete action `n` selects `BUTTON_ORDER[n - 1]`.
pub const BUTTON_ORDER: [Button; NUM_BUTTONS] = [
    Button::A,
    Button::B,
    Button::Up,
    Button::Down,
    Button::Left,
    Button::Right,
    Button::Start,
    Button::Select,
];

/// Mask bit for each button, indexed by `Button as usize`
const BUTTON_MASKS: [Buttons; NUM_BUTTONS] = [
    Buttons::A,
    Buttons::B,
    Buttons::UP,
    Buttons::DOWN,
    Buttons::LEFT,
    Buttons::RIGHT,
    Buttons::START,
    Buttons::SELECT,
];

impl Button {
    /// Mask bit for this button
    pub const fn mask(self) -> Buttons {
        BUTTON_MASKS[self as usize]
    }

    /// Wire name of this button
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl Buttons {
    /// Build a mask from a list of buttons
    pub fn from_buttons<I: IntoIterator<Item = Button>>(buttons: I) -> Self {
        buttons
            .into_iter()
            .fold(Buttons::empty(), |mask, button| mask | button.mask())
    }

    /// Pressed buttons, in `BUTTON_ORDER` order
    pub fn pressed(self) -> Vec<Button> {
        BUTTON_ORDER
            .iter()
            .copied()
            .filter(|button| self.contains(button.mask()))
            .collect()
    }

    /// Decode eight multi-binary flags. Any non-zero flag counts as pressed.
    pub fn from_multi_binary(flags: &[u8; NUM_BUTTONS]) -> Self {
        BUTTON_ORDER
            .iter()
            .zip(flags)
            .filter(|(_, flag)| **flag != 0)
            .fold(Buttons::empty(), |mask, (button, _)| mask | button.mask())
    }

    /// Encode as eight multi-binary flags
    pub fn to_multi_binary(self) -> [u8; NUM_BUTTONS] {
        let mut flags = [0u8; NUM_BUTTONS];
        for (flag, button) in flags.iter_mut().zip(BUTTON_ORDER) {
            *flag = u8::from(self.contains(button.mask()));
        }
        flags
    }

    /// Decode a discrete action, rejecting values outside `0..=8`
    pub fn try_from_discrete(action: i64) -> Result<Self, ActionError> {
        match action {
            0 => Ok(Buttons::empty()),
            1..=8 => Ok(BUTTON_ORDER[(action - 1) as usize].mask()),
            _ => Err(ActionError::OutOfRange(action)),
        }
    }

    /// Decode a discrete action. Out-of-range values mean "no buttons".
    pub fn from_discrete(action: i64) -> Self {
        Self::try_from_discrete(action).unwrap_or_else(|err| {
            tracing::warn!("{err}, pressing nothing");
            Buttons::empty()
        })
    }
}

/// Which of the two action encodings a session uses
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionSpace {
    /// `Discrete(9)`: no-op plus one action per button
    #[default]
    Discrete,
    /// `MultiBinary(8)`: any combination of buttons
    MultiBinary,
}

impl ActionSpace {
    /// Number of discrete values, or number of flags for multi-binary
    pub fn n(self) -> usize {
        match self {
            ActionSpace::Discrete => NUM_BUTTONS + 1,
            ActionSpace::MultiBinary => NUM_BUTTONS,
        }
    }
}

/// An action as produced by a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Discrete(i64),
    MultiBinary([u8; NUM_BUTTONS]),
}

impl Action {
    pub fn space(&self) -> ActionSpace {
        match self {
            Action::Discrete(_) => ActionSpace::Discrete,
            Action::MultiBinary(_) => ActionSpace::MultiBinary,
        }
    }

    /// Key mask for this action
    pub fn buttons(&self) -> Buttons {
        match self {
            Action::Discrete(n) => Buttons::from_discrete(*n),
            Action::MultiBinary(flags) => Buttons::from_multi_binary(flags),
        }
    }

    /// Key mask for this action, checking that it belongs to `space`
    pub fn buttons_in(&self, space: ActionSpace) -> Result<Buttons, ActionError> {
        if self.space() != space {
            return Err(ActionError::SpaceMismatch {
                action: self.space(),
                space,
            });
        }
        Ok(self.buttons())
    }
}

/// Action decoding errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("discrete action {0} is outside 0..=8")]
    OutOfRange(i64),

    #[error("{action} action given to a {space} action space")]
    SpaceMismatch {
        action: ActionSpace,
        space: ActionSpace,
    },
}
