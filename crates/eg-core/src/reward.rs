//! Reward shaping
//!
//! The reward for a step is the sum of five independent terms computed from
//! the previous and current snapshots. Each term only ever pushes in its own
//! direction: losing a badge or money is not punished, healing is not rewarded.

use serde::Serialize;

use crate::memory::Snapshot;

/// Reward per newly obtained badge
pub const BADGE_REWARD: f64 = 1000.0;
/// Money gained is divided by this
pub const MONEY_SCALE: f64 = 1000.0;
/// Penalty per HP point lost across the party
pub const HP_LOSS_PENALTY: f64 = 0.1;
/// Flat reward for changing map
pub const NEW_MAP_REWARD: f64 = 5.0;
/// Charged on every step
pub const STEP_PENALTY: f64 = 0.01;

/// The five reward terms of one step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RewardBreakdown {
    pub badges: f64,
    pub money: f64,
    pub hp: f64,
    pub exploration: f64,
    pub step: f64,
}

impl RewardBreakdown {
    /// Compute every term. Without a previous snapshot only the step penalty applies.
    pub fn compute(previous: Option<&Snapshot>, current: &Snapshot) -> Self {
        let step = -STEP_PENALTY;
        let Some(prev) = previous else {
            return Self {
                step,
                ..Self::default()
            };
        };

        let new_badges = i64::from(current.badge_count()) - i64::from(prev.badge_count());
        let money_gained = i64::from(current.money) - i64::from(prev.money);
        let hp_lost = i64::from(prev.party_hp_total) - i64::from(current.party_hp_total);

        Self {
            badges: BADGE_REWARD * new_badges.max(0) as f64,
            money: if money_gained > 0 {
                money_gained as f64 / MONEY_SCALE
            } else {
                0.0
            },
            hp: if hp_lost > 0 {
                -(HP_LOSS_PENALTY * hp_lost as f64)
            } else {
                0.0
            },
            exploration: if current.map_id != prev.map_id {
                NEW_MAP_REWARD
            } else {
                0.0
            },
            step,
        }
    }

    pub fn total(&self) -> f64 {
        self.badges + self.money + self.hp + self.exploration + self.step
    }
}

/// Reward for moving from `previous` to `current`
pub fn shape_reward(previous: Option<&Snapshot>, current: &Snapshot) -> f64 {
    RewardBreakdown::compute(previous, current).total()
}

/// Per-episode reward bookkeeping
#[derive(Debug, Clone, Default)]
pub struct RewardState {
    previous: Option<Snapshot>,
    episode_cumulative_reward: f64,
}

impl RewardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous snapshot and the running total
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Score `current` against the previous snapshot, then make it the previous one
    pub fn update(&mut self, current: Snapshot) -> RewardBreakdown {
        let breakdown = RewardBreakdown::compute(self.previous.as_ref(), &current);

        if breakdown.badges > 0.0 {
            tracing::info!(
                badges = current.badge_count(),
                frame = current.frame_index,
                "new badge"
            );
        }

        self.episode_cumulative_reward += breakdown.total();
        self.previous = Some(current);
        breakdown
    }

    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    pub fn cumulative(&self) -> f64 {
        self.episode_cumulative_reward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snap(badges: u8, money: u32, hp: u32, map: u8) -> Snapshot {
        Snapshot {
            badge_bitmask: badges,
            money,
            party_hp_total: hp,
            map_id: map,
            frame_index: 0,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_all_terms() {
        let prev = snap(0b01, 100, 50, 3);
        let curr = snap(0b11, 150, 40, 4);

        let breakdown = RewardBreakdown::compute(Some(&prev), &curr);
        assert_eq!(breakdown.badges, 1000.0);
        assert_close(breakdown.money, 0.05);
        assert_close(breakdown.hp, -1.0);
        assert_eq!(breakdown.exploration, 5.0);
        assert_eq!(breakdown.step, -0.01);

        assert_close(shape_reward(Some(&prev), &curr), 1004.04);
    }

    #[test]
    fn test_first_step_only_pays_step_penalty() {
        let curr = snap(0xFF, 999_999, 500, 42);
        assert_eq!(shape_reward(None, &curr), -0.01);
    }

    #[test]
    fn test_unchanged_state() {
        let s = snap(0b1, 3000, 120, 7);
        assert_eq!(shape_reward(Some(&s), &s), -0.01);
    }

    #[test]
    fn test_losses_are_one_sided() {
        let prev = snap(0b111, 5000, 100, 1);
        let curr = snap(0b001, 10, 150, 1);
        let breakdown = RewardBreakdown::compute(Some(&prev), &curr);
        assert_eq!(breakdown.badges, 0.0);
        assert_eq!(breakdown.money, 0.0);
        assert_eq!(breakdown.hp, 0.0);
        assert_eq!(breakdown.total(), -0.01);
    }

    #[test]
    fn test_exploration_is_flat() {
        let near = shape_reward(Some(&snap(0, 0, 0, 1)), &snap(0, 0, 0, 2));
        let far = shape_reward(Some(&snap(0, 0, 0, 1)), &snap(0, 0, 0, 200));
        assert_eq!(near, far);
    }

    #[test]
    fn test_state_tracks_episode() {
        let mut state = RewardState::new();
        assert!(state.previous().is_none());

        let first = state.update(snap(0, 100, 50, 3));
        assert_eq!(first.total(), -0.01);

        let second = state.update(snap(0b1, 100, 50, 3));
        assert_close(second.total(), 999.99);
        assert_close(state.cumulative(), 999.98);
        assert_eq!(state.previous().map(|s| s.badge_bitmask), Some(0b1));

        state.reset();
        assert!(state.previous().is_none());
        assert_eq!(state.cumulative(), 0.0);
    }

    fn any_snapshot() -> impl Strategy<Value = Snapshot> {
        (any::<u8>(), any::<u32>(), any::<u32>(), any::<u8>()).prop_map(
            |(badges, money, hp, map)| snap(badges, money, hp, map),
        )
    }

    proptest! {
        #[test]
        fn prop_reward_is_pure(prev in any_snapshot(), curr in any_snapshot()) {
            let a = shape_reward(Some(&prev), &curr);
            let b = shape_reward(Some(&prev), &curr);
            prop_assert_eq!(a.to_bits(), b.to_bits());
        }

        #[test]
        fn prop_terms_keep_their_sign(prev in any_snapshot(), curr in any_snapshot()) {
            let breakdown = RewardBreakdown::compute(Some(&prev), &curr);
            prop_assert!(breakdown.badges >= 0.0);
            prop_assert!(breakdown.money >= 0.0);
            prop_assert!(breakdown.hp <= 0.0);
            prop_assert!(breakdown.exploration == 0.0 || breakdown.exploration == NEW_MAP_REWARD);
            prop_assert_eq!(breakdown.step, -STEP_PENALTY);
        }
    }
}
