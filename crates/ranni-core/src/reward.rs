//! Reward and termination functions.
//!
//! The orchestrator calls [`RewardFunction::reward`] only on sampled steps
//! and [`RewardFunction::is_done`] on every step. `prev` is the info of the
//! previous sampled step (or of the reset), so deltas span exactly one
//! sample.

use std::fmt;

use ranni_types::{Observation, StepInfo};

/// Pluggable reward and termination.
pub trait RewardFunction: fmt::Debug + Send {
    /// Reward for moving from `prev` to `info`.
    fn reward(&mut self, observation: &Observation, info: &StepInfo, prev: Option<&StepInfo>)
    -> f64;

    /// Whether the episode is over.
    fn is_done(&self, observation: &Observation, info: &StepInfo) -> bool;

    /// Names of the attributes this function reads, so the orchestrator can
    /// include them in every snapshot.
    fn attributes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Reward is the change in a score attribute. Never terminates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreDeltaReward {
    score_key: String,
}

impl ScoreDeltaReward {
    /// Track the attribute named `score_key`.
    pub fn new(score_key: &str) -> Self {
        Self {
            score_key: score_key.to_owned(),
        }
    }
}

impl Default for ScoreDeltaReward {
    fn default() -> Self {
        Self::new("score")
    }
}

impl RewardFunction for ScoreDeltaReward {
    fn reward(&mut self, _observation: &Observation, info: &StepInfo, prev: Option<&StepInfo>) -> f64 {
        let Some(prev) = prev else {
            return 0.0;
        };
        let current = info.attribute_f64(&self.score_key).unwrap_or(0.0);
        let before = prev.attribute_f64(&self.score_key).unwrap_or(0.0);
        current - before
    }

    fn is_done(&self, _observation: &Observation, _info: &StepInfo) -> bool {
        false
    }

    fn attributes(&self) -> Vec<String> {
        vec![self.score_key.clone()]
    }
}

/// One-on-one fight reward: damage dealt minus damage taken.
///
/// Damage is the drop in the hp attribute between samples; heals are
/// ignored. The episode ends when either side's hp reaches zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DuelReward {
    /// Attribute holding the player's hp.
    pub player_hp: String,
    /// Attribute holding the opponent's hp.
    pub target_hp: String,
    /// Weight of damage dealt.
    pub damage_dealt_weight: f64,
    /// Weight of damage taken.
    pub damage_taken_weight: f64,
}

impl Default for DuelReward {
    fn default() -> Self {
        Self {
            player_hp: "HeroHp".to_owned(),
            target_hp: "NpcHp".to_owned(),
            damage_dealt_weight: 1.0,
            damage_taken_weight: 1.0,
        }
    }
}

impl DuelReward {
    fn drop_in(name: &str, info: &StepInfo, prev: &StepInfo) -> f64 {
        match (prev.attribute_f64(name), info.attribute_f64(name)) {
            (Some(before), Some(after)) => (before - after).max(0.0),
            _ => 0.0,
        }
    }
}

impl RewardFunction for DuelReward {
    fn reward(&mut self, _observation: &Observation, info: &StepInfo, prev: Option<&StepInfo>) -> f64 {
        let Some(prev) = prev else {
            return 0.0;
        };
        let dealt = Self::drop_in(&self.target_hp, info, prev);
        let taken = Self::drop_in(&self.player_hp, info, prev);
        dealt.mul_add(self.damage_dealt_weight, -(taken * self.damage_taken_weight))
    }

    fn is_done(&self, _observation: &Observation, info: &StepInfo) -> bool {
        [&self.player_hp, &self.target_hp]
            .into_iter()
            .any(|name| info.attribute_f64(name).is_some_and(|hp| hp <= 0.0))
    }

    fn attributes(&self) -> Vec<String> {
        vec![self.player_hp.clone(), self.target_hp.clone()]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ranni_types::{AnimationPhase, AttributeValue, LifecycleState};

    use super::*;

    fn observation() -> Observation {
        Observation {
            frame: None,
            attributes: BTreeMap::new(),
            action_state: LifecycleState::Idle,
            current_action: None,
            action_progress: 0.0,
            pending_count: 0,
            animation_phase: AnimationPhase::Idle,
            can_interrupt: true,
        }
    }

    fn info(values: &[(&str, i64)]) -> StepInfo {
        StepInfo {
            step: 1,
            timestamp: 0.0,
            elapsed: 0.0,
            requested_action: None,
            admission: None,
            interrupted: None,
            sampled: true,
            attributes: values
                .iter()
                .map(|&(name, value)| (name.to_owned(), AttributeValue::Int(value)))
                .collect(),
        }
    }

    #[test]
    fn score_delta_needs_previous_info() {
        let mut reward = ScoreDeltaReward::default();
        let obs = observation();
        assert!(reward.reward(&obs, &info(&[("score", 10)]), None).abs() < f64::EPSILON);
        let delta = reward.reward(&obs, &info(&[("score", 25)]), Some(&info(&[("score", 10)])));
        assert!((delta - 15.0).abs() < f64::EPSILON);
        assert!(!reward.is_done(&obs, &info(&[("score", 0)])));
    }

    #[test]
    fn duel_rewards_dealt_minus_taken() {
        let mut reward = DuelReward::default();
        let obs = observation();
        let prev = info(&[("HeroHp", 100), ("NpcHp", 500)]);
        let now = info(&[("HeroHp", 80), ("NpcHp", 450)]);
        assert!((reward.reward(&obs, &now, Some(&prev)) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn duel_ignores_heals() {
        let mut reward = DuelReward::default();
        let obs = observation();
        let prev = info(&[("HeroHp", 50), ("NpcHp", 500)]);
        let now = info(&[("HeroHp", 90), ("NpcHp", 500)]);
        assert!(reward.reward(&obs, &now, Some(&prev)).abs() < f64::EPSILON);
    }

    #[test]
    fn duel_ends_when_either_side_falls() {
        let reward = DuelReward::default();
        let obs = observation();
        assert!(!reward.is_done(&obs, &info(&[("HeroHp", 1), ("NpcHp", 1)])));
        assert!(reward.is_done(&obs, &info(&[("HeroHp", 0), ("NpcHp", 1)])));
        assert!(reward.is_done(&obs, &info(&[("HeroHp", 5), ("NpcHp", 0)])));
        assert!(!reward.is_done(&obs, &info(&[])));
    }
}
