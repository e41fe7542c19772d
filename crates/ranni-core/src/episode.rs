//! Episode driver: runs a policy through one episode with a step budget.
//!
//! [`run_episode`] resets the environment, asks the [`Policy`] for an action
//! after every result, and stops when the reward function reports
//! termination, the step budget runs out (the last result is marked
//! `truncated`), or the policy has nothing more to say. The environment is
//! closed on every exit path so no key stays held.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use ranni_types::{ActionId, EpisodeId, Observation, StepInfo, StepResult};
use serde::Serialize;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::orchestrator::{StepError, StepOrchestrator};
use crate::target::TargetProcess;

/// Errors that end an episode early.
#[derive(Debug, thiserror::Error)]
pub enum EpisodeError {
    /// A reset, step or close failed.
    #[error("step error: {source}")]
    Step {
        /// The underlying step error.
        #[from]
        source: StepError,
    },

    /// The policy produced something the environment cannot run.
    #[error("policy error: {reason}")]
    Policy {
        /// Description of the problem.
        reason: String,
    },
}

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeEndReason {
    /// The reward function reported a terminal state.
    Terminated,
    /// The step budget was used up.
    BudgetExhausted,
    /// The policy returned no action.
    PolicyExhausted,
}

/// Chooses the next action from the latest result.
pub trait Policy {
    /// The next action, or `None` to end the episode.
    fn choose(&mut self, observation: &Observation, info: &StepInfo) -> Option<ActionId>;
}

/// Uniformly random actions from a seeded generator.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: SmallRng,
    action_count: u16,
}

impl RandomPolicy {
    /// Choose among the first `action_count` ids.
    pub fn new(seed: u64, action_count: u16) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            action_count,
        }
    }
}

impl Policy for RandomPolicy {
    fn choose(&mut self, _observation: &Observation, _info: &StepInfo) -> Option<ActionId> {
        (self.action_count > 0).then(|| ActionId(self.rng.random_range(0..self.action_count)))
    }
}

/// Replays a fixed list of actions, then stops.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPolicy {
    actions: VecDeque<ActionId>,
}

impl ScriptedPolicy {
    /// Replay `actions` in order.
    pub fn new(actions: impl IntoIterator<Item = ActionId>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
        }
    }
}

impl Policy for ScriptedPolicy {
    fn choose(&mut self, _observation: &Observation, _info: &StepInfo) -> Option<ActionId> {
        self.actions.pop_front()
    }
}

/// Callback invoked after each step of an episode.
pub trait StepCallback {
    /// Called with every step result, in order.
    fn on_step(&mut self, result: &StepResult);
}

/// A callback that ignores every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl StepCallback for NoOpCallback {
    fn on_step(&mut self, _result: &StepResult) {}
}

/// Outcome of one episode.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeSummary {
    /// Episode identifier.
    pub id: EpisodeId,
    /// Why the episode ended.
    pub end_reason: EpisodeEndReason,
    /// Steps taken after the reset.
    pub steps: u64,
    /// Sum of step rewards.
    pub total_reward: f64,
    /// The last result (the reset result when no step was taken).
    pub final_result: StepResult,
    /// When the episode started.
    pub started_at: DateTime<Utc>,
    /// When the episode ended.
    pub ended_at: DateTime<Utc>,
}

/// Run one episode of at most `max_steps` steps.
///
/// # Errors
///
/// Returns [`EpisodeError::Step`] if the environment fails and
/// [`EpisodeError::Policy`] if the policy picks an action outside the
/// catalog. The environment is closed before any error is returned.
pub async fn run_episode<T: TargetProcess, C: Clock>(
    env: &mut StepOrchestrator<T, C>,
    policy: &mut dyn Policy,
    callback: &mut dyn StepCallback,
    max_steps: u64,
) -> Result<EpisodeSummary, EpisodeError> {
    let id = EpisodeId::new();
    let started_at = Utc::now();
    info!(episode_id = %id, max_steps, "Episode starting");

    let outcome = drive(env, policy, callback, max_steps).await;
    let closed = env.close().await;

    let (end_reason, steps, total_reward, final_result) = match (outcome, closed) {
        (Ok(done), Ok(())) => done,
        (Ok(_), Err(err)) => return Err(err.into()),
        (Err(err), closed) => {
            if let Err(close_err) = closed {
                warn!(episode_id = %id, error = %close_err, "Close failed after episode error");
            }
            warn!(episode_id = %id, error = %err, "Episode aborted");
            return Err(err);
        }
    };

    let summary = EpisodeSummary {
        id,
        end_reason,
        steps,
        total_reward,
        final_result,
        started_at,
        ended_at: Utc::now(),
    };
    info!(
        episode_id = %summary.id,
        reason = ?summary.end_reason,
        steps = summary.steps,
        total_reward = summary.total_reward,
        "Episode ended"
    );
    Ok(summary)
}

async fn drive<T: TargetProcess, C: Clock>(
    env: &mut StepOrchestrator<T, C>,
    policy: &mut dyn Policy,
    callback: &mut dyn StepCallback,
    max_steps: u64,
) -> Result<(EpisodeEndReason, u64, f64, StepResult), EpisodeError> {
    let mut result = env.reset().await?;
    let mut steps: u64 = 0;
    let mut total_reward = 0.0;

    let reason = loop {
        if result.terminated {
            break EpisodeEndReason::Terminated;
        }
        if steps >= max_steps {
            result.truncated = true;
            break EpisodeEndReason::BudgetExhausted;
        }
        let Some(action) = policy.choose(&result.observation, &result.info) else {
            break EpisodeEndReason::PolicyExhausted;
        };
        if env.catalog().lookup(action).is_err() {
            return Err(EpisodeError::Policy {
                reason: format!(
                    "chose action {action} but the catalog holds {} actions",
                    env.catalog().len()
                ),
            });
        }

        result = env.step(action).await?;
        steps = steps.saturating_add(1);
        total_reward += result.reward;
        callback.on_step(&result);
    };

    Ok((reason, steps, total_reward, result))
}
