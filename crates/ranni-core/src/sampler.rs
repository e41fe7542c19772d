//! Observation sampler: decides whether a step takes a fresh sample.
//!
//! The sampler only remembers when it last sampled. That timestamp moves
//! forward through [`ObservationSampler::record_sample`], which the
//! orchestrator calls after a sample was actually taken, never on a
//! speculative check.

use ranni_types::{LifecycleState, SamplingStrategy};

use crate::execution::ActionExecutionState;

/// Sampling policy plus the time of the last sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSampler {
    strategy: SamplingStrategy,
    agent_interval: f64,
    last_sample: Option<f64>,
}

impl ObservationSampler {
    /// Create a sampler for an agent deciding `agent_frequency_hz` times a
    /// second. A non-positive frequency makes `Smart` sample only when the
    /// action state is settled.
    pub fn new(strategy: SamplingStrategy, agent_frequency_hz: f64) -> Self {
        let agent_interval = if agent_frequency_hz > 0.0 {
            agent_frequency_hz.recip()
        } else {
            f64::INFINITY
        };
        Self {
            strategy,
            agent_interval,
            last_sample: None,
        }
    }

    /// The configured strategy.
    pub const fn strategy(&self) -> SamplingStrategy {
        self.strategy
    }

    /// Seconds between samples the agent expects.
    pub const fn agent_interval(&self) -> f64 {
        self.agent_interval
    }

    /// Time of the last recorded sample.
    pub const fn last_sample(&self) -> Option<f64> {
        self.last_sample
    }

    /// Whether a step at `now` should sample. Pure: does not record.
    pub fn should_sample(&self, state: &ActionExecutionState, now: f64) -> bool {
        let settled = matches!(
            state.lifecycle_state(),
            LifecycleState::Idle | LifecycleState::Completed
        );

        match self.strategy {
            SamplingStrategy::Immediate => true,
            SamplingStrategy::OnCompletion => settled,
            SamplingStrategy::Smart => {
                settled
                    || self
                        .last_sample
                        .is_none_or(|last| now - last >= self.agent_interval)
            }
        }
    }

    /// Record that a sample was taken at `now`.
    pub const fn record_sample(&mut self, now: f64) {
        self.last_sample = Some(now);
    }

    /// Forget the last sample (episode reset).
    pub const fn reset(&mut self) {
        self.last_sample = None;
    }
}
