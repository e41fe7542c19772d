//! Step callback that logs every step result.

use ranni_core::episode::StepCallback;
use ranni_types::StepResult;
use tracing::{debug, warn};

/// Logs each step at debug level and keeps running counters.
#[derive(Debug, Default)]
pub struct LogCallback {
    steps: u64,
    interruptions: u64,
}

impl LogCallback {
    /// A callback with zeroed counters.
    pub const fn new() -> Self {
        Self {
            steps: 0,
            interruptions: 0,
        }
    }

    /// Steps seen so far.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Steps whose request preempted an action in flight.
    pub const fn interruptions(&self) -> u64 {
        self.interruptions
    }
}

impl StepCallback for LogCallback {
    fn on_step(&mut self, result: &StepResult) {
        self.steps = self.steps.saturating_add(1);
        if result.info.interrupted.is_some() {
            self.interruptions = self.interruptions.saturating_add(1);
        }

        match serde_json::to_string(&result.info) {
            Ok(info) => debug!(
                step = result.info.step,
                reward = result.reward,
                phase = ?result.observation.animation_phase,
                info = %info,
                "Step"
            ),
            Err(e) => warn!(step = result.info.step, error = %e, "failed to serialize step info"),
        }
    }
}
