//! Action execution state: what is running and since when.
//!
//! One [`ActionExecutionState`] exists per environment and is mutated only
//! by the step orchestrator. The action id, start timestamp and baseline
//! animation id live inside the `Executing` variant, so "executing iff both
//! the current action and the start timestamp are set" holds by
//! construction: leaving `Executing` drops them.
//!
//! The pending slot holds at most one request. A newer rejected request
//! replaces the older one (latest wins); it is not a FIFO queue.

use ranni_types::{ActionId, LifecycleState};

/// The action in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Execution {
    /// The action being executed.
    pub action: ActionId,
    /// Clock time at which the action was dispatched, in seconds.
    pub started_at: f64,
    /// Animation id observed right after dispatch, for detectors that
    /// compare against it.
    pub baseline_animation: Option<i64>,
}

impl Execution {
    /// Seconds since dispatch, clamped at zero.
    pub fn elapsed(&self, now: f64) -> f64 {
        (now - self.started_at).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Lifecycle {
    Idle,
    Executing(Execution),
    Completed,
    Interrupted,
}

/// Mutable record of the current action and the pending request.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionExecutionState {
    lifecycle: Lifecycle,
    pending: Option<ActionId>,
}

impl Default for ActionExecutionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExecutionState {
    /// A fresh, idle state with an empty pending slot.
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Idle,
            pending: None,
        }
    }

    /// The lifecycle tag.
    pub const fn lifecycle_state(&self) -> LifecycleState {
        match self.lifecycle {
            Lifecycle::Idle => LifecycleState::Idle,
            Lifecycle::Executing(_) => LifecycleState::Executing,
            Lifecycle::Completed => LifecycleState::Completed,
            Lifecycle::Interrupted => LifecycleState::Interrupted,
        }
    }

    /// Whether an action is in flight.
    pub const fn is_executing(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Executing(_))
    }

    /// Whether nothing is in flight (`Idle`, `Completed` or `Interrupted`).
    pub const fn is_free(&self) -> bool {
        !self.is_executing()
    }

    /// The in-flight execution, if any.
    pub const fn execution(&self) -> Option<&Execution> {
        match &self.lifecycle {
            Lifecycle::Executing(execution) => Some(execution),
            Lifecycle::Idle | Lifecycle::Completed | Lifecycle::Interrupted => None,
        }
    }

    /// The action in flight, if any.
    pub fn current_action(&self) -> Option<ActionId> {
        self.execution().map(|e| e.action)
    }

    /// Dispatch time of the action in flight, if any.
    pub fn start_timestamp(&self) -> Option<f64> {
        self.execution().map(|e| e.started_at)
    }

    /// Seconds since the action in flight was dispatched.
    pub fn elapsed(&self, now: f64) -> Option<f64> {
        self.execution().map(|e| e.elapsed(now))
    }

    /// The request waiting in the pending slot.
    pub const fn pending_action(&self) -> Option<ActionId> {
        self.pending
    }

    /// Number of pending requests (0 or 1).
    pub const fn pending_count(&self) -> u32 {
        if self.pending.is_some() { 1 } else { 0 }
    }

    /// Start executing `action` at `now`. Any previous execution is
    /// discarded; callers complete or interrupt it first.
    pub fn begin(&mut self, action: ActionId, now: f64, baseline_animation: Option<i64>) {
        self.lifecycle = Lifecycle::Executing(Execution {
            action,
            started_at: now,
            baseline_animation,
        });
    }

    /// Move an executing action to `Completed`, returning what finished.
    /// Does nothing when not executing.
    pub fn complete(&mut self) -> Option<Execution> {
        self.finish(Lifecycle::Completed)
    }

    /// Move an executing action to `Interrupted`, returning what was cut.
    /// Does nothing when not executing.
    pub fn interrupt(&mut self) -> Option<Execution> {
        self.finish(Lifecycle::Interrupted)
    }

    /// Return a finished state (`Completed` or `Interrupted`) to `Idle`.
    pub fn settle(&mut self) {
        if matches!(self.lifecycle, Lifecycle::Completed | Lifecycle::Interrupted) {
            self.lifecycle = Lifecycle::Idle;
        }
    }

    /// Store a rejected request, replacing any earlier one. Returns the
    /// request it replaced.
    pub fn queue(&mut self, action: ActionId) -> Option<ActionId> {
        self.pending.replace(action)
    }

    /// Empty the pending slot, returning what it held.
    pub fn clear_pending(&mut self) -> Option<ActionId> {
        self.pending.take()
    }

    /// Back to a fresh idle state.
    pub fn reset(&mut self) {
        self.lifecycle = Lifecycle::Idle;
        self.pending = None;
    }

    fn finish(&mut self, next: Lifecycle) -> Option<Execution> {
        match self.lifecycle {
            Lifecycle::Executing(execution) => {
                self.lifecycle = next;
                Some(execution)
            }
            Lifecycle::Idle | Lifecycle::Completed | Lifecycle::Interrupted => None,
        }
    }
}
