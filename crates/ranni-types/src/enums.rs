//! Enumeration types for the Ranni step-timing engine.
//!
//! Every enumerated value in the timing model is a closed sum type. Strategy
//! selectors deserialize from lowercase `snake_case` names so they can be
//! written directly in the YAML configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Action taxonomy
// ---------------------------------------------------------------------------

/// The category of an action, which determines its interruption priority.
///
/// Movement sits in the low tier. Combat and Dodge form a high tier whose
/// members may cut each other's recovery window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    /// Effectively instantaneous inputs (interact, use item, no-op).
    Instant,
    /// Locomotion; always preemptible once in recovery.
    Movement,
    /// Attacks and weapon arts.
    Combat,
    /// Rolls and backsteps.
    Dodge,
}

impl ActionCategory {
    /// Whether this category belongs to the high-priority tier.
    pub const fn is_priority(self) -> bool {
        matches!(self, Self::Combat | Self::Dodge)
    }
}

// ---------------------------------------------------------------------------
// Execution lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle of the action currently tracked by the execution state.
///
/// The machine cycles `Idle -> Executing -> {Completed, Interrupted} -> Idle`
/// for the life of an episode; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Nothing has been dispatched since the last reset or no-op.
    Idle,
    /// An action is in flight.
    Executing,
    /// The last action ran to completion (naturally or forced).
    Completed,
    /// The last action was preempted by a newer request.
    Interrupted,
}

/// Coarse animation phase derived from elapsed time within an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationPhase {
    /// Wind-up; never interruptible.
    Startup,
    /// The committed window where the action takes effect; never interruptible.
    Active,
    /// Wind-down; interruptible depending on categories.
    Recovery,
    /// No distinguishable phase (nothing running, or past the declared duration).
    Idle,
}

/// What the orchestrator did with a requested action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// The request was sent to the target and is now executing.
    Dispatched,
    /// The request could not preempt the running action and sits in the
    /// pending slot.
    Queued,
    /// The request matched the running action, which keeps going.
    Continued,
    /// The no-op was admitted: nothing was sent and the engine is idle.
    NoOp,
}

// ---------------------------------------------------------------------------
// Strategy selectors
// ---------------------------------------------------------------------------

/// How the target process's clock is throttled while an action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteppingStrategy {
    /// Slow the target to a crawl while anything executes.
    Pause,
    /// Keep the target at normal speed.
    Continuous,
    /// Scale speed by animation phase.
    #[default]
    Adaptive,
}

/// When a step takes a fresh observation sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Every step samples.
    Immediate,
    /// Only steps that end with nothing executing sample.
    #[serde(alias = "completion")]
    OnCompletion,
    /// Sample on completion, or when the agent interval has elapsed.
    #[default]
    Smart,
}
