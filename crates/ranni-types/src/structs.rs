//! Action definitions and their building blocks.
//!
//! An [`ActionDefinition`] is created once when the catalog is built and is
//! never mutated afterwards. All durations are in seconds.

use serde::{Deserialize, Serialize};

use crate::enums::ActionCategory;
use crate::ids::ActionId;

/// Per-phase durations of an action's animation, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseBreakdown {
    /// Wind-up before the action takes effect.
    pub startup: f64,
    /// Window in which the action takes effect.
    pub active: f64,
    /// Wind-down after the active window.
    pub recovery: f64,
}

impl PhaseBreakdown {
    /// Create a breakdown from its three phase durations.
    pub const fn new(startup: f64, active: f64, recovery: f64) -> Self {
        Self {
            startup,
            active,
            recovery,
        }
    }

    /// Sum of all three phases.
    pub fn total(&self) -> f64 {
        self.startup + self.active + self.recovery
    }

    /// Elapsed time at which the active window ends.
    pub fn active_end(&self) -> f64 {
        self.startup + self.active
    }
}

/// How an action is delivered to the target's input surface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InputBinding {
    /// The no-op: nothing is sent.
    #[default]
    None,
    /// Press the keys for `hold_ms`, releasing on the target side.
    Tap {
        /// Keys pressed together, e.g. `["shift", "w"]`.
        keys: Vec<String>,
        /// How long the target holds the keys, in milliseconds.
        #[serde(default = "default_hold_ms")]
        hold_ms: u64,
        /// Delay between consecutive keys, in milliseconds.
        #[serde(default)]
        delay_ms: u64,
    },
    /// Toggle the keys on at dispatch and off when the action ends.
    Hold {
        /// Keys held for the life of the action.
        keys: Vec<String>,
    },
}

impl InputBinding {
    /// Whether this binding is the no-op.
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Keys touched by this binding (empty for the no-op).
    pub fn keys(&self) -> &[String] {
        match self {
            Self::None => &[],
            Self::Tap { keys, .. } | Self::Hold { keys } => keys,
        }
    }
}

const fn default_hold_ms() -> u64 {
    100
}

/// Immutable description of one action the agent can request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Position of this action in the catalog.
    pub id: ActionId,
    /// Human-readable name, unique within a catalog.
    pub name: String,
    /// Interruption priority category.
    pub category: ActionCategory,
    /// Total duration of the action's animation, in seconds.
    pub duration: f64,
    /// Whether the action advertises itself as interruptible. Informational:
    /// the interruption policy is category and phase driven.
    #[serde(default)]
    pub interruptible: bool,
    /// Phase breakdown, or `None` when the action has no sub-phases.
    #[serde(default)]
    pub phases: Option<PhaseBreakdown>,
    /// How the action reaches the target.
    #[serde(default)]
    pub input: InputBinding,
}

impl ActionDefinition {
    /// Whether requesting this action sends nothing to the target.
    pub const fn is_noop(&self) -> bool {
        self.input.is_noop()
    }
}
