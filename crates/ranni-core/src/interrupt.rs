//! Interruption policy: may a new request preempt the action in flight?
//!
//! Two tiers of priority:
//!
//! - **Committed window**: nothing may cut an action during `Startup` or
//!   `Active`, whoever asks.
//! - **Recovery**: `Movement` recovery is always preemptible. `Combat` and
//!   `Dodge` recovery may only be cut by another `Combat` or `Dodge` request.
//!   `Instant` recovery is never cut.
//!
//! Outside an action (not executing, or past its duration) every request is
//! admitted.

use ranni_types::{ActionCategory, ActionDefinition, AnimationPhase};

use crate::execution::ActionExecutionState;
use crate::phase;

/// Whether `requested` may preempt the action described by `current`.
pub fn can_interrupt(
    state: &ActionExecutionState,
    current: &ActionDefinition,
    requested: &ActionDefinition,
    now: f64,
) -> bool {
    can_interrupt_with(state, current, requested.category, now)
}

/// Category-level form of [`can_interrupt`].
pub fn can_interrupt_with(
    state: &ActionExecutionState,
    current: &ActionDefinition,
    requested: ActionCategory,
    now: f64,
) -> bool {
    if !state.is_executing() {
        return true;
    }

    match phase::compute_phase(state, current, now) {
        AnimationPhase::Startup | AnimationPhase::Active => false,
        AnimationPhase::Recovery => recovery_admits(current.category, requested),
        AnimationPhase::Idle => true,
    }
}

const fn recovery_admits(current: ActionCategory, requested: ActionCategory) -> bool {
    match current {
        ActionCategory::Movement => true,
        ActionCategory::Combat | ActionCategory::Dodge => requested.is_priority(),
        ActionCategory::Instant => false,
    }
}
