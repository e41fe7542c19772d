//! Phase calculator: animation phase and progress from elapsed time.
//!
//! Phases are derived on demand, never stored. Boundaries are half-open:
//! an action with breakdown `{s, a, r}` is in `Startup` for `[0, s)`,
//! `Active` for `[s, s + a)`, `Recovery` for `[s + a, duration)`, and reports
//! `Idle` from `duration` onwards.
//!
//! That last case can be reached while the execution state still says
//! `Executing` (the orchestrator has not refreshed yet). Callers treat
//! `Idle` while executing as "effectively done".

use ranni_types::{ActionDefinition, AnimationPhase};

use crate::execution::ActionExecutionState;

/// Phase of `definition` after `elapsed` seconds of execution.
pub fn phase_at(definition: &ActionDefinition, elapsed: f64) -> AnimationPhase {
    let Some(phases) = definition.phases else {
        return AnimationPhase::Idle;
    };

    if elapsed < phases.startup {
        AnimationPhase::Startup
    } else if elapsed < phases.active_end() {
        AnimationPhase::Active
    } else if elapsed < definition.duration {
        AnimationPhase::Recovery
    } else {
        AnimationPhase::Idle
    }
}

/// Current animation phase of the action tracked by `state`.
///
/// `definition` must describe the action in flight; it is ignored when
/// nothing is executing.
pub fn compute_phase(
    state: &ActionExecutionState,
    definition: &ActionDefinition,
    now: f64,
) -> AnimationPhase {
    state
        .elapsed(now)
        .map_or(AnimationPhase::Idle, |elapsed| phase_at(definition, elapsed))
}

/// Fraction of the action in flight that has elapsed, in `[0, 1]`.
///
/// Zero when nothing executes. A zero-duration action reports `1.0` as soon
/// as it starts.
pub fn action_progress(state: &ActionExecutionState, definition: &ActionDefinition, now: f64) -> f64 {
    let Some(elapsed) = state.elapsed(now) else {
        return 0.0;
    };
    if definition.duration <= 0.0 {
        return 1.0;
    }
    (elapsed / definition.duration).clamp(0.0, 1.0)
}
