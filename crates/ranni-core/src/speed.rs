//! Speed controller: clock-speed directives for the target process.
//!
//! The controller is pure. The orchestrator sends the returned factor to the
//! target once per poll tick.
//!
//! | Strategy     | Executing                                   | Otherwise |
//! |--------------|---------------------------------------------|-----------|
//! | `Pause`      | 0.1                                         | 1.0       |
//! | `Continuous` | 1.0                                         | 1.0       |
//! | `Adaptive`   | Startup 0.5, Active 1.0, Recovery 0.7       | 1.0       |

use ranni_types::{ActionDefinition, AnimationPhase, SteppingStrategy};

use crate::execution::ActionExecutionState;
use crate::phase;

/// Normal target speed.
pub const NORMAL_SPEED: f64 = 1.0;

/// Target speed while anything executes under [`SteppingStrategy::Pause`].
pub const PAUSED_SPEED: f64 = 0.1;

/// Speed factor for the current state under `strategy`.
///
/// `definition` must describe the action in flight; it is ignored when
/// nothing is executing.
pub fn compute_speed_factor(
    strategy: SteppingStrategy,
    state: &ActionExecutionState,
    definition: &ActionDefinition,
    now: f64,
) -> f64 {
    if !state.is_executing() {
        return NORMAL_SPEED;
    }

    match strategy {
        SteppingStrategy::Pause => PAUSED_SPEED,
        SteppingStrategy::Continuous => NORMAL_SPEED,
        SteppingStrategy::Adaptive => adaptive_factor(phase::compute_phase(state, definition, now)),
    }
}

/// Phase-indexed factor used by [`SteppingStrategy::Adaptive`].
pub const fn adaptive_factor(phase: AnimationPhase) -> f64 {
    match phase {
        AnimationPhase::Startup => 0.5,
        AnimationPhase::Active | AnimationPhase::Idle => NORMAL_SPEED,
        AnimationPhase::Recovery => 0.7,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ranni_types::{ActionCategory, ActionId, InputBinding, PhaseBreakdown};

    use super::*;

    fn definitions() -> Vec<ActionDefinition> {
        [
            (ActionCategory::Combat, 1.5, PhaseBreakdown::new(0.4, 0.3, 0.8)),
            (ActionCategory::Dodge, 0.8, PhaseBreakdown::new(0.1, 0.4, 0.3)),
            (ActionCategory::Movement, 0.5, PhaseBreakdown::new(0.05, 0.3, 0.15)),
        ]
        .into_iter()
        .map(|(category, duration, phases)| ActionDefinition {
            id: ActionId(0),
            name: format!("{category:?}"),
            category,
            duration,
            interruptible: false,
            phases: Some(phases),
            input: InputBinding::None,
        })
        .collect()
    }

    fn running() -> ActionExecutionState {
        let mut state = ActionExecutionState::new();
        state.begin(ActionId(0), 0.0, None);
        state
    }

    #[test]
    fn adaptive_follows_phase_table_for_every_action() {
        let state = running();
        for def in definitions() {
            let phases = def.phases.unwrap_or(PhaseBreakdown::new(0.0, 0.0, 0.0));
            let startup = phases.startup / 2.0;
            let active = phases.startup + phases.active / 2.0;
            let recovery = phases.active_end() + phases.recovery / 2.0;
            let s = SteppingStrategy::Adaptive;
            assert!((compute_speed_factor(s, &state, &def, startup) - 0.5).abs() < 1e-9);
            assert!((compute_speed_factor(s, &state, &def, active) - 1.0).abs() < 1e-9);
            assert!((compute_speed_factor(s, &state, &def, recovery) - 0.7).abs() < 1e-9);
            assert!((compute_speed_factor(s, &ActionExecutionState::new(), &def, 0.0) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn pause_slows_only_while_executing() {
        let defs = definitions();
        let def = defs.first().unwrap();
        let s = SteppingStrategy::Pause;
        assert!((compute_speed_factor(s, &running(), def, 0.1) - PAUSED_SPEED).abs() < 1e-9);
        assert!((compute_speed_factor(s, &ActionExecutionState::new(), def, 0.1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn continuous_never_changes_speed() {
        let defs = definitions();
        let def = defs.first().unwrap();
        for now in [0.1, 0.5, 1.0, 2.0] {
            let factor = compute_speed_factor(SteppingStrategy::Continuous, &running(), def, now);
            assert!((factor - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn adaptive_past_duration_is_normal_speed() {
        let defs = definitions();
        let def = defs.first().unwrap();
        let factor = compute_speed_factor(SteppingStrategy::Adaptive, &running(), def, 5.0);
        assert!((factor - 1.0).abs() < 1e-9);
    }
}
