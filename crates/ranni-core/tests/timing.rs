//! Timing scenarios for the step orchestrator, driven with a manual clock.
//!
//! Each test builds a small catalog, steps or requests actions at chosen
//! clock times, and checks the execution state the agent would observe.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    missing_docs
)]

use ranni_core::catalog::ActionCatalog;
use ranni_core::clock::{Clock, ManualClock};
use ranni_core::config::EnvironmentConfig;
use ranni_core::interrupt;
use ranni_core::orchestrator::StepOrchestrator;
use ranni_core::phase;
use ranni_core::sampler::ObservationSampler;
use ranni_core::speed;
use ranni_core::target::ScriptedTarget;
use ranni_types::{
    ActionCategory, ActionDefinition, ActionId, Admission, AnimationPhase, InputBinding,
    LifecycleState, PhaseBreakdown, SamplingStrategy, SteppingStrategy,
};

const NO_OP: ActionId = ActionId(0);
const ATTACK: ActionId = ActionId(1);
const DODGE: ActionId = ActionId(2);
const WALK: ActionId = ActionId(3);

fn tap(key: &str) -> InputBinding {
    InputBinding::Tap {
        keys: vec![key.to_owned()],
        hold_ms: 100,
        delay_ms: 0,
    }
}

fn definition(
    name: &str,
    category: ActionCategory,
    duration: f64,
    phases: Option<PhaseBreakdown>,
    input: InputBinding,
) -> ActionDefinition {
    ActionDefinition {
        id: ActionId(0),
        name: name.to_owned(),
        category,
        duration,
        interruptible: false,
        phases,
        input,
    }
}

fn catalog() -> ActionCatalog {
    ActionCatalog::from_ordered(vec![
        definition("no_op", ActionCategory::Instant, 0.0, None, InputBinding::None),
        definition(
            "attack",
            ActionCategory::Combat,
            1.5,
            Some(PhaseBreakdown::new(0.4, 0.3, 0.8)),
            tap("lmb"),
        ),
        definition(
            "dodge",
            ActionCategory::Dodge,
            0.8,
            Some(PhaseBreakdown::new(0.1, 0.4, 0.3)),
            tap("shift"),
        ),
        definition(
            "walk",
            ActionCategory::Movement,
            0.5,
            Some(PhaseBreakdown::new(0.05, 0.3, 0.15)),
            InputBinding::Hold {
                keys: vec!["w".to_owned()],
            },
        ),
    ])
    .unwrap()
}

fn environment(wait_for_completion: bool) -> EnvironmentConfig {
    EnvironmentConfig {
        wait_for_completion,
        attributes: Vec::new(),
        capture_frames: false,
        animation_attribute: None,
        ..EnvironmentConfig::default()
    }
}

fn free_running() -> (StepOrchestrator<ScriptedTarget, ManualClock>, ManualClock) {
    let clock = ManualClock::default();
    let orch = StepOrchestrator::new(
        catalog(),
        environment(false),
        ScriptedTarget::new(),
        clock.clone(),
    );
    (orch, clock)
}

#[tokio::test]
async fn attack_then_dodge_is_queued_then_interrupts() {
    let (mut orch, clock) = free_running();

    let outcome = orch.request(ATTACK).await.unwrap();
    assert_eq!(outcome.admission, Admission::Dispatched);

    clock.set(0.2);
    assert_eq!(orch.animation_phase(), AnimationPhase::Startup);
    let outcome = orch.request(DODGE).await.unwrap();
    assert_eq!(outcome.admission, Admission::Queued);
    assert_eq!(orch.state().lifecycle_state(), LifecycleState::Executing);
    assert_eq!(orch.state().current_action(), Some(ATTACK));
    assert_eq!(orch.state().pending_action(), Some(DODGE));

    clock.set(1.0);
    assert_eq!(orch.animation_phase(), AnimationPhase::Recovery);
    let outcome = orch.request(DODGE).await.unwrap();
    assert_eq!(outcome.admission, Admission::Dispatched);
    assert_eq!(outcome.interrupted, Some(ATTACK));
    assert_eq!(orch.state().lifecycle_state(), LifecycleState::Executing);
    assert_eq!(orch.state().current_action(), Some(DODGE));
    assert_eq!(orch.state().start_timestamp(), Some(1.0));
    assert_eq!(orch.state().pending_count(), 0);

    let keys: Vec<Vec<String>> = orch.target().dispatches();
    assert_eq!(keys, vec![vec!["lmb".to_owned()], vec!["shift".to_owned()]]);
}

#[tokio::test]
async fn pending_slot_keeps_latest_request_only() {
    let (mut orch, clock) = free_running();
    let _ = orch.request(ATTACK).await.unwrap();

    clock.set(0.1);
    let _ = orch.request(DODGE).await.unwrap();
    clock.set(0.2);
    let _ = orch.request(WALK).await.unwrap();

    assert_eq!(orch.state().pending_action(), Some(WALK));
    assert_eq!(orch.state().pending_count(), 1);
}

#[tokio::test]
async fn movement_cannot_cut_combat_recovery() {
    let (mut orch, clock) = free_running();
    let _ = orch.request(ATTACK).await.unwrap();

    clock.set(1.0);
    let outcome = orch.request(WALK).await.unwrap();

    assert_eq!(outcome.admission, Admission::Queued);
    assert_eq!(orch.state().current_action(), Some(ATTACK));
}

#[tokio::test]
async fn anything_cuts_movement_recovery() {
    let (mut orch, clock) = free_running();
    let _ = orch.request(WALK).await.unwrap();
    assert_eq!(orch.target().pressed_keys(), vec!["w".to_owned()]);

    clock.set(0.4);
    let outcome = orch.request(ATTACK).await.unwrap();

    assert_eq!(outcome.admission, Admission::Dispatched);
    assert_eq!(outcome.interrupted, Some(WALK));
    assert!(orch.target().pressed_keys().is_empty());
}

#[tokio::test]
async fn repeating_the_running_action_continues_it() {
    let (mut orch, clock) = free_running();
    let _ = orch.request(ATTACK).await.unwrap();

    clock.set(0.5);
    let outcome = orch.request(ATTACK).await.unwrap();

    assert_eq!(outcome.admission, Admission::Continued);
    assert_eq!(orch.state().start_timestamp(), Some(0.0));
    assert_eq!(orch.target().dispatches().len(), 1);
}

#[tokio::test]
async fn no_op_in_movement_recovery_returns_to_idle() {
    let (mut orch, clock) = free_running();
    let _ = orch.request(WALK).await.unwrap();
    assert_eq!(orch.target().pressed_keys(), vec!["w".to_owned()]);

    clock.set(0.45);
    let outcome = orch.request(NO_OP).await.unwrap();

    assert_eq!(outcome.admission, Admission::NoOp);
    assert_eq!(outcome.interrupted, Some(WALK));
    assert_eq!(orch.state().lifecycle_state(), LifecycleState::Idle);
    assert_eq!(orch.state().current_action(), None);
    assert_eq!(orch.state().pending_count(), 0);
    assert!(orch.held_keys().is_empty());
    assert!(orch.target().pressed_keys().is_empty());
}

#[tokio::test]
async fn no_op_during_attack_startup_is_queued() {
    let (mut orch, clock) = free_running();
    let _ = orch.request(ATTACK).await.unwrap();

    clock.set(0.2);
    let outcome = orch.request(NO_OP).await.unwrap();

    assert_eq!(outcome.admission, Admission::Queued);
    assert_eq!(orch.state().lifecycle_state(), LifecycleState::Executing);
    assert_eq!(orch.state().current_action(), Some(ATTACK));
    assert_eq!(orch.state().pending_action(), Some(NO_OP));
}

#[tokio::test]
async fn no_op_waits_out_attack_recovery() {
    let (mut orch, clock) = free_running();
    let _ = orch.request(ATTACK).await.unwrap();

    clock.set(1.0);
    let outcome = orch.request(NO_OP).await.unwrap();

    assert_eq!(outcome.admission, Admission::Queued);
    assert_eq!(orch.state().pending_action(), Some(NO_OP));

    clock.set(1.5);
    let outcome = orch.request(NO_OP).await.unwrap();

    assert_eq!(outcome.admission, Admission::NoOp);
    assert_eq!(outcome.interrupted, None);
    assert_eq!(orch.state().lifecycle_state(), LifecycleState::Idle);
    assert_eq!(orch.state().pending_count(), 0);
}

#[tokio::test]
async fn elapsed_action_completes_on_next_request() {
    let (mut orch, clock) = free_running();
    let _ = orch.request(DODGE).await.unwrap();

    clock.set(0.8);
    let outcome = orch.request(ATTACK).await.unwrap();

    assert_eq!(outcome.admission, Admission::Dispatched);
    assert_eq!(outcome.interrupted, None);
}

#[tokio::test]
async fn natural_completion_reports_idle_phase() {
    let clock = ManualClock::default();
    let mut orch = StepOrchestrator::new(
        catalog(),
        environment(true),
        ScriptedTarget::new(),
        clock.clone(),
    );
    let _ = orch.reset().await.unwrap();

    let result = orch.step(ATTACK).await.unwrap();
    assert_eq!(result.observation.current_action, None);
    assert_eq!(result.observation.animation_phase, AnimationPhase::Idle);
    assert_eq!(result.info.step, 1);

    let next = orch.step(NO_OP).await.unwrap();
    assert_eq!(next.observation.current_action, None);
    assert_eq!(next.observation.animation_phase, AnimationPhase::Idle);
    assert_eq!(next.observation.action_state, LifecycleState::Idle);
    assert!(next.observation.action_progress.abs() < f64::EPSILON);
}

#[tokio::test]
async fn observation_reports_progress_while_in_flight() {
    let (mut orch, clock) = free_running();
    let _ = orch.reset().await.unwrap();

    let result = orch.step(ATTACK).await.unwrap();
    assert_eq!(result.observation.action_state, LifecycleState::Executing);
    assert_eq!(result.observation.animation_phase, AnimationPhase::Startup);
    assert!(!result.observation.can_interrupt);

    clock.set(0.75);
    let result = orch.step(ATTACK).await.unwrap();
    assert_eq!(result.info.admission, Some(Admission::Continued));
    assert!((result.observation.action_progress - 0.5).abs() < 1e-9);
    assert_eq!(result.observation.animation_phase, AnimationPhase::Recovery);
    assert!(result.observation.can_interrupt);
}

#[test]
fn priority_actions_are_committed_through_active() {
    let catalog = catalog();
    let mut state = ranni_core::execution::ActionExecutionState::new();
    for current in catalog
        .iter()
        .filter(|def| def.category.is_priority())
    {
        state.begin(current.id, 0.0, None);
        let committed = current.phases.map_or(0.0, |p| p.active_end());
        let mut elapsed = 0.0;
        while elapsed < committed {
            for requested in catalog.iter() {
                assert!(
                    !interrupt::can_interrupt(&state, current, requested, elapsed),
                    "{} cut by {} at {elapsed}",
                    current.name,
                    requested.name
                );
            }
            elapsed += 0.01;
        }
    }
}

#[test]
fn phase_boundaries_are_exact() {
    let catalog = catalog();
    for def in catalog.iter() {
        let Some(phases) = def.phases else {
            continue;
        };
        assert_eq!(phase::phase_at(def, phases.startup), AnimationPhase::Active);
        assert_eq!(phase::phase_at(def, phases.active_end()), AnimationPhase::Recovery);
        if phases.startup > 0.0 {
            let before = phases.startup - 1e-9;
            assert_eq!(phase::phase_at(def, before), AnimationPhase::Startup);
        }
    }
}

#[test]
fn smart_sampling_at_two_hertz() {
    let mut sampler = ObservationSampler::new(SamplingStrategy::Smart, 2.0);
    let mut state = ranni_core::execution::ActionExecutionState::new();
    state.begin(ATTACK, 0.0, None);

    sampler.record_sample(0.0);
    let mut sampled = 0;
    for now in [0.1, 0.4] {
        if sampler.should_sample(&state, now) {
            sampler.record_sample(now);
            sampled += 1;
        }
    }
    assert!(sampled < 2);
    assert!(sampler.should_sample(&state, sampler.last_sample().unwrap() + 0.6));
}

#[test]
fn adaptive_speed_for_every_registered_action() {
    let catalog = catalog();
    let mut state = ranni_core::execution::ActionExecutionState::new();
    for def in catalog.iter() {
        let Some(phases) = def.phases else {
            continue;
        };
        state.begin(def.id, 0.0, None);
        let s = SteppingStrategy::Adaptive;
        let mid_startup = phases.startup / 2.0;
        let mid_active = phases.startup + phases.active / 2.0;
        let mid_recovery = phases.active_end() + phases.recovery / 2.0;
        assert_eq!(speed::compute_speed_factor(s, &state, def, mid_startup), 0.5);
        assert_eq!(speed::compute_speed_factor(s, &state, def, mid_active), 1.0);
        assert_eq!(speed::compute_speed_factor(s, &state, def, mid_recovery), 0.7);
        state.reset();
        assert_eq!(speed::compute_speed_factor(s, &state, def, mid_active), 1.0);
    }
}

#[tokio::test]
async fn manual_clock_drives_the_poll_loop() {
    let clock = ManualClock::default();
    let mut orch = StepOrchestrator::new(
        catalog(),
        environment(true),
        ScriptedTarget::new(),
        clock.clone(),
    );

    let result = orch.step(DODGE).await.unwrap();

    assert!(clock.now() >= 0.8);
    assert!(clock.now() < 0.8 + 0.05);
    assert!(result.info.elapsed >= 0.8);
}
