//! Step orchestrator: the step state machine.
//!
//! One [`StepOrchestrator`] owns the execution state, the target and the
//! clock of a single environment. Each [`StepOrchestrator::step`] runs the
//! cycle:
//!
//! 1. **Refresh** -- complete the action in flight if its detector says so.
//! 2. **Phase** -- recompute the animation phase.
//! 3. **Admission** -- a differing request either preempts the action in
//!    flight or lands in the single pending slot (latest wins).
//! 4. **Dispatch** -- when nothing is in flight, send the request.
//! 5. **Speed** -- send the clock-speed directive.
//! 6. **Poll** -- optionally wait for the action, re-checking completion and
//!    speed every poll interval; force completion at the wait bound.
//! 7. **Sample** -- fetch a snapshot, compute reward on sampled steps and
//!    termination on every step.
//!
//! Steps 1-4 are also available on their own as
//! [`StepOrchestrator::request`], which drives the timing policy without
//! waiting or sampling.
//!
//! Keys held by `Hold` bindings are released on completion, interruption,
//! reset, close and on every error returned from `request` or `step`.

use std::collections::BTreeMap;
use std::time::Duration;

use ranni_types::{
    ActionCategory, ActionDefinition, ActionId, Admission, AnimationPhase, AttributeKind,
    AttributeValue, Frame, InputBinding, Observation, StepInfo, StepResult,
};
use tracing::{debug, info, warn};

use crate::catalog::{ActionCatalog, CatalogError};
use crate::clock::Clock;
use crate::completion::{CompletionContext, CompletionDetectors};
use crate::config::{EnvironmentConfig, MissingAttributePolicy};
use crate::execution::{ActionExecutionState, Execution};
use crate::input::HeldKeys;
use crate::interrupt;
use crate::normalize::AttributeNormalizer;
use crate::phase;
use crate::reward::{RewardFunction, ScoreDeltaReward};
use crate::sampler::ObservationSampler;
use crate::speed::{self, NORMAL_SPEED};
use crate::target::{BoundaryError, TargetProcess};

/// Errors that abort a step. Nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// The requested (or in-flight) action is not in the catalog.
    #[error("catalog error: {source}")]
    Catalog {
        /// The underlying catalog error.
        #[from]
        source: CatalogError,
    },

    /// The target failed.
    #[error("target error: {source}")]
    Boundary {
        /// The underlying boundary error.
        #[from]
        source: BoundaryError,
    },
}

/// Result of the admission half of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionOutcome {
    /// What happened to the request.
    pub admission: Admission,
    /// The action preempted to make room, if any.
    pub interrupted: Option<ActionId>,
}

impl AdmissionOutcome {
    const fn new(admission: Admission) -> Self {
        Self {
            admission,
            interrupted: None,
        }
    }
}

/// Drives one environment's action timing against a target process.
#[derive(Debug)]
pub struct StepOrchestrator<T, C> {
    catalog: ActionCatalog,
    config: EnvironmentConfig,
    target: T,
    clock: C,
    state: ActionExecutionState,
    sampler: ObservationSampler,
    detectors: CompletionDetectors,
    reward: Box<dyn RewardFunction>,
    normalizer: Option<AttributeNormalizer>,
    held: HeldKeys,
    prev_info: Option<StepInfo>,
    last_speed: Option<f64>,
    step_count: u64,
}

impl<T: TargetProcess, C: Clock> StepOrchestrator<T, C> {
    /// Create an orchestrator with the default detectors (animation change
    /// for `Combat`) and [`ScoreDeltaReward`].
    pub fn new(catalog: ActionCatalog, config: EnvironmentConfig, target: T, clock: C) -> Self {
        let sampler = ObservationSampler::new(config.sampling, config.agent_frequency_hz);
        let normalizer = config
            .normalize_attributes
            .then(|| AttributeNormalizer::new(config.attribute_ranges.clone()));
        Self {
            catalog,
            config,
            target,
            clock,
            state: ActionExecutionState::new(),
            sampler,
            detectors: CompletionDetectors::default(),
            reward: Box::new(ScoreDeltaReward::default()),
            normalizer,
            held: HeldKeys::new(),
            prev_info: None,
            last_speed: None,
            step_count: 0,
        }
    }

    /// Replace the reward function.
    #[must_use]
    pub fn with_reward(mut self, reward: Box<dyn RewardFunction>) -> Self {
        self.reward = reward;
        self
    }

    /// Replace the completion detector table.
    #[must_use]
    pub fn with_detectors(mut self, detectors: CompletionDetectors) -> Self {
        self.detectors = detectors;
        self
    }

    /// The action catalog.
    pub const fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    /// The execution state.
    pub const fn state(&self) -> &ActionExecutionState {
        &self.state
    }

    /// The target process.
    pub const fn target(&self) -> &T {
        &self.target
    }

    /// Mutable access to the target, e.g. to script it between steps.
    pub const fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// The clock.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Keys currently held by `Hold` bindings.
    pub const fn held_keys(&self) -> &HeldKeys {
        &self.held
    }

    /// Number of steps since the last reset.
    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Current animation phase of the action in flight.
    pub fn animation_phase(&self) -> AnimationPhase {
        self.current_definition()
            .map_or(AnimationPhase::Idle, |def| {
                phase::compute_phase(&self.state, def, self.clock.now())
            })
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start a new episode: release held keys, restore normal speed, clear
    /// execution and sampling state, and return the initial observation.
    ///
    /// The returned result has step index 0, zero reward, and counts as a
    /// sample.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Boundary`] if the target fails.
    pub async fn reset(&mut self) -> Result<StepResult, StepError> {
        let result = self.reset_inner().await;
        self.release_after_error(result).await
    }

    async fn reset_inner(&mut self) -> Result<StepResult, StepError> {
        self.held.release_all(&mut self.target).await?;
        self.last_speed = None;
        self.send_speed(NORMAL_SPEED).await?;

        self.state.reset();
        self.sampler.reset();
        self.prev_info = None;
        self.step_count = 0;
        if let Some(normalizer) = &mut self.normalizer {
            normalizer.reset_observed();
        }

        let now = self.clock.now();
        let (frame, attributes) = self.snapshot().await?;
        let mut observation = self.build_observation(frame, &attributes, now);
        let info = StepInfo {
            step: 0,
            timestamp: now,
            elapsed: 0.0,
            requested_action: None,
            admission: None,
            interrupted: None,
            sampled: true,
            attributes,
        };
        let terminated = self.reward.is_done(&observation, &info);
        self.sampler.record_sample(now);
        self.prev_info = Some(info.clone());
        self.normalize(&mut observation);

        info!(actions = self.catalog.len(), "Environment reset");
        Ok(StepResult {
            observation,
            reward: 0.0,
            terminated,
            truncated: false,
            info,
        })
    }

    /// Release held keys and restore normal speed.
    ///
    /// Both are attempted even if the first fails.
    ///
    /// # Errors
    ///
    /// Returns the first [`StepError::Boundary`] raised by the target.
    pub async fn close(&mut self) -> Result<(), StepError> {
        let released = self.held.release_all(&mut self.target).await;
        self.last_speed = None;
        let restored = self.send_speed(NORMAL_SPEED).await;
        self.state.reset();
        info!("Environment closed");
        released?;
        restored
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    /// Run one full step for `action`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Catalog`] for an unknown action and
    /// [`StepError::Boundary`] if the target fails. Held keys are released
    /// before the error is returned.
    pub async fn step(&mut self, action: ActionId) -> Result<StepResult, StepError> {
        let result = self.step_inner(action).await;
        self.release_after_error(result).await
    }

    async fn step_inner(&mut self, action: ActionId) -> Result<StepResult, StepError> {
        let started = self.clock.now();
        let outcome = self.admit(action).await?;
        self.apply_speed().await?;

        if self.config.wait_for_completion {
            self.poll_until_settled().await?;
        }

        self.observe(action, outcome, started).await
    }

    /// Run only the admission half of a step (refresh, phase, admission,
    /// dispatch) for `action`.
    ///
    /// # Errors
    ///
    /// Same as [`StepOrchestrator::step`].
    pub async fn request(&mut self, action: ActionId) -> Result<AdmissionOutcome, StepError> {
        let result = self.admit(action).await;
        self.release_after_error(result).await
    }

    async fn admit(&mut self, action: ActionId) -> Result<AdmissionOutcome, StepError> {
        let requested = self.catalog.lookup(action)?.clone();
        self.refresh().await?;

        let mut interrupted = None;
        if let Some(current_id) = self.state.current_action() {
            if current_id == action {
                return Ok(AdmissionOutcome::new(Admission::Continued));
            }

            let now = self.clock.now();
            let current = self.catalog.lookup(current_id)?;
            if !interrupt::can_interrupt(&self.state, current, &requested, now) {
                let replaced = self.state.queue(action);
                debug!(
                    action = %action,
                    current = %current_id,
                    phase = ?phase::compute_phase(&self.state, current, now),
                    replaced = ?replaced,
                    "Request queued behind committed action"
                );
                return Ok(AdmissionOutcome::new(Admission::Queued));
            }

            let cut = self.interrupt_current().await?;
            interrupted = cut.map(|execution| execution.action);
            info!(action = %action, interrupted = %current_id, "Action interrupted");
        }

        if requested.is_noop() {
            self.state.settle();
            let _ = self.state.clear_pending();
            return Ok(AdmissionOutcome {
                admission: Admission::NoOp,
                interrupted,
            });
        }

        self.dispatch(&requested).await?;
        Ok(AdmissionOutcome {
            admission: Admission::Dispatched,
            interrupted,
        })
    }

    async fn dispatch(&mut self, definition: &ActionDefinition) -> Result<(), StepError> {
        match &definition.input {
            InputBinding::None => {}
            InputBinding::Tap {
                keys,
                hold_ms,
                delay_ms,
            } => {
                self.target
                    .dispatch_input(keys, *hold_ms, *delay_ms)
                    .await?;
            }
            InputBinding::Hold { keys } => {
                self.held.press(&mut self.target, keys).await?;
            }
        }

        let now = self.clock.now();
        let baseline = if self
            .detectors
            .for_category(definition.category)
            .needs_animation()
        {
            self.read_animation().await?
        } else {
            None
        };

        self.state.begin(definition.id, now, baseline);
        let _ = self.state.clear_pending();
        debug!(
            action = %definition.id,
            name = %definition.name,
            category = ?definition.category,
            baseline_animation = ?baseline,
            "Action dispatched"
        );
        Ok(())
    }

    /// Complete the action in flight if its detector says it is done.
    async fn refresh(&mut self) -> Result<(), StepError> {
        let Some(execution) = self.state.execution().copied() else {
            return Ok(());
        };
        let definition = self.catalog.lookup(execution.action)?.clone();
        let animation = if self
            .detectors
            .for_category(definition.category)
            .needs_animation()
        {
            self.read_animation().await?
        } else {
            None
        };

        let context = CompletionContext {
            execution: &execution,
            definition: &definition,
            now: self.clock.now(),
            animation,
        };
        if self
            .detectors
            .for_category(definition.category)
            .is_complete(&context)
        {
            let _ = self.complete_current().await?;
            debug!(
                action = %execution.action,
                elapsed = execution.elapsed(context.now),
                "Action completed"
            );
        }
        Ok(())
    }

    async fn poll_until_settled(&mut self) -> Result<(), StepError> {
        let Some(definition) = self.current_definition() else {
            return Ok(());
        };
        let bound = definition.duration.min(self.config.max_action_duration_secs);
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let loop_start = self.clock.now();

        while self.state.is_executing() && self.clock.now() - loop_start < bound {
            self.refresh().await?;
            if !self.state.is_executing() {
                break;
            }
            self.apply_speed().await?;
            self.clock.sleep(interval).await;
        }

        if self.state.is_executing() {
            self.refresh().await?;
        }
        if let Some(forced) = self.complete_current().await? {
            debug!(
                action = %forced.action,
                elapsed = forced.elapsed(self.clock.now()),
                "Forced completion at wait bound"
            );
        }
        self.apply_speed().await
    }

    async fn complete_current(&mut self) -> Result<Option<Execution>, StepError> {
        let finished = self.state.complete();
        if finished.is_some() {
            self.held.release_all(&mut self.target).await?;
        }
        Ok(finished)
    }

    async fn interrupt_current(&mut self) -> Result<Option<Execution>, StepError> {
        let finished = self.state.interrupt();
        if finished.is_some() {
            self.held.release_all(&mut self.target).await?;
        }
        Ok(finished)
    }

    // -----------------------------------------------------------------------
    // Speed
    // -----------------------------------------------------------------------

    async fn apply_speed(&mut self) -> Result<(), StepError> {
        let factor = self.current_definition().map_or(NORMAL_SPEED, |def| {
            speed::compute_speed_factor(self.config.stepping, &self.state, def, self.clock.now())
        });
        self.send_speed(factor).await
    }

    async fn send_speed(&mut self, factor: f64) -> Result<(), StepError> {
        if self.config.dedupe_speed_directives
            && self
                .last_speed
                .is_some_and(|last| (last - factor).abs() < f64::EPSILON)
        {
            return Ok(());
        }
        self.target.set_clock_speed(factor).await?;
        self.last_speed = Some(factor);
        debug!(factor, "Clock speed set");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    async fn observe(
        &mut self,
        action: ActionId,
        outcome: AdmissionOutcome,
        started: f64,
    ) -> Result<StepResult, StepError> {
        let now = self.clock.now();
        let sampled = self.sampler.should_sample(&self.state, now);
        let (frame, attributes) = self.snapshot().await?;
        let mut observation = self.build_observation(frame, &attributes, now);

        self.step_count = self.step_count.saturating_add(1);
        let info = StepInfo {
            step: self.step_count,
            timestamp: now,
            elapsed: (now - started).max(0.0),
            requested_action: Some(action),
            admission: Some(outcome.admission),
            interrupted: outcome.interrupted,
            sampled,
            attributes,
        };

        let reward = if sampled {
            self.reward
                .reward(&observation, &info, self.prev_info.as_ref())
        } else {
            0.0
        };
        let terminated = self.reward.is_done(&observation, &info);
        if sampled {
            self.sampler.record_sample(now);
            self.prev_info = Some(info.clone());
        }
        self.normalize(&mut observation);

        debug!(
            step = info.step,
            action = %action,
            admission = ?outcome.admission,
            state = ?observation.action_state,
            sampled,
            reward,
            terminated,
            "Step finished"
        );
        Ok(StepResult {
            observation,
            reward,
            terminated,
            truncated: false,
            info,
        })
    }

    async fn snapshot(
        &mut self,
    ) -> Result<(Option<Frame>, BTreeMap<String, AttributeValue>), StepError> {
        let mut wanted: Vec<(String, AttributeKind)> = self
            .config
            .attributes
            .iter()
            .map(|attr| (attr.name.clone(), attr.kind))
            .collect();
        for name in self.reward.attributes() {
            if !wanted.iter().any(|(known, _)| *known == name) {
                wanted.push((name, AttributeKind::Int));
            }
        }

        let mut attributes = BTreeMap::new();
        for (name, kind) in wanted {
            let value = match self.target.get_attribute(&name).await {
                Ok(value) => value,
                Err(BoundaryError::AttributeNotFound { .. })
                    if self.config.missing_attributes == MissingAttributePolicy::DefaultZero =>
                {
                    warn!(attribute = %name, "Attribute missing, substituting zero");
                    AttributeValue::zero(kind)
                }
                Err(err) => return Err(err.into()),
            };
            attributes.insert(name, value);
        }

        let frame = if self.config.capture_frames {
            Some(self.target.capture_frame().await?)
        } else {
            None
        };
        Ok((frame, attributes))
    }

    fn build_observation(
        &self,
        frame: Option<Frame>,
        attributes: &BTreeMap<String, AttributeValue>,
        now: f64,
    ) -> Observation {
        let numeric = attributes
            .iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name.clone(), v)))
            .collect();

        let (action_progress, animation_phase, can_interrupt) =
            self.current_definition().map_or((0.0, AnimationPhase::Idle, true), |def| {
                (
                    phase::action_progress(&self.state, def, now),
                    phase::compute_phase(&self.state, def, now),
                    interrupt::can_interrupt_with(&self.state, def, ActionCategory::Combat, now),
                )
            });

        Observation {
            frame,
            attributes: numeric,
            action_state: self.state.lifecycle_state(),
            current_action: self.state.current_action(),
            action_progress,
            pending_count: self.state.pending_count(),
            animation_phase,
            can_interrupt,
        }
    }

    fn normalize(&mut self, observation: &mut Observation) {
        if let Some(normalizer) = &mut self.normalizer {
            normalizer.apply(observation);
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn current_definition(&self) -> Option<&ActionDefinition> {
        self.state
            .current_action()
            .and_then(|id| self.catalog.lookup(id).ok())
    }

    /// Latest animation id, or `None` when no animation attribute is
    /// configured, the target does not expose it, or it is not an integer.
    async fn read_animation(&mut self) -> Result<Option<i64>, BoundaryError> {
        let Some(name) = &self.config.animation_attribute else {
            return Ok(None);
        };
        match self.target.get_attribute(name).await {
            Ok(value) => Ok(value.as_i64()),
            Err(BoundaryError::AttributeNotFound { .. }) => {
                debug!(attribute = %name, "Animation attribute unavailable");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn release_after_error<V>(
        &mut self,
        result: Result<V, StepError>,
    ) -> Result<V, StepError> {
        if result.is_err() && !self.held.is_empty() {
            if let Err(err) = self.held.release_all(&mut self.target).await {
                warn!(error = %err, "Failed to release held keys after step error");
            }
        }
        result
    }
}
