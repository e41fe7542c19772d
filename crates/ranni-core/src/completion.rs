//! Completion detectors: when is the action in flight done?
//!
//! Every action completes once its declared duration has elapsed. A
//! detector may add an earlier signal from the target. The built-in one for
//! `Combat` watches the player's animation id: when it differs from the id
//! captured right after dispatch, the swing is treated as finished.
//!
//! Detectors are registered per [`ActionCategory`] in a
//! [`CompletionDetectors`] table; categories without an entry fall back to
//! [`ElapsedCompletion`].

use std::collections::BTreeMap;
use std::fmt;

use ranni_types::{ActionCategory, ActionDefinition};

use crate::execution::Execution;

/// What a detector sees on each check.
#[derive(Debug, Clone, Copy)]
pub struct CompletionContext<'a> {
    /// The action in flight.
    pub execution: &'a Execution,
    /// Its definition.
    pub definition: &'a ActionDefinition,
    /// Current clock time, in seconds.
    pub now: f64,
    /// Latest animation id read from the target, when the detector asked for
    /// one and the read succeeded.
    pub animation: Option<i64>,
}

impl CompletionContext<'_> {
    /// Whether the declared duration has fully elapsed.
    pub fn duration_elapsed(&self) -> bool {
        self.execution.elapsed(self.now) >= self.definition.duration
    }
}

/// Decides whether an executing action has completed.
pub trait CompletionDetector: fmt::Debug + Send + Sync {
    /// Whether the orchestrator must read the animation id for this
    /// detector (once after dispatch as the baseline, then on every check).
    fn needs_animation(&self) -> bool {
        false
    }

    /// Whether the action described by `context` is done.
    fn is_complete(&self, context: &CompletionContext<'_>) -> bool;
}

/// Completes when the declared duration has elapsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElapsedCompletion;

impl CompletionDetector for ElapsedCompletion {
    fn is_complete(&self, context: &CompletionContext<'_>) -> bool {
        context.duration_elapsed()
    }
}

/// Completes when the duration has elapsed or the animation id moved away
/// from the baseline captured at dispatch.
///
/// This is a heuristic: an animation change usually means the action ended,
/// but a hit-stun or a chained animation also changes the id.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimationChangeCompletion;

impl CompletionDetector for AnimationChangeCompletion {
    fn needs_animation(&self) -> bool {
        true
    }

    fn is_complete(&self, context: &CompletionContext<'_>) -> bool {
        if context.duration_elapsed() {
            return true;
        }
        match (context.execution.baseline_animation, context.animation) {
            (Some(baseline), Some(latest)) => baseline != latest,
            _ => false,
        }
    }
}

/// Per-category detector table.
#[derive(Debug)]
pub struct CompletionDetectors {
    by_category: BTreeMap<ActionCategory, Box<dyn CompletionDetector>>,
    fallback: ElapsedCompletion,
}

impl Default for CompletionDetectors {
    /// `Combat` uses [`AnimationChangeCompletion`]; everything else
    /// completes on elapsed time.
    fn default() -> Self {
        Self::elapsed_only().with(ActionCategory::Combat, AnimationChangeCompletion)
    }
}

impl CompletionDetectors {
    /// Every category completes on elapsed time only.
    pub fn elapsed_only() -> Self {
        Self {
            by_category: BTreeMap::new(),
            fallback: ElapsedCompletion,
        }
    }

    /// Register `detector` for `category`, replacing any earlier one.
    #[must_use]
    pub fn with(
        mut self,
        category: ActionCategory,
        detector: impl CompletionDetector + 'static,
    ) -> Self {
        self.by_category.insert(category, Box::new(detector));
        self
    }

    /// The detector responsible for `category`.
    pub fn for_category(&self, category: ActionCategory) -> &dyn CompletionDetector {
        match self.by_category.get(&category) {
            Some(detector) => detector.as_ref(),
            None => &self.fallback,
        }
    }
}
