//! Per-step observation types.
//!
//! A step produces a [`StepResult`]: an [`Observation`] (frame, numeric
//! attributes, and execution-state fields), a reward, termination and
//! truncation flags, and a [`StepInfo`] with the raw attribute values and
//! step metadata. The caller owns the result once the step returns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{Admission, AnimationPhase, LifecycleState};
use crate::ids::ActionId;

/// The wire kind of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Signed integer.
    Int,
    /// Floating point.
    Float,
    /// Raw bytes.
    Bytes,
}

/// A value read from (or written to) the target process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Signed integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Raw byte array.
    Bytes(Vec<u8>),
}

impl AttributeValue {
    /// The kind tag of this value.
    pub const fn kind(&self) -> AttributeKind {
        match self {
            Self::Int(_) => AttributeKind::Int,
            Self::Float(_) => AttributeKind::Float,
            Self::Bytes(_) => AttributeKind::Bytes,
        }
    }

    /// The zero value of a kind, used when a missing attribute is defaulted.
    pub const fn zero(kind: AttributeKind) -> Self {
        match kind {
            AttributeKind::Int => Self::Int(0),
            AttributeKind::Float => Self::Float(0.0),
            AttributeKind::Bytes => Self::Bytes(Vec::new()),
        }
    }

    /// Numeric view of the value; `None` for bytes.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Bytes(_) => None,
        }
    }

    /// Integer view of the value; `None` for floats and bytes.
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(_) | Self::Bytes(_) => None,
        }
    }
}

/// A captured frame from the target's display.
///
/// Pixel layout is whatever the capture collaborator produced; this crate
/// does not decode or convert it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Raw pixel bytes, row-major.
    pub pixels: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per pixel.
    pub channels: u8,
}

/// What the agent sees after a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Captured frame, if frame capture is enabled.
    pub frame: Option<Frame>,
    /// Numeric attributes by name (byte attributes are omitted).
    pub attributes: BTreeMap<String, f64>,
    /// Lifecycle state at the end of the step.
    pub action_state: LifecycleState,
    /// The action in flight, if any.
    pub current_action: Option<ActionId>,
    /// Fraction of the current action's duration elapsed, in `[0, 1]`.
    pub action_progress: f64,
    /// Number of requests waiting in the pending slot (0 or 1).
    pub pending_count: u32,
    /// Animation phase at the end of the step.
    pub animation_phase: AnimationPhase,
    /// Whether a priority-tier request could preempt the current action now.
    pub can_interrupt: bool,
}

/// Raw attribute values and step metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Zero-based step index within the episode (reset produces step 0).
    pub step: u64,
    /// Clock time at which the step finished, in seconds.
    pub timestamp: f64,
    /// Wall time spent inside the step, in seconds.
    pub elapsed: f64,
    /// The action the agent asked for.
    pub requested_action: Option<ActionId>,
    /// What happened to the request.
    pub admission: Option<Admission>,
    /// The action that was preempted by this request, if any.
    pub interrupted: Option<ActionId>,
    /// Whether this step counted as a fresh sample.
    pub sampled: bool,
    /// Raw attribute values as read from the target.
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl StepInfo {
    /// Numeric value of an attribute, if present and numeric.
    pub fn attribute_f64(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(AttributeValue::as_f64)
    }
}

/// The bundle returned from one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// The observation after the step.
    pub observation: Observation,
    /// Reward for the step (zero when the step did not sample).
    pub reward: f64,
    /// Whether the episode reached a terminal state.
    pub terminated: bool,
    /// Whether the episode was cut short by the caller's step budget.
    pub truncated: bool,
    /// Raw values and metadata.
    pub info: StepInfo,
}
