//! Target process boundary and an in-memory scripted target.
//!
//! The orchestrator talks to the running process only through
//! [`TargetProcess`]: input dispatch, clock speed, attribute reads and
//! writes, and frame capture. The wire protocol behind it is somebody
//! else's problem.
//!
//! [`ScriptedTarget`] implements the trait without any process behind it.
//! Attribute values can be scripted as sequences (each read consumes one
//! value, the last one repeats), failures can be injected per operation,
//! and every mutating call is recorded for inspection.

use std::collections::{BTreeMap, VecDeque};

use ranni_types::{AttributeValue, Frame};

/// Attribute toggling clock-speed override on the target.
pub const SPEED_FLAG_ATTRIBUTE: &str = "gameSpeedFlag";

/// Attribute carrying the clock-speed factor.
pub const SPEED_VALUE_ATTRIBUTE: &str = "gameSpeedVal";

/// Errors raised at the target boundary. None of them are retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoundaryError {
    /// The target does not expose the requested attribute.
    #[error("attribute not found: {name}")]
    AttributeNotFound {
        /// Attribute name that was requested.
        name: String,
    },

    /// The target could not produce a frame.
    #[error("frame capture failed: {reason}")]
    CaptureFailure {
        /// Description of the failure.
        reason: String,
    },

    /// The connection to the target is gone.
    #[error("connection to target lost: {reason}")]
    ConnectionLost {
        /// Description of the failure.
        reason: String,
    },

    /// The target refused an input.
    #[error("input {keys:?} rejected: {reason}")]
    InputRejected {
        /// Keys in the rejected input.
        keys: Vec<String>,
        /// Description of the failure.
        reason: String,
    },
}

/// The running process the agent controls.
///
/// One orchestrator owns its target exclusively; implementations need no
/// internal synchronization.
#[allow(async_fn_in_trait)]
pub trait TargetProcess {
    /// Press `keys` together for `hold_ms`, then wait `delay_ms`.
    async fn dispatch_input(
        &mut self,
        keys: &[String],
        hold_ms: u64,
        delay_ms: u64,
    ) -> Result<(), BoundaryError>;

    /// Press (`pressed = true`) or release a single key.
    async fn toggle_key(&mut self, key: &str, pressed: bool) -> Result<(), BoundaryError>;

    /// Read a named attribute.
    async fn get_attribute(&mut self, name: &str) -> Result<AttributeValue, BoundaryError>;

    /// Write a named attribute.
    async fn set_attribute(&mut self, name: &str, value: AttributeValue)
    -> Result<(), BoundaryError>;

    /// Capture the current frame.
    async fn capture_frame(&mut self) -> Result<Frame, BoundaryError>;

    /// Scale the target's clock by `factor` (1.0 is normal speed).
    ///
    /// The default enables the speed override and writes the factor through
    /// [`SPEED_FLAG_ATTRIBUTE`] and [`SPEED_VALUE_ATTRIBUTE`].
    async fn set_clock_speed(&mut self, factor: f64) -> Result<(), BoundaryError> {
        self.set_attribute(SPEED_FLAG_ATTRIBUTE, AttributeValue::Int(1))
            .await?;
        self.set_attribute(SPEED_VALUE_ATTRIBUTE, AttributeValue::Float(factor))
            .await
    }
}

/// A mutating call observed by a [`ScriptedTarget`].
#[derive(Debug, Clone, PartialEq)]
pub enum TargetCall {
    /// `dispatch_input` succeeded.
    Dispatch {
        /// Keys pressed.
        keys: Vec<String>,
        /// Hold time in milliseconds.
        hold_ms: u64,
        /// Delay after release in milliseconds.
        delay_ms: u64,
    },
    /// `toggle_key` succeeded.
    Toggle {
        /// Key toggled.
        key: String,
        /// New key state.
        pressed: bool,
    },
    /// `set_attribute` succeeded.
    SetAttribute {
        /// Attribute written.
        name: String,
        /// Value written.
        value: AttributeValue,
    },
    /// `capture_frame` succeeded.
    Capture,
}

/// In-memory target driven by a script.
#[derive(Debug, Clone)]
pub struct ScriptedTarget {
    attributes: BTreeMap<String, VecDeque<AttributeValue>>,
    frame: Frame,
    calls: Vec<TargetCall>,
    reject_input: Option<String>,
    capture_failure: Option<String>,
    disconnected: Option<String>,
}

impl Default for ScriptedTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTarget {
    /// An empty target with a 1x1 black RGB frame.
    pub fn new() -> Self {
        Self {
            attributes: BTreeMap::new(),
            frame: Frame {
                pixels: vec![0; 3],
                width: 1,
                height: 1,
                channels: 3,
            },
            calls: Vec::new(),
            reject_input: None,
            capture_failure: None,
            disconnected: None,
        }
    }

    /// Builder form of [`ScriptedTarget::script`].
    #[must_use]
    pub fn with_attribute(mut self, name: &str, values: Vec<AttributeValue>) -> Self {
        self.script(name, values);
        self
    }

    /// Builder form of [`ScriptedTarget::set_frame`].
    #[must_use]
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    /// Script the values successive reads of `name` return. The last value
    /// repeats. An empty script removes the attribute.
    pub fn script(&mut self, name: &str, values: Vec<AttributeValue>) {
        if values.is_empty() {
            self.attributes.remove(name);
        } else {
            self.attributes.insert(name.to_owned(), values.into());
        }
    }

    /// Replace the frame returned by captures.
    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    /// Make input calls fail with [`BoundaryError::InputRejected`] until
    /// [`ScriptedTarget::heal`] is called.
    pub fn reject_input(&mut self, reason: &str) {
        self.reject_input = Some(reason.to_owned());
    }

    /// Make captures fail with [`BoundaryError::CaptureFailure`].
    pub fn break_capture(&mut self, reason: &str) {
        self.capture_failure = Some(reason.to_owned());
    }

    /// Make every call fail with [`BoundaryError::ConnectionLost`].
    pub fn disconnect(&mut self, reason: &str) {
        self.disconnected = Some(reason.to_owned());
    }

    /// Clear every injected failure.
    pub fn heal(&mut self) {
        self.reject_input = None;
        self.capture_failure = None;
        self.disconnected = None;
    }

    /// Every successful mutating call, oldest first.
    pub fn calls(&self) -> &[TargetCall] {
        &self.calls
    }

    /// Forget the call log.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Keys of every successful `dispatch_input`, oldest first.
    pub fn dispatches(&self) -> Vec<Vec<String>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                TargetCall::Dispatch { keys, .. } => Some(keys.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every clock-speed factor written, oldest first.
    pub fn speed_directives(&self) -> Vec<f64> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                TargetCall::SetAttribute { name, value } if name == SPEED_VALUE_ATTRIBUTE => {
                    value.as_f64()
                }
                _ => None,
            })
            .collect()
    }

    /// Keys currently pressed through `toggle_key`, in key order.
    pub fn pressed_keys(&self) -> Vec<String> {
        let mut state: BTreeMap<&str, bool> = BTreeMap::new();
        for call in &self.calls {
            if let TargetCall::Toggle { key, pressed } = call {
                state.insert(key.as_str(), *pressed);
            }
        }
        state
            .into_iter()
            .filter(|&(_, pressed)| pressed)
            .map(|(key, _)| key.to_owned())
            .collect()
    }

    fn check_connected(&self) -> Result<(), BoundaryError> {
        self.disconnected
            .as_ref()
            .map_or(Ok(()), |reason| {
                Err(BoundaryError::ConnectionLost {
                    reason: reason.clone(),
                })
            })
    }

    fn check_input(&self, keys: &[String]) -> Result<(), BoundaryError> {
        self.check_connected()?;
        self.reject_input.as_ref().map_or(Ok(()), |reason| {
            Err(BoundaryError::InputRejected {
                keys: keys.to_vec(),
                reason: reason.clone(),
            })
        })
    }
}

impl TargetProcess for ScriptedTarget {
    async fn dispatch_input(
        &mut self,
        keys: &[String],
        hold_ms: u64,
        delay_ms: u64,
    ) -> Result<(), BoundaryError> {
        self.check_input(keys)?;
        self.calls.push(TargetCall::Dispatch {
            keys: keys.to_vec(),
            hold_ms,
            delay_ms,
        });
        Ok(())
    }

    async fn toggle_key(&mut self, key: &str, pressed: bool) -> Result<(), BoundaryError> {
        self.check_input(&[key.to_owned()])?;
        self.calls.push(TargetCall::Toggle {
            key: key.to_owned(),
            pressed,
        });
        Ok(())
    }

    async fn get_attribute(&mut self, name: &str) -> Result<AttributeValue, BoundaryError> {
        self.check_connected()?;
        let values = self
            .attributes
            .get_mut(name)
            .ok_or_else(|| BoundaryError::AttributeNotFound {
                name: name.to_owned(),
            })?;
        let value = if values.len() > 1 {
            values.pop_front()
        } else {
            values.front().cloned()
        };
        value.ok_or_else(|| BoundaryError::AttributeNotFound {
            name: name.to_owned(),
        })
    }

    async fn set_attribute(
        &mut self,
        name: &str,
        value: AttributeValue,
    ) -> Result<(), BoundaryError> {
        self.check_connected()?;
        self.attributes
            .insert(name.to_owned(), VecDeque::from([value.clone()]));
        self.calls.push(TargetCall::SetAttribute {
            name: name.to_owned(),
            value,
        });
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<Frame, BoundaryError> {
        self.check_connected()?;
        if let Some(reason) = &self.capture_failure {
            return Err(BoundaryError::CaptureFailure {
                reason: reason.clone(),
            });
        }
        self.calls.push(TargetCall::Capture);
        Ok(self.frame.clone())
    }
}
