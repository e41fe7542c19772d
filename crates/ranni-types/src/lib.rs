//! Shared type definitions for the Ranni step-timing engine.
//!
//! This crate is the single source of truth for the data model shared by
//! the core engine and the binaries built on top of it.
//!
//! # Modules
//!
//! - [`ids`] -- Catalog action identifiers and episode identifiers
//! - [`enums`] -- Categories, lifecycle states, phases, and strategy selectors
//! - [`structs`] -- Action definitions, phase breakdowns, and input bindings
//! - [`observation`] -- Attribute values, frames, and the per-step result bundle

pub mod enums;
pub mod ids;
pub mod observation;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    ActionCategory, Admission, AnimationPhase, LifecycleState, SamplingStrategy,
    SteppingStrategy,
};
pub use ids::{ActionId, EpisodeId};
pub use observation::{AttributeKind, AttributeValue, Frame, Observation, StepInfo, StepResult};
pub use structs::{ActionDefinition, InputBinding, PhaseBreakdown};
