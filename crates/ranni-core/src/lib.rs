//! Action timing, interruption, and step orchestration for the Ranni engine.
//!
//! This crate turns a continuously running target process into a
//! discrete-time decision loop. One agent request per step; the target keeps
//! animating in real time, and the engine decides when a request may cut the
//! action in flight, how fast the target's clock should run, and when a
//! fresh observation counts as a sample.
//!
//! # Modules
//!
//! - [`catalog`] -- Validated registry of action definitions.
//! - [`execution`] -- The mutable record of the action in flight.
//! - [`phase`] -- Animation phase and progress derived from elapsed time.
//! - [`interrupt`] -- The two-tier interruption policy.
//! - [`speed`] -- Clock-speed directives per stepping strategy.
//! - [`sampler`] -- Observation sampling decisions.
//! - [`completion`] -- Per-category completion detectors.
//! - [`clock`] -- Injectable time source and sleep primitive.
//! - [`target`] -- [`TargetProcess`] collaborator boundary and [`ScriptedTarget`].
//! - [`input`] -- Ledger of keys currently held down.
//! - [`reward`] -- Pluggable reward and termination functions.
//! - [`normalize`] -- Numeric attribute normalization.
//! - [`config`] -- Configuration loading from `ranni-config.yaml`.
//! - [`orchestrator`] -- The step state machine.
//! - [`episode`] -- Episode driver with a step budget.
//!
//! [`TargetProcess`]: target::TargetProcess
//! [`ScriptedTarget`]: target::ScriptedTarget

pub mod catalog;
pub mod clock;
pub mod completion;
pub mod config;
pub mod episode;
pub mod execution;
pub mod input;
pub mod interrupt;
pub mod normalize;
pub mod orchestrator;
pub mod phase;
pub mod reward;
pub mod sampler;
pub mod speed;
pub mod target;
