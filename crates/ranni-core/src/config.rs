//! Configuration loading and typed config structures for the Ranni engine.
//!
//! The configuration lives in `ranni-config.yaml` at the project root. Every
//! field has a default, so an empty file (or no file at all) yields a
//! working setup with the built-in action catalog.
//!
//! `RANNI_AGENT_FREQUENCY_HZ` overrides `environment.agent_frequency_hz`
//! when set to a number.

use std::collections::BTreeMap;
use std::path::Path;

use ranni_types::{
    ActionCategory, ActionDefinition, ActionId, AttributeKind, InputBinding, PhaseBreakdown,
    SamplingStrategy, SteppingStrategy,
};
use serde::Deserialize;
use tracing::warn;

use crate::catalog::{ActionCatalog, CatalogError};
use crate::reward::{DuelReward, RewardFunction, ScoreDeltaReward};

/// Environment variable overriding the agent frequency.
pub const AGENT_FREQUENCY_ENV: &str = "RANNI_AGENT_FREQUENCY_HZ";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },

    /// The configured action list does not form a valid catalog.
    #[error("invalid action catalog: {source}")]
    Catalog {
        /// The underlying catalog error.
        #[from]
        source: CatalogError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RanniConfig {
    /// Step timing, strategies and snapshot contents.
    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Episode driver settings.
    #[serde(default)]
    pub episode: EpisodeConfig,

    /// Reward function selection.
    #[serde(default)]
    pub reward: RewardConfig,

    /// Action table, in id order. Empty means the built-in catalog.
    #[serde(default)]
    pub actions: Vec<ActionConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RanniConfig {
    /// Load configuration from a YAML file at the given path, apply
    /// environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, apply environment overrides
    /// and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.environment.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let env = &self.environment;
        if !env.agent_frequency_hz.is_finite() || env.agent_frequency_hz <= 0.0 {
            return Err(invalid(format!(
                "environment.agent_frequency_hz must be positive, got {}",
                env.agent_frequency_hz
            )));
        }
        if !env.max_action_duration_secs.is_finite() || env.max_action_duration_secs < 0.0 {
            return Err(invalid(format!(
                "environment.max_action_duration_secs must be non-negative, got {}",
                env.max_action_duration_secs
            )));
        }
        if env.poll_interval_ms == 0 {
            return Err(invalid(
                "environment.poll_interval_ms must be at least 1".to_owned(),
            ));
        }
        for (name, &(min, max)) in &env.attribute_ranges {
            if !(min.is_finite() && max.is_finite()) || min > max {
                return Err(invalid(format!(
                    "environment.attribute_ranges.{name} must be a finite [min, max] pair"
                )));
            }
        }
        if self.episode.max_steps == 0 {
            return Err(invalid("episode.max_steps must be at least 1".to_owned()));
        }
        Ok(())
    }

    /// Build the action catalog: the configured table, or the built-in one
    /// when none is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Catalog`] if the table is invalid.
    pub fn catalog(&self) -> Result<ActionCatalog, ConfigError> {
        if self.actions.is_empty() {
            return Ok(ActionCatalog::builtin()?);
        }
        let definitions = self
            .actions
            .iter()
            .cloned()
            .map(ActionConfig::into_definition)
            .collect();
        Ok(ActionCatalog::from_ordered(definitions)?)
    }
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid { reason }
}

/// What to do when a snapshot attribute cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAttributePolicy {
    /// Substitute the zero value of the attribute's kind and log a warning.
    #[default]
    DefaultZero,
    /// Abort the step with the read error.
    Fail,
}

/// An attribute to read into every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttributeConfig {
    /// Attribute name on the target.
    pub name: String,

    /// Kind used for the zero value when the attribute is missing.
    #[serde(default = "default_attribute_kind")]
    pub kind: AttributeKind,
}

impl AttributeConfig {
    /// An integer attribute.
    pub fn int(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: AttributeKind::Int,
        }
    }
}

/// Step timing and snapshot configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnvironmentConfig {
    /// Decision rate of the calling policy, in Hz.
    #[serde(default = "default_agent_frequency_hz")]
    pub agent_frequency_hz: f64,

    /// Upper bound on how long one step waits for an action, in seconds.
    #[serde(default = "default_max_action_duration_secs")]
    pub max_action_duration_secs: f64,

    /// Sleep between completion checks in the poll loop, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Whether `step` waits for the dispatched action to finish. When
    /// false, actions stay in flight across steps and later requests go
    /// through the interruption policy.
    #[serde(default = "default_true")]
    pub wait_for_completion: bool,

    /// Clock throttling strategy.
    #[serde(default)]
    pub stepping: SteppingStrategy,

    /// Skip a speed directive when it matches the last factor sent. When
    /// off, the factor is re-sent on every poll tick.
    #[serde(default)]
    pub dedupe_speed_directives: bool,

    /// Observation sampling strategy.
    #[serde(default)]
    pub sampling: SamplingStrategy,

    /// Behavior when a snapshot attribute is missing.
    #[serde(default)]
    pub missing_attributes: MissingAttributePolicy,

    /// Attribute holding the player's animation id, read by animation-based
    /// completion detectors. `None` disables them.
    #[serde(default = "default_animation_attribute")]
    pub animation_attribute: Option<String>,

    /// Attributes read into every snapshot.
    #[serde(default = "default_attributes")]
    pub attributes: Vec<AttributeConfig>,

    /// Whether snapshots capture a frame.
    #[serde(default = "default_true")]
    pub capture_frames: bool,

    /// Whether observation attributes are normalized into `[0, 1]`.
    #[serde(default)]
    pub normalize_attributes: bool,

    /// Fixed `[min, max]` ranges for normalization; other attributes use
    /// their observed range.
    #[serde(default)]
    pub attribute_ranges: BTreeMap<String, (f64, f64)>,
}

impl EnvironmentConfig {
    /// Apply `RANNI_AGENT_FREQUENCY_HZ` when it is set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides read through `lookup`, which maps a variable name to
    /// its value. Non-numeric values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup(AGENT_FREQUENCY_ENV) {
            match val.trim().parse::<f64>() {
                Ok(hz) => self.agent_frequency_hz = hz,
                Err(err) => warn!(
                    variable = AGENT_FREQUENCY_ENV,
                    value = %val,
                    error = %err,
                    "Ignoring non-numeric override"
                ),
            }
        }
    }

    /// Seconds between agent decisions.
    pub fn agent_interval_secs(&self) -> f64 {
        self.agent_frequency_hz.recip()
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            agent_frequency_hz: default_agent_frequency_hz(),
            max_action_duration_secs: default_max_action_duration_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            wait_for_completion: true,
            stepping: SteppingStrategy::default(),
            dedupe_speed_directives: false,
            sampling: SamplingStrategy::default(),
            missing_attributes: MissingAttributePolicy::default(),
            animation_attribute: default_animation_attribute(),
            attributes: default_attributes(),
            capture_frames: true,
            normalize_attributes: false,
            attribute_ranges: BTreeMap::new(),
        }
    }
}

/// Episode driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EpisodeConfig {
    /// Number of episodes the engine runs.
    #[serde(default = "default_episodes")]
    pub episodes: u32,

    /// Step budget per episode; reaching it truncates the episode.
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,

    /// Seed for the random policy.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            episodes: default_episodes(),
            max_steps: default_max_steps(),
            seed: default_seed(),
        }
    }
}

/// Reward function selection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewardConfig {
    /// [`ScoreDeltaReward`].
    ScoreDelta {
        /// Score attribute name.
        #[serde(default = "default_score_key")]
        score_key: String,
    },
    /// [`DuelReward`].
    Duel {
        /// Player hp attribute name.
        #[serde(default = "default_player_hp")]
        player_hp: String,
        /// Opponent hp attribute name.
        #[serde(default = "default_target_hp")]
        target_hp: String,
        /// Weight of damage dealt.
        #[serde(default = "default_weight")]
        damage_dealt_weight: f64,
        /// Weight of damage taken.
        #[serde(default = "default_weight")]
        damage_taken_weight: f64,
    },
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self::ScoreDelta {
            score_key: default_score_key(),
        }
    }
}

impl RewardConfig {
    /// Instantiate the selected reward function.
    pub fn build(&self) -> Box<dyn RewardFunction> {
        match self {
            Self::ScoreDelta { score_key } => Box::new(ScoreDeltaReward::new(score_key)),
            Self::Duel {
                player_hp,
                target_hp,
                damage_dealt_weight,
                damage_taken_weight,
            } => Box::new(DuelReward {
                player_hp: player_hp.clone(),
                target_hp: target_hp.clone(),
                damage_dealt_weight: *damage_dealt_weight,
                damage_taken_weight: *damage_taken_weight,
            }),
        }
    }
}

/// One action in the configured table. Ids follow list order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionConfig {
    /// Unique action name.
    pub name: String,
    /// Interruption priority category.
    pub category: ActionCategory,
    /// Total duration in seconds.
    pub duration: f64,
    /// Advertised interruptibility (informational).
    #[serde(default)]
    pub interruptible: bool,
    /// Optional phase breakdown.
    #[serde(default)]
    pub phases: Option<PhaseBreakdown>,
    /// Input binding; omitted means the no-op.
    #[serde(default)]
    pub input: InputBinding,
}

impl ActionConfig {
    fn into_definition(self) -> ActionDefinition {
        ActionDefinition {
            id: ActionId(0),
            name: self.name,
            category: self.category,
            duration: self.duration,
            interruptible: self.interruptible,
            phases: self.phases,
            input: self.input,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_agent_frequency_hz() -> f64 {
    5.0
}

const fn default_max_action_duration_secs() -> f64 {
    3.0
}

const fn default_poll_interval_ms() -> u64 {
    16
}

#[allow(clippy::unnecessary_wraps)]
fn default_animation_attribute() -> Option<String> {
    Some("HeroAnimId".to_owned())
}

fn default_attributes() -> Vec<AttributeConfig> {
    ["HeroHp", "HeroMaxHp", "NpcHp", "NpcMaxHp"]
        .into_iter()
        .map(AttributeConfig::int)
        .collect()
}

const fn default_attribute_kind() -> AttributeKind {
    AttributeKind::Int
}

const fn default_episodes() -> u32 {
    1
}

const fn default_max_steps() -> u64 {
    1000
}

const fn default_seed() -> u64 {
    42
}

fn default_score_key() -> String {
    "score".to_owned()
}

fn default_player_hp() -> String {
    "HeroHp".to_owned()
}

fn default_target_hp() -> String {
    "NpcHp".to_owned()
}

const fn default_weight() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn frequency_override_replaces_configured_value() {
        let mut env = EnvironmentConfig::default();
        env.apply_overrides(|name| (name == AGENT_FREQUENCY_ENV).then(|| " 12.5 ".to_owned()));
        assert!((env.agent_frequency_hz - 12.5).abs() < f64::EPSILON);
        assert!((env.agent_interval_secs() - 0.08).abs() < 1e-12);
    }

    #[test]
    fn non_numeric_frequency_override_is_ignored() {
        let mut env = EnvironmentConfig::default();
        env.apply_overrides(|_| Some("fast".to_owned()));
        assert!((env.agent_frequency_hz - 5.0).abs() < f64::EPSILON);

        env.apply_overrides(|_| None);
        assert!((env.agent_frequency_hz - 5.0).abs() < f64::EPSILON);
        assert!(!env.dedupe_speed_directives);
    }

    #[test]
    fn default_config_is_valid() {
        let config = RanniConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.environment.agent_frequency_hz - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.environment.poll_interval_ms, 16);
        assert_eq!(config.environment.stepping, SteppingStrategy::Adaptive);
        assert_eq!(config.environment.sampling, SamplingStrategy::Smart);
        assert!(config.environment.wait_for_completion);
        assert_eq!(config.episode.max_steps, 1000);
        assert_eq!(config.catalog().unwrap().len(), 16);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
environment:
  agent_frequency_hz: 2.0
  max_action_duration_secs: 1.5
  poll_interval_ms: 10
  wait_for_completion: false
  stepping: pause
  dedupe_speed_directives: true
  sampling: completion
  missing_attributes: fail
  animation_attribute: null
  capture_frames: false
  attributes:
    - name: HeroHp
    - name: Stamina
      kind: float
  normalize_attributes: true
  attribute_ranges:
    HeroHp: [0.0, 1900.0]

episode:
  episodes: 3
  max_steps: 50
  seed: 7

reward:
  kind: duel
  damage_taken_weight: 2.0

actions:
  - name: idle
    category: instant
    duration: 0.0
  - name: attack
    category: combat
    duration: 1.5
    phases: { startup: 0.4, active: 0.3, recovery: 0.8 }
    input: { mode: tap, keys: [lmb] }
  - name: walk
    category: movement
    duration: 0.5
    interruptible: true
    input: { mode: hold, keys: [w] }

logging:
  level: debug
"#;
        let config = RanniConfig::parse(yaml).unwrap();
        let env = &config.environment;
        assert_eq!(env.stepping, SteppingStrategy::Pause);
        assert!(env.dedupe_speed_directives);
        assert_eq!(env.sampling, SamplingStrategy::OnCompletion);
        assert_eq!(env.missing_attributes, MissingAttributePolicy::Fail);
        assert_eq!(env.animation_attribute, None);
        assert!(!env.wait_for_completion);
        assert_eq!(env.attributes.len(), 2);
        assert_eq!(env.attributes.get(1).map(|a| a.kind), Some(AttributeKind::Float));
        assert_eq!(env.attribute_ranges.get("HeroHp"), Some(&(0.0, 1900.0)));
        assert_eq!(config.episode.episodes, 3);
        assert_eq!(config.logging.level, "debug");
        assert!(matches!(
            config.reward,
            RewardConfig::Duel { damage_taken_weight, .. } if (damage_taken_weight - 2.0).abs() < f64::EPSILON
        ));

        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.len(), 3);
        let attack = catalog.find_by_name("attack").unwrap();
        assert_eq!(attack.id, ActionId(1));
        assert_eq!(catalog.noop(), Some(ActionId(0)));
    }

    #[test]
    fn parse_empty_yaml() {
        let config = RanniConfig::parse("").unwrap();
        assert_eq!(config, RanniConfig::default());
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = RanniConfig::parse("episode:\n  max_steps: 5\n").unwrap();
        assert_eq!(config.episode.max_steps, 5);
        assert_eq!(config.environment, EnvironmentConfig::default());
    }

    #[test]
    fn invalid_values_rejected() {
        let err = RanniConfig::parse("environment:\n  poll_interval_ms: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = RanniConfig::parse("environment:\n  max_action_duration_secs: -1.0\n")
            .unwrap_err();
        assert!(err.to_string().contains("max_action_duration_secs"));
    }

    #[test]
    fn unknown_strategy_is_a_yaml_error() {
        let err = RanniConfig::parse("environment:\n  stepping: turbo\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn bad_phase_table_fails_catalog() {
        let yaml = r"
actions:
  - name: attack
    category: combat
    duration: 1.5
    phases: { startup: 0.4, active: 0.3, recovery: 0.5 }
    input: { mode: tap, keys: [lmb] }
";
        let config = RanniConfig::parse(yaml).unwrap();
        assert!(matches!(config.catalog(), Err(ConfigError::Catalog { .. })));
    }

    #[test]
    fn reward_config_builds_matching_function() {
        let reward = RewardConfig::default().build();
        assert_eq!(reward.attributes(), vec!["score".to_owned()]);
    }
}
