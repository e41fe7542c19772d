//! Demo binary for the Ranni engine.
//!
//! Runs seeded random-policy episodes against an in-process sparring target
//! on the wall clock, so every timing rule (interruption, speed directives,
//! sampling, completion) runs exactly as it would against a live process.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `RANNI_CONFIG` (default `ranni-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the action catalog
//! 4. Run the configured number of episodes
//! 5. Log each episode summary

mod error;
mod log_callback;
mod sparring;

use std::path::PathBuf;

use ranni_core::clock::SystemClock;
use ranni_core::config::RanniConfig;
use ranni_core::episode::{self, RandomPolicy};
use ranni_core::orchestrator::StepOrchestrator;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::log_callback::LogCallback;

/// Environment variable holding the config file path.
const CONFIG_PATH_ENV: &str = "RANNI_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is unset.
const DEFAULT_CONFIG_PATH: &str = "ranni-config.yaml";

/// Duel exchanges scripted into each sparring target.
const SPARRING_EXCHANGES: usize = 512;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging setup, or an episode fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_path, found) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .try_init()
        .map_err(|e| EngineError::Logging {
            message: format!("{e}"),
        })?;

    info!("ranni-engine starting");
    if found {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        agent_frequency_hz = config.environment.agent_frequency_hz,
        stepping = ?config.environment.stepping,
        sampling = ?config.environment.sampling,
        wait_for_completion = config.environment.wait_for_completion,
        episodes = config.episode.episodes,
        max_steps = config.episode.max_steps,
        "Environment configured"
    );

    // 3. Build the catalog.
    let catalog = config.catalog()?;
    let action_count = u16::try_from(catalog.len()).map_err(|e| EngineError::Policy {
        message: format!("{} actions exceed the policy's id range: {e}", catalog.len()),
    })?;
    info!(actions = action_count, "Action catalog ready");

    // 4. Run episodes.
    let mut total_reward = 0.0;
    for index in 0..config.episode.episodes {
        let seed = config.episode.seed.wrapping_add(u64::from(index));
        let target = sparring::sparring_target(seed, SPARRING_EXCHANGES);
        let mut env = StepOrchestrator::new(
            catalog.clone(),
            config.environment.clone(),
            target,
            SystemClock::new(),
        )
        .with_reward(config.reward.build());
        let mut policy = RandomPolicy::new(seed, action_count);
        let mut callback = LogCallback::new();

        let summary =
            episode::run_episode(&mut env, &mut policy, &mut callback, config.episode.max_steps)
                .await
                .map_err(EngineError::from)?;
        total_reward += summary.total_reward;

        // 5. Log the summary.
        info!(
            episode = index,
            seed,
            interruptions = callback.interruptions(),
            speed_directives = env.target().speed_directives().len(),
            "Episode complete"
        );
        match serde_json::to_string(&SummaryLine::from(&summary)) {
            Ok(line) => info!(summary = %line, "Episode summary"),
            Err(e) => warn!(error = %e, "failed to serialize episode summary"),
        }
    }

    info!(
        episodes = config.episode.episodes,
        total_reward, "ranni-engine shutdown complete"
    );
    Ok(())
}

/// Compact, frame-free view of an episode summary for the log.
#[derive(Debug, serde::Serialize)]
struct SummaryLine<'a> {
    id: String,
    end_reason: episode::EpisodeEndReason,
    steps: u64,
    total_reward: f64,
    final_attributes: &'a std::collections::BTreeMap<String, f64>,
    started_at: String,
    ended_at: String,
}

impl<'a> From<&'a episode::EpisodeSummary> for SummaryLine<'a> {
    fn from(summary: &'a episode::EpisodeSummary) -> Self {
        Self {
            id: summary.id.to_string(),
            end_reason: summary.end_reason,
            steps: summary.steps,
            total_reward: summary.total_reward,
            final_attributes: &summary.final_result.observation.attributes,
            started_at: summary.started_at.to_rfc3339(),
            ended_at: summary.ended_at.to_rfc3339(),
        }
    }
}

/// Load configuration from [`CONFIG_PATH_ENV`] or [`DEFAULT_CONFIG_PATH`].
///
/// Returns the config, the path consulted, and whether the file existed.
fn load_config() -> Result<(RanniConfig, PathBuf, bool), EngineError> {
    let path = std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        let config = RanniConfig::from_file(&path)?;
        Ok((config, path, true))
    } else {
        let config = RanniConfig::parse("")?;
        Ok((config, path, false))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn shipped_config_parses() {
        let config = RanniConfig::parse(include_str!("../../../ranni-config.yaml")).unwrap();
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.len(), 16);
        assert_eq!(config.reward.build().attributes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sparring_episode_runs_to_an_end() {
        let config = RanniConfig::parse(include_str!("../../../ranni-config.yaml")).unwrap();
        let catalog = config.catalog().unwrap();
        let mut env = StepOrchestrator::new(
            catalog,
            config.environment.clone(),
            sparring::sparring_target(1, SPARRING_EXCHANGES),
            SystemClock::new(),
        )
        .with_reward(config.reward.build());
        let mut policy = RandomPolicy::new(1, 16);
        let mut callback = LogCallback::new();

        let summary = episode::run_episode(&mut env, &mut policy, &mut callback, 10)
            .await
            .unwrap();

        assert_eq!(summary.steps, callback.steps());
        assert!(summary.steps <= 10);
        assert!(env.held_keys().is_empty());
        assert!(SummaryLine::from(&summary).final_attributes.contains_key("NpcHp"));
    }
}
