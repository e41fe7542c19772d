//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and the episode loop
//! so `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ranni_core::config::ConfigError,
    },

    /// An episode failed.
    #[error("episode error: {source}")]
    Episode {
        /// The underlying episode error.
        #[from]
        source: ranni_core::episode::EpisodeError,
    },

    /// The configured catalog cannot be driven by the random policy.
    #[error("policy error: {message}")]
    Policy {
        /// Description of the problem.
        message: String,
    },

    /// Logging could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
