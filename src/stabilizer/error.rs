//! Error definitions for the stabilization module

use thiserror::Error;

/// Error types for the stabilization pipeline and its service layer
#[derive(Debug, Error)]
pub enum StabilizerError {
    /// A stage parameter failed validation
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The service could not be brought up
    #[error("Initialization error: {0}")]
    InitializationError(String),

    /// A channel to or from the service task failed
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The service task panicked or could not be joined
    #[error("Thread error: {0}")]
    ThreadError(String),

    /// A preset name could not be resolved
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}
