//! Parallax error types

use parallax_platform::PlatformError;
use thiserror::Error;

/// Errors surfaced while constructing or configuring the engine
///
/// Runtime failures inside event handlers are never returned; they are
/// logged and the engine degrades to a static page instead.
#[derive(Error, Debug)]
pub enum ParallaxError {
    /// Error reported by the host platform
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Configuration values are out of range or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file is not valid TOML for [`ParallaxConfig`](crate::ParallaxConfig)
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be written as TOML
    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for parallax operations
pub type Result<T> = std::result::Result<T, ParallaxError>;
