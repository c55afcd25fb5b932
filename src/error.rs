// SPDX-License-Identifier: MPL-2.0
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Io(String),
    Config(String),
    /// Seek time was negative or not a finite number.
    InvalidSeekTime(f64),
    /// Volume outside the 0..=100 range (or not a finite number).
    InvalidVolume(f64),
    /// The operation was cancelled before it ran; carries the reason.
    Cancelled(String),
    /// The player (or one of its runners) is no longer accepting work.
    Shutdown,
    Engine(EngineError),
}

/// Failures reported by the media engine binding when a command
/// cannot be dispatched. Playback failures that the engine reports
/// asynchronously arrive as status events instead and become the
/// `error` phase, not an `EngineError`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine process/handle is gone (crashed or torn down).
    Unavailable,

    /// The engine rejected or failed to accept a command.
    Command(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Unavailable => write!(f, "Media engine is unavailable"),
            EngineError::Command(msg) => write!(f, "Engine command failed: {}", msg),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O Error: {}", e),
            Error::Config(e) => write!(f, "Config Error: {}", e),
            Error::InvalidSeekTime(t) => {
                write!(f, "Invalid seek time: {} (must be a non-negative number)", t)
            }
            Error::InvalidVolume(v) => {
                write!(f, "Invalid volume: {} (must be between 0 and 100)", v)
            }
            Error::Cancelled(reason) => write!(f, "Cancelled: {}", reason),
            Error::Shutdown => write!(f, "Player is shut down"),
            Error::Engine(e) => write!(f, "Engine Error: {}", e),
        }
    }
}

impl Error {
    /// True for cancellations and shutdown rejections, which mean the
    /// operation never ran, as opposed to an operation that ran and failed.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled(_) | Error::Shutdown)
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        Error::Engine(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
