//! Error types for the retrohost frontend

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the host
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Restore error: {0}")]
    Restore(#[from] RestoreError),

    #[error("Invalid transition: {operation} is not allowed while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Core fault: {0}")]
    CoreFault(String),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Video error: {0}")]
    Video(#[from] VideoError),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Unsupported by core: {0}")]
    Unsupported(String),
}

impl HostError {
    /// Stable numeric code used by the C binding surface.
    pub fn code(&self) -> i32 {
        match self {
            Self::Load(_) => -1,
            Self::Restore(_) => -2,
            Self::InvalidTransition { .. } => -3,
            Self::CoreFault(_) => -4,
            Self::Input(_) => -5,
            Self::Video(_) => -6,
            Self::Audio(_) => -7,
            Self::Io(_) => -8,
            Self::Config(_) => -9,
            Self::Unsupported(_) => -10,
        }
    }
}

/// Errors raised while resolving a core or mounting its content
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Core file not found: {0}")]
    CoreNotFound(PathBuf),

    #[error("No core registered under '{0}'")]
    CoreNotRegistered(String),

    #[error("Content unreadable: {path}: {source}")]
    ContentUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Content {path} is not supported by core '{core}'")]
    ContentIncompatible { path: PathBuf, core: String },

    #[error("Directory inaccessible: {0}")]
    DirectoryInaccessible(PathBuf),

    #[error("Core rejected content: {0}")]
    CoreRejected(String),
}

/// Errors raised while restoring a savestate or save RAM image
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestoreError {
    #[error("Malformed state: expected {expected} bytes, got {actual}")]
    Malformed { expected: usize, actual: usize },

    #[error("Incompatible state: {0}")]
    Incompatible(String),

    #[error("Core does not support this operation")]
    Unsupported,
}

/// Input routing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid port {port} (valid ports: 0..{max})")]
    InvalidPort { port: i32, max: usize },

    #[error("Unknown motion source: {0}")]
    UnknownMotionSource(i32),

    #[error("Unknown key action: {0}")]
    UnknownAction(i32),
}

/// Render surface errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VideoError {
    #[error("Invalid surface size {width}x{height}")]
    InvalidSurfaceSize { width: i32, height: i32 },

    #[error("Unknown shader selection: {0}")]
    UnknownShader(i32),

    #[error("Frame buffer too small: need {needed} bytes, got {actual}")]
    FrameTooSmall { needed: usize, actual: usize },

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Error reported by an emulation core implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Content rejected: {0}")]
    ContentRejected(String),

    #[error("State rejected: {0}")]
    StateRejected(String),

    #[error("Unsupported: {0}")]
    Unsupported(&'static str),

    #[error("Fault: {0}")]
    Fault(String),
}

/// Result type alias for host operations
pub type Result<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HostError::InvalidTransition {
            operation: "step",
            state: "Destroyed",
        };
        assert_eq!(
            format!("{}", err),
            "Invalid transition: step is not allowed while Destroyed"
        );

        let err = RestoreError::Malformed {
            expected: 64,
            actual: 12,
        };
        assert_eq!(
            format!("{}", err),
            "Malformed state: expected 64 bytes, got 12"
        );
    }

    #[test]
    fn test_error_conversion() {
        let load_err = LoadError::CoreNotRegistered("snes9x".to_string());
        let host_err: HostError = load_err.into();
        assert!(matches!(host_err, HostError::Load(_)));

        let input_err = InputError::InvalidPort { port: 9, max: 4 };
        let host_err: HostError = input_err.into();
        assert!(matches!(host_err, HostError::Input(_)));
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            HostError::Load(LoadError::CoreNotRegistered(String::new())),
            HostError::Restore(RestoreError::Unsupported),
            HostError::InvalidTransition { operation: "x", state: "y" },
            HostError::CoreFault(String::new()),
            HostError::Input(InputError::UnknownAction(7)),
            HostError::Video(VideoError::UnknownShader(9)),
            HostError::Audio(String::new()),
            HostError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")),
            HostError::Config(String::new()),
            HostError::Unsupported(String::new()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(HostError::code).collect();
        assert!(codes.iter().all(|c| *c < 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
