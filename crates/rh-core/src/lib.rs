//! Core types for the retrohost frontend
//!
//! This crate provides the foundational types, error handling,
//! configuration, and logging infrastructure shared by every other
//! retrohost crate, plus the protocol types that cross the boundary
//! between the host and a loaded emulation core.

pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;

pub use config::Config;
pub use error::{CoreError, HostError, InputError, LoadError, RestoreError, Result, VideoError};
pub use protocol::{InputSource, PixelFormat, VideoFrame};
