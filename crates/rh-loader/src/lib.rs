//! Core loader for retrohost
//!
//! Resolves a pluggable emulation core from its file path, validates the
//! content and directories handed to it, and brings the core up to the
//! point where it can run frames.

pub mod core;
pub mod loader;
pub mod registry;
pub mod testpattern;

pub use crate::core::{
    AvInfo, Core, CoreEnvironment, CoreInfo, DiskControl, FrameIo, GameInfo, Geometry, Variable,
};
pub use loader::{CoreLoader, LoadRequest, LoadedCore};
pub use registry::{normalize_core_name, CoreFactory, CoreRegistry};
pub use testpattern::TestPatternCore;
