//! Video output for retrohost
//!
//! Tracks the platform drawing surface, converts core frames into a
//! texture and presents them through a backend with the selected shader.

pub mod backend;
pub mod shader;
pub mod surface;
pub mod texture;

pub use backend::{NullBackend, VideoBackend};
pub use rh_core::config::ShaderSelection;
pub use shader::{ShaderEffect, ShaderPass, ShaderPipeline, TextureFilter};
pub use surface::{PresentStats, SurfaceBinding, SurfaceInfo, Viewport};
pub use texture::Texture;
