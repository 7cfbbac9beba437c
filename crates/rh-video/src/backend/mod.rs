//! Video backends

pub mod null;

pub use null::NullBackend;

use crate::shader::ShaderPipeline;
use crate::surface::Viewport;
use crate::texture::Texture;

/// Presentation backend driven by [`crate::SurfaceBinding`]
pub trait VideoBackend: Send {
    /// Initialize the backend
    fn init(&mut self) -> Result<(), String>;

    /// Shutdown the backend, releasing every resource
    fn shutdown(&mut self);

    /// Build surface-bound resources (textures, programs) for a pipeline.
    /// Called each time a surface is created; previous resources are gone.
    fn create_resources(&mut self, pipeline: &ShaderPipeline) -> Result<(), String>;

    /// Forget surface-bound resources without touching the platform
    fn release_resources(&mut self);

    /// Upload the core texture
    fn upload_texture(&mut self, texture: &Texture);

    /// Set viewport
    fn set_viewport(&mut self, viewport: Viewport);

    /// Draw the uploaded texture through the pipeline and present
    fn draw(&mut self, pipeline: &mut ShaderPipeline);
}
