//! Null backend for headless runs and tests

use super::VideoBackend;
use crate::shader::ShaderPipeline;
use crate::surface::Viewport;
use crate::texture::Texture;

/// Backend that records what it was asked to do
#[derive(Debug, Default)]
pub struct NullBackend {
    initialized: bool,
    has_resources: bool,
    /// Number of times resources were built
    resource_generations: u32,
    uploads: u64,
    frames_drawn: u64,
    passes_executed: u64,
    viewport: Option<Viewport>,
    last_texture: Option<Texture>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn has_resources(&self) -> bool {
        self.has_resources
    }

    pub fn resource_generations(&self) -> u32 {
        self.resource_generations
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn passes_executed(&self) -> u64 {
        self.passes_executed
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Most recently uploaded texture
    pub fn last_texture(&self) -> Option<&Texture> {
        self.last_texture.as_ref()
    }
}

impl VideoBackend for NullBackend {
    fn init(&mut self) -> Result<(), String> {
        self.initialized = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.release_resources();
        self.initialized = false;
    }

    fn create_resources(&mut self, pipeline: &ShaderPipeline) -> Result<(), String> {
        if !self.initialized {
            return Err("backend not initialized".to_string());
        }
        tracing::debug!(
            "Null backend: building resources for {:?} ({} passes)",
            pipeline.selection(),
            pipeline.active_pass_count()
        );
        self.has_resources = true;
        self.resource_generations += 1;
        Ok(())
    }

    fn release_resources(&mut self) {
        self.has_resources = false;
        self.last_texture = None;
    }

    fn upload_texture(&mut self, texture: &Texture) {
        if !self.has_resources {
            return;
        }
        self.uploads += 1;
        self.last_texture = Some(texture.clone());
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn draw(&mut self, pipeline: &mut ShaderPipeline) {
        if !self.has_resources {
            return;
        }
        self.passes_executed += pipeline.process() as u64;
        self.frames_drawn += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rh_core::config::ShaderSelection;

    #[test]
    fn test_resources_require_init() {
        let mut backend = NullBackend::new();
        let pipeline = ShaderPipeline::default();
        assert!(backend.create_resources(&pipeline).is_err());

        backend.init().unwrap();
        backend.create_resources(&pipeline).unwrap();
        backend.create_resources(&pipeline).unwrap();
        assert_eq!(backend.resource_generations(), 2);
    }

    #[test]
    fn test_draw_without_resources_is_ignored() {
        let mut backend = NullBackend::new();
        backend.init().unwrap();
        let mut pipeline = ShaderPipeline::for_selection(ShaderSelection::Crt);
        backend.draw(&mut pipeline);
        assert_eq!(backend.frames_drawn(), 0);

        backend.create_resources(&pipeline).unwrap();
        backend.draw(&mut pipeline);
        assert_eq!(backend.frames_drawn(), 1);
        assert_eq!(backend.passes_executed(), 2);

        backend.shutdown();
        assert!(!backend.has_resources());
        assert!(!backend.is_initialized());
    }
}
