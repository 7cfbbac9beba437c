//! Render surface binding
//!
//! The platform owns the drawing surface and may tear it down and recreate
//! it at any time (backgrounding, rotation). The binding only holds what it
//! needs to rebuild resources and keeps the latest core frame so it can be
//! shown again once a surface returns. Presenting without a valid surface
//! is skipped and counted, never an error.

use crate::backend::VideoBackend;
use crate::shader::ShaderPipeline;
use crate::texture::Texture;
use rh_core::config::ShaderSelection;
use rh_core::protocol::VideoFrame;
use rh_core::{HostError, Result, VideoError};

/// Current surface dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
}

/// Region of the surface the image is drawn into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Presentation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentStats {
    pub surfaces_created: u32,
    pub frames_presented: u64,
    pub frames_skipped: u64,
    pub texture_uploads: u64,
}

/// Binding between the session and the platform surface
pub struct SurfaceBinding {
    backend: Box<dyn VideoBackend>,
    pipeline: ShaderPipeline,
    /// True between surface creation and destruction
    bound: bool,
    /// Known once the platform reports a size
    surface: Option<SurfaceInfo>,
    texture: Option<Texture>,
    texture_dirty: bool,
    aspect_ratio: Option<f32>,
    integer_scaling: bool,
    stats: PresentStats,
}

impl SurfaceBinding {
    /// Create a binding and initialize its backend
    pub fn new(
        mut backend: Box<dyn VideoBackend>,
        selection: ShaderSelection,
        integer_scaling: bool,
    ) -> Result<Self> {
        backend.init().map_err(VideoError::Backend)?;
        tracing::debug!("Surface binding created with shader {:?}", selection);
        Ok(Self {
            backend,
            pipeline: ShaderPipeline::for_selection(selection),
            bound: false,
            surface: None,
            texture: None,
            texture_dirty: false,
            aspect_ratio: None,
            integer_scaling,
            stats: PresentStats::default(),
        })
    }

    pub fn shader(&self) -> ShaderSelection {
        self.pipeline.selection()
    }

    pub fn pipeline(&self) -> &ShaderPipeline {
        &self.pipeline
    }

    /// A new surface exists; every previous graphics resource is gone
    pub fn on_surface_created(&mut self) -> Result<()> {
        self.backend.release_resources();
        self.backend
            .create_resources(&self.pipeline)
            .map_err(VideoError::Backend)?;
        self.bound = true;
        self.texture_dirty = self.texture.is_some();
        if let Some(info) = self.surface {
            self.pipeline.init_targets(info.width, info.height);
        }
        self.stats.surfaces_created += 1;
        tracing::info!("Surface created (generation {})", self.stats.surfaces_created);
        Ok(())
    }

    /// Surface resized
    pub fn on_surface_changed(&mut self, width: i32, height: i32) -> Result<()> {
        if width <= 0 || height <= 0 {
            return Err(HostError::Video(VideoError::InvalidSurfaceSize { width, height }));
        }
        let info = SurfaceInfo {
            width: width as u32,
            height: height as u32,
        };
        self.surface = Some(info);
        self.pipeline.init_targets(info.width, info.height);
        tracing::debug!("Surface changed to {}x{}", info.width, info.height);
        Ok(())
    }

    /// Platform surface is gone; presentation pauses until the next create
    pub fn on_surface_destroyed(&mut self) {
        if self.bound {
            tracing::debug!("Surface destroyed");
        }
        self.bound = false;
        self.surface = None;
        self.pipeline.release_targets();
        self.backend.release_resources();
    }

    pub fn is_valid(&self) -> bool {
        self.bound && self.surface.is_some()
    }

    pub fn surface(&self) -> Option<SurfaceInfo> {
        self.surface
    }

    /// Display aspect ratio reported by the core
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = (aspect_ratio.is_finite() && aspect_ratio > 0.0).then_some(aspect_ratio);
    }

    /// Accept a frame from the core
    pub fn submit_frame(&mut self, frame: &VideoFrame) -> Result<()> {
        let texture = Texture::from_frame(frame)?;
        self.texture = Some(texture);
        self.texture_dirty = true;
        Ok(())
    }

    /// Most recent core frame, converted
    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    /// Draw the latest frame. Returns false when there was nothing to draw on.
    pub fn present(&mut self) -> bool {
        let Some(viewport) = self.viewport() else {
            self.stats.frames_skipped += 1;
            return false;
        };
        if !self.bound {
            self.stats.frames_skipped += 1;
            return false;
        }

        if self.texture_dirty {
            if let Some(texture) = &self.texture {
                self.backend.upload_texture(texture);
                self.stats.texture_uploads += 1;
            }
            self.texture_dirty = false;
        }
        self.backend.set_viewport(viewport);
        self.backend.draw(&mut self.pipeline);
        self.stats.frames_presented += 1;
        true
    }

    /// Destination rectangle for the current surface and image
    pub fn viewport(&self) -> Option<Viewport> {
        let surface = self.surface?;
        let (sw, sh) = (surface.width, surface.height);

        let texture_size = self.texture.as_ref().map(|t| (t.width, t.height));
        if self.integer_scaling {
            if let Some((tw, th)) = texture_size.filter(|&(w, h)| w > 0 && h > 0) {
                let scale = (sw / tw).min(sh / th).max(1);
                let width = (tw * scale).min(sw);
                let height = (th * scale).min(sh);
                return Some(centered(sw, sh, width, height));
            }
        }

        let aspect = self.aspect_ratio.or_else(|| {
            texture_size
                .filter(|&(w, h)| w > 0 && h > 0)
                .map(|(w, h)| w as f32 / h as f32)
        });
        let Some(aspect) = aspect else {
            return Some(Viewport { x: 0, y: 0, width: sw, height: sh });
        };

        let surface_aspect = sw as f32 / sh as f32;
        let (width, height) = if surface_aspect > aspect {
            (((sh as f32 * aspect).round() as u32).clamp(1, sw), sh)
        } else {
            (sw, ((sw as f32 / aspect).round() as u32).clamp(1, sh))
        };
        Some(centered(sw, sh, width, height))
    }

    pub fn stats(&self) -> PresentStats {
        self.stats
    }

    /// Release everything held on the backend
    pub fn shutdown(&mut self) {
        self.on_surface_destroyed();
        self.texture = None;
        self.backend.shutdown();
    }
}

fn centered(surface_width: u32, surface_height: u32, width: u32, height: u32) -> Viewport {
    Viewport {
        x: (surface_width - width) / 2,
        y: (surface_height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullBackend;
    use rh_core::protocol::PixelFormat;

    fn binding(selection: ShaderSelection) -> SurfaceBinding {
        SurfaceBinding::new(Box::new(NullBackend::new()), selection, false).unwrap()
    }

    fn frame(width: u32, height: u32) -> VideoFrame {
        VideoFrame {
            data: vec![0xFF; (width * height * 2) as usize],
            width,
            height,
            pitch: width as usize * 2,
            format: PixelFormat::Rgb565,
        }
    }

    #[test]
    fn test_present_without_surface_skips() {
        let mut binding = binding(ShaderSelection::Default);
        binding.submit_frame(&frame(4, 4)).unwrap();
        assert!(!binding.present());
        assert!(!binding.present());

        let stats = binding.stats();
        assert_eq!(stats.frames_skipped, 2);
        assert_eq!(stats.frames_presented, 0);
        assert!(binding.texture().is_some());
    }

    #[test]
    fn test_surface_lifecycle() {
        let mut binding = binding(ShaderSelection::Crt);
        binding.on_surface_created().unwrap();
        assert!(!binding.is_valid());

        binding.on_surface_changed(640, 480).unwrap();
        assert!(binding.is_valid());
        assert_eq!(binding.pipeline().target_size(), Some((640, 480)));

        binding.submit_frame(&frame(4, 4)).unwrap();
        assert!(binding.present());
        // Unchanged frame is not uploaded again.
        assert!(binding.present());
        assert_eq!(binding.stats().texture_uploads, 1);

        binding.on_surface_destroyed();
        assert!(!binding.is_valid());
        assert!(!binding.present());

        binding.on_surface_created().unwrap();
        binding.on_surface_changed(320, 240).unwrap();
        assert!(binding.present());

        let stats = binding.stats();
        assert_eq!(stats.surfaces_created, 2);
        assert_eq!(stats.frames_presented, 3);
        assert_eq!(stats.frames_skipped, 1);
        assert_eq!(stats.texture_uploads, 2);
    }

    #[test]
    fn test_repeated_surface_created_is_safe() {
        let mut binding = binding(ShaderSelection::Lcd);
        for _ in 0..3 {
            binding.on_surface_created().unwrap();
        }
        binding.on_surface_changed(100, 100).unwrap();
        assert!(binding.present());
        assert_eq!(binding.stats().surfaces_created, 3);
    }

    #[test]
    fn test_invalid_surface_size_rejected() {
        let mut binding = binding(ShaderSelection::Default);
        binding.on_surface_created().unwrap();
        binding.on_surface_changed(640, 480).unwrap();

        let err = binding.on_surface_changed(0, 480).unwrap_err();
        assert!(matches!(
            err,
            HostError::Video(VideoError::InvalidSurfaceSize { width: 0, height: 480 })
        ));
        assert!(binding.on_surface_changed(640, -1).is_err());
        // Previous size kept.
        assert_eq!(binding.surface(), Some(SurfaceInfo { width: 640, height: 480 }));
    }

    #[test]
    fn test_viewport_letterbox() {
        let mut binding = binding(ShaderSelection::Default);
        binding.on_surface_created().unwrap();
        binding.on_surface_changed(800, 400).unwrap();
        binding.set_aspect_ratio(4.0 / 3.0);

        let viewport = binding.viewport().unwrap();
        assert_eq!(viewport.height, 400);
        assert_eq!(viewport.width, 533);
        assert_eq!(viewport.x, (800 - 533) / 2);

        binding.on_surface_changed(400, 800).unwrap();
        let viewport = binding.viewport().unwrap();
        assert_eq!(viewport.width, 400);
        assert_eq!(viewport.height, 300);
        assert_eq!(viewport.y, 250);
    }

    #[test]
    fn test_viewport_integer_scaling() {
        let mut binding =
            SurfaceBinding::new(Box::new(NullBackend::new()), ShaderSelection::Sharp, true).unwrap();
        binding.on_surface_created().unwrap();
        binding.on_surface_changed(500, 400).unwrap();
        binding.submit_frame(&frame(160, 120)).unwrap();

        let viewport = binding.viewport().unwrap();
        assert_eq!((viewport.width, viewport.height), (480, 360));
        assert_eq!((viewport.x, viewport.y), (10, 20));
    }
}
