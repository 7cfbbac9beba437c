//! Shader pipelines
//!
//! Each user-selectable shader is a short chain of passes applied to the
//! core's texture before it reaches the surface. Passes render through a
//! pair of ping-pong targets sized to the surface.

use rh_core::config::ShaderSelection;

/// Effect applied by a single pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderEffect {
    /// Plain blit
    Passthrough,
    /// Integer nearest prescale, smoothed on the final blit
    SharpBilinear,
    /// Scanline darkening with slight bloom
    CrtScanlines,
    /// Visible pixel grid
    LcdGrid,
    /// Edge darkening
    Vignette,
}

/// Sampling filter for a pass input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// One pass of a pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderPass {
    pub effect: ShaderEffect,
    pub filter: TextureFilter,
    /// Effect strength (0.0 to 1.0)
    pub intensity: f32,
    pub enabled: bool,
}

impl ShaderPass {
    pub fn new(effect: ShaderEffect, filter: TextureFilter) -> Self {
        Self {
            effect,
            filter,
            intensity: 1.0,
            enabled: true,
        }
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity.clamp(0.0, 1.0);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderTarget {
    width: u32,
    height: u32,
}

/// Ordered passes for one shader selection
#[derive(Debug, Clone)]
pub struct ShaderPipeline {
    selection: ShaderSelection,
    passes: Vec<ShaderPass>,
    targets: Vec<RenderTarget>,
    current_target: usize,
}

impl ShaderPipeline {
    /// Build the pass chain for a selection
    pub fn for_selection(selection: ShaderSelection) -> Self {
        let passes = match selection {
            ShaderSelection::Default => {
                vec![ShaderPass::new(ShaderEffect::Passthrough, TextureFilter::Linear)]
            }
            ShaderSelection::Crt => vec![
                ShaderPass::new(ShaderEffect::CrtScanlines, TextureFilter::Linear).with_intensity(0.5),
                ShaderPass::new(ShaderEffect::Vignette, TextureFilter::Linear).with_intensity(0.3),
            ],
            ShaderSelection::Lcd => {
                vec![ShaderPass::new(ShaderEffect::LcdGrid, TextureFilter::Nearest).with_intensity(0.6)]
            }
            ShaderSelection::Sharp => vec![
                ShaderPass::new(ShaderEffect::SharpBilinear, TextureFilter::Nearest),
                ShaderPass::new(ShaderEffect::Passthrough, TextureFilter::Linear),
            ],
        };

        Self {
            selection,
            passes,
            targets: Vec::new(),
            current_target: 0,
        }
    }

    pub fn selection(&self) -> ShaderSelection {
        self.selection
    }

    pub fn passes(&self) -> &[ShaderPass] {
        &self.passes
    }

    pub fn passes_mut(&mut self) -> &mut [ShaderPass] {
        &mut self.passes
    }

    pub fn active_pass_count(&self) -> usize {
        self.passes.iter().filter(|p| p.enabled).count()
    }

    /// Filter used when sampling the core's texture
    pub fn input_filter(&self) -> TextureFilter {
        self.passes
            .iter()
            .find(|p| p.enabled)
            .map_or(TextureFilter::Linear, |p| p.filter)
    }

    /// (Re)create ping-pong targets for a surface size
    pub fn init_targets(&mut self, width: u32, height: u32) {
        self.targets.clear();
        if self.active_pass_count() > 1 {
            for _ in 0..2 {
                self.targets.push(RenderTarget { width, height });
            }
        }
        self.current_target = 0;
    }

    /// Drop surface-sized targets
    pub fn release_targets(&mut self) {
        self.targets.clear();
        self.current_target = 0;
    }

    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.targets.first().map(|t| (t.width, t.height))
    }

    /// Run enabled passes, returning how many executed
    pub fn process(&mut self) -> usize {
        let mut executed = 0;
        for pass in self.passes.iter().filter(|p| p.enabled) {
            tracing::trace!(
                "Executing shader pass: {:?} (intensity: {})",
                pass.effect,
                pass.intensity
            );
            if !self.targets.is_empty() {
                self.current_target = 1 - self.current_target;
            }
            executed += 1;
        }
        executed
    }
}

impl Default for ShaderPipeline {
    fn default() -> Self {
        Self::for_selection(ShaderSelection::Default)
    }
}
