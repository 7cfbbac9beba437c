//! Core loader for bringing a core and its content up
//!
//! This module provides the CoreLoader which validates the paths it is
//! given, resolves the core from the registry, reads the content and
//! hands both to the core. Nothing outlives a failed load: the core
//! instance is dropped before the error is returned.

use crate::core::{AvInfo, Core, CoreEnvironment, CoreInfo, GameInfo};
use crate::registry::{normalize_core_name, CoreRegistry};
use rh_core::LoadError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything needed to load a core and its content
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub core_path: PathBuf,
    pub game_path: PathBuf,
    pub system_dir: PathBuf,
    pub saves_dir: PathBuf,
    pub language: String,
    pub screen_refresh_rate: f32,
    /// Save RAM image applied right after content load
    pub save_ram: Option<Vec<u8>>,
}

impl LoadRequest {
    pub fn new(
        core_path: impl Into<PathBuf>,
        game_path: impl Into<PathBuf>,
        system_dir: impl Into<PathBuf>,
        saves_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            core_path: core_path.into(),
            game_path: game_path.into(),
            system_dir: system_dir.into(),
            saves_dir: saves_dir.into(),
            language: "en".to_string(),
            screen_refresh_rate: 60.0,
            save_ram: None,
        }
    }

    pub fn with_save_ram(mut self, save_ram: Vec<u8>) -> Self {
        self.save_ram = Some(save_ram);
        self
    }
}

/// A core with content loaded, ready to run frames
pub struct LoadedCore {
    core: Box<dyn Core>,
    info: CoreInfo,
    av_info: AvInfo,
    game_path: PathBuf,
}

impl LoadedCore {
    pub fn core(&self) -> &dyn Core {
        self.core.as_ref()
    }

    pub fn core_mut(&mut self) -> &mut dyn Core {
        self.core.as_mut()
    }

    pub fn info(&self) -> &CoreInfo {
        &self.info
    }

    pub fn av_info(&self) -> &AvInfo {
        &self.av_info
    }

    pub fn game_path(&self) -> &Path {
        &self.game_path
    }

    /// Refresh cached A/V info after the core changed geometry
    pub fn refresh_av_info(&mut self) {
        self.av_info = self.core.av_info();
    }

    /// Unload content and release the core
    pub fn unload(mut self) {
        info!("Unloading core '{}'", self.info.name);
        self.core.unload_game();
    }
}

/// Resolves and initializes cores
pub struct CoreLoader<'a> {
    registry: &'a CoreRegistry,
}

impl<'a> CoreLoader<'a> {
    pub fn new(registry: &'a CoreRegistry) -> Self {
        Self { registry }
    }

    /// Load the core and content named by `request`
    pub fn load(&self, request: &LoadRequest) -> Result<LoadedCore, LoadError> {
        info!(
            "Loading core {} with content {}",
            request.core_path.display(),
            request.game_path.display()
        );

        check_directory(&request.system_dir)?;
        check_directory(&request.saves_dir)?;

        if !request.core_path.is_file() {
            return Err(LoadError::CoreNotFound(request.core_path.clone()));
        }

        let name = normalize_core_name(&request.core_path);
        let mut core = self
            .registry
            .instantiate(&name)
            .ok_or_else(|| LoadError::CoreNotRegistered(name.clone()))?;
        let info = core.info();
        debug!("Resolved core '{}' version {}", info.name, info.version);

        let extension = request
            .game_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        if !info.accepts_extension(&extension) {
            return Err(LoadError::ContentIncompatible {
                path: request.game_path.clone(),
                core: info.name,
            });
        }

        let game = read_content(&request.game_path, info.need_fullpath)?;

        let env = CoreEnvironment {
            system_dir: request.system_dir.clone(),
            save_dir: request.saves_dir.clone(),
            language: request.language.clone(),
            screen_refresh_rate: request.screen_refresh_rate,
        };
        core.configure(&env)
            .map_err(|e| LoadError::CoreRejected(e.to_string()))?;
        core.load_game(&game)
            .map_err(|e| LoadError::CoreRejected(e.to_string()))?;

        if let Some(image) = &request.save_ram {
            apply_save_ram(core.as_mut(), image);
        }

        let av_info = core.av_info();
        info!(
            "Core '{}' loaded: {}x{} @ {:.2} fps, {} Hz audio",
            info.name,
            av_info.geometry.base_width,
            av_info.geometry.base_height,
            av_info.fps,
            av_info.sample_rate
        );

        Ok(LoadedCore {
            core,
            info,
            av_info,
            game_path: request.game_path.clone(),
        })
    }
}

fn check_directory(path: &Path) -> Result<(), LoadError> {
    if path.is_dir() && std::fs::read_dir(path).is_ok() {
        Ok(())
    } else {
        Err(LoadError::DirectoryInaccessible(path.to_path_buf()))
    }
}

fn read_content(path: &Path, need_fullpath: bool) -> Result<GameInfo, LoadError> {
    let unreadable = |source| LoadError::ContentUnreadable {
        path: path.to_path_buf(),
        source,
    };

    if need_fullpath {
        std::fs::metadata(path).map_err(unreadable)?;
        return Ok(GameInfo {
            path: path.to_path_buf(),
            data: Vec::new(),
        });
    }

    let data = std::fs::read(path).map_err(unreadable)?;
    debug!("Read {} bytes of content", data.len());
    Ok(GameInfo {
        path: path.to_path_buf(),
        data,
    })
}

fn apply_save_ram(core: &mut dyn Core, image: &[u8]) {
    match core.save_ram_mut() {
        Some(ram) if ram.len() == image.len() => {
            ram.copy_from_slice(image);
            debug!("Applied {} bytes of save RAM", image.len());
        }
        Some(ram) => warn!(
            "Ignoring save RAM image of {} bytes, core expects {}",
            image.len(),
            ram.len()
        ),
        None => warn!("Core has no save RAM, ignoring image"),
    }
}
