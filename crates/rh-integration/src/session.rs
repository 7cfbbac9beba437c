//! Session state machine and frame stepper
//!
//! A [`Session`] owns one loaded core together with the surface binding and
//! audio sink it drives. Lifecycle:
//!
//! ```text
//! Uninitialized --create--> Created <--resume/pause--> Running / Paused
//!        any live state --core fault--> Faulted
//!        any live or faulted state --destroy--> Destroyed
//! ```
//!
//! Stepping with no valid surface still advances the core; presentation is
//! skipped and counted. Stepping while `Created` or `Paused` does nothing and
//! reports [`StepOutcome::Idle`].
//!
//! Input is the only state touched from other threads. It lives in an
//! [`InputRouter`] shared through an `Arc` and is snapshotted once per step.

use crate::events::{EventBus, SessionEvent};
use crate::runtime::Runtime;
use crate::serializer;
use crossbeam::channel::Receiver;
use rh_audio::{open_sink, AudioSink};
use rh_core::config::{ShaderSelection, VideoBackendKind};
use rh_core::{CoreError, HostError, RestoreError, Result};
use rh_input::{InputRouter, KeyAction, MotionSource, RouterConfig};
use rh_loader::{CoreInfo, CoreLoader, FrameIo, LoadRequest, LoadedCore, Variable};
use rh_video::{NullBackend, PresentStats, SurfaceBinding, VideoBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Uninitialized,
    Created,
    Running,
    Paused,
    /// The core failed; only `destroy` is accepted
    Faulted,
    Destroyed,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Created => "Created",
            Self::Running => "Running",
            Self::Paused => "Paused",
            Self::Faulted => "Faulted",
            Self::Destroyed => "Destroyed",
        }
    }

    /// A core is loaded and usable
    pub fn is_live(self) -> bool {
        matches!(self, Self::Created | Self::Running | Self::Paused)
    }
}

/// Result of one `step` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The core ran one frame
    Advanced { presented: bool },
    /// Not running; nothing happened
    Idle,
}

/// Arguments to [`Session::create`]
#[derive(Debug, Clone)]
pub struct CreateParams {
    pub core_path: PathBuf,
    pub game_path: PathBuf,
    pub system_dir: PathBuf,
    pub saves_dir: PathBuf,
    pub shader: ShaderSelection,
    pub save_ram: Option<Vec<u8>>,
}

impl CreateParams {
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
            shader: ShaderSelection::Default,
            save_ram: None,
        }
    }

    pub fn with_shader(mut self, shader: ShaderSelection) -> Self {
        self.shader = shader;
        self
    }

    pub fn with_save_ram(mut self, save_ram: Vec<u8>) -> Self {
        self.save_ram = Some(save_ram);
        self
    }
}

/// Resources that exist between `create` and `destroy`
struct Live {
    core: LoadedCore,
    surface: SurfaceBinding,
    audio: Box<dyn AudioSink>,
    shader: ShaderSelection,
    system_dir: PathBuf,
    saves_dir: PathBuf,
}

/// One hosted core instance
pub struct Session {
    runtime: Arc<Runtime>,
    state: SessionState,
    live: Option<Live>,
    input: Arc<InputRouter>,
    frame_count: u64,
    fault: Option<String>,
    events: EventBus,
}

impl Session {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        let input = Arc::new(InputRouter::new(RouterConfig::from(&runtime.config().input)));
        Self {
            runtime,
            state: SessionState::Uninitialized,
            live: None,
            input,
            frame_count: 0,
            fault: None,
            events: EventBus::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Frames the core has advanced since `create`
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Reason the session entered `Faulted`
    pub fn fault_reason(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    /// Handle for input callbacks on other threads
    pub fn input(&self) -> Arc<InputRouter> {
        Arc::clone(&self.input)
    }

    /// New receiver for session notifications, starting with the most
    /// recent event
    pub fn events(&mut self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn shader(&self) -> Option<ShaderSelection> {
        self.live.as_ref().map(|l| l.shader)
    }

    pub fn core_info(&self) -> Option<&CoreInfo> {
        self.live.as_ref().map(|l| l.core.info())
    }

    /// System and save directories the core was configured with
    pub fn directories(&self) -> Option<(PathBuf, PathBuf)> {
        self.live
            .as_ref()
            .map(|l| (l.system_dir.clone(), l.saves_dir.clone()))
    }

    pub fn surface_stats(&self) -> Option<PresentStats> {
        self.live.as_ref().map(|l| l.surface.stats())
    }

    /// Load a core and its content. On failure nothing is kept and the
    /// session stays `Uninitialized`.
    pub fn create(&mut self, params: CreateParams) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            return Err(self.invalid("create"));
        }

        let runtime = Arc::clone(&self.runtime);
        let config = runtime.config();
        let mut request = LoadRequest::new(
            &params.core_path,
            &params.game_path,
            &params.system_dir,
            &params.saves_dir,
        );
        request.language = config.general.language.clone();
        request.screen_refresh_rate = config.general.screen_refresh_rate;
        request.save_ram = params.save_ram;

        let core = CoreLoader::new(runtime.registry()).load(&request)?;

        let mut surface = match SurfaceBinding::new(
            video_backend(config.video.backend),
            params.shader,
            config.video.integer_scaling,
        ) {
            Ok(surface) => surface,
            Err(e) => {
                core.unload();
                return Err(e);
            }
        };
        let av_info = *core.av_info();
        surface.set_aspect_ratio(av_info.geometry.effective_aspect_ratio());
        let audio = open_sink(&config.audio, av_info.sample_rate);

        info!(
            "Session created: core '{}', content {}, shader {:?}, audio {}",
            core.info().name,
            params.game_path.display(),
            params.shader,
            audio.name()
        );

        self.live = Some(Live {
            core,
            surface,
            audio,
            shader: params.shader,
            system_dir: params.system_dir,
            saves_dir: params.saves_dir,
        });
        self.frame_count = 0;
        self.input.activate();
        self.transition(SessionState::Created);
        if config.general.start_paused {
            self.pause()?;
        }
        Ok(())
    }

    /// Start (or keep) running
    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            SessionState::Running => Ok(()),
            SessionState::Created | SessionState::Paused => {
                if let Some(live) = self.live.as_mut() {
                    live.audio.resume();
                }
                self.transition(SessionState::Running);
                Ok(())
            }
            _ => Err(self.invalid("resume")),
        }
    }

    /// Stop advancing frames without touching core memory
    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            SessionState::Paused => Ok(()),
            SessionState::Created | SessionState::Running => {
                if let Some(live) = self.live.as_mut() {
                    live.audio.pause();
                }
                self.transition(SessionState::Paused);
                Ok(())
            }
            _ => Err(self.invalid("pause")),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == SessionState::Paused
    }

    /// A new platform surface exists; graphics resources are rebuilt
    pub fn on_surface_created(&mut self) -> Result<()> {
        let live = self.live_mut("onSurfaceCreated")?;
        live.surface.on_surface_created()?;
        let generation = live.surface.stats().surfaces_created;
        self.events
            .publish(SessionEvent::SurfaceCreated { generation });
        Ok(())
    }

    /// Surface resized; core state is untouched
    pub fn on_surface_changed(&mut self, width: i32, height: i32) -> Result<()> {
        let live = self.live_mut("onSurfaceChanged")?;
        live.surface.on_surface_changed(width, height)?;
        self.events.publish(SessionEvent::SurfaceChanged {
            width: width as u32,
            height: height as u32,
        });
        Ok(())
    }

    /// Platform surface is gone; stepping continues without presenting
    pub fn on_surface_destroyed(&mut self) -> Result<()> {
        let live = self.live_mut("onSurfaceDestroyed")?;
        live.surface.on_surface_destroyed();
        Ok(())
    }

    /// Run exactly one emulated frame when `Running`
    pub fn step(&mut self) -> Result<StepOutcome> {
        match self.state {
            SessionState::Running => {}
            SessionState::Created | SessionState::Paused => return Ok(StepOutcome::Idle),
            _ => return Err(self.invalid("step")),
        }
        let Some(live) = self.live.as_mut() else {
            return Err(self.invalid("step"));
        };

        let snapshot = self.input.snapshot();
        let mut io = FrameIo::new(&snapshot);
        if let Err(e) = live.core.core_mut().run(&mut io) {
            return Err(self.fault(e));
        }

        if let Some(frame) = io.take_video() {
            if let Err(e) = live.surface.submit_frame(&frame) {
                warn!("Dropping video frame {}: {}", self.frame_count, e);
            }
        }
        let presented = live.surface.present();
        live.audio.push_samples(io.audio());

        self.frame_count += 1;
        trace!("Frame {} done (presented: {})", self.frame_count, presented);
        self.events.publish(SessionEvent::FrameRendered {
            frame: self.frame_count,
            presented,
        });
        Ok(StepOutcome::Advanced { presented })
    }

    /// Cold-start the core without reloading content
    pub fn reset(&mut self) -> Result<()> {
        let live = self.live_mut("reset")?;
        if let Err(e) = live.core.core_mut().reset() {
            return Err(self.fault(e));
        }
        info!("Session reset");
        Ok(())
    }

    /// Release the core and every resource tied to it. Calling it again, or
    /// before `create`, does nothing.
    pub fn destroy(&mut self) -> Result<()> {
        match self.state {
            SessionState::Uninitialized | SessionState::Destroyed => {
                debug!("destroy ignored while {}", self.state.name());
                return Ok(());
            }
            _ => {}
        }

        self.input.deactivate();
        if let Some(mut live) = self.live.take() {
            live.surface.shutdown();
            live.audio.shutdown();
            live.core.unload();
        }
        self.transition(SessionState::Destroyed);
        Ok(())
    }

    /// Snapshot the complete core state
    pub fn serialize(&mut self) -> Result<Vec<u8>> {
        let live = self.live_mut("serialize")?;
        match serializer::capture(live.core.core()) {
            Ok(state) => Ok(state),
            Err(CoreError::Unsupported(what)) => Err(HostError::Unsupported(what.to_string())),
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Restore a snapshot. On any failure the session is left exactly as it was.
    pub fn unserialize(&mut self, data: &[u8]) -> Result<()> {
        let live = self.live_mut("unserialize")?;
        match serializer::restore(live.core.core_mut(), data) {
            Ok(()) => {
                info!("Savestate restored ({} bytes)", data.len());
                Ok(())
            }
            Err(failure) if failure.state_intact => {
                warn!("Savestate rejected: {}", failure.error);
                Err(HostError::Restore(failure.error))
            }
            Err(failure) => {
                self.fault(CoreError::Fault(failure.to_string()));
                Err(HostError::Restore(failure.error))
            }
        }
    }

    /// Copy of the core's save RAM
    pub fn serialize_sram(&mut self) -> Result<Vec<u8>> {
        let live = self.live_mut("serializeSram")?;
        serializer::capture_sram(live.core.core()).map_err(unsupported_or_restore)
    }

    /// Replace the core's save RAM
    pub fn unserialize_sram(&mut self, data: &[u8]) -> Result<()> {
        let live = self.live_mut("unserializeSram")?;
        serializer::restore_sram(live.core.core_mut(), data).map_err(unsupported_or_restore)
    }

    pub fn variables(&mut self) -> Result<Vec<Variable>> {
        let live = self.live_mut("variables")?;
        Ok(live.core.core().variables())
    }

    /// Set a core option. Returns false for unknown keys or values.
    pub fn update_variable(&mut self, key: &str, value: &str) -> Result<bool> {
        let live = self.live_mut("updateVariable")?;
        let applied = live.core.core_mut().set_variable(key, value);
        if applied {
            live.core.refresh_av_info();
            let aspect = live.core.av_info().geometry.effective_aspect_ratio();
            live.surface.set_aspect_ratio(aspect);
            debug!("Core variable {} = {}", key, value);
        } else {
            warn!("Core variable {} = {} not applied", key, value);
        }
        Ok(applied)
    }

    pub fn available_disks(&mut self) -> Result<usize> {
        let live = self.live_mut("availableDisks")?;
        Ok(live
            .core
            .core_mut()
            .disk_control()
            .map_or(0, |disks| disks.disk_count()))
    }

    pub fn current_disk(&mut self) -> Result<Option<usize>> {
        let live = self.live_mut("currentDisk")?;
        Ok(live
            .core
            .core_mut()
            .disk_control()
            .map(|disks| disks.current_disk()))
    }

    pub fn change_disk(&mut self, index: usize) -> Result<()> {
        let live = self.live_mut("changeDisk")?;
        let disks = live
            .core
            .core_mut()
            .disk_control()
            .ok_or_else(|| HostError::Unsupported("disk control".to_string()))?;
        disks
            .set_disk(index)
            .map_err(|e| HostError::Unsupported(e.to_string()))?;
        info!("Switched to disk {}", index);
        Ok(())
    }

    /// Display aspect ratio of the running content
    pub fn aspect_ratio(&mut self) -> Result<f32> {
        let live = self.live_mut("aspectRatio")?;
        Ok(live.core.av_info().geometry.effective_aspect_ratio())
    }

    pub fn on_motion_event(&self, port: i32, source: MotionSource, x: f32, y: f32) -> Result<()> {
        self.input.on_motion_event(port, source, x, y)
    }

    pub fn on_key_event(&self, port: i32, action: KeyAction, key_code: i32) -> Result<bool> {
        self.input.on_key_event(port, action, key_code)
    }

    fn live_mut(&mut self, operation: &'static str) -> Result<&mut Live> {
        if !self.state.is_live() {
            return Err(self.invalid(operation));
        }
        let state = self.state.name();
        self.live.as_mut().ok_or(HostError::InvalidTransition { operation, state })
    }

    fn invalid(&self, operation: &'static str) -> HostError {
        warn!("{} rejected while {}", operation, self.state.name());
        HostError::InvalidTransition {
            operation,
            state: self.state.name(),
        }
    }

    fn fault(&mut self, e: CoreError) -> HostError {
        let reason = e.to_string();
        error!("Core fault at frame {}: {}", self.frame_count, reason);
        self.input.deactivate();
        if let Some(live) = self.live.as_mut() {
            live.audio.pause();
        }
        self.fault = Some(reason.clone());
        self.transition(SessionState::Faulted);
        self.events.publish(SessionEvent::Faulted(reason.clone()));
        HostError::CoreFault(reason)
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        info!("Session {} -> {}", from.name(), to.name());
        self.state = to;
        self.events.publish(SessionEvent::StateChanged { from, to });
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.destroy();
    }
}

fn video_backend(kind: VideoBackendKind) -> Box<dyn VideoBackend> {
    match kind {
        VideoBackendKind::Null => Box::new(NullBackend::new()),
    }
}

fn unsupported_or_restore(e: RestoreError) -> HostError {
    match e {
        RestoreError::Unsupported => HostError::Unsupported("save RAM".to_string()),
        other => HostError::Restore(other),
    }
}
