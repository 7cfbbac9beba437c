//! retrohost - headless driver
//!
//! Runs a core for a fixed number of frames without a display surface.
//! Useful for smoke-testing cores and producing savestates from scripts.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rh_core::config::{LogLevel, ShaderSelection};
use rh_core::{logging, Config};
use rh_integration::{CreateParams, Runtime, StepOutcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "retrohost", version, about = "Emulation-core frontend host")]
struct Cli {
    /// Configuration file (defaults to the per-user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a core and content, then step it headlessly
    Run {
        /// Core library, e.g. testpattern_libretro_android.so
        core: PathBuf,

        /// Content file
        content: PathBuf,

        /// Frames to run
        #[arg(long, default_value_t = 60)]
        frames: u64,

        #[arg(long, value_enum)]
        shader: Option<ShaderArg>,

        /// Savestate to restore before stepping
        #[arg(long)]
        state_in: Option<PathBuf>,

        /// Write a savestate here after the last frame
        #[arg(long)]
        state_out: Option<PathBuf>,

        #[arg(long)]
        system_dir: Option<PathBuf>,

        #[arg(long)]
        saves_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShaderArg {
    Default,
    Crt,
    Lcd,
    Sharp,
}

impl From<ShaderArg> for ShaderSelection {
    fn from(arg: ShaderArg) -> Self {
        match arg {
            ShaderArg::Default => ShaderSelection::Default,
            ShaderArg::Crt => ShaderSelection::Crt,
            ShaderArg::Lcd => ShaderSelection::Lcd,
            ShaderArg::Sharp => ShaderSelection::Sharp,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.debug.log_level
    };
    logging::init(level);

    match cli.command {
        Command::Run {
            core,
            content,
            frames,
            shader,
            state_in,
            state_out,
            system_dir,
            saves_dir,
        } => {
            let system_dir = system_dir.unwrap_or_else(|| config.paths.system.clone());
            let saves_dir = saves_dir.unwrap_or_else(|| config.paths.saves.clone());
            std::fs::create_dir_all(&system_dir)?;
            std::fs::create_dir_all(&saves_dir)?;
            let shader = shader.map_or(config.video.shader, ShaderSelection::from);

            let runtime = Runtime::new(config);
            let mut session = runtime.new_session();
            session.create(
                CreateParams::new(core, content, system_dir, saves_dir).with_shader(shader),
            )?;

            if let Some(path) = state_in {
                let data = std::fs::read(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                session.unserialize(&data)?;
                tracing::info!("Restored savestate from {}", path.display());
            }

            session.resume()?;
            for _ in 0..frames {
                if session.step()? == StepOutcome::Idle {
                    bail!("session stopped advancing at frame {}", session.frame_count());
                }
            }

            if let Some(info) = session.core_info() {
                tracing::info!(
                    "Ran {} frames of '{}' {}",
                    session.frame_count(),
                    info.name,
                    info.version
                );
            }

            if let Some(path) = state_out {
                let state = session.serialize()?;
                std::fs::write(&path, &state)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("{} bytes written to {}", state.len(), path.display());
            }

            session.destroy()?;
        }
    }

    Ok(())
}
