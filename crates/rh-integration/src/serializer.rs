//! Savestate capture and atomic restore
//!
//! Savestates are opaque to the host; only the core understands them. The
//! host guarantees that a restore either applies completely or leaves the
//! core exactly as it was: the buffer size is validated first, the live state
//! is snapshotted, and the snapshot is put back if the core rejects the
//! buffer partway through.

use rh_core::{CoreError, RestoreError};
use rh_loader::Core;
use std::fmt;

/// Why a restore failed, and whether the previous state is intact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreFailure {
    pub error: RestoreError,
    /// False only when the core also refused its own snapshot
    pub state_intact: bool,
}

impl From<RestoreError> for RestoreFailure {
    fn from(error: RestoreError) -> Self {
        Self {
            error,
            state_intact: true,
        }
    }
}

impl fmt::Display for RestoreFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.state_intact {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{} (rollback failed)", self.error)
        }
    }
}

/// Capture the complete execution state of `core`
pub fn capture(core: &dyn Core) -> Result<Vec<u8>, CoreError> {
    let size = core.serialize_size();
    if size == 0 {
        return Err(CoreError::Unsupported("savestates"));
    }
    let mut buf = vec![0u8; size];
    core.serialize(&mut buf)?;
    tracing::debug!("Captured {} byte savestate", size);
    Ok(buf)
}

/// Restore `data` into `core`, all or nothing
pub fn restore(core: &mut dyn Core, data: &[u8]) -> Result<(), RestoreFailure> {
    let expected = core.serialize_size();
    if expected == 0 {
        return Err(RestoreError::Unsupported.into());
    }
    if data.len() != expected {
        return Err(RestoreError::Malformed {
            expected,
            actual: data.len(),
        }
        .into());
    }

    let backup = capture(core)
        .map_err(|e| RestoreError::Incompatible(format!("cannot snapshot live state: {}", e)))?;

    match core.unserialize(data) {
        Ok(()) => {
            tracing::debug!("Restored {} byte savestate", data.len());
            Ok(())
        }
        Err(e) => {
            let error = RestoreError::Incompatible(e.to_string());
            match core.unserialize(&backup) {
                Ok(()) => {
                    tracing::warn!("Savestate rejected, previous state kept: {}", e);
                    Err(error.into())
                }
                Err(rollback) => {
                    tracing::error!("Savestate rejected and rollback failed: {}", rollback);
                    Err(RestoreFailure {
                        error,
                        state_intact: false,
                    })
                }
            }
        }
    }
}

/// Copy of the core's battery-backed memory
pub fn capture_sram(core: &dyn Core) -> Result<Vec<u8>, RestoreError> {
    core.save_ram()
        .map(<[u8]>::to_vec)
        .ok_or(RestoreError::Unsupported)
}

/// Replace the core's battery-backed memory; sizes must match exactly
pub fn restore_sram(core: &mut dyn Core, data: &[u8]) -> Result<(), RestoreError> {
    let sram = core.save_ram_mut().ok_or(RestoreError::Unsupported)?;
    if sram.len() != data.len() {
        return Err(RestoreError::Malformed {
            expected: sram.len(),
            actual: data.len(),
        });
    }
    sram.copy_from_slice(data);
    Ok(())
}
