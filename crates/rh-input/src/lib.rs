//! Input handling for retrohost
//!
//! Turns host controller events into the level-polled state an emulation
//! core reads at the start of every frame.

pub mod mapping;
pub mod pad;
pub mod router;

pub use mapping::{keycodes, KeyAction, KeyMapping};
pub use pad::{PadState, RetroButtons};
pub use router::{InputRouter, InputSnapshot, MotionSource, RouterConfig};
