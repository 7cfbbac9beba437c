//! Session host for retrohost
//!
//! This crate ties the loader, input router, surface binding and audio sink
//! together behind a [`Session`]: one live instance of a hosted core with an
//! explicit lifecycle, driven one frame at a time by an external caller.

pub mod events;
pub mod runtime;
pub mod serializer;
pub mod session;

pub use events::SessionEvent;
pub use runtime::Runtime;
pub use serializer::RestoreFailure;
pub use session::{CreateParams, Session, SessionState, StepOutcome};
