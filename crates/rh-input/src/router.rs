//! Input router
//!
//! Holds the per-port state table shared between the input callbacks and
//! the frame stepper. Writers take the table's write lock for the length of
//! one update; the stepper copies the whole table under the read lock at the
//! start of each frame, so a core never observes a half-applied event.

use crate::mapping::{KeyAction, KeyMapping};
use crate::pad::{PadState, RetroButtons};
use parking_lot::RwLock;
use rh_core::config::InputConfig;
use rh_core::protocol::{analog, pointer, Device, InputSource};
use rh_core::{HostError, InputError, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// Which logical device a motion event drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionSource {
    Dpad,
    AnalogLeft,
    AnalogRight,
    /// Touch position, normalized to [0, 1]; negative means released
    Pointer,
}

impl MotionSource {
    pub fn from_raw(raw: i32) -> std::result::Result<Self, InputError> {
        match raw {
            0 => Ok(Self::Dpad),
            1 => Ok(Self::AnalogLeft),
            2 => Ok(Self::AnalogRight),
            3 => Ok(Self::Pointer),
            other => Err(InputError::UnknownMotionSource(other)),
        }
    }
}

/// Router tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterConfig {
    pub max_ports: usize,
    pub dpad_threshold: f32,
    pub analog_deadzone: f32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::from(&InputConfig::default())
    }
}

impl From<&InputConfig> for RouterConfig {
    fn from(config: &InputConfig) -> Self {
        Self {
            max_ports: config.max_ports.max(1),
            dpad_threshold: config.dpad_threshold,
            analog_deadzone: config.analog_deadzone.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PortState {
    pad: PadState,
    /// Key codes currently held on this port
    held_keys: HashSet<i32>,
}

/// Copy of the state table taken at the start of a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSnapshot {
    ports: Vec<PadState>,
}

impl InputSnapshot {
    pub fn port(&self, port: usize) -> Option<&PadState> {
        self.ports.get(port)
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }
}

impl InputSource for InputSnapshot {
    fn input_state(&self, port: usize, device: Device, index: u32, id: u32) -> i16 {
        let Some(pad) = self.ports.get(port) else {
            return 0;
        };

        match device {
            Device::Joypad => RetroButtons::from_id(id)
                .map(|button| pad.is_button_pressed(button) as i16)
                .unwrap_or(0),
            Device::Analog => {
                let stick = match index {
                    analog::INDEX_LEFT => pad.left,
                    analog::INDEX_RIGHT => pad.right,
                    _ => return 0,
                };
                match id {
                    analog::AXIS_X => stick.0,
                    analog::AXIS_Y => stick.1,
                    _ => 0,
                }
            }
            Device::Pointer => match (pad.pointer, id) {
                (Some((x, _)), pointer::X) => x,
                (Some((_, y)), pointer::Y) => y,
                (Some(_), pointer::PRESSED) => 1,
                _ => 0,
            },
        }
    }
}

/// Shared per-port input state
pub struct InputRouter {
    config: RouterConfig,
    ports: RwLock<Vec<PortState>>,
    mapping: RwLock<KeyMapping>,
    active: AtomicBool,
}

impl InputRouter {
    /// Create an inactive router; events are rejected until `activate`
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            ports: RwLock::new(vec![PortState::default(); config.max_ports.max(1)]),
            mapping: RwLock::new(KeyMapping::default_gamepad_mapping()),
            active: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn max_ports(&self) -> usize {
        self.config.max_ports.max(1)
    }

    /// Start accepting events
    pub fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    /// Stop accepting events and release every control
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        self.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn set_mapping(&self, mapping: KeyMapping) {
        *self.mapping.write() = mapping;
    }

    /// Release every control on every port
    pub fn clear(&self) {
        for port in self.ports.write().iter_mut() {
            *port = PortState::default();
        }
    }

    /// Apply a motion event.
    ///
    /// Axis values are clamped to [-1, 1] (pointer: [0, 1]) before use.
    pub fn on_motion_event(&self, port: i32, source: MotionSource, x: f32, y: f32) -> Result<()> {
        self.ensure_active("onMotionEvent")?;
        let index = self.port_index(port)?;
        let x = sanitize(x);
        let y = sanitize(y);

        let mut ports = self.ports.write();
        let pad = &mut ports[index].pad;
        match source {
            MotionSource::Dpad => pad.set_hat(self.hat_directions(x, y)),
            MotionSource::AnalogLeft => pad.left = self.to_axis_pair(x, y),
            MotionSource::AnalogRight => pad.right = self.to_axis_pair(x, y),
            MotionSource::Pointer => {
                pad.pointer = if x < 0.0 || y < 0.0 {
                    None
                } else {
                    Some((to_pointer_axis(x), to_pointer_axis(y)))
                };
            }
        }

        tracing::trace!("Port {} {:?} -> ({:.3}, {:.3})", index, source, x, y);
        Ok(())
    }

    /// Raw binding-surface variant of `on_motion_event`
    pub fn on_motion_event_raw(&self, port: i32, source: i32, x: f32, y: f32) -> Result<()> {
        let source = MotionSource::from_raw(source)?;
        self.on_motion_event(port, source, x, y)
    }

    /// Apply a key event.
    ///
    /// Returns whether the event changed the held state of `(port, key_code)`.
    /// Repeats of an already-held key are absorbed; unmapped key codes are
    /// tracked but do not affect any button.
    pub fn on_key_event(&self, port: i32, action: KeyAction, key_code: i32) -> Result<bool> {
        self.ensure_active("onKeyEvent")?;
        let index = self.port_index(port)?;
        let button = self.mapping.read().get_mapping(key_code);

        let mut ports = self.ports.write();
        let state = &mut ports[index];
        let edge = match action {
            KeyAction::Press => state.held_keys.insert(key_code),
            KeyAction::Release => state.held_keys.remove(&key_code),
        };

        if !edge {
            tracing::trace!("Port {} key {} repeat ignored", index, key_code);
            return Ok(false);
        }

        match button {
            Some(button) => {
                // Two key codes can share a button; it stays down while either is held.
                let mapping = self.mapping.read();
                let still_held = state
                    .held_keys
                    .iter()
                    .any(|k| mapping.get_mapping(*k) == Some(button));
                state.pad.set_button(button, still_held);
                tracing::trace!("Port {} {:?} {:?}", index, button, action);
            }
            None => tracing::trace!("Port {} key {} is unmapped", index, key_code),
        }
        Ok(true)
    }

    /// Raw binding-surface variant of `on_key_event`
    pub fn on_key_event_raw(&self, port: i32, action: i32, key_code: i32) -> Result<bool> {
        let action = KeyAction::from_raw(action)?;
        self.on_key_event(port, action, key_code)
    }

    /// Copy the table for one frame's worth of polling
    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            ports: self.ports.read().iter().map(|p| p.pad).collect(),
        }
    }

    /// Current state of one port
    pub fn port_state(&self, port: usize) -> Option<PadState> {
        self.ports.read().get(port).map(|p| p.pad)
    }

    fn ensure_active(&self, operation: &'static str) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            tracing::warn!("{} rejected: no live session", operation);
            Err(HostError::InvalidTransition {
                operation,
                state: "Detached",
            })
        }
    }

    fn port_index(&self, port: i32) -> Result<usize> {
        let max = self.max_ports();
        if port < 0 || port as usize >= max {
            tracing::warn!("Rejecting input for port {} (max {})", port, max);
            return Err(InputError::InvalidPort { port, max }.into());
        }
        Ok(port as usize)
    }

    fn hat_directions(&self, x: f32, y: f32) -> RetroButtons {
        let t = self.config.dpad_threshold;
        let mut directions = RetroButtons::empty();
        directions.set(RetroButtons::LEFT, x <= -t);
        directions.set(RetroButtons::RIGHT, x >= t);
        directions.set(RetroButtons::UP, y <= -t);
        directions.set(RetroButtons::DOWN, y >= t);
        directions
    }

    fn to_axis_pair(&self, x: f32, y: f32) -> (i16, i16) {
        let deadzone = self.config.analog_deadzone;
        if x.hypot(y) < deadzone {
            return (0, 0);
        }
        (to_axis(x), to_axis(y))
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

/// Clamp to [-1, 1]; NaN reads as centered
fn sanitize(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

fn to_axis(value: f32) -> i16 {
    (value * i16::MAX as f32).round() as i16
}

fn to_pointer_axis(value: f32) -> i16 {
    to_axis(value * 2.0 - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::keycodes;
    use rh_core::protocol::joypad;
    use std::sync::Arc;

    fn router() -> InputRouter {
        let router = InputRouter::default();
        router.activate();
        router
    }

    #[test]
    fn test_inactive_router_rejects_events() {
        let router = InputRouter::default();
        let err = router.on_key_event(0, KeyAction::Press, keycodes::BUTTON_A).unwrap_err();
        assert!(matches!(err, HostError::InvalidTransition { .. }));
        assert!(router.on_motion_event(0, MotionSource::Dpad, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_out_of_range_ports_rejected() {
        let router = router();
        for port in [-1, 4, 100] {
            let err = router.on_motion_event(port, MotionSource::AnalogLeft, 0.5, 0.5).unwrap_err();
            assert!(matches!(err, HostError::Input(InputError::InvalidPort { .. })));
        }
        // Nothing leaked into port 0.
        assert_eq!(router.port_state(0), Some(PadState::default()));
    }

    #[test]
    fn test_key_press_and_release() {
        let router = router();
        assert!(router.on_key_event(1, KeyAction::Press, keycodes::BUTTON_A).unwrap());
        let snapshot = router.snapshot();
        assert_eq!(snapshot.input_state(1, Device::Joypad, 0, joypad::A), 1);
        assert_eq!(snapshot.input_state(0, Device::Joypad, 0, joypad::A), 0);

        assert!(router.on_key_event(1, KeyAction::Release, keycodes::BUTTON_A).unwrap());
        assert_eq!(router.snapshot().input_state(1, Device::Joypad, 0, joypad::A), 0);
    }

    #[test]
    fn test_key_repeats_are_not_edges() {
        let router = router();
        assert!(router.on_key_event(0, KeyAction::Press, keycodes::BUTTON_B).unwrap());
        assert!(!router.on_key_event(0, KeyAction::Press, keycodes::BUTTON_B).unwrap());
        assert!(router.on_key_event(0, KeyAction::Release, keycodes::BUTTON_B).unwrap());
        assert!(!router.on_key_event(0, KeyAction::Release, keycodes::BUTTON_B).unwrap());
    }

    #[test]
    fn test_shared_button_stays_pressed() {
        let router = router();
        let mut mapping = KeyMapping::default_gamepad_mapping();
        mapping.map_key(62, RetroButtons::A);
        router.set_mapping(mapping);

        router.on_key_event(0, KeyAction::Press, keycodes::BUTTON_A).unwrap();
        router.on_key_event(0, KeyAction::Press, 62).unwrap();
        router.on_key_event(0, KeyAction::Release, keycodes::BUTTON_A).unwrap();
        assert!(router.port_state(0).unwrap().is_button_pressed(RetroButtons::A));

        router.on_key_event(0, KeyAction::Release, 62).unwrap();
        assert!(!router.port_state(0).unwrap().is_button_pressed(RetroButtons::A));
    }

    #[test]
    fn test_unmapped_key_is_tracked_only() {
        let router = router();
        assert!(router.on_key_event(0, KeyAction::Press, 4).unwrap());
        assert_eq!(router.port_state(0).unwrap().buttons(), RetroButtons::empty());
    }

    #[test]
    fn test_motion_values_are_clamped() {
        let router = router();
        router.on_motion_event(2, MotionSource::AnalogLeft, 5.0, -3.0).unwrap();
        router.on_motion_event(2, MotionSource::AnalogRight, f32::NAN, 0.5).unwrap();

        let snapshot = router.snapshot();
        assert_eq!(snapshot.input_state(2, Device::Analog, analog::INDEX_LEFT, analog::AXIS_X), i16::MAX);
        assert_eq!(snapshot.input_state(2, Device::Analog, analog::INDEX_LEFT, analog::AXIS_Y), -i16::MAX);
        assert_eq!(snapshot.input_state(2, Device::Analog, analog::INDEX_RIGHT, analog::AXIS_X), 0);
        assert_eq!(snapshot.input_state(2, Device::Analog, analog::INDEX_RIGHT, analog::AXIS_Y), 16384);

        for other in [0, 1, 3] {
            assert_eq!(snapshot.port(other), Some(&PadState::default()));
        }
    }

    #[test]
    fn test_dpad_motion_threshold() {
        let router = router();
        router.on_motion_event(0, MotionSource::Dpad, -1.0, 0.2).unwrap();
        let pad = router.port_state(0).unwrap();
        assert!(pad.is_button_pressed(RetroButtons::LEFT));
        assert!(!pad.is_button_pressed(RetroButtons::DOWN));

        router.on_motion_event(0, MotionSource::Dpad, 0.0, 0.0).unwrap();
        assert_eq!(router.port_state(0).unwrap().buttons(), RetroButtons::empty());
    }

    #[test]
    fn test_pointer_press_and_release() {
        let router = router();
        router.on_motion_event(0, MotionSource::Pointer, 0.5, 1.0).unwrap();
        let snapshot = router.snapshot();
        assert_eq!(snapshot.input_state(0, Device::Pointer, 0, pointer::PRESSED), 1);
        assert_eq!(snapshot.input_state(0, Device::Pointer, 0, pointer::X), 0);
        assert_eq!(snapshot.input_state(0, Device::Pointer, 0, pointer::Y), i16::MAX);

        router.on_motion_event(0, MotionSource::Pointer, -1.0, -1.0).unwrap();
        assert_eq!(router.snapshot().input_state(0, Device::Pointer, 0, pointer::PRESSED), 0);
    }

    #[test]
    fn test_deadzone() {
        let router = InputRouter::new(RouterConfig {
            analog_deadzone: 0.2,
            ..RouterConfig::default()
        });
        router.activate();
        router.on_motion_event(0, MotionSource::AnalogLeft, 0.1, 0.1).unwrap();
        assert_eq!(router.port_state(0).unwrap().left, (0, 0));
    }

    #[test]
    fn test_raw_variants_validate() {
        let router = router();
        assert!(matches!(
            router.on_motion_event_raw(0, 7, 0.0, 0.0),
            Err(HostError::Input(InputError::UnknownMotionSource(7)))
        ));
        assert!(matches!(
            router.on_key_event_raw(0, 5, keycodes::BUTTON_A),
            Err(HostError::Input(InputError::UnknownAction(5)))
        ));
        assert!(router.on_key_event_raw(0, 0, keycodes::BUTTON_A).unwrap());
    }

    #[test]
    fn test_deactivate_releases_everything() {
        let router = router();
        router.on_key_event(0, KeyAction::Press, keycodes::BUTTON_START).unwrap();
        router.deactivate();
        assert_eq!(router.port_state(0), Some(PadState::default()));
    }

    #[test]
    fn test_concurrent_writers_and_snapshots() {
        let router = Arc::new(router());
        let writers: Vec<_> = (0..4)
            .map(|port| {
                let router = Arc::clone(&router);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let action = if i % 2 == 0 { KeyAction::Press } else { KeyAction::Release };
                        router.on_key_event(port, action, keycodes::BUTTON_A).unwrap();
                        router
                            .on_motion_event(port, MotionSource::AnalogLeft, port as f32 / 4.0, 0.0)
                            .unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            let snapshot = router.snapshot();
            assert_eq!(snapshot.port_count(), 4);
        }
        for writer in writers {
            writer.join().unwrap();
        }

        // Every writer ended on a release.
        let snapshot = router.snapshot();
        for port in 0..4 {
            assert_eq!(snapshot.input_state(port, Device::Joypad, 0, joypad::A), 0);
            assert_eq!(
                snapshot.input_state(port, Device::Analog, analog::INDEX_LEFT, analog::AXIS_X),
                to_axis(port as f32 / 4.0)
            );
        }
    }
}
