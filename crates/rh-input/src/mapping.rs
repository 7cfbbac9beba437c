//! Input mapping
//!
//! Maps platform key codes to joypad buttons.

use crate::pad::RetroButtons;
use rh_core::InputError;
use std::collections::HashMap;

/// Android `KeyEvent` key codes for gamepads
pub mod keycodes {
    pub const DPAD_UP: i32 = 19;
    pub const DPAD_DOWN: i32 = 20;
    pub const DPAD_LEFT: i32 = 21;
    pub const DPAD_RIGHT: i32 = 22;
    pub const BUTTON_A: i32 = 96;
    pub const BUTTON_B: i32 = 97;
    pub const BUTTON_X: i32 = 99;
    pub const BUTTON_Y: i32 = 100;
    pub const BUTTON_L1: i32 = 102;
    pub const BUTTON_R1: i32 = 103;
    pub const BUTTON_L2: i32 = 104;
    pub const BUTTON_R2: i32 = 105;
    pub const BUTTON_THUMBL: i32 = 106;
    pub const BUTTON_THUMBR: i32 = 107;
    pub const BUTTON_START: i32 = 108;
    pub const BUTTON_SELECT: i32 = 109;
}

/// Key event action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

impl KeyAction {
    /// Android `ACTION_DOWN` (0) / `ACTION_UP` (1)
    pub fn from_raw(raw: i32) -> Result<Self, InputError> {
        match raw {
            0 => Ok(Self::Press),
            1 => Ok(Self::Release),
            other => Err(InputError::UnknownAction(other)),
        }
    }

    pub fn is_press(self) -> bool {
        self == Self::Press
    }
}

/// Key code to button table
#[derive(Debug, Clone)]
pub struct KeyMapping {
    mappings: HashMap<i32, RetroButtons>,
}

impl KeyMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }

    /// Standard gamepad layout
    pub fn default_gamepad_mapping() -> Self {
        use keycodes::*;

        let mut mapping = Self::new();

        // D-pad
        mapping.map_key(DPAD_UP, RetroButtons::UP);
        mapping.map_key(DPAD_DOWN, RetroButtons::DOWN);
        mapping.map_key(DPAD_LEFT, RetroButtons::LEFT);
        mapping.map_key(DPAD_RIGHT, RetroButtons::RIGHT);

        // Face buttons
        mapping.map_key(BUTTON_A, RetroButtons::A);
        mapping.map_key(BUTTON_B, RetroButtons::B);
        mapping.map_key(BUTTON_X, RetroButtons::X);
        mapping.map_key(BUTTON_Y, RetroButtons::Y);

        // Shoulders and sticks
        mapping.map_key(BUTTON_L1, RetroButtons::L);
        mapping.map_key(BUTTON_R1, RetroButtons::R);
        mapping.map_key(BUTTON_L2, RetroButtons::L2);
        mapping.map_key(BUTTON_R2, RetroButtons::R2);
        mapping.map_key(BUTTON_THUMBL, RetroButtons::L3);
        mapping.map_key(BUTTON_THUMBR, RetroButtons::R3);

        mapping.map_key(BUTTON_START, RetroButtons::START);
        mapping.map_key(BUTTON_SELECT, RetroButtons::SELECT);

        mapping
    }

    pub fn map_key(&mut self, key_code: i32, button: RetroButtons) {
        self.mappings.insert(key_code, button);
    }

    pub fn get_mapping(&self, key_code: i32) -> Option<RetroButtons> {
        self.mappings.get(&key_code).copied()
    }

    pub fn remove_mapping(&mut self, key_code: i32) {
        self.mappings.remove(&key_code);
    }

    pub fn clear(&mut self) {
        self.mappings.clear();
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl Default for KeyMapping {
    fn default() -> Self {
        Self::default_gamepad_mapping()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_mapping_creation() {
        let mapping = KeyMapping::new();
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_default_gamepad_mapping() {
        let mapping = KeyMapping::default_gamepad_mapping();
        assert_eq!(mapping.len(), 16);
        assert_eq!(mapping.get_mapping(keycodes::DPAD_UP), Some(RetroButtons::UP));
        assert_eq!(mapping.get_mapping(keycodes::BUTTON_START), Some(RetroButtons::START));
        assert_eq!(mapping.get_mapping(4), None);
    }

    #[test]
    fn test_remove_mapping() {
        let mut mapping = KeyMapping::default_gamepad_mapping();
        mapping.remove_mapping(keycodes::BUTTON_A);
        assert!(mapping.get_mapping(keycodes::BUTTON_A).is_none());

        mapping.clear();
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_key_action_from_raw() {
        assert_eq!(KeyAction::from_raw(0), Ok(KeyAction::Press));
        assert_eq!(KeyAction::from_raw(1), Ok(KeyAction::Release));
        assert_eq!(KeyAction::from_raw(2), Err(InputError::UnknownAction(2)));
    }
}
