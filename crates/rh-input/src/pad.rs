//! Controller state for one logical port

use bitflags::bitflags;
use rh_core::protocol::joypad;

bitflags! {
    /// Digital joypad buttons, bit `n` is joypad id `n`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RetroButtons: u16 {
        const B      = 1 << joypad::B;
        const Y      = 1 << joypad::Y;
        const SELECT = 1 << joypad::SELECT;
        const START  = 1 << joypad::START;
        const UP     = 1 << joypad::UP;
        const DOWN   = 1 << joypad::DOWN;
        const LEFT   = 1 << joypad::LEFT;
        const RIGHT  = 1 << joypad::RIGHT;
        const A      = 1 << joypad::A;
        const X      = 1 << joypad::X;
        const L      = 1 << joypad::L;
        const R      = 1 << joypad::R;
        const L2     = 1 << joypad::L2;
        const R2     = 1 << joypad::R2;
        const L3     = 1 << joypad::L3;
        const R3     = 1 << joypad::R3;
    }
}

impl RetroButtons {
    /// Flag for a joypad id, if it names a button
    pub fn from_id(id: u32) -> Option<Self> {
        if id < joypad::COUNT {
            Self::from_bits(1 << id)
        } else {
            None
        }
    }
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PadState {
    /// Buttons held through key events
    pub keys: RetroButtons,
    /// D-pad directions held through hat motion
    pub hat: RetroButtons,
    /// Left analog (x, y), full `i16` range, 0 = center
    pub left: (i16, i16),
    /// Right analog (x, y)
    pub right: (i16, i16),
    /// Touch position in `i16` range while pressed
    pub pointer: Option<(i16, i16)>,
}

impl PadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buttons as the core sees them
    pub fn buttons(&self) -> RetroButtons {
        self.keys | self.hat
    }

    pub fn is_button_pressed(&self, button: RetroButtons) -> bool {
        self.buttons().contains(button)
    }

    pub fn set_button(&mut self, button: RetroButtons, pressed: bool) {
        self.keys.set(button, pressed);
    }

    /// Replace the hat-driven d-pad directions
    pub fn set_hat(&mut self, directions: RetroButtons) {
        self.hat = directions & (RetroButtons::UP | RetroButtons::DOWN | RetroButtons::LEFT | RetroButtons::RIGHT);
    }
}
