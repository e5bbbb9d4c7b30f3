use std::collections::HashSet;

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// Identifier for a keyboard key, independent of the windowing backend.
///
/// Only single-character keys are tracked; the case is kept as typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(char);

impl KeyCode {
    pub const fn new(ch: char) -> Self {
        Self(ch)
    }

    /// Accepts a DOM `KeyboardEvent.key` value or winit character text.
    pub fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if !ch.is_control() => Some(Self(ch)),
            _ => None,
        }
    }

    pub fn char(self) -> char {
        self.0
    }
}

/// Key that shows or hides the debug panel.
pub const DEBUG_TOGGLE: KeyCode = KeyCode::new('h');

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

/// Pointer motion gathered since the controls last consumed it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrbitInput {
    /// Drag distance in physical pixels while the left button was held.
    pub drag: Vec2,
    /// Wheel steps; positive values zoom out.
    pub wheel: f32,
}

/// Thread-safe input snapshot fed by the platform event handlers.
#[derive(Debug, Default)]
pub struct InputState {
    keys: RwLock<HashSet<KeyCode>>,
    mouse_buttons: RwLock<HashSet<MouseButton>>,
    mouse_position: RwLock<Option<Vec2>>,
    pending: RwLock<OrbitInput>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key press and returns `true` if it was not already held.
    pub fn set_key_down(&self, key: KeyCode) -> bool {
        self.keys.write().insert(key)
    }

    pub fn set_key_up(&self, key: KeyCode) {
        self.keys.write().remove(&key);
    }

    pub fn set_mouse_button_down(&self, button: MouseButton) {
        self.mouse_buttons.write().insert(button);
    }

    pub fn set_mouse_button_up(&self, button: MouseButton) {
        self.mouse_buttons.write().remove(&button);
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.read().contains(&button)
    }

    /// Moves the cursor, turning the motion into drag distance while the left button is held.
    pub fn set_mouse_position(&self, position: Vec2) {
        let previous = self.mouse_position.write().replace(position);
        if let Some(previous) = previous {
            if self.is_mouse_button_down(MouseButton::LEFT) {
                self.pending.write().drag += position - previous;
            }
        }
    }

    pub fn mouse_position(&self) -> Option<Vec2> {
        *self.mouse_position.read()
    }

    pub fn add_wheel(&self, steps: f32) {
        self.pending.write().wheel += steps;
    }

    /// Returns and clears the accumulated orbit input.
    pub fn take_orbit_input(&self) -> OrbitInput {
        std::mem::take(&mut *self.pending.write())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_character_keys_keeping_case() {
        assert_eq!(KeyCode::from_name("h"), Some(DEBUG_TOGGLE));
        assert_ne!(KeyCode::from_name("H"), Some(DEBUG_TOGGLE));
        assert_eq!(KeyCode::from_name("H").map(KeyCode::char), Some('H'));
        assert_eq!(KeyCode::from_name("Escape"), None);
        assert_eq!(KeyCode::from_name("ArrowLeft"), None);
        assert_eq!(KeyCode::from_name(""), None);
    }

    #[test]
    fn key_down_reports_first_press_only() {
        let state = InputState::new();
        assert!(state.set_key_down(DEBUG_TOGGLE));
        assert!(!state.set_key_down(DEBUG_TOGGLE));
        state.set_key_up(DEBUG_TOGGLE);
        assert!(state.set_key_down(DEBUG_TOGGLE));
    }

    #[test]
    fn drag_only_accumulates_with_button_held() {
        let state = InputState::new();
        state.set_mouse_position(Vec2::new(10.0, 10.0));
        state.set_mouse_position(Vec2::new(20.0, 10.0));
        assert_eq!(state.take_orbit_input().drag, Vec2::ZERO);

        state.set_mouse_button_down(MouseButton::LEFT);
        state.set_mouse_position(Vec2::new(25.0, 4.0));
        state.add_wheel(-1.0);
        let input = state.take_orbit_input();
        assert_eq!(input.drag, Vec2::new(5.0, -6.0));
        assert_eq!(input.wheel, -1.0);
        assert_eq!(state.take_orbit_input(), OrbitInput::default());
    }
}
