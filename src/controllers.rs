use macroquad::prelude::*;
use polypad::keyboard::KeyChange;

/// Raw key of the Z key before any octave shift (C3).
const COMPUTER_BASE_KEY: i32 = 36;
const MIN_SHIFT: i32 = -3;
const MAX_SHIFT: i32 = 4;

#[derive(Clone, Copy)]
pub struct KeyBinding {
    pub label: &'static str,
    pub keycode: KeyCode,
    /// Semitones above the Z key.
    pub offset: i32,
}

const fn bind(label: &'static str, keycode: KeyCode, offset: i32) -> KeyBinding {
    KeyBinding {
        label,
        keycode,
        offset,
    }
}

const BINDINGS: [KeyBinding; 12] = [
    bind("Z", KeyCode::Z, 0),
    bind("S", KeyCode::S, 1),
    bind("X", KeyCode::X, 2),
    bind("D", KeyCode::D, 3),
    bind("C", KeyCode::C, 4),
    bind("V", KeyCode::V, 5),
    bind("G", KeyCode::G, 6),
    bind("B", KeyCode::B, 7),
    bind("H", KeyCode::H, 8),
    bind("N", KeyCode::N, 9),
    bind("J", KeyCode::J, 10),
    bind("M", KeyCode::M, 11),
];

/// Plays the keyboard from the bottom letter row. `-` and `=` move it by an octave.
pub struct ComputerKeys {
    /// Keys currently down with the raw key they pressed.
    pressed: Vec<(KeyCode, i32)>,
    octave_shift: i32,
}

impl ComputerKeys {
    pub fn new() -> Self {
        Self {
            pressed: Vec::new(),
            octave_shift: 0,
        }
    }

    pub fn poll(&mut self) -> Vec<KeyChange> {
        if is_key_pressed(KeyCode::Minus) {
            self.adjust_octave(-1);
        }
        if is_key_pressed(KeyCode::Equal) {
            self.adjust_octave(1);
        }

        let mut changes = Vec::new();
        for binding in BINDINGS {
            if is_key_pressed(binding.keycode) && !self.is_pressed(binding.keycode) {
                let key = self.raw_key(binding.offset);
                self.pressed.push((binding.keycode, key));
                changes.push(KeyChange::press(key));
            }
            if is_key_released(binding.keycode) {
                if let Some(index) = self
                    .pressed
                    .iter()
                    .position(|(code, _)| *code == binding.keycode)
                {
                    let (_, key) = self.pressed.remove(index);
                    changes.push(KeyChange::release(key));
                }
            }
        }
        changes
    }

    fn adjust_octave(&mut self, delta: i32) {
        self.octave_shift = (self.octave_shift + delta).clamp(MIN_SHIFT, MAX_SHIFT);
        log::debug!(target: "controllers", "computer keyboard octave shift {}", self.octave_shift);
    }

    fn raw_key(&self, offset: i32) -> i32 {
        COMPUTER_BASE_KEY + self.octave_shift * 12 + offset
    }

    fn is_pressed(&self, keycode: KeyCode) -> bool {
        self.pressed.iter().any(|(code, _)| *code == keycode)
    }

    /// Letter printed on the on-screen key that `key` would play, if any.
    pub fn label_for(&self, key: i32) -> Option<&'static str> {
        BINDINGS
            .iter()
            .find(|binding| self.raw_key(binding.offset) == key)
            .map(|binding| binding.label)
    }
}

/// Tracks the on-screen key under a held left mouse button, gliding between keys.
#[derive(Default)]
pub struct MouseKeys {
    active: Option<i32>,
}

impl MouseKeys {
    pub fn update(
        &mut self,
        hovered: Option<i32>,
        mouse_pressed: bool,
        mouse_down: bool,
        mouse_released: bool,
    ) -> Vec<KeyChange> {
        let mut changes = Vec::new();
        if mouse_pressed {
            if let Some(key) = hovered {
                self.active = Some(key);
                changes.push(KeyChange::press(key));
            }
        }
        if mouse_down && !mouse_pressed {
            if let Some(active) = self.active {
                match hovered {
                    Some(hit) if hit != active => {
                        changes.push(KeyChange::release(active));
                        changes.push(KeyChange::press(hit));
                        self.active = Some(hit);
                    }
                    Some(_) => {}
                    None => {
                        changes.push(KeyChange::release(active));
                        self.active = None;
                    }
                }
            }
        }
        if mouse_released {
            if let Some(active) = self.active.take() {
                changes.push(KeyChange::release(active));
            }
        }
        changes
    }
}
