use std::collections::BTreeMap;

use crate::engine::{RELEASE_DELAY, SIXTEENTH, When};
use crate::notes::Note;
use crate::panel::Rig;
use crate::params::{OCTAVE, ParamState, SEMITONE};
use crate::status::StatusAction;

/// A key on the keyboard widget went down or up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyChange {
    pub pressed: bool,
    pub key: i32,
}

impl KeyChange {
    pub fn press(key: i32) -> Self {
        Self { pressed: true, key }
    }

    pub fn release(key: i32) -> Self {
        Self {
            pressed: false,
            key,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Attacked(Note),
    Released { note: Note, all_off: bool },
    Ignored,
}

/// Turns key changes into attack/release calls and keeps track of sounding notes.
///
/// Offsets are read from the parameter store on every event. Held notes are keyed by
/// raw key so a release always stops the note its press started.
pub struct KeyboardHandler {
    group: String,
    held: BTreeMap<i32, Note>,
}

impl KeyboardHandler {
    pub fn new(group: &str) -> Self {
        Self {
            group: group.to_string(),
            held: BTreeMap::new(),
        }
    }

    pub fn offsets(&self, params: &ParamState) -> (i32, i32) {
        let read = |control: &str| {
            params
                .control(&self.group, control)
                .map(|value| value.round_i32())
                .unwrap_or(0)
        };
        (read(OCTAVE), read(SEMITONE))
    }

    pub fn note_for(&self, key: i32, params: &ParamState) -> Note {
        let (octave, semitone) = self.offsets(params);
        Note::from_key(key, octave, semitone)
    }

    pub fn held_keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.held.keys().copied()
    }

    pub fn held_notes(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = self.held.values().copied().collect();
        notes.sort();
        notes.dedup();
        notes
    }

    pub fn is_held(&self, key: i32) -> bool {
        self.held.contains_key(&key)
    }

    pub fn handle(&mut self, change: &KeyChange, rig: &mut Rig) -> KeyOutcome {
        if change.pressed {
            self.press(change.key, rig)
        } else {
            self.release(change.key, rig)
        }
    }

    fn press(&mut self, key: i32, rig: &mut Rig) -> KeyOutcome {
        if self.held.contains_key(&key) {
            return KeyOutcome::Ignored;
        }
        let note = self.note_for(key, rig.params.get());
        log::debug!(target: "keyboard", "attack {note} (key {key})");
        self.held.insert(key, note);
        rig.status.dispatch(StatusAction::KeyHeld(note));
        rig.engine.trigger_attack(note, When::Now);
        KeyOutcome::Attacked(note)
    }

    fn release(&mut self, key: i32, rig: &mut Rig) -> KeyOutcome {
        let note = match self.held.remove(&key) {
            Some(note) => note,
            None => self.note_for(key, rig.params.get()),
        };
        let still_held = self.held.values().any(|held| *held == note);
        if still_held {
            log::debug!(target: "keyboard", "{note} still held by another key");
        } else {
            log::debug!(target: "keyboard", "release {note} (key {key})");
            rig.status.dispatch(StatusAction::KeyReleased(note));
            rig.engine
                .trigger_release(&[note], When::After(RELEASE_DELAY));
        }

        // Missed release events leave voices hanging; once nothing is held, stop everything.
        let all_off = self.held.is_empty();
        if all_off {
            rig.engine.release_all();
        }
        KeyOutcome::Released { note, all_off }
    }

    /// Plays a short one-shot note without touching the held set.
    pub fn audition(&self, key: i32, rig: &mut Rig) -> Note {
        let note = self.note_for(key, rig.params.get());
        rig.engine.trigger_attack_release(note, SIXTEENTH);
        note
    }
}
