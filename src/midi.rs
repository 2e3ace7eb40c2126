//! Hardware keyboard input over MIDI.
//!
//! Note messages are translated into [`KeyChange`] events on the midir callback thread
//! and drained by the UI loop once per frame.

use std::sync::mpsc::{self, Receiver};

use midir::{MidiInput, MidiInputConnection};

use crate::error::MidiError;
use crate::keyboard::KeyChange;

const CLIENT_NAME: &str = "polypad";

/// Raw key 0 is C0, which MIDI numbers 12.
const MIDI_KEY_OFFSET: i32 = 12;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;

pub struct MidiKeys {
    _connection: MidiInputConnection<()>,
    events: Receiver<KeyChange>,
    port_name: String,
}

impl MidiKeys {
    /// Connects to the first input port whose name contains `port_hint`, or to the
    /// first port when no hint is given or nothing matches.
    pub fn connect(port_hint: Option<&str>) -> Result<Self, MidiError> {
        let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
        let ports = midi_in.ports();
        if ports.is_empty() {
            return Err(MidiError::NoPorts);
        }

        let names: Vec<String> = ports
            .iter()
            .map(|port| {
                midi_in
                    .port_name(port)
                    .unwrap_or_else(|_| "Unknown".to_string())
            })
            .collect();
        let index = pick_port(&names, port_hint);
        if let Some(hint) = port_hint {
            if !names[index].contains(hint) {
                log::info!(target: "midi", "no port matching '{hint}', using {}", names[index]);
            }
        }
        let port_name = names[index].clone();

        let (tx, rx) = mpsc::channel();
        let connection = midi_in
            .connect(
                &ports[index],
                "polypad-input",
                move |_timestamp, message, _| {
                    if let Some(change) = key_change(message) {
                        let _ = tx.send(change);
                    }
                },
                (),
            )
            .map_err(|e| MidiError::Connect {
                port: port_name.clone(),
                reason: e.to_string(),
            })?;

        log::info!(target: "midi", "listening on {port_name}");
        Ok(Self {
            _connection: connection,
            events: rx,
            port_name,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Pending key changes, oldest first (non-blocking).
    pub fn drain(&self) -> Vec<KeyChange> {
        self.events.try_iter().collect()
    }
}

fn pick_port(names: &[String], hint: Option<&str>) -> usize {
    hint.and_then(|hint| names.iter().position(|name| name.contains(hint)))
        .unwrap_or(0)
}

/// Note on/off as a key change. Note-on with velocity 0 is a release.
pub fn key_change(message: &[u8]) -> Option<KeyChange> {
    if message.len() < 3 {
        return None;
    }
    let status = message[0] & 0xF0;
    let note = i32::from(message[1]);
    let velocity = message[2];
    if note < MIDI_KEY_OFFSET {
        return None;
    }
    let key = note - MIDI_KEY_OFFSET;
    match status {
        NOTE_ON if velocity > 0 => Some(KeyChange::press(key)),
        NOTE_ON | NOTE_OFF => Some(KeyChange::release(key)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::Note;

    #[test]
    fn note_messages() {
        assert_eq!(key_change(&[0x90, 60, 100]), Some(KeyChange::press(48)));
        assert_eq!(key_change(&[0x93, 60, 100]), Some(KeyChange::press(48)));
        assert_eq!(key_change(&[0x80, 60, 0]), Some(KeyChange::release(48)));
        assert_eq!(key_change(&[0x90, 60, 0]), Some(KeyChange::release(48)));
    }

    #[test]
    fn middle_c_is_c4() {
        let change = key_change(&[0x90, 60, 90]).unwrap();
        assert_eq!(Note::from_key(change.key, 0, 0).to_string(), "C4");
    }

    #[test]
    fn other_messages_are_ignored() {
        assert_eq!(key_change(&[0xB0, 7, 100]), None);
        assert_eq!(key_change(&[0x90, 11, 100]), None);
        assert_eq!(key_change(&[0xF8]), None);
    }

    #[test]
    fn port_hint_matches_by_substring() {
        let names = vec!["Midi Through".to_string(), "Keystation 49".to_string()];
        assert_eq!(pick_port(&names, Some("Keystation")), 1);
        assert_eq!(pick_port(&names, Some("Launchkey")), 0);
        assert_eq!(pick_port(&names, None), 0);
    }
}
