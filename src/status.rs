use serde::Serialize;

use crate::notes::Note;
use crate::store::Store;

const RELEASED_HISTORY: usize = 16;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AudioStatus {
    #[default]
    Suspended,
    Running,
    Failed {
        reason: String,
    },
}

impl AudioStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, AudioStatus::Running)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStatus {
    pub panel_loaded: bool,
    pub window_loaded: bool,
    pub audio: AudioStatus,
    pub keys_held: Vec<Note>,
    pub keys_released: Vec<Note>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StatusAction {
    PanelLoaded,
    WindowLoaded,
    Audio(AudioStatus),
    KeyHeld(Note),
    KeyReleased(Note),
    ClearReleased,
}

impl AppStatus {
    pub fn reduce(&self, action: &StatusAction) -> AppStatus {
        let mut next = self.clone();
        match action {
            StatusAction::PanelLoaded => next.panel_loaded = true,
            StatusAction::WindowLoaded => next.window_loaded = true,
            StatusAction::Audio(status) => {
                // running is sticky for the session
                if !next.audio.is_running() {
                    next.audio = status.clone();
                }
            }
            StatusAction::KeyHeld(note) => {
                if !next.keys_held.contains(note) {
                    next.keys_held.push(*note);
                }
            }
            StatusAction::KeyReleased(note) => {
                next.keys_held.retain(|held| held != note);
                next.keys_released.push(*note);
                if next.keys_released.len() > RELEASED_HISTORY {
                    let excess = next.keys_released.len() - RELEASED_HISTORY;
                    next.keys_released.drain(..excess);
                }
            }
            StatusAction::ClearReleased => next.keys_released.clear(),
        }
        next
    }
}

impl Store<AppStatus> {
    pub fn dispatch(&mut self, action: StatusAction) {
        self.apply(|status| status.reduce(&action));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(text: &str) -> Note {
        text.parse().unwrap()
    }

    #[test]
    fn running_is_sticky() {
        let status = AppStatus::default()
            .reduce(&StatusAction::Audio(AudioStatus::Running))
            .reduce(&StatusAction::Audio(AudioStatus::Failed {
                reason: "late".into(),
            }));
        assert_eq!(status.audio, AudioStatus::Running);
    }

    #[test]
    fn failure_can_be_retried() {
        let status = AppStatus::default()
            .reduce(&StatusAction::Audio(AudioStatus::Failed {
                reason: "no device".into(),
            }))
            .reduce(&StatusAction::Audio(AudioStatus::Running));
        assert!(status.audio.is_running());
    }

    #[test]
    fn release_moves_note_between_lists() {
        let status = AppStatus::default()
            .reduce(&StatusAction::KeyHeld(note("C2")))
            .reduce(&StatusAction::KeyHeld(note("E2")))
            .reduce(&StatusAction::KeyReleased(note("C2")));
        assert_eq!(status.keys_held, vec![note("E2")]);
        assert_eq!(status.keys_released, vec![note("C2")]);
        let cleared = status.reduce(&StatusAction::ClearReleased);
        assert!(cleared.keys_released.is_empty());
    }

    #[test]
    fn released_history_is_bounded() {
        let mut status = AppStatus::default();
        for raw in 0..40 {
            status = status.reduce(&StatusAction::KeyReleased(Note::from_key(raw, 0, 0)));
        }
        assert_eq!(status.keys_released.len(), RELEASED_HISTORY);
        assert_eq!(status.keys_released.last(), Some(&Note::from_key(39, 0, 0)));
    }
}
