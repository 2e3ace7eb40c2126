//! Synthesis engine seam.
//!
//! The panel only ever talks to a [`SynthEngine`]. [`PolySynth`] is the backend the
//! binary uses; tests plug in a recorder instead.

mod output;
mod poly;
mod voice;

use std::time::Duration;

use crate::error::EngineError;
use crate::notes::Note;
use crate::settings::SettingsPatch;

pub use poly::{PolySynth, VoicePool};

/// Length of a sixteenth note at 120 BPM, used for one-shot auditions.
pub const SIXTEENTH: Duration = Duration::from_millis(125);

/// Offset applied to note releases coming from the keyboard.
pub const RELEASE_DELAY: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum When {
    Now,
    After(Duration),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
}

pub trait SynthEngine {
    fn trigger_attack(&mut self, note: Note, when: When);

    fn trigger_release(&mut self, notes: &[Note], when: When);

    fn trigger_attack_release(&mut self, note: Note, duration: Duration);

    fn release_all(&mut self);

    /// Applies a deep-partial settings update to every voice.
    fn set(&mut self, patch: &SettingsPatch);

    fn context_state(&self) -> ContextState;

    /// Starts audio output. Safe to call again after a failure.
    fn resume(&mut self) -> Result<(), EngineError>;
}

#[cfg(test)]
pub(crate) mod recording {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Call {
        Attack(String, When),
        Release(Vec<String>, When),
        AttackRelease(String, Duration),
        ReleaseAll,
        Set(SettingsPatch),
        Resume,
    }

    /// Records every call; the log is shared so tests can inspect it after the engine
    /// has been boxed into a panel.
    #[derive(Clone, Default)]
    pub struct RecordingEngine {
        pub calls: Rc<RefCell<Vec<Call>>>,
        pub fail_resumes: Rc<RefCell<usize>>,
        running: bool,
    }

    impl RecordingEngine {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_resumes(count: usize) -> Self {
            let engine = Self::default();
            *engine.fail_resumes.borrow_mut() = count;
            engine
        }

        pub fn take(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.borrow_mut())
        }

        pub fn count(&self, wanted: &Call) -> usize {
            self.calls.borrow().iter().filter(|c| *c == wanted).count()
        }
    }

    impl SynthEngine for RecordingEngine {
        fn trigger_attack(&mut self, note: Note, when: When) {
            self.calls.borrow_mut().push(Call::Attack(note.to_string(), when));
        }

        fn trigger_release(&mut self, notes: &[Note], when: When) {
            let names = notes.iter().map(|n| n.to_string()).collect();
            self.calls.borrow_mut().push(Call::Release(names, when));
        }

        fn trigger_attack_release(&mut self, note: Note, duration: Duration) {
            self.calls
                .borrow_mut()
                .push(Call::AttackRelease(note.to_string(), duration));
        }

        fn release_all(&mut self) {
            self.calls.borrow_mut().push(Call::ReleaseAll);
        }

        fn set(&mut self, patch: &SettingsPatch) {
            self.calls.borrow_mut().push(Call::Set(*patch));
        }

        fn context_state(&self) -> ContextState {
            if self.running {
                ContextState::Running
            } else {
                ContextState::Suspended
            }
        }

        fn resume(&mut self) -> Result<(), EngineError> {
            self.calls.borrow_mut().push(Call::Resume);
            let mut failures = self.fail_resumes.borrow_mut();
            if *failures > 0 {
                *failures -= 1;
                return Err(EngineError::Output(anyhow::anyhow!("no output device")));
            }
            self.running = true;
            Ok(())
        }
    }
}
