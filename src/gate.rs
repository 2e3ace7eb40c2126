//! Audio start gate.
//!
//! Output stays suspended until the user clicks somewhere on the panel. The gate keeps
//! at most one one-shot click listener pending while audio is not running.

use crate::engine::ContextState;
use crate::events::{EventTarget, Subscription};
use crate::panel::Rig;
use crate::status::{AudioStatus, StatusAction};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Click {
    pub x: f32,
    pub y: f32,
}

#[derive(Default)]
pub struct AudioGate {
    pending: Option<Subscription>,
}

impl AudioGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|subscription| subscription.is_active())
    }

    /// Registers the resume listener if audio is not running and none is pending.
    /// Returns whether a new listener was registered.
    pub fn arm(&mut self, clicks: &EventTarget<Click, Rig>, rig: &Rig) -> bool {
        if is_running(rig) {
            self.pending = None;
            return false;
        }
        if self.is_armed() {
            return false;
        }
        log::debug!(target: "gate", "waiting for a click to start audio");
        self.pending = Some(clicks.add_once_listener(|_, rig: &mut Rig| resume(rig)));
        true
    }
}

fn is_running(rig: &Rig) -> bool {
    rig.engine.context_state() == ContextState::Running && rig.status.get().audio.is_running()
}

pub fn resume(rig: &mut Rig) {
    match rig.engine.resume() {
        Ok(()) => {
            log::info!(target: "gate", "audio running");
            rig.status.dispatch(StatusAction::Audio(AudioStatus::Running));
        }
        Err(err) => {
            log::warn!(target: "gate", "could not start audio: {err}");
            rig.status.dispatch(StatusAction::Audio(AudioStatus::Failed {
                reason: err.to_string(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recording::{Call, RecordingEngine};
    use crate::params::ParamState;

    const CLICK: Click = Click { x: 1.0, y: 1.0 };

    #[test]
    fn first_click_resumes_once() {
        let engine = RecordingEngine::new();
        let mut rig = Rig::new(ParamState::default(), Box::new(engine.clone()));
        let clicks = EventTarget::new();
        let mut gate = AudioGate::new();

        assert!(gate.arm(&clicks, &rig));
        assert!(!gate.arm(&clicks, &rig));
        assert_eq!(clicks.listener_count(), 1);

        clicks.dispatch(&CLICK, &mut rig);
        clicks.dispatch(&CLICK, &mut rig);

        assert_eq!(engine.count(&Call::Resume), 1);
        assert!(rig.status.get().audio.is_running());
        assert!(!gate.is_armed());
        assert!(!gate.arm(&clicks, &rig));
        assert_eq!(clicks.listener_count(), 0);
    }

    #[test]
    fn failed_resume_is_retryable() {
        let engine = RecordingEngine::failing_resumes(1);
        let mut rig = Rig::new(ParamState::default(), Box::new(engine.clone()));
        let clicks = EventTarget::new();
        let mut gate = AudioGate::new();

        gate.arm(&clicks, &rig);
        clicks.dispatch(&CLICK, &mut rig);
        assert!(matches!(rig.status.get().audio, AudioStatus::Failed { .. }));

        assert!(gate.arm(&clicks, &rig));
        clicks.dispatch(&CLICK, &mut rig);
        assert!(rig.status.get().audio.is_running());
        assert_eq!(engine.count(&Call::Resume), 2);
    }

    #[test]
    fn dropping_the_gate_removes_its_listener() {
        let engine = RecordingEngine::new();
        let rig = Rig::new(ParamState::default(), Box::new(engine));
        let clicks = EventTarget::new();
        let mut gate = AudioGate::new();
        gate.arm(&clicks, &rig);
        drop(gate);
        assert_eq!(clicks.listener_count(), 0);
    }
}
