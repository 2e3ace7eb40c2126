use std::cell::RefCell;
use std::rc::Rc;

use crate::binding::{ControlBindings, ControlChange, ControlId, ControlSurface};
use crate::engine::SynthEngine;
use crate::error::BindingError;
use crate::events::{EventTarget, Subscription};
use crate::gate::{AudioGate, Click};
use crate::keyboard::{KeyChange, KeyboardHandler};
use crate::notes::Note;
use crate::params::{OCTAVE, OSC_A, ParamState, SEMITONE, SHAPE};
use crate::status::{AppStatus, StatusAction};
use crate::store::Store;

/// Everything a listener may touch while handling an event.
pub struct Rig {
    pub params: Store<ParamState>,
    pub status: Store<AppStatus>,
    pub engine: Box<dyn SynthEngine>,
}

impl Rig {
    pub fn new(params: ParamState, engine: Box<dyn SynthEngine>) -> Self {
        Self {
            params: Store::new(params),
            status: Store::new(AppStatus::default()),
            engine,
        }
    }
}

/// Controls the panel expects to find on its surface.
pub fn declared_controls() -> [ControlId; 3] {
    [
        ControlId::new(OSC_A, OCTAVE),
        ControlId::new(OSC_A, SEMITONE),
        ControlId::new(OSC_A, SHAPE),
    ]
}

pub struct Panel {
    rig: Rig,
    surface: ControlSurface,
    bindings: ControlBindings,
    binding_errors: Vec<BindingError>,
    keys: EventTarget<KeyChange, Rig>,
    clicks: EventTarget<Click, Rig>,
    keyboard: Rc<RefCell<KeyboardHandler>>,
    _keyboard_listener: Subscription,
    gate: AudioGate,
}

impl Panel {
    pub fn new(params: ParamState, engine: Box<dyn SynthEngine>, surface: ControlSurface) -> Self {
        let mut rig = Rig::new(params, engine);
        let mut bindings = ControlBindings::new();
        let mut binding_errors: Vec<BindingError> = declared_controls()
            .iter()
            .filter_map(|id| bindings.bind(&surface, id).err())
            .inspect(|err| log::error!(target: "panel", "{err}"))
            .collect();
        binding_errors.extend(bindings.bind_all(&surface));

        let keys = EventTarget::new();
        let keyboard = Rc::new(RefCell::new(KeyboardHandler::new(OSC_A)));
        let handler = keyboard.clone();
        let keyboard_listener = keys.add_listener(move |change: &KeyChange, rig: &mut Rig| {
            handler.borrow_mut().handle(change, rig);
        });

        rig.status.dispatch(StatusAction::PanelLoaded);
        log::info!(
            target: "panel",
            "panel ready: {} controls bound, {} failed",
            bindings.len(),
            binding_errors.len()
        );

        Self {
            rig,
            surface,
            bindings,
            binding_errors,
            keys,
            clicks: EventTarget::new(),
            keyboard,
            _keyboard_listener: keyboard_listener,
            gate: AudioGate::new(),
        }
    }

    pub fn control_changed(&mut self, id: &str, value: f64) {
        let change = ControlChange {
            id: id.to_string(),
            value,
        };
        self.surface.dispatch(&change, &mut self.rig);
    }

    pub fn key_changed(&mut self, change: KeyChange) {
        self.keys.dispatch(&change, &mut self.rig);
    }

    pub fn clicked(&mut self, click: Click) {
        self.clicks.dispatch(&click, &mut self.rig);
    }

    /// Called after every drawn frame.
    pub fn frame_rendered(&mut self) {
        if !self.rig.status.get().window_loaded {
            self.rig.status.dispatch(StatusAction::WindowLoaded);
        }
        self.gate.arm(&self.clicks, &self.rig);
    }

    pub fn audition(&mut self, key: i32) -> Note {
        self.keyboard.borrow().audition(key, &mut self.rig)
    }

    pub fn params(&self) -> &ParamState {
        self.rig.params.get()
    }

    pub fn status(&self) -> &AppStatus {
        self.rig.status.get()
    }

    pub fn surface(&self) -> &ControlSurface {
        &self.surface
    }

    pub fn bindings(&self) -> &ControlBindings {
        &self.bindings
    }

    pub fn binding_errors(&self) -> &[BindingError] {
        &self.binding_errors
    }

    pub fn is_key_held(&self, key: i32) -> bool {
        self.keyboard.borrow().is_held(key)
    }

    pub fn note_for(&self, key: i32) -> Note {
        self.keyboard.borrow().note_for(key, self.rig.params.get())
    }

    pub fn audio_armed(&self) -> bool {
        self.gate.is_armed()
    }

    pub fn rig_mut(&mut self) -> &mut Rig {
        &mut self.rig
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ControlSpec;
    use crate::engine::recording::{Call, RecordingEngine};
    use crate::engine::When;
    use crate::params::ControlValue;
    use crate::settings::{SettingsPatch, Waveform};

    fn panel() -> (RecordingEngine, Panel) {
        let engine = RecordingEngine::new();
        let panel = Panel::new(
            ParamState::default(),
            Box::new(engine.clone()),
            ControlSurface::oscillator_a(),
        );
        (engine, panel)
    }

    #[test]
    fn startup_binds_controls_and_marks_panel_loaded() {
        let (_engine, panel) = panel();
        assert_eq!(panel.bindings().len(), 3);
        assert!(panel.binding_errors().is_empty());
        assert!(panel.status().panel_loaded);
        assert!(!panel.status().window_loaded);
    }

    #[test]
    fn octave_knob_moves_the_next_note() {
        let (engine, mut panel) = panel();
        panel.control_changed("OSC_A_octave_control", 1.0);
        assert_eq!(panel.params().control(OSC_A, OCTAVE), Some(ControlValue(1.0)));
        panel.key_changed(KeyChange::press(24));
        assert!(panel.is_key_held(24));
        assert_eq!(engine.take(), vec![Call::Attack("C3".into(), When::Now)]);
    }

    #[test]
    fn shape_slider_reaches_engine() {
        let (engine, mut panel) = panel();
        panel.control_changed("OSC_A_shape_control", 2.0);
        assert_eq!(
            engine.take(),
            vec![Call::Set(SettingsPatch::oscillator(-12.0, Waveform::Triangle))]
        );
    }

    #[test]
    fn click_after_first_frame_starts_audio() {
        let (engine, mut panel) = panel();
        panel.clicked(Click { x: 0.0, y: 0.0 });
        assert_eq!(engine.count(&Call::Resume), 0);

        panel.frame_rendered();
        assert!(panel.status().window_loaded);
        assert!(panel.audio_armed());
        panel.clicked(Click { x: 0.0, y: 0.0 });
        assert!(panel.status().audio.is_running());

        panel.frame_rendered();
        panel.clicked(Click { x: 0.0, y: 0.0 });
        assert_eq!(engine.count(&Call::Resume), 1);
    }

    #[test]
    fn surface_without_a_control_still_builds() {
        let engine = RecordingEngine::new();
        let mut panel = Panel::new(
            ParamState::default(),
            Box::new(engine.clone()),
            ControlSurface::new([ControlSpec::knob(OSC_A, OCTAVE, -3.0, 3.0, [0; 3])]),
        );
        assert_eq!(panel.bindings().len(), 1);
        assert_eq!(
            panel.binding_errors(),
            &[
                BindingError::MissingControl {
                    id: "OSC_A_semitone_control".into()
                },
                BindingError::MissingControl {
                    id: "OSC_A_shape_control".into()
                },
            ]
        );
        panel.control_changed("OSC_A_shape_control", 1.0);
        assert!(engine.take().is_empty());
    }
}
