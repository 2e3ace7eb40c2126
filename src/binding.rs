use std::collections::HashMap;

use crate::error::BindingError;
use crate::events::{EventTarget, Subscription};
use crate::panel::Rig;
use crate::params::{CONTROLS, ControlValue, OCTAVE, OSC_A, SEMITONE, SHAPE};
use crate::settings::{OscillatorSettings, SettingsBlock, SettingsPatch, Waveform};

pub const SHAPE_VOLUME_DB: f32 = -12.0;

const SHAPES: [Waveform; 4] = [
    Waveform::Sine,
    Waveform::Square,
    Waveform::Triangle,
    Waveform::Sawtooth,
];

/// Oscillator block selected by a shape index. Anything outside 0..=3 is a sine.
pub fn shape_settings(value: ControlValue) -> OscillatorSettings {
    let kind = value
        .as_index()
        .and_then(|index| usize::try_from(index).ok())
        .and_then(|index| SHAPES.get(index))
        .copied()
        .unwrap_or(SHAPES[0]);
    OscillatorSettings {
        volume: SHAPE_VOLUME_DB,
        kind,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ControlId {
    pub group: String,
    pub control: String,
}

impl ControlId {
    pub fn new(group: &str, control: &str) -> Self {
        Self {
            group: group.to_string(),
            control: control.to_string(),
        }
    }

    pub fn element_id(&self) -> String {
        format!("{}_{}_control", self.group, self.control)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKind {
    Knob,
    Slider,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControlSpec {
    pub id: ControlId,
    pub kind: ControlKind,
    pub min: f64,
    pub max: f64,
    pub size: f32,
    /// Foreground, background and pointer colours as `0xRRGGBB`.
    pub colors: [u32; 3],
}

impl ControlSpec {
    pub fn knob(group: &str, control: &str, min: f64, max: f64, colors: [u32; 3]) -> Self {
        Self {
            id: ControlId::new(group, control),
            kind: ControlKind::Knob,
            min,
            max,
            size: 100.0,
            colors,
        }
    }

    pub fn slider(group: &str, control: &str, min: f64, max: f64, colors: [u32; 3]) -> Self {
        Self {
            kind: ControlKind::Slider,
            ..Self::knob(group, control, min, max, colors)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControlChange {
    pub id: String,
    pub value: f64,
}

pub struct ControlElement {
    spec: ControlSpec,
    events: EventTarget<ControlChange, Rig>,
}

impl ControlElement {
    pub fn spec(&self) -> &ControlSpec {
        &self.spec
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }
}

/// The set of controls drawn on the panel, each addressable by its element id.
pub struct ControlSurface {
    elements: Vec<ControlElement>,
}

impl ControlSurface {
    pub fn new(specs: impl IntoIterator<Item = ControlSpec>) -> Self {
        let elements = specs
            .into_iter()
            .map(|spec| ControlElement {
                spec,
                events: EventTarget::new(),
            })
            .collect();
        Self { elements }
    }

    /// Octave and semitone knobs plus the shape slider for OSC A.
    pub fn oscillator_a() -> Self {
        Self::new([
            ControlSpec::knob(OSC_A, OCTAVE, -3.0, 3.0, [0xFF6188, 0x2C292D, 0xD9D9D9]),
            ControlSpec::knob(OSC_A, SEMITONE, -3.0, 3.0, [0xA9DC76, 0x2C292D, 0xD9D9D9]),
            ControlSpec::slider(OSC_A, SHAPE, 0.0, 4.0, [0x78DCE8, 0x2C292D, 0xD9D9D9]),
        ])
    }

    pub fn element(&self, element_id: &str) -> Option<&ControlElement> {
        self.elements
            .iter()
            .find(|element| element.spec.id.element_id() == element_id)
    }

    pub fn specs(&self) -> impl Iterator<Item = &ControlSpec> {
        self.elements.iter().map(|element| &element.spec)
    }

    /// Delivers a change to the element it names. Returns the number of listeners run.
    pub fn dispatch(&self, change: &ControlChange, rig: &mut Rig) -> usize {
        match self.element(&change.id) {
            Some(element) => element.events.dispatch(change, rig),
            None => {
                log::warn!(target: "binding", "change for unknown control {}", change.id);
                0
            }
        }
    }
}

/// Live bindings, one listener per element id.
#[derive(Default)]
pub struct ControlBindings {
    bound: HashMap<String, Subscription>,
}

impl ControlBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the change listener for `id`. Returns `Ok(false)` if it was already bound.
    pub fn bind(&mut self, surface: &ControlSurface, id: &ControlId) -> Result<bool, BindingError> {
        let element_id = id.element_id();
        if self.bound.contains_key(&element_id) {
            return Ok(false);
        }
        let element = surface
            .element(&element_id)
            .ok_or_else(|| BindingError::MissingControl {
                id: element_id.clone(),
            })?;
        let spec = element.spec.clone();
        let subscription = element
            .events
            .add_listener(move |change: &ControlChange, rig: &mut Rig| {
                handle_change(&spec, change.value, rig)
            });
        log::debug!(target: "binding", "bound {element_id}");
        self.bound.insert(element_id, subscription);
        Ok(true)
    }

    /// Binds every control on the surface, returning the ones that failed.
    pub fn bind_all(&mut self, surface: &ControlSurface) -> Vec<BindingError> {
        let ids: Vec<ControlId> = surface.specs().map(|spec| spec.id.clone()).collect();
        ids.iter()
            .filter_map(|id| self.bind(surface, id).err())
            .inspect(|err| log::error!(target: "binding", "{err}"))
            .collect()
    }

    pub fn unbind(&mut self, id: &ControlId) -> bool {
        self.bound.remove(&id.element_id()).is_some()
    }

    pub fn is_bound(&self, id: &ControlId) -> bool {
        self.bound.contains_key(&id.element_id())
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

fn handle_change(spec: &ControlSpec, value: f64, rig: &mut Rig) {
    let id = &spec.id;
    log::debug!(target: "binding", "{} <- {}", id.element_id(), value);

    if id.control == SHAPE {
        let settings = shape_settings(ControlValue(value));
        let stored = rig
            .params
            .set_control(&id.group, CONTROLS, &id.control, ControlValue(value))
            .and_then(|_| {
                rig.params
                    .set_settings(&id.group, SettingsBlock::Oscillator(settings))
            });
        if let Err(err) = stored {
            log::warn!(target: "binding", "{}: {err}", id.element_id());
        }
        rig.engine
            .set(&SettingsPatch::oscillator(settings.volume, settings.kind));
        return;
    }

    if value.is_nan() {
        log::warn!(target: "binding", "{}: ignoring NaN", id.element_id());
        return;
    }
    let clamped = value.clamp(spec.min, spec.max);
    if clamped != value {
        log::warn!(
            target: "binding",
            "{}: {value} outside [{}, {}], using {clamped}",
            id.element_id(),
            spec.min,
            spec.max
        );
    }
    if let Err(err) = rig
        .params
        .set_control(&id.group, CONTROLS, &id.control, ControlValue(clamped))
    {
        log::warn!(target: "binding", "{}: {err}", id.element_id());
    }
}
