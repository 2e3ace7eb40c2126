use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::StoreError;
use crate::settings::{GroupSettings, SettingsBlock, Waveform};
use crate::store::Store;

pub const OSC_A: &str = "OSC_A";
pub const CONTROLS: &str = "controls";

pub const OCTAVE: &str = "octave";
pub const SEMITONE: &str = "semitone";
pub const QUANTIZE: &str = "quantize";
pub const SHAPE: &str = "shape";
pub const ATTACK: &str = "attack";
pub const DECAY: &str = "decay";
pub const SUSTAIN: &str = "sustain";
pub const RELEASE: &str = "release";

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ControlValue(pub f64);

impl ControlValue {
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Integer view of the value; `None` for fractional or non-finite values.
    pub fn as_index(self) -> Option<i64> {
        if self.0.is_finite() && self.0.fract() == 0.0 {
            Some(self.0 as i64)
        } else {
            None
        }
    }

    pub fn round_i32(self) -> i32 {
        if self.0.is_finite() {
            self.0.round() as i32
        } else {
            0
        }
    }
}

impl From<f64> for ControlValue {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OscillatorGroupState {
    pub name: String,
    pub enabled: bool,
    pub pos: Position,
    pub controls: Arc<BTreeMap<String, ControlValue>>,
    pub settings: Arc<GroupSettings>,
}

impl OscillatorGroupState {
    /// An empty group; `OSC_B` is displayed as `OSC B`.
    pub fn named(key: &str) -> Self {
        Self {
            name: key.replace('_', " "),
            enabled: true,
            pos: Position::default(),
            controls: Arc::new(BTreeMap::new()),
            settings: Arc::new(GroupSettings::default()),
        }
    }

    pub fn osc_a() -> Self {
        let controls = [
            (OCTAVE, 0.0),
            (SEMITONE, 0.0),
            (QUANTIZE, 0.0),
            (SHAPE, 0.0),
            (ATTACK, 1.0),
            (DECAY, 500.0),
            (SUSTAIN, 1.0),
            (RELEASE, 1000.0),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), ControlValue(value)))
        .collect();
        Self {
            pos: Position { x: 20.0, y: 140.0 },
            controls: Arc::new(controls),
            ..Self::named(OSC_A)
        }
    }

    pub fn control(&self, name: &str) -> Option<ControlValue> {
        self.controls.get(name).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OscillatorField {
    Volume(f32),
    Type(Waveform),
}

/// Every oscillator group keyed by name. Cloning is cheap: groups are shared until
/// one of them is written.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParamState {
    groups: BTreeMap<String, Arc<OscillatorGroupState>>,
}

impl Default for ParamState {
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(OSC_A.to_string(), Arc::new(OscillatorGroupState::osc_a()));
        Self { groups }
    }
}

impl ParamState {
    pub fn empty() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }

    pub fn group(&self, name: &str) -> Option<&OscillatorGroupState> {
        self.groups.get(name).map(|group| group.as_ref())
    }

    pub fn group_arc(&self, name: &str) -> Option<&Arc<OscillatorGroupState>> {
        self.groups.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &OscillatorGroupState)> {
        self.groups
            .iter()
            .map(|(name, group)| (name.as_str(), group.as_ref()))
    }

    pub fn control(&self, group: &str, control: &str) -> Option<ControlValue> {
        self.group(group).and_then(|g| g.control(control))
    }

    pub fn with_group(&self, key: &str, group: OscillatorGroupState) -> Self {
        let mut next = self.clone();
        next.groups.insert(key.to_string(), Arc::new(group));
        next
    }

    /// Sets one control leaf. Groups that do not exist yet are created.
    pub fn with_control(
        &self,
        group: &str,
        subgroup: &str,
        control: &str,
        value: ControlValue,
    ) -> Result<Self, StoreError> {
        if subgroup != CONTROLS {
            return Err(StoreError::UnknownSubgroup(subgroup.to_string()));
        }
        let mut next = self.clone();
        let slot = next
            .groups
            .entry(group.to_string())
            .or_insert_with(|| Arc::new(OscillatorGroupState::named(group)));
        let state = Arc::make_mut(slot);
        Arc::make_mut(&mut state.controls).insert(control.to_string(), value);
        Ok(next)
    }

    pub fn with_settings(&self, group: &str, block: SettingsBlock) -> Result<Self, StoreError> {
        self.map_settings(group, |settings| block.apply(settings))
    }

    pub fn with_oscillator_field(
        &self,
        group: &str,
        field: OscillatorField,
    ) -> Result<Self, StoreError> {
        self.map_settings(group, |settings| match field {
            OscillatorField::Volume(volume) => settings.oscillator.volume = volume,
            OscillatorField::Type(kind) => settings.oscillator.kind = kind,
        })
    }

    fn map_settings(
        &self,
        group: &str,
        edit: impl FnOnce(&mut GroupSettings),
    ) -> Result<Self, StoreError> {
        let mut next = self.clone();
        let slot = next
            .groups
            .get_mut(group)
            .ok_or_else(|| StoreError::UnknownGroup(group.to_string()))?;
        let state = Arc::make_mut(slot);
        edit(Arc::make_mut(&mut state.settings));
        Ok(next)
    }
}

impl Store<ParamState> {
    pub fn set_control(
        &mut self,
        group: &str,
        subgroup: &str,
        control: &str,
        value: ControlValue,
    ) -> Result<(), StoreError> {
        self.try_apply(|state| state.with_control(group, subgroup, control, value))
    }

    pub fn set_settings(&mut self, group: &str, block: SettingsBlock) -> Result<(), StoreError> {
        self.try_apply(|state| state.with_settings(group, block))
    }

    pub fn set_oscillator(&mut self, group: &str, field: OscillatorField) -> Result<(), StoreError> {
        self.try_apply(|state| state.with_oscillator_field(group, field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::OscillatorSettings;

    #[test]
    fn set_control_leaves_siblings_untouched() {
        let mut store = Store::new(
            ParamState::default().with_group("OSC_B", OscillatorGroupState::named("OSC_B")),
        );
        let before = store.snapshot();

        store
            .set_control(OSC_A, CONTROLS, OCTAVE, ControlValue(2.0))
            .unwrap();

        let after = store.get();
        assert_eq!(after.control(OSC_A, OCTAVE), Some(ControlValue(2.0)));
        assert_eq!(before.control(OSC_A, OCTAVE), Some(ControlValue(0.0)));
        for name in [SEMITONE, QUANTIZE, SHAPE, ATTACK, DECAY, SUSTAIN, RELEASE] {
            assert_eq!(
                after.control(OSC_A, name),
                before.control(OSC_A, name),
                "{name} changed"
            );
        }
        let (old_a, new_a) = (
            before.group_arc(OSC_A).unwrap(),
            after.group_arc(OSC_A).unwrap(),
        );
        assert!(Arc::ptr_eq(&old_a.settings, &new_a.settings));
        assert!(!Arc::ptr_eq(&old_a.controls, &new_a.controls));
        assert!(Arc::ptr_eq(
            before.group_arc("OSC_B").unwrap(),
            after.group_arc("OSC_B").unwrap()
        ));
    }

    #[test]
    fn out_of_range_values_are_stored_as_is() {
        let mut store = Store::new(ParamState::default());
        store
            .set_control(OSC_A, CONTROLS, OCTAVE, ControlValue(42.0))
            .unwrap();
        assert_eq!(store.get().control(OSC_A, OCTAVE), Some(ControlValue(42.0)));
    }

    #[test]
    fn controls_create_missing_groups() {
        let mut store = Store::new(ParamState::default());
        store
            .set_control("OSC_B", CONTROLS, OCTAVE, ControlValue(-1.0))
            .unwrap();
        let group = store.get().group("OSC_B").unwrap();
        assert_eq!(group.name, "OSC B");
        assert_eq!(group.control(OCTAVE), Some(ControlValue(-1.0)));
    }

    #[test]
    fn rejects_non_control_subgroups() {
        let mut store = Store::new(ParamState::default());
        let err = store
            .set_control(OSC_A, "settings", OCTAVE, ControlValue(1.0))
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownSubgroup("settings".into()));
    }

    #[test]
    fn settings_block_replaces_whole_subgroup() {
        let mut store = Store::new(ParamState::default());
        let before = store.snapshot();
        let block = OscillatorSettings {
            volume: 0.0,
            kind: Waveform::Sine,
        };
        store
            .set_settings(OSC_A, SettingsBlock::Oscillator(block))
            .unwrap();
        let group = store.get().group(OSC_A).unwrap();
        assert_eq!(group.settings.oscillator, block);
        let old = before.group(OSC_A).unwrap();
        assert_eq!(group.settings.envelope, old.settings.envelope);
        assert!(Arc::ptr_eq(&group.controls, &old.controls));

        let err = store
            .set_settings("OSC_Z", SettingsBlock::Oscillator(block))
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownGroup("OSC_Z".into()));
    }

    #[test]
    fn oscillator_field_update() {
        let mut store = Store::new(ParamState::default());
        store
            .set_oscillator(OSC_A, OscillatorField::Volume(-3.0))
            .unwrap();
        let osc = store.get().group(OSC_A).unwrap().settings.oscillator;
        assert_eq!(osc.volume, -3.0);
        assert_eq!(osc.kind, Waveform::Sawtooth);
    }
}
