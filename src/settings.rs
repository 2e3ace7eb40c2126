use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    pub fn label(&self) -> &'static str {
        match self {
            Waveform::Sine => "SINE",
            Waveform::Square => "SQUARE",
            Waveform::Triangle => "TRI",
            Waveform::Sawtooth => "SAW",
        }
    }

    /// One cycle of the waveform for `phase` in `[0, 1)`.
    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            Waveform::Sawtooth => 2.0 * (phase - 0.5),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
            Waveform::Sine => (phase * std::f32::consts::TAU).sin(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OscillatorSettings {
    /// Gain in dB.
    pub volume: f32,
    #[serde(rename = "type")]
    pub kind: Waveform,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(rename = "Q")]
    pub q: f32,
    #[serde(rename = "type")]
    pub kind: FilterType,
    /// Slope in dB per octave, one of -12, -24, -48.
    pub rolloff: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterEnvelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub base_frequency: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSettings {
    pub oscillator: OscillatorSettings,
    pub envelope: Envelope,
    pub filter: FilterSettings,
    pub filter_envelope: FilterEnvelope,
    pub max_polyphony: usize,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            oscillator: OscillatorSettings {
                volume: -5.0,
                kind: Waveform::Sawtooth,
            },
            envelope: Envelope {
                attack: 1.0,
                decay: 1.0,
                sustain: 1.0,
                release: 1.0,
            },
            filter: FilterSettings {
                q: 5.0,
                kind: FilterType::Lowpass,
                rolloff: -12,
            },
            filter_envelope: FilterEnvelope {
                attack: 0.1,
                decay: 0.2,
                sustain: 1.0,
                release: 2.0,
                base_frequency: 150.0,
            },
            max_polyphony: 4,
        }
    }
}

impl GroupSettings {
    /// Full patch that brings an engine in line with these settings.
    pub fn to_patch(&self) -> SettingsPatch {
        SettingsPatch {
            oscillator: Some(OscillatorPatch {
                volume: Some(self.oscillator.volume),
                kind: Some(self.oscillator.kind),
            }),
            envelope: Some(self.envelope),
            filter: Some(self.filter),
            filter_envelope: Some(self.filter_envelope),
            max_polyphony: Some(self.max_polyphony),
        }
    }
}

/// Whole settings subgroup, as replaced by `ParamState::set_settings`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SettingsBlock {
    Oscillator(OscillatorSettings),
    Envelope(Envelope),
    Filter(FilterSettings),
    FilterEnvelope(FilterEnvelope),
}

impl SettingsBlock {
    pub fn name(&self) -> &'static str {
        match self {
            SettingsBlock::Oscillator(_) => "oscillator",
            SettingsBlock::Envelope(_) => "envelope",
            SettingsBlock::Filter(_) => "filter",
            SettingsBlock::FilterEnvelope(_) => "filterEnvelope",
        }
    }

    pub fn apply(self, settings: &mut GroupSettings) {
        match self {
            SettingsBlock::Oscillator(block) => settings.oscillator = block,
            SettingsBlock::Envelope(block) => settings.envelope = block,
            SettingsBlock::Filter(block) => settings.filter = block,
            SettingsBlock::FilterEnvelope(block) => settings.filter_envelope = block,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OscillatorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<Waveform>,
}

/// Deep-partial update: only the fields that are `Some` are applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oscillator: Option<OscillatorPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope: Option<Envelope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_envelope: Option<FilterEnvelope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_polyphony: Option<usize>,
}

impl SettingsPatch {
    pub fn oscillator(volume: f32, kind: Waveform) -> Self {
        Self {
            oscillator: Some(OscillatorPatch {
                volume: Some(volume),
                kind: Some(kind),
            }),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, settings: &mut GroupSettings) {
        if let Some(osc) = self.oscillator {
            if let Some(volume) = osc.volume {
                settings.oscillator.volume = volume;
            }
            if let Some(kind) = osc.kind {
                settings.oscillator.kind = kind;
            }
        }
        if let Some(envelope) = self.envelope {
            settings.envelope = envelope;
        }
        if let Some(filter) = self.filter {
            settings.filter = filter;
        }
        if let Some(filter_envelope) = self.filter_envelope {
            settings.filter_envelope = filter_envelope;
        }
        if let Some(max) = self.max_polyphony {
            settings.max_polyphony = max.max(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_only_touches_present_fields() {
        let mut settings = GroupSettings::default();
        let before = settings.clone();
        SettingsPatch::oscillator(-12.0, Waveform::Sine).apply_to(&mut settings);
        assert_eq!(settings.oscillator.volume, -12.0);
        assert_eq!(settings.oscillator.kind, Waveform::Sine);
        assert_eq!(settings.envelope, before.envelope);
        assert_eq!(settings.filter, before.filter);
        assert_eq!(settings.filter_envelope, before.filter_envelope);
        assert_eq!(settings.max_polyphony, before.max_polyphony);
    }

    #[test]
    fn serializes_with_engine_field_names() {
        let json = serde_json::to_value(GroupSettings::default()).unwrap();
        assert_eq!(json["oscillator"]["type"], "sawtooth");
        assert_eq!(json["filter"]["Q"], 5.0);
        assert_eq!(json["filterEnvelope"]["baseFrequency"], 150.0);
        assert_eq!(json["maxPolyphony"], 4);

        let patch = serde_json::to_value(SettingsPatch::oscillator(-12.0, Waveform::Square)).unwrap();
        assert_eq!(
            patch,
            serde_json::json!({"oscillator": {"volume": -12.0, "type": "square"}})
        );
    }
}
