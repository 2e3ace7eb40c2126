//! Pretty JSON views of the stores, shown in the panel's inspection panes.

use serde::Serialize;

use crate::params::OscillatorGroupState;
use crate::status::AppStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Controls,
    Oscillator,
    Envelope,
    Filter,
    FilterEnvelope,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Controls,
        Section::Oscillator,
        Section::Envelope,
        Section::Filter,
        Section::FilterEnvelope,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Section::Controls => "controls",
            Section::Oscillator => "oscillator",
            Section::Envelope => "envelope",
            Section::Filter => "filter",
            Section::FilterEnvelope => "filterEnvelope",
        }
    }
}

pub fn status_json(status: &AppStatus) -> serde_json::Result<String> {
    serde_json::to_string_pretty(status)
}

pub fn section_json(group: &OscillatorGroupState, section: Section) -> serde_json::Result<String> {
    let settings = &group.settings;
    match section {
        Section::Controls => pretty(&group.controls),
        Section::Oscillator => pretty(&settings.oscillator),
        Section::Envelope => pretty(&settings.envelope),
        Section::Filter => pretty(&settings.filter),
        Section::FilterEnvelope => pretty(&settings.filter_envelope),
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{AudioStatus, StatusAction};

    #[test]
    fn status_pane_uses_camel_case() {
        let status = AppStatus::default()
            .reduce(&StatusAction::PanelLoaded)
            .reduce(&StatusAction::KeyHeld("C2".parse().unwrap()));
        let json: serde_json::Value =
            serde_json::from_str(&status_json(&status).unwrap()).unwrap();
        assert_eq!(json["panelLoaded"], true);
        assert_eq!(json["windowLoaded"], false);
        assert_eq!(json["keysHeld"][0], "C2");
        assert_eq!(json["audio"]["state"], "suspended");
    }

    #[test]
    fn failed_audio_carries_reason() {
        let status = AppStatus::default().reduce(&StatusAction::Audio(AudioStatus::Failed {
            reason: "no device".into(),
        }));
        let json: serde_json::Value =
            serde_json::from_str(&status_json(&status).unwrap()).unwrap();
        assert_eq!(json["audio"]["state"], "failed");
        assert_eq!(json["audio"]["reason"], "no device");
    }

    #[test]
    fn sections_of_osc_a() {
        let group = OscillatorGroupState::osc_a();

        let controls: serde_json::Value =
            serde_json::from_str(&section_json(&group, Section::Controls).unwrap()).unwrap();
        assert_eq!(controls["decay"], 500.0);
        assert_eq!(controls["octave"], 0.0);

        let oscillator: serde_json::Value =
            serde_json::from_str(&section_json(&group, Section::Oscillator).unwrap()).unwrap();
        assert_eq!(oscillator["type"], "sawtooth");
        assert_eq!(oscillator["volume"], -5.0);

        let filter: serde_json::Value =
            serde_json::from_str(&section_json(&group, Section::Filter).unwrap()).unwrap();
        assert_eq!(filter["Q"], 5.0);
        assert_eq!(filter["rolloff"], -12);

        let envelope: serde_json::Value =
            serde_json::from_str(&section_json(&group, Section::FilterEnvelope).unwrap()).unwrap();
        assert_eq!(envelope["baseFrequency"], 150.0);
    }
}
