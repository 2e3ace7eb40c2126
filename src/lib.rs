//! Polyphonic synth panel: a parameter store driven by knobs and a keyboard, feeding a
//! voice-pool synth that starts on the first click.

pub mod binding;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod gate;
pub mod inspect;
pub mod keyboard;
pub mod midi;
pub mod notes;
pub mod panel;
pub mod params;
pub mod settings;
pub mod status;
pub mod store;
