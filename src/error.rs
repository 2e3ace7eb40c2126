use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown oscillator group '{0}'")]
    UnknownGroup(String),
    #[error("'{0}' is not a control subgroup")]
    UnknownSubgroup(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("no control '{id}' on the panel surface")]
    MissingControl { id: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("audio output failed: {0}")]
    Output(#[from] anyhow::Error),
    #[error("synth command worker has stopped")]
    WorkerGone,
}

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("could not open MIDI input: {0}")]
    Init(String),
    #[error("no MIDI input ports available")]
    NoPorts,
    #[error("could not connect to MIDI port '{port}': {reason}")]
    Connect { port: String, reason: String },
}
