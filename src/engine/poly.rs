use std::f32::consts::PI;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use super::output::AudioOutput;
use super::voice::Voice;
use super::{ContextState, SynthEngine, When};
use crate::error::EngineError;
use crate::notes::Note;
use crate::settings::{GroupSettings, SettingsPatch};

const AUTO_FILTER_RATE_HZ: f32 = 4.0;
const AUTO_FILTER_BASE_HZ: f32 = 200.0;
const AUTO_FILTER_OCTAVES: f32 = 2.6;
const MASTER_LEVEL: f32 = 0.7;

pub type SharedPool = Arc<Mutex<VoicePool>>;

/// Low-pass swept by a sine LFO, applied after the voices are summed.
struct AutoFilter {
    phase: f32,
    lowpass: [f32; 2],
}

impl AutoFilter {
    fn new() -> Self {
        Self {
            phase: 0.0,
            lowpass: [0.0; 2],
        }
    }

    fn process(&mut self, input: f32, dt: f32) -> f32 {
        self.phase = (self.phase + AUTO_FILTER_RATE_HZ * dt).fract();
        let lfo = 0.5 + 0.5 * (self.phase * std::f32::consts::TAU).sin();
        let cutoff = AUTO_FILTER_BASE_HZ * 2.0f32.powf(lfo * AUTO_FILTER_OCTAVES);
        let g = (2.0 * PI * cutoff * dt).clamp(0.0, 0.99);
        self.lowpass[0] += g * (input - self.lowpass[0]);
        self.lowpass[1] += g * (self.lowpass[0] - self.lowpass[1]);
        self.lowpass[1]
    }
}

pub struct VoicePool {
    settings: GroupSettings,
    voices: Vec<Voice>,
    sample_rate: f32,
    clock: u64,
    auto_filter: AutoFilter,
}

impl VoicePool {
    pub fn new(settings: GroupSettings) -> Self {
        Self {
            settings,
            voices: Vec::new(),
            sample_rate: 44_100.0,
            clock: 0,
            auto_filter: AutoFilter::new(),
        }
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.sample_rate = rate.max(1.0);
    }

    pub fn settings(&self) -> &GroupSettings {
        &self.settings
    }

    /// Notes with a voice that has not been released yet.
    pub fn sounding(&self) -> Vec<Note> {
        self.voices
            .iter()
            .filter(|voice| !voice.is_released())
            .map(|voice| voice.note())
            .collect()
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn attack(&mut self, note: Note) {
        self.clock += 1;
        if let Some(voice) = self.voices.iter_mut().find(|v| v.note() == note) {
            voice.retrigger(self.clock);
            return;
        }
        if self.voices.len() >= self.settings.max_polyphony.max(1) {
            self.steal_oldest();
        }
        self.voices.push(Voice::start(note, self.clock));
    }

    pub fn release(&mut self, note: Note) {
        for voice in self.voices.iter_mut().filter(|v| v.note() == note) {
            voice.release();
        }
    }

    pub fn release_all(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.release();
        }
    }

    pub fn apply(&mut self, patch: &SettingsPatch) {
        patch.apply_to(&mut self.settings);
        while self.voices.len() > self.settings.max_polyphony.max(1) {
            self.steal_oldest();
        }
    }

    fn steal_oldest(&mut self) {
        let oldest = self
            .voices
            .iter()
            .enumerate()
            .min_by_key(|(_, voice)| (!voice.is_released(), voice.started()))
            .map(|(index, _)| index);
        if let Some(index) = oldest {
            self.voices.remove(index);
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let dt = 1.0 / self.sample_rate;
        let gain = 10.0f32.powf(self.settings.oscillator.volume / 20.0);
        let settings = &self.settings;
        let mixed: f32 = self
            .voices
            .iter_mut()
            .map(|voice| voice.sample(settings, dt))
            .sum();
        self.voices.retain(|voice| !voice.is_finished());
        self.auto_filter.process(mixed * gain, dt) * MASTER_LEVEL
    }
}

#[derive(Debug)]
enum PoolCommand {
    Attack(Note),
    Release(Vec<Note>),
    ReleaseAll,
    Set(SettingsPatch),
}

fn apply_command(pool: &SharedPool, command: PoolCommand) {
    let Ok(mut pool) = pool.lock() else {
        log::warn!(target: "engine", "voice pool lock poisoned, dropping {command:?}");
        return;
    };
    match command {
        PoolCommand::Attack(note) => pool.attack(note),
        PoolCommand::Release(notes) => {
            for note in notes {
                pool.release(note);
            }
        }
        PoolCommand::ReleaseAll => pool.release_all(),
        PoolCommand::Set(patch) => pool.apply(&patch),
    }
}

/// Polyphonic engine: commands go through a tokio worker into a shared voice pool
/// which the audio callback renders once the context has been resumed.
pub struct PolySynth {
    _runtime: Runtime,
    commands: mpsc::UnboundedSender<(PoolCommand, When)>,
    pool: SharedPool,
    output: Option<AudioOutput>,
}

impl PolySynth {
    pub fn new(settings: GroupSettings) -> Result<Self, EngineError> {
        let runtime = Runtime::new().map_err(|err| EngineError::Output(err.into()))?;
        let pool = Arc::new(Mutex::new(VoicePool::new(settings)));
        let (tx, mut rx) = mpsc::unbounded_channel::<(PoolCommand, When)>();

        let worker_pool = pool.clone();
        runtime.spawn(async move {
            while let Some((command, when)) = rx.recv().await {
                match when {
                    When::Now => apply_command(&worker_pool, command),
                    When::After(delay) => {
                        let pool = worker_pool.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            apply_command(&pool, command);
                        });
                    }
                }
            }
        });

        Ok(Self {
            _runtime: runtime,
            commands: tx,
            pool,
            output: None,
        })
    }

    pub fn pool(&self) -> SharedPool {
        self.pool.clone()
    }

    fn send(&self, command: PoolCommand, when: When) {
        if self.commands.send((command, when)).is_err() {
            log::error!(target: "engine", "{}", EngineError::WorkerGone);
        }
    }
}

impl SynthEngine for PolySynth {
    fn trigger_attack(&mut self, note: Note, when: When) {
        self.send(PoolCommand::Attack(note), when);
    }

    fn trigger_release(&mut self, notes: &[Note], when: When) {
        self.send(PoolCommand::Release(notes.to_vec()), when);
    }

    fn trigger_attack_release(&mut self, note: Note, duration: Duration) {
        self.send(PoolCommand::Attack(note), When::Now);
        self.send(PoolCommand::Release(vec![note]), When::After(duration));
    }

    fn release_all(&mut self) {
        self.send(PoolCommand::ReleaseAll, When::Now);
    }

    fn set(&mut self, patch: &SettingsPatch) {
        self.send(PoolCommand::Set(*patch), When::Now);
    }

    fn context_state(&self) -> ContextState {
        if self.output.is_some() {
            ContextState::Running
        } else {
            ContextState::Suspended
        }
    }

    fn resume(&mut self) -> Result<(), EngineError> {
        if self.output.is_some() {
            return Ok(());
        }
        let output = AudioOutput::start(self.pool.clone())?;
        log::info!(target: "engine", "audio output running at {} Hz", output.sample_rate());
        self.output = Some(output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Waveform;

    fn note(text: &str) -> Note {
        text.parse().unwrap()
    }

    #[test]
    fn steals_oldest_voice_past_polyphony() {
        let mut pool = VoicePool::new(GroupSettings::default());
        for name in ["C2", "D2", "E2", "F2", "G2"] {
            pool.attack(note(name));
        }
        assert_eq!(pool.voice_count(), 4);
        assert_eq!(
            pool.sounding(),
            vec![note("D2"), note("E2"), note("F2"), note("G2")]
        );
    }

    #[test]
    fn released_voices_are_stolen_first() {
        let mut pool = VoicePool::new(GroupSettings::default());
        for name in ["C2", "D2", "E2", "F2"] {
            pool.attack(note(name));
        }
        pool.release(note("E2"));
        pool.attack(note("A2"));
        assert_eq!(
            pool.sounding(),
            vec![note("C2"), note("D2"), note("F2"), note("A2")]
        );
    }

    #[test]
    fn repeated_attack_reuses_voice() {
        let mut pool = VoicePool::new(GroupSettings::default());
        pool.attack(note("C2"));
        pool.release(note("C2"));
        pool.attack(note("C2"));
        assert_eq!(pool.voice_count(), 1);
        assert_eq!(pool.sounding(), vec![note("C2")]);
    }

    #[test]
    fn patch_shrinks_polyphony_and_switches_waveform() {
        let mut pool = VoicePool::new(GroupSettings::default());
        for name in ["C2", "D2", "E2"] {
            pool.attack(note(name));
        }
        pool.apply(&SettingsPatch {
            max_polyphony: Some(2),
            ..SettingsPatch::oscillator(-12.0, Waveform::Sine)
        });
        assert_eq!(pool.voice_count(), 2);
        assert_eq!(pool.settings().oscillator.kind, Waveform::Sine);
        assert_eq!(pool.settings().oscillator.volume, -12.0);
    }

    #[test]
    fn release_all_lets_every_voice_finish() {
        let mut settings = GroupSettings::default();
        settings.envelope.release = 0.001;
        settings.envelope.attack = 0.001;
        let mut pool = VoicePool::new(settings);
        pool.attack(note("C2"));
        pool.attack(note("G2"));
        pool.release_all();
        assert!(pool.sounding().is_empty());
        for _ in 0..44_100 {
            pool.next_sample();
        }
        assert_eq!(pool.voice_count(), 0);
    }
}
