use std::f32::consts::PI;

use crate::notes::Note;
use crate::settings::{Envelope, FilterEnvelope, FilterSettings, FilterType, GroupSettings};

const FILTER_MIN_CUTOFF: f32 = 20.0;
const FILTER_MAX_CUTOFF: f32 = 18_000.0;
const FILTER_ENV_OCTAVES: f32 = 4.0;
const MAX_Q: f32 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EnvStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Clone, Copy)]
struct EnvelopeTimes {
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,
}

impl From<&Envelope> for EnvelopeTimes {
    fn from(env: &Envelope) -> Self {
        Self {
            attack: env.attack,
            decay: env.decay,
            sustain: env.sustain,
            release: env.release,
        }
    }
}

impl From<&FilterEnvelope> for EnvelopeTimes {
    fn from(env: &FilterEnvelope) -> Self {
        Self {
            attack: env.attack,
            decay: env.decay,
            sustain: env.sustain,
            release: env.release,
        }
    }
}

struct Adsr {
    value: f32,
    stage: EnvStage,
}

impl Adsr {
    fn new() -> Self {
        Self {
            value: 0.0,
            stage: EnvStage::Idle,
        }
    }

    fn trigger(&mut self) {
        self.stage = EnvStage::Attack;
    }

    fn release(&mut self) {
        if self.stage != EnvStage::Idle {
            self.stage = EnvStage::Release;
        }
    }

    fn advance(&mut self, dt: f32, times: EnvelopeTimes) -> f32 {
        let sustain = times.sustain.clamp(0.0, 1.0);
        match self.stage {
            EnvStage::Idle => {
                self.value = 0.0;
            }
            EnvStage::Attack => {
                self.value += dt / times.attack.max(0.0005);
                if self.value >= 1.0 {
                    self.value = 1.0;
                    self.stage = EnvStage::Decay;
                }
            }
            EnvStage::Decay => {
                let step = (dt / times.decay.max(0.0005)).min(1.0);
                self.value += (sustain - self.value) * step;
                if (self.value - sustain).abs() < 0.001 {
                    self.value = sustain;
                    self.stage = EnvStage::Sustain;
                }
            }
            EnvStage::Sustain => {
                self.value = sustain;
            }
            EnvStage::Release => {
                let step = (dt / times.release.max(0.0005)).min(1.0);
                self.value -= self.value * step;
                if self.value <= 0.0001 {
                    self.value = 0.0;
                    self.stage = EnvStage::Idle;
                }
            }
        }
        self.value.clamp(0.0, 1.0)
    }
}

struct LadderFilter {
    stage: [f32; 4],
}

impl LadderFilter {
    fn new() -> Self {
        Self { stage: [0.0; 4] }
    }

    fn process(&mut self, input: f32, cutoff: f32, settings: &FilterSettings, dt: f32) -> f32 {
        let g = (2.0 * PI * cutoff * dt).clamp(0.0, 0.99);
        let resonance = (settings.q / MAX_Q).clamp(0.0, 0.95) * 4.0;

        let feedback = self.stage[3] * resonance;
        let drive = (input - feedback).tanh();

        self.stage[0] += g * (drive - self.stage[0]);
        self.stage[1] += g * (self.stage[0].tanh() - self.stage[1]);
        self.stage[2] += g * (self.stage[1].tanh() - self.stage[2]);
        self.stage[3] += g * (self.stage[2].tanh() - self.stage[3]);

        let lowpass = if settings.rolloff > -24 {
            self.stage[1]
        } else {
            self.stage[3]
        };
        match settings.kind {
            FilterType::Lowpass => lowpass,
            FilterType::Highpass => input - lowpass,
            FilterType::Bandpass => self.stage[1] - self.stage[3],
        }
    }
}

pub struct Voice {
    note: Note,
    frequency: f32,
    phase: f32,
    started: u64,
    released: bool,
    amp_env: Adsr,
    filter_env: Adsr,
    filter: LadderFilter,
}

impl Voice {
    pub fn start(note: Note, started: u64) -> Self {
        let mut voice = Self {
            note,
            frequency: note.frequency(),
            phase: 0.0,
            started,
            released: false,
            amp_env: Adsr::new(),
            filter_env: Adsr::new(),
            filter: LadderFilter::new(),
        };
        voice.retrigger(started);
        voice
    }

    pub fn note(&self) -> Note {
        self.note
    }

    pub fn started(&self) -> u64 {
        self.started
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn is_finished(&self) -> bool {
        self.released && self.amp_env.stage == EnvStage::Idle
    }

    pub fn retrigger(&mut self, started: u64) {
        self.started = started;
        self.released = false;
        self.amp_env.trigger();
        self.filter_env.trigger();
    }

    pub fn release(&mut self) {
        self.released = true;
        self.amp_env.release();
        self.filter_env.release();
    }

    pub fn sample(&mut self, settings: &GroupSettings, dt: f32) -> f32 {
        self.phase = (self.phase + self.frequency * dt).fract();
        let raw = settings.oscillator.kind.sample(self.phase);

        let filter_env = self
            .filter_env
            .advance(dt, EnvelopeTimes::from(&settings.filter_envelope));
        let cutoff = (settings.filter_envelope.base_frequency
            * 2.0f32.powf(filter_env * FILTER_ENV_OCTAVES))
        .clamp(FILTER_MIN_CUTOFF, FILTER_MAX_CUTOFF);
        let filtered = self.filter.process(raw, cutoff, &settings.filter, dt);

        let amp = self.amp_env.advance(dt, EnvelopeTimes::from(&settings.envelope));
        filtered * amp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_settings() -> GroupSettings {
        let mut settings = GroupSettings::default();
        settings.envelope = Envelope {
            attack: 0.001,
            decay: 0.001,
            sustain: 0.5,
            release: 0.001,
        };
        settings
    }

    #[test]
    fn envelope_settles_on_sustain_then_finishes_after_release() {
        let settings = quick_settings();
        let dt = 1.0 / 44_100.0;
        let mut voice = Voice::start("A4".parse().unwrap(), 0);
        for _ in 0..4_410 {
            voice.sample(&settings, dt);
        }
        assert_eq!(voice.amp_env.stage, EnvStage::Sustain);
        assert!((voice.amp_env.value - 0.5).abs() < 1e-3);
        assert!(!voice.is_finished());

        voice.release();
        for _ in 0..4_410 {
            voice.sample(&settings, dt);
        }
        assert!(voice.is_finished());
    }

    #[test]
    fn output_stays_bounded() {
        let settings = quick_settings();
        let dt = 1.0 / 48_000.0;
        let mut voice = Voice::start("C2".parse().unwrap(), 0);
        for _ in 0..48_000 {
            let sample = voice.sample(&settings, dt);
            assert!(sample.is_finite());
            assert!(sample.abs() <= 2.0);
        }
    }
}
