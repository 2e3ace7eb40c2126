use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;
use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

const DEFAULT_KEYS: usize = 49;
const MAX_KEYS: usize = 88;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    panel: PanelConfig,
    #[serde(default)]
    midi: MidiConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Deserialize, Default)]
struct PanelConfig {
    keys: Option<usize>,
    first_key: Option<i32>,
}

#[derive(Deserialize, Default)]
struct MidiConfig {
    enabled: Option<bool>,
    port: Option<String>,
}

#[derive(Deserialize, Default)]
struct LoggingConfig {
    level: Option<String>,
}

pub struct Config {
    panel: PanelConfig,
    midi: MidiConfig,
    logging: LoggingConfig,
}

impl Config {
    /// Embedded defaults, overridden by `$CONFIG_DIR/polypad/config.toml` when present.
    pub fn load() -> Self {
        let user = user_config_path().filter(|path| path.exists()).and_then(|path| {
            match std::fs::read_to_string(&path) {
                Ok(contents) => Some(contents),
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e);
                    None
                }
            }
        });
        Self::from_sources(user.as_deref())
    }

    pub fn from_sources(user: Option<&str>) -> Self {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is invalid: {e}");
            ConfigFile::default()
        });

        if let Some(contents) = user {
            match toml::from_str::<ConfigFile>(contents) {
                Ok(user) => {
                    merge_panel(&mut base.panel, user.panel);
                    merge_midi(&mut base.midi, user.midi);
                    merge_logging(&mut base.logging, user.logging);
                }
                Err(e) => log::warn!(target: "config", "ignoring malformed config: {e}"),
            }
        }

        Config {
            panel: base.panel,
            midi: base.midi,
            logging: base.logging,
        }
    }

    /// Keys on the on-screen keyboard (clamped to 1..=88).
    pub fn keys(&self) -> usize {
        self.panel.keys.unwrap_or(DEFAULT_KEYS).clamp(1, MAX_KEYS)
    }

    pub fn first_key(&self) -> i32 {
        self.panel.first_key.unwrap_or(0)
    }

    pub fn midi_enabled(&self) -> bool {
        self.midi.enabled.unwrap_or(true)
    }

    pub fn midi_port(&self) -> Option<&str> {
        self.midi.port.as_deref().filter(|port| !port.is_empty())
    }

    pub fn log_level(&self) -> LevelFilter {
        self.logging
            .level
            .as_deref()
            .and_then(|level| LevelFilter::from_str(level).ok())
            .unwrap_or(LevelFilter::Info)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("polypad").join("config.toml"))
}

fn merge_panel(base: &mut PanelConfig, user: PanelConfig) {
    if user.keys.is_some() {
        base.keys = user.keys;
    }
    if user.first_key.is_some() {
        base.first_key = user.first_key;
    }
}

fn merge_midi(base: &mut MidiConfig, user: MidiConfig) {
    if user.enabled.is_some() {
        base.enabled = user.enabled;
    }
    if user.port.is_some() {
        base.port = user.port;
    }
}

fn merge_logging(base: &mut LoggingConfig, user: LoggingConfig) {
    if user.level.is_some() {
        base.level = user.level;
    }
}
