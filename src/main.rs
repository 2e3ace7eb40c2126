mod controllers;
mod view;

use anyhow::Context;
use controllers::{ComputerKeys, MouseKeys};
use log::LevelFilter;
use macroquad::prelude::*;
use polypad::binding::{ControlKind, ControlSpec, ControlSurface, shape_settings};
use polypad::config::Config;
use polypad::engine::PolySynth;
use polypad::error::MidiError;
use polypad::gate::Click;
use polypad::inspect::{Section, section_json, status_json};
use polypad::midi::MidiKeys;
use polypad::notes::pitch_index;
use polypad::panel::Panel;
use polypad::params::{ControlValue, OSC_A, ParamState, SHAPE};
use view::{
    AMBER, BACKGROUND, DragState, PianoLayout, SCREEN_WIDTH, control_widget, draw_audio_prompt,
    draw_keyboard, draw_section, draw_text_pane, mouse_position_vec, window_conf,
};

const HELP: &str = "Z-M PLAY   - / = OCTAVE   TAB PANE   RIGHT CLICK AUDITION";

fn init_logging() {
    use simplelog::{ColorChoice, TermLogger, TerminalMode};

    // Filtering happens through `log::set_max_level` once the config is read.
    if let Err(err) = TermLogger::init(
        LevelFilter::Trace,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("logging unavailable: {err}");
    }
    log::set_max_level(LevelFilter::Info);
}

#[macroquad::main(window_conf)]
async fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose" || a == "-v");
    init_logging();
    if let Err(err) = run(verbose).await {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run(verbose: bool) -> anyhow::Result<()> {
    let config = Config::load();
    let level = if verbose {
        LevelFilter::Debug
    } else {
        config.log_level()
    };
    log::set_max_level(level);
    log::info!("polypad starting (log level: {level:?})");

    let params = ParamState::default();
    let settings = params
        .group(OSC_A)
        .map(|group| (*group.settings).clone())
        .unwrap_or_default();
    let engine = PolySynth::new(settings).context("could not start the synth engine")?;
    let mut panel = Panel::new(params, Box::new(engine), ControlSurface::oscillator_a());
    let midi = connect_midi(&config);

    let specs: Vec<ControlSpec> = panel.surface().specs().cloned().collect();
    let piano = PianoLayout::new(config.first_key(), config.keys());
    let mut computer_keys = ComputerKeys::new();
    let mut mouse_keys = MouseKeys::default();
    let mut drag = DragState::default();
    let mut section = 0;

    loop {
        clear_background(BACKGROUND);
        let mouse = mouse_position_vec();

        if is_mouse_button_pressed(MouseButton::Left) {
            panel.clicked(Click {
                x: mouse.x,
                y: mouse.y,
            });
        }

        let hovered = piano.hit_test(mouse);
        let mut key_changes = mouse_keys.update(
            hovered,
            is_mouse_button_pressed(MouseButton::Left),
            is_mouse_button_down(MouseButton::Left),
            is_mouse_button_released(MouseButton::Left),
        );
        key_changes.extend(computer_keys.poll());
        if let Some(midi) = &midi {
            key_changes.extend(midi.drain());
        }
        for change in key_changes {
            panel.key_changed(change);
        }
        if is_mouse_button_pressed(MouseButton::Right) {
            if let Some(key) = hovered {
                panel.audition(key);
            }
        }
        if is_key_pressed(KeyCode::Tab) {
            section = (section + 1) % Section::ALL.len();
        }

        let group = panel.params().group(OSC_A).cloned();
        let oscillator_rect = match &group {
            Some(group) => Rect::new(group.pos.x, group.pos.y, 480.0, 220.0),
            None => Rect::new(20.0, 140.0, 480.0, 220.0),
        };
        draw_section(&oscillator_rect, "OSC A");
        let mut control_changes = Vec::new();
        for (index, spec) in specs.iter().enumerate() {
            let value = group
                .as_ref()
                .and_then(|group| group.control(&spec.id.control))
                .map(ControlValue::as_f64)
                .unwrap_or(spec.min);
            let rect = control_rect(&oscillator_rect, index, spec);
            let label = spec.id.control.to_uppercase();
            if let Some(next) =
                control_widget(&mut drag, spec, rect, value, &label, &display(spec, value))
            {
                control_changes.push((spec.id.element_id(), next));
            }
        }
        for (id, value) in control_changes {
            panel.control_changed(&id, value);
        }

        let status_rect = Rect::new(540.0, 40.0, 340.0, 400.0);
        draw_section(&status_rect, "STATUS");
        match status_json(panel.status()) {
            Ok(text) => draw_text_pane(&status_rect, &text),
            Err(err) => log::warn!("status pane: {err}"),
        }

        let pane = Section::ALL[section];
        let pane_rect = Rect::new(900.0, 40.0, SCREEN_WIDTH - 920.0, 400.0);
        draw_section(&pane_rect, &pane.title().to_uppercase());
        if let Some(group) = panel.params().group(OSC_A) {
            match section_json(group, pane) {
                Ok(text) => draw_text_pane(&pane_rect, &text),
                Err(err) => log::warn!("{} pane: {err}", pane.title()),
            }
        }

        draw_text(HELP, 20.0, 24.0, 18.0, AMBER);
        let midi_label = match &midi {
            Some(midi) => format!("MIDI {}", midi.port_name()),
            None => "MIDI OFF".to_string(),
        };
        draw_text(&midi_label, 20.0, oscillator_rect.y + oscillator_rect.h + 30.0, 18.0, AMBER);

        draw_keyboard(
            &piano,
            |key| panel.is_key_held(key),
            |key| computer_keys.label_for(key),
            |key| (pitch_index(key) == 0).then(|| panel.note_for(key).to_string()),
        );
        draw_audio_prompt(&panel.status().audio);

        next_frame().await;
        panel.frame_rendered();
    }
}

fn connect_midi(config: &Config) -> Option<MidiKeys> {
    if !config.midi_enabled() {
        log::info!("MIDI input disabled");
        return None;
    }
    match MidiKeys::connect(config.midi_port()) {
        Ok(midi) => Some(midi),
        Err(MidiError::NoPorts) => {
            log::info!("no MIDI input ports, playing from the computer keyboard");
            None
        }
        Err(err) => {
            log::warn!("{err}");
            None
        }
    }
}

fn control_rect(section: &Rect, index: usize, spec: &ControlSpec) -> Rect {
    let x = section.x + 30.0 + index as f32 * 150.0;
    match spec.kind {
        ControlKind::Knob => Rect::new(x, section.y + 50.0, spec.size, spec.size),
        ControlKind::Slider => Rect::new(x, section.y + 80.0, spec.size * 1.3, 40.0),
    }
}

fn display(spec: &ControlSpec, value: f64) -> String {
    if spec.id.control == SHAPE {
        shape_settings(ControlValue(value)).kind.label().to_string()
    } else {
        format!("{value:+.0}")
    }
}
