use macroquad::{prelude::*, text::measure_text};
use polypad::binding::{ControlKind, ControlSpec};
use polypad::notes::pitch_index;
use polypad::status::AudioStatus;

pub const SCREEN_WIDTH: f32 = 1280.0;
pub const SCREEN_HEIGHT: f32 = 720.0;
pub const KEYBOARD_TOP: f32 = 500.0;
const KEY_FONT_SIZE: u16 = 14;
const PANE_FONT_SIZE: u16 = 16;
const PANE_LINE_HEIGHT: f32 = 18.0;

pub const AMBER: Color = Color {
    r: 0.98,
    g: 0.66,
    b: 0.12,
    a: 1.0,
};
pub const AMBER_DIM: Color = Color {
    r: 0.78,
    g: 0.52,
    b: 0.08,
    a: 0.4,
};
pub const BACKGROUND: Color = Color {
    r: 0.02,
    g: 0.02,
    b: 0.02,
    a: 1.0,
};

pub fn window_conf() -> Conf {
    Conf {
        window_title: "Polypad".into(),
        fullscreen: false,
        sample_count: 1,
        window_width: SCREEN_WIDTH as i32,
        window_height: SCREEN_HEIGHT as i32,
        high_dpi: false,
        ..Default::default()
    }
}

pub fn mouse_position_vec() -> Vec2 {
    let (x, y) = mouse_position();
    vec2(x, y)
}

#[derive(Default)]
pub struct DragState {
    active: Option<String>,
    origin_value: f64,
    origin: Vec2,
}

/// Draws a knob or slider for `spec` and returns the new value when the user moved it.
pub fn control_widget(
    drag: &mut DragState,
    spec: &ControlSpec,
    rect: Rect,
    value: f64,
    label: &str,
    display: &str,
) -> Option<f64> {
    let next = handle_drag(drag, spec, rect, value);
    let shown = next.unwrap_or(value);
    match spec.kind {
        ControlKind::Knob => draw_knob(spec, rect, shown),
        ControlKind::Slider => draw_slider(spec, rect, shown),
    }
    draw_centered_text(display, Rect::new(rect.x, rect.y - 16.0, rect.w, 20.0), 16);
    draw_centered_text(label, Rect::new(rect.x, rect.y + rect.h + 4.0, rect.w, 18.0), 16);
    next
}

fn handle_drag(drag: &mut DragState, spec: &ControlSpec, rect: Rect, value: f64) -> Option<f64> {
    let id = spec.id.element_id();
    let mouse = mouse_position_vec();
    let range = spec.max - spec.min;

    if is_mouse_button_pressed(MouseButton::Left) && rect.contains(mouse) {
        drag.active = Some(id.clone());
        drag.origin_value = value;
        drag.origin = mouse;
    }

    let mut next = value;
    if drag.active.as_deref() == Some(id.as_str()) {
        if is_mouse_button_down(MouseButton::Left) {
            next = match spec.kind {
                ControlKind::Knob => {
                    let delta = f64::from(drag.origin.y - mouse.y) * range * 0.01;
                    drag.origin_value + delta
                }
                ControlKind::Slider => {
                    let t = f64::from(((mouse.x - rect.x) / rect.w).clamp(0.0, 1.0));
                    spec.min + t * range
                }
            };
        } else {
            drag.active = None;
        }
    }

    let (_x, wheel) = mouse_wheel();
    if rect.contains(mouse) && wheel.abs() > f32::EPSILON {
        next += f64::from(wheel.signum());
    }

    let next = next.round().clamp(spec.min, spec.max);
    (next != value).then_some(next)
}

fn normalized(spec: &ControlSpec, value: f64) -> f32 {
    let range = spec.max - spec.min;
    if range <= 0.0 {
        return 0.0;
    }
    (((value - spec.min) / range).clamp(0.0, 1.0)) as f32
}

fn draw_knob(spec: &ControlSpec, rect: Rect, value: f64) {
    let [foreground, background, pointer_color] = spec.colors.map(Color::from_hex);
    let center = vec2(rect.x + rect.w * 0.5, rect.y + rect.h * 0.5);
    let radius = rect.w.min(rect.h) * 0.35;
    draw_circle(
        center.x,
        center.y,
        radius + 6.0,
        Color::new(0.05, 0.03, 0.02, 1.0),
    );
    draw_circle(center.x, center.y, radius, background);
    draw_circle_lines(center.x, center.y, radius + 6.0, 1.0, AMBER_DIM);
    draw_circle_lines(center.x, center.y, radius, 2.0, foreground);
    let start_angle = -240.0f32.to_radians();
    let angle_range = 300.0f32.to_radians();
    let theta = start_angle + normalized(spec, value) * angle_range;
    let pointer = vec2(theta.cos(), theta.sin()) * radius * 0.8;
    draw_line(
        center.x,
        center.y,
        center.x + pointer.x,
        center.y + pointer.y,
        3.0,
        pointer_color,
    );
}

fn draw_slider(spec: &ControlSpec, rect: Rect, value: f64) {
    let [foreground, background, thumb] = spec.colors.map(Color::from_hex);
    let track = Rect::new(rect.x, rect.y + rect.h * 0.5 - 4.0, rect.w, 8.0);
    draw_rounded_rect(track, 4.0, background);
    let fill = normalized(spec, value) * track.w;
    draw_rectangle(track.x, track.y, fill, track.h, foreground);
    draw_circle(track.x + fill, track.y + track.h * 0.5, 9.0, thumb);
    draw_circle_lines(track.x + fill, track.y + track.h * 0.5, 9.0, 2.0, foreground);
}

pub fn draw_section(rect: &Rect, label: &str) {
    draw_rectangle(
        rect.x,
        rect.y,
        rect.w,
        rect.h,
        Color::new(0.05, 0.03, 0.02, 0.65),
    );
    draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, AMBER);
    draw_text_ex(
        label,
        rect.x + 6.0,
        rect.y - 6.0,
        TextParams {
            font_size: 18,
            color: AMBER,
            ..Default::default()
        },
    );
}

/// Draws as many lines of `text` as fit in `rect`.
pub fn draw_text_pane(rect: &Rect, text: &str) {
    let mut y = rect.y + PANE_LINE_HEIGHT;
    for line in text.lines() {
        if y > rect.y + rect.h {
            break;
        }
        draw_text_ex(
            line,
            rect.x + 8.0,
            y,
            TextParams {
                font_size: PANE_FONT_SIZE,
                color: AMBER,
                ..Default::default()
            },
        );
        y += PANE_LINE_HEIGHT;
    }
}

pub fn draw_audio_prompt(audio: &AudioStatus) {
    let message = match audio {
        AudioStatus::Running => return,
        AudioStatus::Suspended => "CLICK ANYWHERE TO START AUDIO".to_string(),
        AudioStatus::Failed { reason } => format!("AUDIO FAILED: {reason}. CLICK TO RETRY"),
    };
    let rect = Rect::new(SCREEN_WIDTH * 0.5 - 320.0, KEYBOARD_TOP - 70.0, 640.0, 44.0);
    draw_rounded_rect(rect, 10.0, Color::new(0.08, 0.05, 0.03, 0.95));
    draw_rounded_rect_lines(rect, 10.0, AMBER);
    draw_centered_text(&message, rect, 20);
}

pub struct PianoKey {
    pub key: i32,
    pub rect: Rect,
    pub black: bool,
}

pub struct PianoLayout {
    keys: Vec<PianoKey>,
}

fn is_black(key: i32) -> bool {
    matches!(pitch_index(key), 1 | 3 | 6 | 8 | 10)
}

impl PianoLayout {
    /// Lays out `count` keys starting at raw key `first_key` across the bottom of the window.
    pub fn new(first_key: i32, count: usize) -> Self {
        let area = Rect::new(
            20.0,
            KEYBOARD_TOP,
            SCREEN_WIDTH - 40.0,
            SCREEN_HEIGHT - KEYBOARD_TOP - 20.0,
        );
        let keys: Vec<i32> = (0..count as i32).map(|i| first_key + i).collect();
        let white_count = keys.iter().filter(|key| !is_black(**key)).count().max(1);
        let white_w = area.w / white_count as f32;
        let black_w = white_w * 0.6;
        let black_h = area.h * 0.62;

        let mut layout = Vec::with_capacity(keys.len());
        let mut x = area.x;
        for key in keys {
            if is_black(key) {
                let rect = Rect::new(x - black_w * 0.5, area.y, black_w, black_h);
                layout.push(PianoKey {
                    key,
                    rect,
                    black: true,
                });
            } else {
                let rect = Rect::new(x, area.y, white_w, area.h);
                layout.push(PianoKey {
                    key,
                    rect,
                    black: false,
                });
                x += white_w;
            }
        }
        Self { keys: layout }
    }

    pub fn hit_test(&self, point: Vec2) -> Option<i32> {
        self.keys
            .iter()
            .filter(|key| key.black)
            .chain(self.keys.iter().filter(|key| !key.black))
            .find(|key| key.rect.contains(point))
            .map(|key| key.key)
    }

    pub fn keys(&self) -> &[PianoKey] {
        &self.keys
    }
}

/// White keys first so black keys are drawn on top.
pub fn draw_keyboard<'a>(
    layout: &PianoLayout,
    is_held: impl Fn(i32) -> bool,
    label: impl Fn(i32) -> Option<&'a str>,
    octave_name: impl Fn(i32) -> Option<String>,
) {
    for black in [false, true] {
        for key in layout.keys().iter().filter(|key| key.black == black) {
            draw_key(key, is_held(key.key));
            if let Some(text) = label(key.key) {
                let area = Rect::new(key.rect.x, key.rect.y + key.rect.h - 44.0, key.rect.w, 20.0);
                draw_centered_text(text, area, KEY_FONT_SIZE);
            }
            if let Some(name) = octave_name(key.key) {
                let area = Rect::new(key.rect.x, key.rect.y + key.rect.h - 22.0, key.rect.w, 20.0);
                draw_centered_text(&name, area, KEY_FONT_SIZE);
            }
        }
    }
}

fn draw_key(key: &PianoKey, active: bool) {
    let fill_color = if active {
        Color::new(0.3, 0.2, 0.07, 0.95)
    } else if key.black {
        Color::new(0.08, 0.05, 0.03, 1.0)
    } else {
        Color::new(0.02, 0.02, 0.02, 0.95)
    };
    draw_rounded_rect(key.rect, 4.0, fill_color);
    draw_rounded_rect_lines(key.rect, 4.0, if key.black { AMBER } else { AMBER_DIM });
}

fn draw_rounded_rect(rect: Rect, radius: f32, color: Color) {
    draw_rectangle(
        rect.x + radius,
        rect.y,
        rect.w - 2.0 * radius,
        rect.h,
        color,
    );
    draw_rectangle(
        rect.x,
        rect.y + radius,
        rect.w,
        rect.h - 2.0 * radius,
        color,
    );
    for corner in corners(rect, radius) {
        draw_circle(corner.x, corner.y, radius, color);
    }
}

fn corners(rect: Rect, radius: f32) -> [Vec2; 4] {
    [
        vec2(rect.x + radius, rect.y + radius),
        vec2(rect.x + rect.w - radius, rect.y + radius),
        vec2(rect.x + rect.w - radius, rect.y + rect.h - radius),
        vec2(rect.x + radius, rect.y + rect.h - radius),
    ]
}

fn draw_rounded_rect_lines(rect: Rect, radius: f32, color: Color) {
    let left_x = rect.x + radius;
    let right_x = rect.x + rect.w - radius;
    let top_y = rect.y + radius;
    let bottom_y = rect.y + rect.h - radius;

    draw_line(left_x, rect.y, right_x, rect.y, 1.0, color);
    draw_line(left_x, rect.y + rect.h, right_x, rect.y + rect.h, 1.0, color);
    draw_line(rect.x, top_y, rect.x, bottom_y, 1.0, color);
    draw_line(rect.x + rect.w, top_y, rect.x + rect.w, bottom_y, 1.0, color);

    let pi = std::f32::consts::PI;
    let [top_left, top_right, bottom_right, bottom_left] = corners(rect, radius);
    draw_corner_arc(top_left, pi, 1.5 * pi, radius, color);
    draw_corner_arc(top_right, 1.5 * pi, 2.0 * pi, radius, color);
    draw_corner_arc(bottom_right, 0.0, 0.5 * pi, radius, color);
    draw_corner_arc(bottom_left, 0.5 * pi, pi, radius, color);
}

fn draw_corner_arc(center: Vec2, start: f32, end: f32, radius: f32, color: Color) {
    let steps = 8;
    let point = |angle: f32| center + vec2(angle.cos(), angle.sin()) * radius;
    let mut prev = point(start);
    for idx in 1..=steps {
        let next = point(start + (end - start) * (idx as f32 / steps as f32));
        draw_line(prev.x, prev.y, next.x, next.y, 1.0, color);
        prev = next;
    }
}

pub fn draw_centered_text(text: &str, rect: Rect, size: u16) {
    let measure = measure_text(text, None, size, 1.0);
    let x = rect.x + rect.w * 0.5 - measure.width * 0.5;
    let y = rect.y + rect.h * 0.5 + measure.height * 0.5;
    draw_text_ex(
        text,
        x,
        y,
        TextParams {
            font_size: size,
            color: AMBER,
            ..Default::default()
        },
    );
}
