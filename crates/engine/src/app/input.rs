use winit::event::{ElementState, MouseScrollDelta};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Scheduler controls bound to keys. Each fires once per press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CityCommand {
    Start,
    Pause,
    Reset,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PanKey {
    Up,
    Down,
    Left,
    Right,
}

const PAN_KEY_COUNT: usize = 4;

impl PanKey {
    const fn index(self) -> usize {
        match self {
            PanKey::Up => 0,
            PanKey::Down => 1,
            PanKey::Left => 2,
            PanKey::Right => 3,
        }
    }
}

/// Press-edge tracker; holding a key down does not fire again until it is released.
#[derive(Debug, Clone, Copy, Default)]
struct EdgeKey {
    is_down: bool,
}

impl EdgeKey {
    fn handle(&mut self, state: ElementState) -> bool {
        match state {
            ElementState::Pressed => {
                let pressed_edge = !self.is_down;
                self.is_down = true;
                pressed_edge
            }
            ElementState::Released => {
                self.is_down = false;
                false
            }
        }
    }
}

/// Everything gathered since the previous frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    pub commands: Vec<CityCommand>,
    /// Held pan direction in tiles, `+y` north.
    pub pan: (f32, f32),
    pub zoom_steps: i32,
}

#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    start_key: EdgeKey,
    pause_key: EdgeKey,
    reset_key: EdgeKey,
    zoom_in_key: EdgeKey,
    zoom_out_key: EdgeKey,
    pan_down: [bool; PAN_KEY_COUNT],
    pending_commands: Vec<CityCommand>,
    pending_zoom_steps: i32,
    quit_requested: bool,
}

impl InputCollector {
    pub(crate) fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub(crate) fn mark_quit_requested(&mut self) {
        if !self.quit_requested {
            self.quit_requested = true;
            self.pending_commands.push(CityCommand::Quit);
        }
    }

    pub(crate) fn handle_keyboard_input(&mut self, key_event: &winit::event::KeyEvent) {
        self.handle_physical_key(key_event.physical_key, key_event.state);
    }

    pub(crate) fn handle_physical_key(&mut self, key: PhysicalKey, state: ElementState) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        let is_pressed = state == ElementState::Pressed;
        match code {
            KeyCode::Enter | KeyCode::NumpadEnter | KeyCode::Space => {
                if self.start_key.handle(state) {
                    self.pending_commands.push(CityCommand::Start);
                }
            }
            KeyCode::KeyP => {
                if self.pause_key.handle(state) {
                    self.pending_commands.push(CityCommand::Pause);
                }
            }
            KeyCode::KeyR => {
                if self.reset_key.handle(state) {
                    self.pending_commands.push(CityCommand::Reset);
                }
            }
            KeyCode::Equal | KeyCode::NumpadAdd => {
                if self.zoom_in_key.handle(state) {
                    self.pending_zoom_steps = self.pending_zoom_steps.saturating_add(1);
                }
            }
            KeyCode::Minus | KeyCode::NumpadSubtract => {
                if self.zoom_out_key.handle(state) {
                    self.pending_zoom_steps = self.pending_zoom_steps.saturating_sub(1);
                }
            }
            KeyCode::ArrowUp | KeyCode::KeyI => self.pan_down[PanKey::Up.index()] = is_pressed,
            KeyCode::ArrowDown | KeyCode::KeyK => self.pan_down[PanKey::Down.index()] = is_pressed,
            KeyCode::ArrowLeft | KeyCode::KeyJ => self.pan_down[PanKey::Left.index()] = is_pressed,
            KeyCode::ArrowRight | KeyCode::KeyL => {
                self.pan_down[PanKey::Right.index()] = is_pressed
            }
            KeyCode::Escape if is_pressed => self.mark_quit_requested(),
            _ => {}
        }
    }

    pub(crate) fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        let steps = zoom_steps_from_scroll_delta(delta);
        self.pending_zoom_steps = self.pending_zoom_steps.saturating_add(steps);
    }

    /// Drains one-shot input. Held pan keys stay down across frames.
    pub(crate) fn take_frame_input(&mut self) -> FrameInput {
        let axis = |positive: PanKey, negative: PanKey| {
            let positive = self.pan_down[positive.index()] as i8;
            let negative = self.pan_down[negative.index()] as i8;
            f32::from(positive - negative)
        };
        let pan = (axis(PanKey::Right, PanKey::Left), axis(PanKey::Up, PanKey::Down));
        FrameInput {
            commands: std::mem::take(&mut self.pending_commands),
            pan,
            zoom_steps: std::mem::take(&mut self.pending_zoom_steps),
        }
    }
}

fn zoom_steps_from_scroll_delta(delta: MouseScrollDelta) -> i32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y.round() as i32,
        MouseScrollDelta::PixelDelta(position) => {
            if position.y > 0.0 {
                1
            } else if position.y < 0.0 {
                -1
            } else {
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut InputCollector, code: KeyCode) {
        input.handle_physical_key(PhysicalKey::Code(code), ElementState::Pressed);
    }

    fn release(input: &mut InputCollector, code: KeyCode) {
        input.handle_physical_key(PhysicalKey::Code(code), ElementState::Released);
    }

    #[test]
    fn held_start_key_fires_once_until_released() {
        let mut input = InputCollector::default();

        press(&mut input, KeyCode::Enter);
        press(&mut input, KeyCode::Enter);
        assert_eq!(input.take_frame_input().commands, vec![CityCommand::Start]);

        press(&mut input, KeyCode::Enter);
        assert!(input.take_frame_input().commands.is_empty());

        release(&mut input, KeyCode::Enter);
        press(&mut input, KeyCode::Space);
        assert_eq!(input.take_frame_input().commands, vec![CityCommand::Start]);
    }

    #[test]
    fn commands_keep_press_order_within_a_frame() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyP);
        press(&mut input, KeyCode::KeyR);
        press(&mut input, KeyCode::Enter);

        assert_eq!(
            input.take_frame_input().commands,
            vec![CityCommand::Pause, CityCommand::Reset, CityCommand::Start]
        );
    }

    #[test]
    fn escape_requests_quit_once() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::Escape);
        press(&mut input, KeyCode::Escape);

        assert!(input.quit_requested());
        assert_eq!(input.take_frame_input().commands, vec![CityCommand::Quit]);
    }

    #[test]
    fn held_pan_keys_persist_across_frames() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::ArrowUp);
        press(&mut input, KeyCode::KeyJ);

        assert_eq!(input.take_frame_input().pan, (-1.0, 1.0));
        assert_eq!(input.take_frame_input().pan, (-1.0, 1.0));

        release(&mut input, KeyCode::ArrowUp);
        release(&mut input, KeyCode::KeyJ);
        assert_eq!(input.take_frame_input().pan, (0.0, 0.0));
    }

    #[test]
    fn zoom_keys_and_wheel_accumulate_then_reset() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::Equal);
        press(&mut input, KeyCode::Equal);
        input.handle_mouse_wheel(MouseScrollDelta::LineDelta(0.0, 2.0));
        press(&mut input, KeyCode::Minus);

        assert_eq!(input.take_frame_input().zoom_steps, 2);
        assert_eq!(input.take_frame_input().zoom_steps, 0);
    }

    #[test]
    fn pixel_wheel_delta_maps_to_single_step_direction() {
        let up = zoom_steps_from_scroll_delta(MouseScrollDelta::PixelDelta(
            winit::dpi::PhysicalPosition::new(0.0, 3.0),
        ));
        let down = zoom_steps_from_scroll_delta(MouseScrollDelta::PixelDelta(
            winit::dpi::PhysicalPosition::new(0.0, -5.0),
        ));

        assert_eq!(up, 1);
        assert_eq!(down, -1);
    }
}
