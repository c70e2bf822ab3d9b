use winit::event::{
    ElementState, KeyboardInput, MouseButton, MouseScrollDelta, VirtualKeyCode, WindowEvent,
};

use crate::selection::EditAction;

/// Pointer, key and camera intent gathered from window events between two input steps.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PointerInput {
    pub cursor: Option<(f64, f64)>,
    pub held: bool,
    pub pressed: bool,
    pub released: bool,
    pub moved: bool,
    pub requested_action: Option<EditAction>,
    pub pan: (f32, f32),
    pub zoom: f32,
    pub orbit: f32,
}

impl PointerInput {
    const PAN_STEP: f32 = 1.0;
    const ORBIT_STEP: f32 = 0.1;

    /// Returns true when the event was consumed.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.on_cursor_moved(position.x, position.y);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.moved = true;
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.on_mouse_button(*button, *state);
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.zoom += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
                true
            }
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        virtual_keycode: Some(key),
                        state,
                        ..
                    },
                ..
            } => self.on_key(*key, *state),
            _ => false,
        }
    }

    pub fn on_cursor_moved(&mut self, x: f64, y: f64) {
        self.cursor = Some((x, y));
        self.moved = true;
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed if !self.held => {
                self.held = true;
                self.pressed = true;
            }
            ElementState::Released if self.held => {
                self.held = false;
                self.released = true;
            }
            _ => (),
        }
    }

    pub fn on_key(&mut self, key: VirtualKeyCode, state: ElementState) -> bool {
        if state != ElementState::Pressed {
            return false;
        }

        if let Some(digit) = key_digit(key) {
            if let Some(action) = EditAction::from_digit(digit) {
                self.requested_action = Some(action);
                return true;
            }
        }

        match key {
            VirtualKeyCode::Left => self.pan.0 -= Self::PAN_STEP,
            VirtualKeyCode::Right => self.pan.0 += Self::PAN_STEP,
            VirtualKeyCode::Up => self.pan.1 += Self::PAN_STEP,
            VirtualKeyCode::Down => self.pan.1 -= Self::PAN_STEP,
            VirtualKeyCode::PageUp => self.zoom += 1.0,
            VirtualKeyCode::PageDown => self.zoom -= 1.0,
            VirtualKeyCode::Q => self.orbit -= Self::ORBIT_STEP,
            VirtualKeyCode::E => self.orbit += Self::ORBIT_STEP,
            _ => return false,
        }
        true
    }

    pub fn has_pointer_activity(&self) -> bool {
        self.moved || self.pressed || self.released
    }

    pub fn has_camera_motion(&self) -> bool {
        self.pan != (0.0, 0.0) || self.zoom != 0.0 || self.orbit != 0.0
    }

    /// Drops the per-step edges, keeps the held button and cursor position.
    pub fn end_step(&mut self) {
        *self = Self {
            cursor: self.cursor,
            held: self.held,
            ..Self::default()
        };
    }
}

fn key_digit(key: VirtualKeyCode) -> Option<u32> {
    use VirtualKeyCode::*;
    let digit = match key {
        Key1 | Numpad1 => 1,
        Key2 | Numpad2 => 2,
        Key3 | Numpad3 => 3,
        Key4 | Numpad4 => 4,
        Key5 | Numpad5 => 5,
        Key6 | Numpad6 => 6,
        Key7 | Numpad7 => 7,
        Key8 | Numpad8 => 8,
        Key9 | Numpad9 => 9,
        _ => return None,
    };
    Some(digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_are_edges() {
        let mut input = PointerInput::default();
        input.on_mouse_button(MouseButton::Left, ElementState::Pressed);
        input.on_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(input.pressed && input.held && !input.released);

        input.end_step();
        assert!(!input.pressed && input.held);

        input.on_mouse_button(MouseButton::Right, ElementState::Released);
        assert!(input.held);
        input.on_mouse_button(MouseButton::Left, ElementState::Released);
        assert!(input.released && !input.held);
    }

    #[test]
    fn digits_select_actions() {
        let mut input = PointerInput::default();
        assert!(input.on_key(VirtualKeyCode::Key4, ElementState::Pressed));
        assert_eq!(input.requested_action, Some(EditAction::Residential));

        assert!(!input.on_key(VirtualKeyCode::Key0, ElementState::Pressed));
        assert!(!input.on_key(VirtualKeyCode::Key9, ElementState::Released));
        assert_eq!(input.requested_action, Some(EditAction::Residential));
    }

    #[test]
    fn end_step_keeps_cursor() {
        let mut input = PointerInput::default();
        input.on_cursor_moved(10.0, 20.0);
        input.on_key(VirtualKeyCode::Left, ElementState::Pressed);
        assert!(input.has_pointer_activity());
        assert!(input.has_camera_motion());

        input.end_step();
        assert_eq!(input.cursor, Some((10.0, 20.0)));
        assert!(!input.has_pointer_activity());
        assert!(!input.has_camera_motion());
    }
}
