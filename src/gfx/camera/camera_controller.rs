use winit::{
    event::{ElementState, KeyEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use super::fly_camera::Camera;

/// Keyboard and cursor state driving a [`Camera`].
///
/// WASD moves in the look plane, Space/Shift move vertically. Held keys are
/// applied every frame by [`CameraController::update_camera`], scaled by the
/// frame time.
#[derive(Debug, Clone)]
pub struct CameraController {
    pub move_speed: f32,
    is_forward_pressed: bool,
    is_backward_pressed: bool,
    is_left_pressed: bool,
    is_right_pressed: bool,
    is_up_pressed: bool,
    is_down_pressed: bool,
}

impl CameraController {
    /// `move_speed` is in world units per second
    pub fn new(move_speed: f32) -> Self {
        Self {
            move_speed,
            is_forward_pressed: false,
            is_backward_pressed: false,
            is_left_pressed: false,
            is_right_pressed: false,
            is_up_pressed: false,
            is_down_pressed: false,
        }
    }

    /// Returns true if the key is one the controller handles
    pub fn process_keyboard(&mut self, event: &KeyEvent) -> bool {
        match event.physical_key {
            PhysicalKey::Code(code) => self.process_key(code, event.state),
            PhysicalKey::Unidentified(_) => false,
        }
    }

    pub fn process_key(&mut self, code: KeyCode, state: ElementState) -> bool {
        let pressed = state == ElementState::Pressed;
        match code {
            KeyCode::KeyW | KeyCode::ArrowUp => self.is_forward_pressed = pressed,
            KeyCode::KeyS | KeyCode::ArrowDown => self.is_backward_pressed = pressed,
            KeyCode::KeyA | KeyCode::ArrowLeft => self.is_left_pressed = pressed,
            KeyCode::KeyD | KeyCode::ArrowRight => self.is_right_pressed = pressed,
            KeyCode::Space => self.is_up_pressed = pressed,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => self.is_down_pressed = pressed,
            _ => return false,
        }
        true
    }

    /// Forwards a cursor position to [`Camera::mouse_look`]
    pub fn process_cursor(&mut self, x: f64, y: f64, camera: &mut Camera) {
        camera.mouse_look(x as f32, y as f32);
    }

    /// Releases every key, e.g. when the window loses focus
    pub fn reset(&mut self) {
        *self = Self::new(self.move_speed);
    }

    /// Applies held keys for a frame of `dt` seconds
    pub fn update_camera(&self, camera: &mut Camera, dt: f32) {
        let amount = self.move_speed * dt;

        if self.is_forward_pressed {
            camera.move_forward(amount);
        }
        if self.is_backward_pressed {
            camera.move_backward(amount);
        }
        if self.is_left_pressed {
            camera.move_left(amount);
        }
        if self.is_right_pressed {
            camera.move_right(amount);
        }
        if self.is_up_pressed {
            camera.move_up(amount);
        }
        if self.is_down_pressed {
            camera.move_down(amount);
        }
    }

    pub fn is_moving(&self) -> bool {
        self.is_forward_pressed
            || self.is_backward_pressed
            || self.is_left_pressed
            || self.is_right_pressed
            || self.is_up_pressed
            || self.is_down_pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    #[test]
    fn held_keys_move_by_speed_times_dt() {
        let mut controller = CameraController::new(2.0);
        let mut camera = Camera::default();

        assert!(controller.process_key(KeyCode::KeyW, ElementState::Pressed));
        assert!(controller.process_key(KeyCode::Space, ElementState::Pressed));
        controller.update_camera(&mut camera, 0.5);
        assert!((camera.eye() - Vector3::new(0.0, 1.0, -1.0)).magnitude() < 1e-6);

        controller.process_key(KeyCode::KeyW, ElementState::Released);
        controller.process_key(KeyCode::Space, ElementState::Released);
        assert!(!controller.is_moving());
        controller.update_camera(&mut camera, 0.5);
        assert!((camera.eye() - Vector3::new(0.0, 1.0, -1.0)).magnitude() < 1e-6);
    }

    #[test]
    fn unrelated_keys_are_not_handled() {
        let mut controller = CameraController::new(1.0);
        assert!(!controller.process_key(KeyCode::KeyQ, ElementState::Pressed));
        assert!(!controller.is_moving());
    }

    #[test]
    fn reset_releases_keys() {
        let mut controller = CameraController::new(3.0);
        controller.process_key(KeyCode::KeyD, ElementState::Pressed);
        assert!(controller.is_moving());
        controller.reset();
        assert!(!controller.is_moving());
        assert_eq!(controller.move_speed, 3.0);
    }

    #[test]
    fn cursor_drives_mouse_look() {
        let mut controller = CameraController::new(1.0);
        let mut camera = Camera::default();
        controller.process_cursor(10.0, 10.0, &mut camera);
        controller.process_cursor(0.0, 10.0, &mut camera);
        assert!(camera.look_direction().x < 0.0);
    }
}
