use cgmath::*;

use crate::config::CameraConfig;

/// Below this squared length `look x up` is treated as degenerate
const MIN_RIGHT_MAGNITUDE2: f32 = 1e-6;

/// First-person camera: an eye position, a unit look direction and an up
/// vector. The right vector is always derived from the other two.
///
/// Matrices follow the OpenGL clip-space convention (depth in `[-1, 1]`);
/// the bundled shaders remap depth for wgpu.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    eye: Vector3<f32>,
    look_direction: Vector3<f32>,
    up: Vector3<f32>,
    /// Last cursor position, `None` until the first `mouse_look`
    old_mouse: Option<Vector2<f32>>,
    /// Degrees of rotation per pixel of cursor travel
    sensitivity: f32,
    fovy: Deg<f32>,
    aspect: f32,
    znear: f32,
    zfar: f32,
}

impl Camera {
    /// Camera at the origin looking down -Z with +Y up
    pub fn new(aspect: f32) -> Self {
        Self::from_config(&CameraConfig::default(), aspect)
    }

    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            eye: config.eye,
            look_direction: -Vector3::unit_z(),
            up: Vector3::unit_y(),
            old_mouse: None,
            sensitivity: config.mouse_sensitivity,
            fovy: config.fovy,
            aspect,
            znear: config.znear,
            zfar: config.zfar,
        }
    }

    /// `look_at(eye, eye + look_direction, up)`
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.eye);
        Matrix4::look_at_rh(eye, eye + self.look_direction, self.up)
    }

    /// Perspective projection built from the stored parameters on every call
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn set_projection(&mut self, fovy: Deg<f32>, aspect: f32, znear: f32, zfar: f32) {
        self.fovy = fovy;
        self.aspect = aspect;
        self.znear = znear;
        self.zfar = zfar;
    }

    /// Keeps the aspect ratio in step with the window; a zero-height
    /// (minimized) window leaves it unchanged
    pub fn update_aspect_ratio(&mut self, width: u32, height: u32) {
        if height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    /// Turns the camera by the cursor movement since the previous call.
    ///
    /// The first call only records the position. After that the look
    /// direction is yawed around `up` by the horizontal delta, then pitched
    /// around the right vector recomputed from the yawed direction.
    pub fn mouse_look(&mut self, mouse_x: f32, mouse_y: f32) {
        let current = Vector2::new(mouse_x, mouse_y);
        let old = *self.old_mouse.get_or_insert(current);
        let delta = old - current;

        let yaw = Matrix3::from_axis_angle(
            self.up.normalize(),
            Deg(self.sensitivity * delta.x),
        );
        self.look_direction = yaw * self.look_direction;

        let pitch = Matrix3::from_axis_angle(self.right(), Deg(self.sensitivity * delta.y));
        self.look_direction = (pitch * self.look_direction).normalize();

        self.old_mouse = Some(current);
    }

    /// Forgets the last cursor position so the next `mouse_look` re-seeds
    pub fn reset_mouse(&mut self) {
        self.old_mouse = None;
    }

    pub fn move_forward(&mut self, speed: f32) {
        self.eye += self.look_direction * speed;
    }

    pub fn move_backward(&mut self, speed: f32) {
        self.eye -= self.look_direction * speed;
    }

    pub fn move_left(&mut self, speed: f32) {
        self.eye -= self.right() * speed;
    }

    pub fn move_right(&mut self, speed: f32) {
        self.eye += self.right() * speed;
    }

    /// Vertical only: moves along world Y whatever the look direction
    pub fn move_up(&mut self, speed: f32) {
        self.eye.y += self.up.normalize().y * speed;
    }

    pub fn move_down(&mut self, speed: f32) {
        self.eye.y -= self.up.normalize().y * speed;
    }

    /// `normalize(cross(look_direction, up))`
    pub fn right(&self) -> Vector3<f32> {
        self.look_direction.cross(self.up).normalize()
    }

    pub fn eye(&self) -> Vector3<f32> {
        self.eye
    }

    pub fn set_eye(&mut self, eye: Vector3<f32>) {
        self.eye = eye;
    }

    pub fn look_direction(&self) -> Vector3<f32> {
        self.look_direction
    }

    /// Points the camera along `direction` (normalized here).
    ///
    /// Zero vectors and directions parallel to `up` leave the camera
    /// unchanged, since the right vector would be undefined.
    pub fn set_look_direction(&mut self, direction: Vector3<f32>) {
        if direction.magnitude2() <= f32::EPSILON {
            log::warn!("ignoring zero look direction");
            return;
        }
        let direction = direction.normalize();
        if direction.cross(self.up).magnitude2() < MIN_RIGHT_MAGNITUDE2 {
            log::warn!("ignoring look direction {:?} parallel to up", direction);
            return;
        }
        self.look_direction = direction;
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Deg<f32> {
        self.fovy
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(640.0 / 480.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const EPS: f32 = 1e-5;

    fn assert_vec_near(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).magnitude() < EPS, "{:?} != {:?}", a, b);
    }

    #[test]
    fn canonical_pose_looks_down_negative_z() {
        let camera = Camera::default();
        assert_eq!(camera.eye(), Vector3::zero());
        assert_eq!(camera.look_direction(), -Vector3::unit_z());
        assert_eq!(camera.up(), Vector3::unit_y());
        assert_vec_near(camera.right(), Vector3::unit_x());

        let expected = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, -1.0),
            Vector3::unit_y(),
        );
        assert_eq!(camera.view_matrix(), expected);
    }

    #[test]
    fn projection_tracks_stored_parameters() {
        let mut camera = Camera::new(1.0);
        assert_eq!(
            camera.projection_matrix(),
            perspective(Deg(45.0), 1.0, 0.1, 100.0)
        );

        camera.update_aspect_ratio(1920, 1080);
        assert_eq!(
            camera.projection_matrix(),
            perspective(Deg(45.0), 1920.0 / 1080.0, 0.1, 100.0)
        );

        camera.update_aspect_ratio(1920, 0);
        assert_eq!(camera.aspect(), 1920.0 / 1080.0);

        camera.set_projection(Deg(60.0), 2.0, 1.0, 10.0);
        assert_eq!(camera.projection_matrix(), perspective(Deg(60.0), 2.0, 1.0, 10.0));
    }

    #[test]
    fn first_mouse_look_only_seeds() {
        let mut camera = Camera::default();
        camera.mouse_look(400.0, 300.0);
        assert_vec_near(camera.look_direction(), -Vector3::unit_z());
    }

    #[test]
    fn horizontal_delta_yaws_around_up() {
        let mut camera = Camera::default();
        camera.mouse_look(100.0, 100.0);
        // cursor moved 10px left: turn left by one degree
        camera.mouse_look(90.0, 100.0);

        let angle = Deg(1.0f32);
        assert_vec_near(
            camera.look_direction(),
            Vector3::new(-angle.sin(), 0.0, -angle.cos()),
        );
    }

    #[test]
    fn vertical_delta_pitches_around_right() {
        let mut camera = Camera::default();
        camera.mouse_look(0.0, 0.0);
        // cursor moved 10px up: look up by one degree
        camera.mouse_look(0.0, -10.0);

        let angle = Deg(1.0f32);
        assert_vec_near(
            camera.look_direction(),
            Vector3::new(0.0, angle.sin(), -angle.cos()),
        );
    }

    #[test]
    fn diagonal_delta_applies_yaw_before_pitch() {
        let mut camera = Camera::default();
        camera.mouse_look(50.0, 50.0);
        camera.mouse_look(20.0, 10.0);

        let up = Vector3::unit_y();
        let yawed = Matrix3::from_axis_angle(up, Deg(3.0)) * -Vector3::unit_z();
        let right = yawed.cross(up).normalize();
        let expected = (Matrix3::from_axis_angle(right, Deg(4.0)) * yawed).normalize();

        assert_vec_near(camera.look_direction(), expected);
    }

    #[test]
    fn random_mouse_paths_are_reproducible_and_stay_normalized() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let path: Vec<(f32, f32)> = (0..200)
            .map(|_| (rng.random_range(0.0..1280.0), rng.random_range(0.0..720.0)))
            .collect();

        let mut a = Camera::default();
        let mut b = Camera::default();
        for &(x, y) in &path {
            a.mouse_look(x, y);
            b.mouse_look(x, y);
            assert!((a.look_direction().magnitude() - 1.0).abs() < EPS);
            assert!(a.right().dot(a.up()).abs() < EPS);
        }
        assert_eq!(a.look_direction(), b.look_direction());
    }

    #[test]
    fn seeding_is_per_camera() {
        let mut a = Camera::default();
        a.mouse_look(0.0, 0.0);
        a.mouse_look(10.0, 0.0);

        let mut b = Camera::default();
        b.mouse_look(500.0, 500.0);
        assert_vec_near(b.look_direction(), -Vector3::unit_z());
    }

    #[test]
    fn movement_follows_look_and_right() {
        let mut camera = Camera::default();
        camera.move_forward(2.0);
        assert_vec_near(camera.eye(), Vector3::new(0.0, 0.0, -2.0));
        camera.move_backward(1.0);
        assert_vec_near(camera.eye(), Vector3::new(0.0, 0.0, -1.0));
        camera.move_right(3.0);
        assert_vec_near(camera.eye(), Vector3::new(3.0, 0.0, -1.0));
        camera.move_left(1.0);
        assert_vec_near(camera.eye(), Vector3::new(2.0, 0.0, -1.0));
    }

    #[test]
    fn vertical_movement_ignores_look_direction() {
        let mut camera = Camera::default();
        camera.set_look_direction(Vector3::new(0.0, 1.0, -1.0));
        camera.move_up(2.0);
        assert_vec_near(camera.eye(), Vector3::new(0.0, 2.0, 0.0));
        camera.move_down(0.5);
        assert_vec_near(camera.eye(), Vector3::new(0.0, 1.5, 0.0));
    }

    #[test]
    fn look_direction_parallel_to_up_is_rejected() {
        let mut camera = Camera::default();
        camera.set_look_direction(Vector3::unit_y());
        assert_vec_near(camera.look_direction(), -Vector3::unit_z());
        camera.set_look_direction(Vector3::new(0.0, -2.0, 0.0));
        camera.set_look_direction(Vector3::zero());
        assert_vec_near(camera.look_direction(), -Vector3::unit_z());

        camera.move_right(1.0);
        assert_vec_near(camera.eye(), Vector3::new(1.0, 0.0, 0.0));
        let eye = camera.eye();
        assert!(eye.x.is_finite() && eye.y.is_finite() && eye.z.is_finite());
    }
}
