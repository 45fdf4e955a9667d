//! Free-fly camera.
//!
//! [`Camera`] keeps a position plus yaw/pitch and derives an orthonormal
//! basis and a right-handed view matrix from them. [`Projection`] is built
//! once from the window aspect ratio. [`CameraController`] collects held keys
//! and mouse deltas between frames and applies them in [`Camera::update`].

use cgmath::{Deg, InnerSpace, Matrix3, Matrix4, Point3, Rad, Vector3, perspective};
use instant::Duration;
use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::config::CameraConfig;

/// cgmath produces OpenGL clip space (z in -1..1), wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Pitch is kept strictly inside (-90°, 90°) so the basis never flips.
pub const PITCH_LIMIT_DEG: f32 = 89.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    yaw: Rad<f32>,
    pitch: Rad<f32>,
    forward: Vector3<f32>,
    right: Vector3<f32>,
    up: Vector3<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
}

impl Camera {
    pub fn new<Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: impl Into<Point3<f32>>,
        yaw: Y,
        pitch: P,
        projection: Projection,
    ) -> Self {
        let mut camera = Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: clamp_pitch(pitch.into()),
            forward: -Vector3::unit_z(),
            right: Vector3::unit_x(),
            up: Vector3::unit_y(),
            view: Matrix4::from_scale(1.0),
            projection: projection.calc_matrix(),
        };
        camera.update_basis();
        camera.update_view();
        camera
    }

    pub fn from_config(config: &CameraConfig, window_size: [u32; 2]) -> Self {
        let projection = Projection::new(
            window_size[0],
            window_size[1],
            Deg(config.fov_deg),
            config.near,
            config.far,
        );
        Self::new(
            config.position,
            Deg(config.yaw_deg),
            Deg(config.pitch_deg),
            projection,
        )
    }

    pub fn yaw(&self) -> Rad<f32> {
        self.yaw
    }

    pub fn pitch(&self) -> Rad<f32> {
        self.pitch
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.forward
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    /// Moves the eye without turning it.
    pub fn set_position(&mut self, position: impl Into<Point3<f32>>) {
        self.position = position.into();
        self.update_view();
    }

    /// Turns the camera by the given deltas; pitch is clamped to ±89°.
    pub fn rotate(&mut self, yaw_delta: impl Into<Rad<f32>>, pitch_delta: impl Into<Rad<f32>>) {
        let pitch_delta: Rad<f32> = pitch_delta.into();
        self.yaw += yaw_delta.into();
        self.pitch = clamp_pitch(self.pitch + pitch_delta);
        self.update_basis();
        self.update_view();
    }

    /// Applies one frame of held movement keys and accumulated mouse motion.
    pub fn update(&mut self, controller: &mut CameraController, dt: Duration) {
        controller.update_camera(self, dt);
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.view
    }

    /// The projection is fixed at construction time.
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    /// View matrix without its translation, so geometry drawn with it stays
    /// centred on the eye.
    pub fn sky_view_matrix(&self) -> Matrix4<f32> {
        let v = self.view;
        Matrix4::from(Matrix3::from_cols(v.x.truncate(), v.y.truncate(), v.z.truncate()))
    }

    pub fn sky_view_proj(&self) -> Matrix4<f32> {
        self.projection * self.sky_view_matrix()
    }

    fn update_basis(&mut self) {
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        self.forward = Vector3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch).normalize();
        self.right = self.forward.cross(Vector3::unit_y()).normalize();
        self.up = self.right.cross(self.forward).normalize();
    }

    fn update_view(&mut self) {
        self.view = Matrix4::look_to_rh(self.position, self.forward, self.up);
    }
}

fn clamp_pitch(pitch: Rad<f32>) -> Rad<f32> {
    let limit: Rad<f32> = Deg(PITCH_LIMIT_DEG).into();
    Rad(pitch.0.clamp(-limit.0, limit.0))
}

/// Input collected between frames.
#[derive(Debug, Default)]
pub struct CameraController {
    speed: f32,
    sensitivity: f32,
    amount_forward: f32,
    amount_backward: f32,
    amount_left: f32,
    amount_right: f32,
    amount_up: f32,
    amount_down: f32,
    mouse_dx: f64,
    mouse_dy: f64,
}

impl CameraController {
    /// `speed` is in units per second, `sensitivity` in degrees per pixel.
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            speed,
            sensitivity,
            ..Default::default()
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.speed, config.sensitivity)
    }

    /// Returns true when the key is one the controller reacts to.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) -> bool {
        let amount = if state == ElementState::Pressed { 1.0 } else { 0.0 };
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => self.amount_forward = amount,
            KeyCode::KeyS | KeyCode::ArrowDown => self.amount_backward = amount,
            KeyCode::KeyA | KeyCode::ArrowLeft => self.amount_left = amount,
            KeyCode::KeyD | KeyCode::ArrowRight => self.amount_right = amount,
            KeyCode::Space => self.amount_up = amount,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => self.amount_down = amount,
            _ => return false,
        }
        true
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => self.process_keyboard(*key, *state),
            // Releasing focus would otherwise leave keys stuck down.
            WindowEvent::Focused(false) => {
                self.release_all();
                false
            }
            _ => false,
        }
    }

    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        self.mouse_dx += dx;
        self.mouse_dy += dy;
    }

    pub fn release_all(&mut self) {
        *self = Self::new(self.speed, self.sensitivity);
    }

    pub fn update_camera(&mut self, camera: &mut Camera, dt: Duration) {
        let dt = dt.as_secs_f32();
        let step = self.speed * dt;

        let forward = camera.forward * (self.amount_forward - self.amount_backward);
        let strafe = camera.right * (self.amount_right - self.amount_left);
        let lift = Vector3::unit_y() * (self.amount_up - self.amount_down);
        camera.position += (forward + strafe + lift) * step;

        let yaw = Deg(self.mouse_dx as f32 * self.sensitivity);
        // Screen y grows downwards.
        let pitch = Deg(-self.mouse_dy as f32 * self.sensitivity);
        self.mouse_dx = 0.0;
        self.mouse_dy = 0.0;

        camera.rotate(yaw, pitch);
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{EuclideanSpace, Transform};

    use super::*;

    const EPS: f32 = 1e-4;

    fn camera() -> Camera {
        Camera::from_config(&crate::config::Config::default().camera, [1600, 900])
    }

    #[test]
    fn basis_is_orthonormal_for_any_orientation() {
        let mut cam = camera();
        for yaw in (-360..=360).step_by(15) {
            for pitch in (-120..=120).step_by(10) {
                cam.yaw = Deg(yaw as f32).into();
                cam.pitch = clamp_pitch(Deg(pitch as f32).into());
                cam.update_basis();
                assert!((cam.forward().magnitude() - 1.0).abs() < EPS);
                assert!((cam.right().magnitude() - 1.0).abs() < EPS);
                assert!((cam.up().magnitude() - 1.0).abs() < EPS);
                assert!(cam.right().dot(cam.up()).abs() < EPS);
                assert!(cam.right().dot(cam.forward()).abs() < EPS);
                assert!(cam.up().dot(cam.forward()).abs() < EPS);
            }
        }
    }

    #[test]
    fn pitch_stays_clamped_under_cumulative_mouse_motion() {
        let mut cam = camera();
        let mut controller = CameraController::new(1.0, 0.5);
        let limit = Rad::from(Deg(PITCH_LIMIT_DEG)).0;
        for _ in 0..100 {
            controller.handle_mouse(0.0, -10_000.0);
            cam.update(&mut controller, Duration::from_millis(16));
            assert!(cam.pitch().0 <= limit + EPS);
        }
        assert!((cam.pitch().0 - limit).abs() < EPS);
        for _ in 0..100 {
            controller.handle_mouse(0.0, 10_000.0);
            cam.update(&mut controller, Duration::from_millis(16));
            assert!(cam.pitch().0 >= -limit - EPS);
        }
        assert!((cam.pitch().0 + limit).abs() < EPS);
    }

    #[test]
    fn space_and_shift_move_straight_up_and_down() {
        let mut cam = camera();
        assert!(cam.pitch().0 != 0.0);
        let start = cam.position;
        let mut controller = CameraController::new(10.0, 0.08);

        controller.process_keyboard(KeyCode::Space, ElementState::Pressed);
        cam.update(&mut controller, Duration::from_secs(1));
        let climbed = cam.position - start;
        assert!(climbed.x.abs() < EPS && climbed.z.abs() < EPS, "{climbed:?}");
        assert!((climbed.y - 10.0).abs() < EPS);

        controller.process_keyboard(KeyCode::Space, ElementState::Released);
        controller.process_keyboard(KeyCode::ShiftLeft, ElementState::Pressed);
        cam.update(&mut controller, Duration::from_secs(1));
        let back = cam.position - start;
        assert!(back.magnitude() < EPS, "{back:?}");
    }

    #[test]
    fn projection_is_invariant_across_frames() {
        let mut cam = camera();
        let mut controller = CameraController::new(8.0, 0.08);
        let before = cam.projection_matrix();
        controller.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        for i in 0..20 {
            controller.handle_mouse(i as f64, -(i as f64));
            cam.update(&mut controller, Duration::from_millis(16));
        }
        assert_eq!(before, cam.projection_matrix());
    }

    #[test]
    fn held_forward_key_moves_along_forward() {
        let mut cam = camera();
        let mut controller = CameraController::new(10.0, 0.1);
        let start = cam.position;
        let forward = cam.forward();
        controller.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        cam.update(&mut controller, Duration::from_millis(500));
        let moved = cam.position - start;
        assert!((moved.magnitude() - 5.0).abs() < EPS);
        assert!((moved.normalize().dot(forward) - 1.0).abs() < EPS);

        controller.process_keyboard(KeyCode::KeyW, ElementState::Released);
        let rest = cam.position;
        cam.update(&mut controller, Duration::from_millis(500));
        assert_eq!(rest, cam.position);
    }

    #[test]
    fn unrelated_keys_are_not_consumed() {
        let mut controller = CameraController::new(1.0, 1.0);
        assert!(!controller.process_keyboard(KeyCode::KeyQ, ElementState::Pressed));
        assert!(controller.process_keyboard(KeyCode::Space, ElementState::Pressed));
    }

    #[test]
    fn view_maps_eye_to_origin_and_forward_to_negative_z() {
        let cam = camera();
        let eye = cam.view_matrix().transform_point(cam.position);
        assert!(eye.to_vec().magnitude() < EPS);
        let ahead = cam.view_matrix().transform_point(cam.position + cam.forward());
        assert!((ahead.z + 1.0).abs() < EPS);
    }

    #[test]
    fn sky_view_drops_translation() {
        let mut cam = camera();
        cam.set_position([100.0, -50.0, 3.0]);
        let sky = cam.sky_view_matrix();
        assert_eq!(sky.w, cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0));
        let view = cam.view_matrix();
        assert_eq!(sky.x.truncate(), view.x.truncate());
    }
}
