use nalgebra::{Point3, Rotation3, Vector2, Vector3};
use winit::event::VirtualKeyCode;

use crate::geometry::Ray;
use crate::util::{mix, mix_vec};

const PITCH_LIMIT: f32 = 1.5707;
const MOUSE_SENSITIVITY: f32 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Point3<f32>,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 1.0, 2.0),
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

impl CameraPose {
    pub fn new(position: Point3<f32>, yaw: f32, pitch: f32) -> Self {
        Self { position, yaw, pitch }
    }

    // 카메라 공간 -> 월드 공간. (Rx(pitch) * Ry(yaw))의 역행렬
    pub fn rotation(&self) -> Rotation3<f32> {
        let pitch = Rotation3::from_axis_angle(&Vector3::x_axis(), self.pitch);
        let yaw = Rotation3::from_axis_angle(&Vector3::y_axis(), self.yaw);
        (pitch * yaw).inverse()
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.rotation() * Vector3::new(0.0, 0.0, -1.0)
    }

    // 위치와 (yaw, pitch)를 각각 따로 선형 보간
    pub fn interpolate(&self, other: &CameraPose, t: f32) -> CameraPose {
        CameraPose {
            position: Point3::from(mix_vec(&self.position.coords, &other.position.coords, t)),
            yaw: mix(self.yaw, other.yaw, t),
            pitch: mix(self.pitch, other.pitch, t),
        }
    }

    pub fn uniform(&self, aspect_ratio: f32) -> CameraUniform {
        CameraUniform {
            position: self.position,
            rotation: self.rotation(),
            aspect_ratio,
        }
    }
}

// 렌더러에 넘기는 카메라 정보
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraUniform {
    pub position: Point3<f32>,
    pub rotation: Rotation3<f32>,
    pub aspect_ratio: f32,
}

impl CameraUniform {
    // uv는 [-1, 1] 화면 좌표 (y 위쪽), 화면비는 x에만 곱함
    pub fn ray(&self, uv: Vector2<f32>) -> Ray {
        let local = Vector3::new(uv.x * self.aspect_ratio, uv.y, -1.0).normalize();
        Ray::new(self.position, self.rotation * local)
    }
}

#[derive(Debug)]
pub struct CameraController {
    inputs: [bool; 7],
    // WASD SPACE SHIFT CTRL
    mouse_delta: Vector2<f32>,
    pub grab_mouse: bool,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            inputs: [false; 7],
            mouse_delta: Vector2::zeros(),
            grab_mouse: false,
        }
    }

    pub fn key(&mut self, key: VirtualKeyCode, is_press: bool) -> bool {
        let slot = match key {
            VirtualKeyCode::W => 0,
            VirtualKeyCode::A => 1,
            VirtualKeyCode::S => 2,
            VirtualKeyCode::D => 3,
            VirtualKeyCode::Space => 4,
            VirtualKeyCode::LShift => 5,
            VirtualKeyCode::LControl => 6,
            _ => return false,
        };
        self.inputs[slot] = is_press;
        true
    }

    pub fn is_held(&self, key: VirtualKeyCode) -> bool {
        match key {
            VirtualKeyCode::W => self.inputs[0],
            VirtualKeyCode::A => self.inputs[1],
            VirtualKeyCode::S => self.inputs[2],
            VirtualKeyCode::D => self.inputs[3],
            VirtualKeyCode::Space => self.inputs[4],
            VirtualKeyCode::LShift => self.inputs[5],
            VirtualKeyCode::LControl => self.inputs[6],
            _ => false,
        }
    }

    pub fn mouse_motion(&mut self, delta: (f64, f64)) {
        if self.grab_mouse {
            self.mouse_delta += Vector2::new(delta.0 as f32, delta.1 as f32);
        }
    }

    pub fn release_all(&mut self) {
        self.inputs = [false; 7];
        self.mouse_delta = Vector2::zeros();
    }

    pub fn movement_speed(&self) -> f32 {
        if self.inputs[6] {
            5.0
        } else {
            1.0
        }
    }

    // 움직였으면 새 pose를 돌려줌
    pub fn update(&mut self, pose: &CameraPose, time_step: f32) -> Option<CameraPose> {
        if !self.grab_mouse {
            self.mouse_delta = Vector2::zeros();
            return None;
        }

        let mut next = *pose;
        let mut moved = false;

        let delta = std::mem::replace(&mut self.mouse_delta, Vector2::zeros());
        if delta.x != 0.0 || delta.y != 0.0 {
            next.yaw += delta.x * MOUSE_SENSITIVITY;
            next.pitch = (next.pitch + delta.y * MOUSE_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
            moved = true;
        }

        let forward = next.forward();
        let up = Vector3::y();
        let right = forward.cross(&up);

        let mut direction = Vector3::zeros();
        if self.inputs[0] {
            direction += forward;
        }
        if self.inputs[1] {
            direction -= right;
        }
        if self.inputs[2] {
            direction -= forward;
        }
        if self.inputs[3] {
            direction += right;
        }
        if self.inputs[4] {
            direction += up;
        }
        if self.inputs[5] {
            direction -= up;
        }

        if direction.magnitude() > 0.0 {
            next.position += direction.normalize() * time_step * self.movement_speed();
            moved = true;
        }

        moved.then_some(next)
    }
}
