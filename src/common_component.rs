use bevy_ecs::prelude::Component;
use nalgebra::{Isometry3, Matrix4, Perspective3, Point3, Vector3};

// nalgebra projects depth into [-1, 1], wgpu clips to [0, 1]
#[rustfmt::skip]
pub fn opengl_to_wgpu() -> Matrix4<f32> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

#[derive(Clone, Debug, Component)]
pub struct Transform {
    // camera to world
    pub isometry: Isometry3<f32>,
}

#[derive(Clone, Debug, Component)]
pub struct Camera {
    pub perspective: Perspective3<f32>,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            perspective: Perspective3::new(aspect, std::f32::consts::FRAC_PI_4, 0.1, 1000.0),
        }
    }

    pub fn view_projection(&self, transform: &Transform) -> Matrix4<f32> {
        opengl_to_wgpu()
            * self.perspective.as_matrix()
            * transform.isometry.inverse().to_homogeneous()
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.perspective.set_aspect(width as f32 / height as f32);
        }
    }
}

#[derive(Clone, Debug, Component)]
pub struct MainCamera;

/// Orbit around a point on the ground.
#[derive(Clone, Debug, Component)]
pub struct CameraRig {
    pub target: Point3<f32>,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraRig {
    pub const MIN_DISTANCE: f32 = 2.0;
    pub const MAX_DISTANCE: f32 = 500.0;

    /// Looks at the middle of a grid of `extent` world units from above and to the south.
    pub fn overlooking(extent: f32) -> Self {
        Self {
            target: Point3::new(extent * 0.5, 0.0, extent * 0.5),
            distance: (extent * 0.9).clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE),
            yaw: 0.0,
            pitch: 0.9,
        }
    }

    pub fn eye(&self) -> Point3<f32> {
        let offset = Vector3::new(
            self.pitch.cos() * self.yaw.sin(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.cos(),
        );
        self.target + offset * self.distance
    }

    pub fn transform(&self) -> Transform {
        let view = Isometry3::look_at_rh(&self.eye(), &self.target, &Vector3::y());
        Transform {
            isometry: view.inverse(),
        }
    }

    /// Pans in the ground plane relative to the current heading.
    pub fn pan(&mut self, right: f32, forward: f32) {
        let scale = self.distance * 0.02;
        let forward_dir = Vector3::new(-self.yaw.sin(), 0.0, -self.yaw.cos());
        let right_dir = Vector3::new(self.yaw.cos(), 0.0, -self.yaw.sin());
        self.target += (right_dir * right + forward_dir * forward) * scale;
    }

    pub fn zoom(&mut self, steps: f32) {
        self.distance =
            (self.distance * 0.9f32.powf(steps)).clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
    }

    pub fn orbit(&mut self, radians: f32) {
        self.yaw = (self.yaw + radians) % std::f32::consts::TAU;
    }
}
