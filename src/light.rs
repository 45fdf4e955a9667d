//! The single scene light.
//!
//! Phong intensities are fixed fractions of the light colour. The light also
//! owns the matrices of the shadow pass: a view looking from the light towards
//! a fixed target and an orthographic projection around it.

use cgmath::{InnerSpace, Matrix4, Point3, Vector3, ortho};

use crate::{camera::OPENGL_TO_WGPU_MATRIX, config::LightConfig};

pub const AMBIENT_RATIO: f32 = 0.1;
pub const DIFFUSE_RATIO: f32 = 0.8;
pub const SPECULAR_RATIO: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowFrustum {
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Clone, Debug)]
pub struct Light {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub colour: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
}

impl Light {
    pub fn new(
        position: impl Into<Point3<f32>>,
        target: impl Into<Point3<f32>>,
        colour: impl Into<Vector3<f32>>,
        frustum: ShadowFrustum,
    ) -> Self {
        let position = position.into();
        let target = target.into();
        let colour = colour.into();
        let half = frustum.half_extent;
        Self {
            position,
            target,
            colour,
            ambient: colour * AMBIENT_RATIO,
            diffuse: colour * DIFFUSE_RATIO,
            specular: colour * SPECULAR_RATIO,
            view: light_view(position, target),
            projection: OPENGL_TO_WGPU_MATRIX
                * ortho(-half, half, -half, half, frustum.near, frustum.far),
        }
    }

    pub fn from_config(config: &LightConfig) -> Self {
        Self::new(
            config.position,
            config.target,
            config.colour,
            ShadowFrustum {
                half_extent: config.shadow_half_extent,
                near: config.shadow_near,
                far: config.shadow_far,
            },
        )
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    /// World space to the shadow map's clip space.
    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection * self.view
    }
}

fn light_view(position: Point3<f32>, target: Point3<f32>) -> Matrix4<f32> {
    let direction = (target - position).normalize();
    // look_at degenerates when looking straight along the up vector
    let up = if direction.dot(Vector3::unit_y()).abs() > 0.999 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    Matrix4::look_at_rh(position, target, up)
}
