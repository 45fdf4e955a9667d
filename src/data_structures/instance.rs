//! Per-object transformation data.
//!
//! Objects are drawn one call each, so the transform travels to the GPU as a
//! small uniform ([`ModelUniform`]) rather than an instance buffer.

use cgmath::{Deg, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3};

/// Position, Euler rotation in degrees (applied x, then y, then z in the
/// object's frame) and non-uniform scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn at(position: impl Into<Vector3<f32>>) -> Self {
        Self {
            position: position.into(),
            ..Self::new()
        }
    }

    pub fn with_rotation(mut self, degrees: impl Into<Vector3<f32>>) -> Self {
        self.rotation = degrees.into();
        self
    }

    pub fn with_scale(mut self, scale: impl Into<Vector3<f32>>) -> Self {
        self.scale = scale.into();
        self
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * self.rotation_matrix()
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    fn rotation_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_angle_x(Deg(self.rotation.x))
            * Matrix4::from_angle_y(Deg(self.rotation.y))
            * Matrix4::from_angle_z(Deg(self.rotation.z))
    }

    /// Inverse transpose of the linear part, so normals stay perpendicular
    /// under non-uniform scale.
    pub fn normal_matrix(&self) -> Matrix3<f32> {
        let m = self.to_matrix();
        let linear = Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate());
        linear
            .invert()
            .map(|inverse| inverse.transpose())
            // zero scale collapses the object; any normal will do
            .unwrap_or_else(Matrix3::identity)
    }

    pub fn to_raw(&self) -> ModelUniform {
        let normal = Matrix4::from(self.normal_matrix());
        ModelUniform {
            model: self.to_matrix().into(),
            normal: normal.into(),
        }
    }
}

impl From<Vector3<f32>> for Instance {
    fn from(position: Vector3<f32>) -> Self {
        Self::at(position)
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw transform stored on the GPU. The normal matrix is padded to a
 * 4x4 because uniform mat3 columns are 16 byte aligned.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}
