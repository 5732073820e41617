//! Per-draw model transforms.

use cgmath::{Matrix, Matrix4, Rad, SquareMatrix, Vector3};

/// The model matrix of one draw, plus whether its shader wants a normal matrix.
///
/// Built by chaining: `Transform::at([0.0, 0.0, -5.0]).rotate_z(a).rotate_y(a * 0.7)`
/// applies the rotations in object space, innermost last.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub model: Matrix4<f32>,
    pub lit: bool,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            model: Matrix4::identity(),
            lit: false,
        }
    }

    pub fn at(position: [f32; 3]) -> Self {
        Self {
            model: Matrix4::from_translation(Vector3::from(position)),
            lit: false,
        }
    }

    pub fn rotate_x(mut self, angle: f32) -> Self {
        self.model = self.model * Matrix4::from_angle_x(Rad(angle));
        self
    }

    pub fn rotate_y(mut self, angle: f32) -> Self {
        self.model = self.model * Matrix4::from_angle_y(Rad(angle));
        self
    }

    pub fn rotate_z(mut self, angle: f32) -> Self {
        self.model = self.model * Matrix4::from_angle_z(Rad(angle));
        self
    }

    pub fn scale(mut self, factor: f32) -> Self {
        self.model = self.model * Matrix4::from_scale(factor);
        self
    }

    /// Also upload the inverse-transpose as `normal`.
    pub fn lit(mut self) -> Self {
        self.lit = true;
        self
    }

    /// Inverse-transpose of the model matrix; identity when it is singular.
    pub fn normal_matrix(&self) -> Matrix4<f32> {
        self.model
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix4::identity)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector4};

    use super::*;

    #[test]
    fn rotation_keeps_translation() {
        let t = Transform::at([1.5, 0.0, -7.0]).rotate_z(1.0).rotate_y(0.7);
        assert_eq!(t.model.w, Vector4::new(1.5, 0.0, -7.0, 1.0));
    }

    #[test]
    fn normal_matrix_of_rotation_is_the_rotation() {
        let t = Transform::identity().rotate_x(0.3);
        let n = t.normal_matrix();
        for (a, b) in [n.x, n.y, n.z, n.w].iter().zip([t.model.x, t.model.y, t.model.z, t.model.w]) {
            assert!((*a - b).magnitude2() < 1e-10);
        }
    }

    #[test]
    fn singular_model_falls_back_to_identity() {
        let t = Transform::identity().scale(0.0);
        assert_eq!(t.normal_matrix(), Matrix4::identity());
    }
}
