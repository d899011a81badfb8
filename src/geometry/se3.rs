//! SE3: 6-DOF rigid body transformation (rotation + translation).
//!
//! Tangent vectors are ordered `[ω, v]` (rotation first), matching the layout
//! of the keyframe state correction.

use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3, Vector6};

use super::so3::{left_jacobian_so3, left_jacobian_so3_inv};

/// Rigid transformation, transforms points as p' = R * p + t.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Construct from rotation matrix and translation.
    pub fn from_rt(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let rot3 = Rotation3::from_matrix_unchecked(rotation);
        Self {
            rotation: UnitQuaternion::from_rotation_matrix(&rot3),
            translation,
        }
    }

    /// Pure translation.
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation,
        }
    }

    /// Construct from homogeneous 4x4 matrix [R | t; 0 | 1].
    pub fn from_matrix(mat: Matrix4<f64>) -> Self {
        let rotation = mat.fixed_view::<3, 3>(0, 0).into_owned();
        let translation = Vector3::new(mat[(0, 3)], mat[(1, 3)], mat[(2, 3)]);
        Self::from_rt(rotation, translation)
    }

    pub fn to_matrix(&self) -> Matrix4<f64> {
        let mut mat = Matrix4::identity();
        mat.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(self.rotation.to_rotation_matrix().matrix());
        mat.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        mat
    }

    /// `self * other`
    pub fn compose(&self, other: &SE3) -> SE3 {
        SE3 {
            rotation: self.rotation * other.rotation,
            translation: self.translation + self.rotation * other.translation,
        }
    }

    pub fn inverse(&self) -> SE3 {
        let rotation = self.rotation.inverse();
        SE3 {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }

    /// Exponential map from the tangent `[ω, v]`.
    pub fn exp(tangent: &Vector6<f64>) -> Self {
        let omega = tangent.fixed_rows::<3>(0).into_owned();
        let upsilon = tangent.fixed_rows::<3>(3).into_owned();
        Self {
            rotation: UnitQuaternion::from_scaled_axis(omega),
            translation: left_jacobian_so3(&omega) * upsilon,
        }
    }

    /// Logarithm map, inverse of [`SE3::exp`].
    pub fn log(&self) -> Vector6<f64> {
        let omega = self.rotation.scaled_axis();
        let upsilon = left_jacobian_so3_inv(&omega) * self.translation;
        let mut tangent = Vector6::zeros();
        tangent.fixed_rows_mut::<3>(0).copy_from(&omega);
        tangent.fixed_rows_mut::<3>(3).copy_from(&upsilon);
        tangent
    }

    /// Right-perturbation update: `self * exp(delta)`.
    pub fn retract(&self, delta: &Vector6<f64>) -> Self {
        self.compose(&Self::exp(delta))
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_pose() -> SE3 {
        SE3 {
            rotation: UnitQuaternion::from_axis_angle(
                &nalgebra::Unit::new_normalize(Vector3::new(0.2, 1.0, -0.3)),
                0.8,
            ),
            translation: Vector3::new(1.0, -2.0, 0.5),
        }
    }

    #[test]
    fn test_exp_pure_translation() {
        let tangent = Vector6::new(0.0, 0.0, 0.0, 1.0, 2.0, 3.0);
        let pose = SE3::exp(&tangent);
        assert_eq!(pose.rotation, UnitQuaternion::identity());
        assert_eq!(pose.translation, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_log_exp_roundtrip() {
        let pose = sample_pose();
        let back = SE3::exp(&pose.log());
        assert_relative_eq!(back.translation, pose.translation, epsilon = 1e-10);
        assert_relative_eq!(back.rotation.coords, pose.rotation.coords, epsilon = 1e-10);
    }

    #[test]
    fn test_inverse_compose_is_identity() {
        let pose = sample_pose();
        let composed = pose.compose(&pose.inverse());
        assert_relative_eq!(composed.translation.norm(), 0.0, epsilon = 1e-10);
        assert_relative_eq!(composed.rotation.angle(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_retract_applies_on_the_right() {
        let pose = sample_pose();
        let delta = Vector6::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        let updated = pose.retract(&delta);

        // Translation moves along the body x axis
        let expected = pose.translation + pose.rotation * Vector3::x();
        assert_relative_eq!(updated.translation, expected, epsilon = 1e-12);
        assert_eq!(updated.rotation, pose.rotation);
    }

    #[test]
    fn test_matrix_roundtrip() {
        let pose = sample_pose();
        let back = SE3::from_matrix(pose.to_matrix());
        assert_relative_eq!(back.translation, pose.translation, epsilon = 1e-12);
        assert_relative_eq!(back.rotation.coords, pose.rotation.coords, epsilon = 1e-10);

        let p = Vector3::new(0.3, 0.4, 5.0);
        let ph = pose.to_matrix() * p.push(1.0);
        assert_relative_eq!(ph.xyz(), pose.transform_point(&p), epsilon = 1e-12);
    }
}
