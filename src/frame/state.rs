//! Optimizable keyframe state: pose plus photometric affine parameters.

use nalgebra::{SVector, Vector6};

use crate::geometry::SE3;

/// Dimension of the keyframe state tangent space.
pub const STATE_DIM: usize = 10;

/// Tangent vector `[rot(3), trans(3), affine_l(a, b), affine_r(a, b)]`.
pub type Vector10 = SVector<f64, STATE_DIM>;

/// Brightness transfer `I' = exp(a) * I + b` of one exposure.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AffineModel {
    pub a: f64,
    pub b: f64,
}

impl AffineModel {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    pub fn apply(&self, intensity: f64) -> f64 {
        self.a.exp() * intensity + self.b
    }
}

/// Pose `T_w_cl` (world from left camera) plus left/right affine models.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameState {
    pub twc: SE3,
    pub affine_l: AffineModel,
    pub affine_r: AffineModel,
}

impl FrameState {
    /// State at `twc` with identity photometric calibration.
    pub fn from_pose(twc: SE3) -> Self {
        Self {
            twc,
            ..Self::default()
        }
    }

    /// `self ⊕ dx`: the pose is right-multiplied by `exp(dx[0..6])`, the
    /// affine parameters are added.
    pub fn retract(&self, dx: &Vector10) -> Self {
        let xi: Vector6<f64> = dx.fixed_rows::<6>(0).into_owned();
        Self {
            twc: self.twc.retract(&xi),
            affine_l: AffineModel::new(self.affine_l.a + dx[6], self.affine_l.b + dx[7]),
            affine_r: AffineModel::new(self.affine_r.a + dx[8], self.affine_r.b + dx[9]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_retract_translation_and_affine() {
        let state = FrameState::from_pose(SE3::from_translation(Vector3::new(1.0, 0.0, 0.0)));
        let mut dx = Vector10::zeros();
        dx.fixed_rows_mut::<3>(3).fill(1.0);
        dx[6] = 0.1;
        dx[9] = -2.0;

        let updated = state.retract(&dx);
        assert_relative_eq!(updated.twc.translation, Vector3::new(2.0, 1.0, 1.0));
        assert_eq!(updated.affine_l, AffineModel::new(0.1, 0.0));
        assert_eq!(updated.affine_r, AffineModel::new(0.0, -2.0));
    }

    #[test]
    fn test_retract_rotation() {
        let mut dx = Vector10::zeros();
        dx[2] = std::f64::consts::FRAC_PI_2;
        let updated = FrameState::default().retract(&dx);
        assert_relative_eq!(
            updated.twc.rotation * Vector3::x(),
            Vector3::y(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_affine_apply() {
        assert_eq!(AffineModel::default().apply(42.0), 42.0);
        assert_relative_eq!(AffineModel::new(2f64.ln(), 3.0).apply(10.0), 23.0, epsilon = 1e-12);
    }
}
