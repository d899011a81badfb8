//! SO(3) Lie group utilities.
//!
//! Provides the skew-symmetric matrix and the left/right Jacobians of SO(3).
//! The left Jacobian is the `V` matrix of the SE(3) exponential map, which is
//! how keyframe pose corrections are folded into the state.

use nalgebra::{Matrix3, Vector3};

/// Small angle threshold for numerical stability.
const SMALL_ANGLE_THRESHOLD: f64 = 1e-6;

/// Constructs the skew-symmetric matrix [v]× such that [v]× u = v × u.
///
/// ```text
/// [v]× = |  0   -v_z   v_y |
///        |  v_z   0   -v_x |
///        | -v_y  v_x    0  |
/// ```
#[inline]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y,
        v.z, 0.0, -v.x,
        -v.y, v.x, 0.0,
    )
}

/// Computes the right Jacobian Jr(φ) of SO(3).
///
/// ```text
/// Jr(φ) = I - (1 - cos|φ|)/|φ|² [φ]× + (|φ| - sin|φ|)/|φ|³ [φ]×²
/// ```
pub fn right_jacobian_so3(phi: &Vector3<f64>) -> Matrix3<f64> {
    let theta = phi.norm();
    let skew_phi = skew(phi);

    if theta < SMALL_ANGLE_THRESHOLD {
        return Matrix3::identity() - 0.5 * skew_phi;
    }

    let theta_sq = theta * theta;
    Matrix3::identity() - ((1.0 - theta.cos()) / theta_sq) * skew_phi
        + ((theta - theta.sin()) / (theta_sq * theta)) * skew_phi * skew_phi
}

/// Computes the inverse of the right Jacobian Jr⁻¹(φ).
///
/// ```text
/// Jr⁻¹(φ) = I + 0.5 [φ]× + (1/|φ|² - (1 + cos|φ|)/(2|φ| sin|φ|)) [φ]×²
/// ```
pub fn right_jacobian_so3_inv(phi: &Vector3<f64>) -> Matrix3<f64> {
    let theta = phi.norm();
    let skew_phi = skew(phi);
    let skew_phi_sq = skew_phi * skew_phi;

    if theta < SMALL_ANGLE_THRESHOLD {
        return Matrix3::identity() + 0.5 * skew_phi + (1.0 / 12.0) * skew_phi_sq;
    }

    let coeff = 1.0 / (theta * theta) - (1.0 + theta.cos()) / (2.0 * theta * theta.sin());
    Matrix3::identity() + 0.5 * skew_phi + coeff * skew_phi_sq
}

/// Left Jacobian Jl(φ) = Jr(-φ).
#[inline]
pub fn left_jacobian_so3(phi: &Vector3<f64>) -> Matrix3<f64> {
    right_jacobian_so3(&-phi)
}

/// Inverse left Jacobian Jl⁻¹(φ) = Jr⁻¹(-φ).
#[inline]
pub fn left_jacobian_so3_inv(phi: &Vector3<f64>) -> Matrix3<f64> {
    right_jacobian_so3_inv(&-phi)
}
