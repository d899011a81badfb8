//! Sparse keyframe point with inverse depth.

use nalgebra::{Point2, Vector3};

/// A selected keyframe pixel and its inverse-depth estimate.
///
/// `info` encodes both validity and confidence: negative means the slot holds
/// no usable point, [`DepthPoint::DEFAULT_INFO`] means the inverse depth is
/// still the prior, anything above it was seeded from a measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthPoint {
    px: Point2<f64>,
    bearing: Vector3<f64>,
    idepth: f64,
    info: f64,
}

impl DepthPoint {
    pub const BAD_INFO: f64 = -1.0;
    pub const DEFAULT_INFO: f64 = 0.0;
    /// Seeded from stereo disparity.
    pub const DISP_INFO: f64 = 50.0;
    /// Seeded from a depth sensor.
    pub const MAX_INFO: f64 = 100.0;

    pub fn new(px: Point2<f64>, bearing: Vector3<f64>, idepth: f64, info: f64) -> Self {
        Self {
            px,
            bearing,
            idepth,
            info,
        }
    }

    pub fn bad() -> Self {
        Self {
            px: Point2::new(-1.0, -1.0),
            bearing: Vector3::zeros(),
            idepth: 0.0,
            info: Self::BAD_INFO,
        }
    }

    pub fn is_bad(&self) -> bool {
        self.info < Self::DEFAULT_INFO
    }

    /// Inverse depth comes from a measurement rather than the prior.
    pub fn is_seeded(&self) -> bool {
        self.info > Self::DEFAULT_INFO
    }

    /// Level-0 pixel.
    pub fn px(&self) -> Point2<f64> {
        self.px
    }

    /// Ray on the z = 1 plane.
    pub fn bearing(&self) -> Vector3<f64> {
        self.bearing
    }

    pub fn idepth(&self) -> f64 {
        self.idepth
    }

    pub fn info(&self) -> f64 {
        self.info
    }

    pub fn depth(&self) -> Option<f64> {
        (!self.is_bad() && self.idepth > 0.0).then(|| 1.0 / self.idepth)
    }

    /// 3D point in the keyframe camera frame.
    pub fn point_cam(&self) -> Option<Vector3<f64>> {
        self.depth().map(|d| self.bearing * d)
    }

    pub fn set_idepth(&mut self, idepth: f64, info: f64) {
        self.idepth = idepth;
        self.info = info;
    }

    pub fn set_bad(&mut self) {
        self.info = Self::BAD_INFO;
    }
}

impl Default for DepthPoint {
    fn default() -> Self {
        Self::bad()
    }
}
