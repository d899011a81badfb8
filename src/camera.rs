//! Pinhole camera model used for pixel validity checks and (un)projection.

use nalgebra::{Point2, Vector3};

use crate::pyramid::{level_scale, ImageSize};

/// Pinhole intrinsics plus image size and an optional stereo baseline.
///
/// `baseline` is zero for a monocular camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub baseline: f64,
    size: ImageSize,
}

impl CameraModel {
    /// `fxycxcy` is `[fx, fy, cx, cy]`.
    pub fn new(size: ImageSize, fxycxcy: [f64; 4], baseline: f64) -> Self {
        let [fx, fy, cx, cy] = fxycxcy;
        Self {
            fx,
            fy,
            cx,
            cy,
            baseline,
            size,
        }
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn image_size(&self) -> ImageSize {
        self.size
    }

    pub fn is_stereo(&self) -> bool {
        self.baseline > 0.0
    }

    /// Whether `px` is a finite pixel coordinate inside the image.
    pub fn is_valid(&self, px: &Point2<f64>) -> bool {
        px.x.is_finite()
            && px.y.is_finite()
            && px.x >= 0.0
            && px.y >= 0.0
            && px.x <= self.size.width as f64 - 1.0
            && px.y <= self.size.height as f64 - 1.0
    }

    /// Project a camera-frame point to pixels. Returns `None` behind the camera.
    pub fn forward(&self, p_cam: &Vector3<f64>) -> Option<Point2<f64>> {
        if p_cam.z <= 0.0 {
            return None;
        }
        Some(Point2::new(
            self.fx * p_cam.x / p_cam.z + self.cx,
            self.fy * p_cam.y / p_cam.z + self.cy,
        ))
    }

    /// Back-project a pixel to its ray on the z = 1 plane.
    pub fn backward(&self, px: &Point2<f64>) -> Vector3<f64> {
        Vector3::new((px.x - self.cx) / self.fx, (px.y - self.cy) / self.fy, 1.0)
    }

    /// Camera for pyramid `level`.
    ///
    /// Pixel centres stay aligned, so the principal point is shifted by half a
    /// pixel before and after scaling.
    pub fn at_level(&self, level: usize) -> Self {
        let s = level_scale(level);
        let mut size = self.size;
        for _ in 0..level {
            size = size.half();
        }
        Self {
            fx: self.fx * s,
            fy: self.fy * s,
            cx: (self.cx + 0.5) * s - 0.5,
            cy: (self.cy + 0.5) * s - 0.5,
            baseline: self.baseline,
            size,
        }
    }

    pub fn depth_to_disp(&self, depth: f64) -> f64 {
        self.fx * self.baseline / depth
    }

    pub fn disp_to_depth(&self, disp: f64) -> f64 {
        self.fx * self.baseline / disp
    }

    pub fn disp_to_idepth(&self, disp: f64) -> f64 {
        disp / (self.fx * self.baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> CameraModel {
        CameraModel::new(ImageSize::new(640, 480), [500.0, 500.0, 320.0, 240.0], 0.1)
    }

    #[test]
    fn test_forward_backward() {
        let cam = camera();
        let p = Vector3::new(0.5, -0.25, 2.0);
        let px = cam.forward(&p).unwrap();
        assert_relative_eq!(px.x, 445.0);
        assert_relative_eq!(px.y, 177.5);

        let ray = cam.backward(&px);
        assert_relative_eq!(ray * p.z, p, epsilon = 1e-12);
        assert!(cam.forward(&Vector3::new(0.0, 0.0, -1.0)).is_none());
    }

    #[test]
    fn test_validity() {
        let cam = camera();
        assert!(cam.is_valid(&Point2::new(0.0, 0.0)));
        assert!(cam.is_valid(&Point2::new(639.0, 479.0)));
        assert!(!cam.is_valid(&Point2::new(639.5, 10.0)));
        assert!(!cam.is_valid(&Point2::new(f64::NAN, 10.0)));
    }

    #[test]
    fn test_disparity_conversions() {
        let cam = camera();
        assert_relative_eq!(cam.depth_to_disp(2.0), 25.0);
        assert_relative_eq!(cam.disp_to_depth(25.0), 2.0);
        assert_relative_eq!(cam.disp_to_idepth(25.0), 0.5);
        assert!(cam.is_stereo());
    }

    #[test]
    fn test_at_level() {
        let cam = camera().at_level(2);
        assert_eq!(cam.image_size(), ImageSize::new(160, 120));
        assert_relative_eq!(cam.fx, 125.0);
        assert_relative_eq!(cam.cx, 79.625);
    }
}
