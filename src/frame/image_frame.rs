//! `Frame`: one camera capture (image pyramid(s) plus pose).
//!
//! A frame is an immutable snapshot. Mono and stereo captures share the same
//! type; a stereo frame simply carries a non-empty right pyramid.

use image::GrayImage;
use thiserror::Error;

use crate::geometry::SE3;
use crate::pyramid::{ImagePyramid, ImageSize};

/// Malformed pyramid input. These are programming errors in the caller's
/// pipeline, not runtime conditions to recover from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("image pyramid has no levels")]
    EmptyPyramid,
    #[error("pyramid level {level} has zero size")]
    EmptyLevel { level: usize },
    #[error("stereo level count mismatch: left={left}, right={right}")]
    LevelCountMismatch { left: usize, right: usize },
    #[error("stereo size mismatch at level {level}: left={left}, right={right}")]
    LevelSizeMismatch {
        level: usize,
        left: ImageSize,
        right: ImageSize,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Frame {
    grays_l: ImagePyramid,
    grays_r: ImagePyramid,
    twc: SE3,
}

impl Frame {
    /// Monocular frame.
    pub fn mono(grays_l: ImagePyramid, twc: SE3) -> Result<Self, FrameError> {
        check_pyramid(&grays_l)?;
        Ok(Self {
            grays_l,
            grays_r: ImagePyramid::new(),
            twc,
        })
    }

    /// Stereo frame. Both pyramids must match level by level.
    pub fn stereo(
        grays_l: ImagePyramid,
        grays_r: ImagePyramid,
        twc: SE3,
    ) -> Result<Self, FrameError> {
        check_pyramid(&grays_l)?;
        check_pyramid(&grays_r)?;
        if grays_l.len() != grays_r.len() {
            return Err(FrameError::LevelCountMismatch {
                left: grays_l.len(),
                right: grays_r.len(),
            });
        }
        for (level, (l, r)) in grays_l.iter().zip(&grays_r).enumerate() {
            let (left, right) = (ImageSize::of(l), ImageSize::of(r));
            if left != right {
                return Err(FrameError::LevelSizeMismatch { level, left, right });
            }
        }
        Ok(Self {
            grays_l,
            grays_r,
            twc,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.grays_l.is_empty()
    }

    pub fn is_stereo(&self) -> bool {
        !self.grays_r.is_empty()
    }

    /// Pyramid depth.
    pub fn levels(&self) -> usize {
        self.grays_l.len()
    }

    /// Level-0 image size (zero for an empty frame).
    pub fn image_size(&self) -> ImageSize {
        self.grays_l.first().map(ImageSize::of).unwrap_or_default()
    }

    pub fn grays_l(&self) -> &[GrayImage] {
        &self.grays_l
    }

    pub fn grays_r(&self) -> &[GrayImage] {
        &self.grays_r
    }

    /// World-from-camera pose at capture time.
    pub fn twc(&self) -> &SE3 {
        &self.twc
    }
}

fn check_pyramid(pyramid: &ImagePyramid) -> Result<(), FrameError> {
    if pyramid.is_empty() {
        return Err(FrameError::EmptyPyramid);
    }
    match pyramid.iter().position(|image| ImageSize::of(image).is_empty()) {
        Some(level) => Err(FrameError::EmptyLevel { level }),
        None => Ok(()),
    }
}
