//! Frames and keyframes.
//!
//! A [`Frame`] is a raw capture: image pyramids plus the pose it was taken at.
//! A [`Keyframe`] binds a frame and adds optimizable state (FEJ), sparse
//! grid-indexed points and per-level patches.

pub mod image_frame;
pub mod keyframe;
pub mod patch;
pub mod pixel_grid;
pub mod point;
pub mod state;

pub use image_frame::{Frame, FrameError};
pub use keyframe::{Keyframe, KeyframeStatus};
pub use patch::{Patch, PatchLevel};
pub use pixel_grid::{GridSize, PixelGrid};
pub use point::DepthPoint;
pub use state::{AffineModel, FrameState, Vector10, STATE_DIM};
