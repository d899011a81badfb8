//! Keyframe - a frame promoted to carry optimizable state and a sparse
//! point/patch set for photometric alignment.
//!
//! A Keyframe contains:
//! - The bound [`Frame`] (pyramids + capture pose)
//! - Current and first-estimate [`FrameState`] for FEJ linearization
//! - Sparse points indexed by pixel-grid cell, with inverse depths
//! - Per-level patch caches aligned with the points
//!
//! # FEJ protocol
//!
//! While a keyframe is free, corrections are applied to the state right away
//! and the first estimate follows the state. Once it is fixed, both are frozen
//! and the optimizer's latest correction, expressed relative to the first
//! estimate, is parked in `pending`. [`Keyframe::update_linearization_point`]
//! then moves the state to `first_estimate ⊕ pending`.

use std::fmt;

use nalgebra::{DMatrix, Point2};
use tracing::{debug, warn};

use crate::camera::CameraModel;
use crate::config::KeyframeConfig;
use crate::geometry::SE3;
use crate::pyramid::{is_in_bounds, level_scale, DepthMap, ImageSize};

use super::image_frame::Frame;
use super::patch::PatchLevel;
use super::pixel_grid::{GridSize, PixelGrid};
use super::point::DepthPoint;
use super::state::{FrameState, Vector10};

/// Point/patch/depth counts of a keyframe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyframeStatus {
    /// Points promoted by `init_points`.
    pub pixels: usize,
    /// Points with valid patches on every level.
    pub patches: usize,
    /// Points whose inverse depth was seeded from depth or disparity.
    pub depths: usize,
    pub ok: bool,
}

impl fmt::Display for KeyframeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyframeStatus(ok={}, pixels={}, patches={}, depths={})",
            self.ok, self.pixels, self.patches, self.depths
        )
    }
}

#[derive(Clone)]
pub struct Keyframe {
    config: KeyframeConfig,
    frame: Frame,

    // ─────────────────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────────────────
    state: FrameState,
    first_estimate: FrameState,
    /// Correction relative to `first_estimate` not yet applied while fixed.
    pending: Vector10,
    fixed: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // Points and patches, indexed by grid cell
    // ─────────────────────────────────────────────────────────────────────────
    grid_size: GridSize,
    points: Vec<DepthPoint>,
    /// `patches[level]`
    patches: Vec<PatchLevel>,

    precomputed: bool,
    status: KeyframeStatus,
}

impl Keyframe {
    pub fn new(config: KeyframeConfig) -> Self {
        Self {
            config,
            frame: Frame::default(),
            state: FrameState::default(),
            first_estimate: FrameState::default(),
            pending: Vector10::zeros(),
            fixed: false,
            grid_size: GridSize::default(),
            points: Vec::new(),
            patches: Vec::new(),
            precomputed: false,
            status: KeyframeStatus::default(),
        }
    }

    pub fn config(&self) -> &KeyframeConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Frame binding
    // ─────────────────────────────────────────────────────────────────────────

    /// Bind a new frame and reset the keyframe to it.
    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
        self.reset();
    }

    /// Back to the state right after `set_frame`: state and first estimate at
    /// the frame pose, not fixed, no pending correction, no points.
    pub fn reset(&mut self) {
        self.state = FrameState::from_pose(*self.frame.twc());
        self.first_estimate = self.state;
        self.pending = Vector10::zeros();
        self.fixed = false;
        self.points.fill(DepthPoint::bad());
        for level in &mut self.patches {
            let cells = level.cells();
            let half = level.half();
            level.reset(cells, half);
        }
        self.precomputed = false;
        self.status = KeyframeStatus::default();
    }

    /// Reserve point and patch storage.
    pub fn allocate(&mut self, num_levels: usize, grid_size: GridSize) {
        let cells = grid_size.area();
        self.grid_size = grid_size;
        self.points.clear();
        self.points.resize(cells, DepthPoint::bad());
        self.patches.resize_with(num_levels, PatchLevel::default);
        for level in &mut self.patches {
            level.reset(cells, self.config.group_size);
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn is_stereo(&self) -> bool {
        self.frame.is_stereo()
    }

    pub fn levels(&self) -> usize {
        self.frame.levels()
    }

    pub fn image_size(&self) -> ImageSize {
        self.frame.image_size()
    }

    pub fn grays_l(&self) -> &[image::GrayImage] {
        self.frame.grays_l()
    }

    pub fn grays_r(&self) -> &[image::GrayImage] {
        self.frame.grays_r()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State and FEJ
    // ─────────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    /// Linearization point for Jacobian evaluation.
    pub fn first_estimate(&self) -> &FrameState {
        &self.first_estimate
    }

    /// Correction waiting for the next `update_linearization_point`.
    pub fn pending(&self) -> &Vector10 {
        &self.pending
    }

    /// Current world-from-camera pose.
    pub fn twc(&self) -> &SE3 {
        &self.state.twc
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Mark as gauge anchor. The current state stops moving under
    /// `update_state` until the linearization point is refreshed.
    pub fn set_fixed(&mut self) {
        self.fixed = true;
    }

    /// Apply an optimizer correction.
    pub fn update_state(&mut self, dx: &Vector10) {
        if self.fixed {
            self.pending = *dx;
        } else {
            self.state = self.state.retract(dx);
            self.first_estimate = self.state;
        }
    }

    /// Fold the pending correction into the state, relative to the first
    /// estimate. Calling it twice in a row is a no-op the second time.
    pub fn update_linearization_point(&mut self) {
        self.state = self.first_estimate.retract(&self.pending);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Points and patches
    // ─────────────────────────────────────────────────────────────────────────

    pub fn grid_size(&self) -> GridSize {
        self.grid_size
    }

    /// Points indexed by grid cell; unused cells hold bad points.
    pub fn points(&self) -> &[DepthPoint] {
        &self.points
    }

    pub fn patches(&self, level: usize) -> Option<&PatchLevel> {
        self.patches.get(level)
    }

    /// Whether point `idx` has patches on every level from the last
    /// `init_patches`.
    pub fn has_patch(&self, idx: usize) -> bool {
        self.patches.first().is_some_and(|level| level.is_good(idx))
    }

    /// Level-0 margin a candidate pixel needs to be promoted.
    fn point_margin(&self) -> f64 {
        self.config.border as f64 + PatchLevel::footprint_margin(self.config.group_size)
    }

    /// Promote the candidates of `pixels` that are far enough from the border
    /// and valid for `camera`. Returns the number of promoted points.
    pub fn init_points(&mut self, pixels: &PixelGrid, camera: &CameraModel) -> usize {
        let levels = self.levels();
        if self.grid_size != pixels.grid_size() || self.patches.len() != levels {
            self.allocate(levels, pixels.grid_size());
        }
        self.precomputed = false;

        let margin = self.point_margin();
        let size = camera.image_size();
        let idepth = 1.0 / self.config.prior_depth;

        let mut n_points = 0;
        for (point, cell) in self.points.iter_mut().zip(pixels.cells()) {
            *point = match cell {
                Some(px) => {
                    let px = Point2::new(px.x as f64, px.y as f64);
                    if is_in_bounds(size, px.x, px.y, margin) && camera.is_valid(&px) {
                        n_points += 1;
                        DepthPoint::new(px, camera.backward(&px), idepth, DepthPoint::DEFAULT_INFO)
                    } else {
                        DepthPoint::bad()
                    }
                }
                None => DepthPoint::bad(),
            };
        }
        for level in &mut self.patches {
            let cells = level.cells();
            level.reset(cells, self.config.group_size);
        }

        self.status = KeyframeStatus {
            pixels: n_points,
            ..KeyframeStatus::default()
        };
        debug!(n_points, cells = pixels.len(), "init points");
        n_points
    }

    /// Sample patches of half size `group_size` for every point on every
    /// level. A point whose footprint leaves any level gets no patch on any
    /// level but stays selected, so a later call with a smaller group size
    /// sees the full `init_points` set again.
    ///
    /// Returns the number of points with complete patches.
    pub fn init_patches(&mut self, group_size: usize) -> usize {
        if self.frame.is_empty() || !self.points.iter().any(|p| !p.is_bad()) {
            self.precomputed = false;
            debug!("init patches skipped, no points selected");
            return 0;
        }

        let Self {
            frame,
            points,
            patches,
            ..
        } = self;

        let cells = points.len();
        for level in patches.iter_mut() {
            level.reset(cells, group_size);
        }

        let mut n_patches = 0;
        for (idx, point) in points.iter().enumerate() {
            if point.is_bad() {
                continue;
            }

            let complete = frame
                .grays_l()
                .iter()
                .zip(patches.iter_mut())
                .enumerate()
                .all(|(level, (image, cache))| {
                    let px = point.px() * level_scale(level);
                    cache.extract(idx, image, &px)
                });

            if complete {
                n_patches += 1;
            } else {
                for cache in patches.iter_mut() {
                    cache.mark_bad(idx);
                }
            }
        }

        self.precomputed = true;
        self.status.patches = n_patches;
        debug!(n_patches, group_size, "init patches");
        n_patches
    }

    /// `init_points` followed by `init_patches` with the configured group
    /// size. Returns false if no point survives selection.
    pub fn precompute(&mut self, pixels: &PixelGrid, camera: &CameraModel) -> bool {
        if self.init_points(pixels, camera) == 0 {
            return false;
        }
        self.init_patches(self.config.group_size);
        self.precomputed
    }

    /// Seed inverse depths from a dense level-0 depth map.
    ///
    /// Returns the number of seeded points. Must run after `precompute`; if it
    /// does not, nothing is seeded and 0 is returned.
    ///
    /// # Panics
    /// If the depth map size differs from the level-0 image size.
    pub fn init_from_depth(&mut self, depth: &DepthMap) -> usize {
        if !self.precomputed {
            warn!("init_from_depth called before points were precomputed");
            return 0;
        }
        let size = self.image_size();
        assert_eq!(
            ImageSize::of(depth),
            size,
            "depth map must match the level-0 image size"
        );

        let (min_depth, max_depth) = (self.config.min_depth, self.config.max_depth);
        let patches = self.patches.first();
        let mut n_depths = 0;
        for (idx, point) in self.points.iter_mut().enumerate() {
            if point.is_bad() || !patches.is_some_and(|level| level.is_good(idx)) {
                continue;
            }
            let px = point.px();
            let d = depth.get_pixel(px.x.round() as u32, px.y.round() as u32)[0] as f64;
            if d.is_finite() && d >= min_depth && d <= max_depth {
                point.set_idepth(1.0 / d, DepthPoint::MAX_INFO);
                n_depths += 1;
            }
        }

        debug!(n_depths, "init from depth");
        n_depths
    }

    /// Seed inverse depths from per-cell stereo disparities (negative means
    /// no match). Points already seeded from a depth sensor are kept.
    ///
    /// # Panics
    /// If `disps` does not have the pixel-grid shape.
    pub fn init_from_disp(&mut self, disps: &DMatrix<i16>, camera: &CameraModel) -> usize {
        if !self.precomputed {
            warn!("init_from_disp called before points were precomputed");
            return 0;
        }
        if !camera.is_stereo() {
            warn!("init_from_disp needs a stereo camera");
            return 0;
        }
        assert_eq!(
            (disps.nrows(), disps.ncols()),
            (self.grid_size.rows, self.grid_size.cols),
            "disparities must match the pixel grid"
        );

        let cols = self.grid_size.cols;
        let patches = self.patches.first();
        let mut n_disps = 0;
        for (idx, point) in self.points.iter_mut().enumerate() {
            if point.is_bad() || point.info() > DepthPoint::DISP_INFO {
                continue;
            }
            if !patches.is_some_and(|level| level.is_good(idx)) {
                continue;
            }
            let disp = disps[(idx / cols, idx % cols)];
            if disp <= 0 {
                continue;
            }
            point.set_idepth(camera.disp_to_idepth(disp as f64), DepthPoint::DISP_INFO);
            n_disps += 1;
        }

        debug!(n_disps, "init from disparities");
        n_disps
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status
    // ─────────────────────────────────────────────────────────────────────────

    /// Recount points, patches and depths and decide whether the keyframe is
    /// usable.
    pub fn update_status(&mut self) -> &KeyframeStatus {
        let mut status = KeyframeStatus::default();
        for (idx, point) in self.points.iter().enumerate() {
            if point.is_bad() {
                continue;
            }
            status.pixels += 1;
            if !self.precomputed || !self.has_patch(idx) {
                continue;
            }
            status.patches += 1;
            if point.is_seeded() {
                status.depths += 1;
            }
        }
        self.status = status;
        self.status.ok = self.precomputed && self.status.depths >= self.config.min_depths;
        &self.status
    }

    pub fn status(&self) -> &KeyframeStatus {
        &self.status
    }

    pub fn ok(&self) -> bool {
        self.status.ok
    }

    pub fn precomputed(&self) -> bool {
        self.precomputed
    }
}

impl Default for Keyframe {
    fn default() -> Self {
        Self::new(KeyframeConfig::default())
    }
}

impl fmt::Debug for Keyframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyframe")
            .field("levels", &self.levels())
            .field("is_stereo", &self.is_stereo())
            .field("grid_size", &self.grid_size)
            .field("fixed", &self.fixed)
            .field("precomputed", &self.precomputed)
            .field("status", &self.status)
            .finish()
    }
}
