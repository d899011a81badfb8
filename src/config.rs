//! Pipeline configuration, loadable from YAML.
//!
//! Every field has a default, so a config file only needs to list what it
//! overrides:
//!
//! ```yaml
//! num_levels: 4
//! select:
//!   cell_size: 16
//!   min_grad: 8
//! keyframe:
//!   min_depth: 0.4
//! ```

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Parameters of point selection and patch precomputation on a keyframe.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeyframeConfig {
    /// Extra level-0 margin (pixels) on top of the patch footprint.
    pub border: u32,
    /// Patch half size used by `Keyframe::precompute`.
    pub group_size: usize,
    /// Depth assigned to freshly selected points.
    pub prior_depth: f64,
    /// Depth samples outside [min_depth, max_depth] are rejected.
    pub min_depth: f64,
    pub max_depth: f64,
    /// Minimum number of seeded points for a keyframe to be ok.
    pub min_depths: usize,
}

impl Default for KeyframeConfig {
    fn default() -> Self {
        Self {
            border: 2,
            group_size: 1,
            prior_depth: 2.0,
            min_depth: 0.1,
            max_depth: 100.0,
            min_depths: 32,
        }
    }
}

/// Gradient-based pixel selection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectConfig {
    /// Pyramid level the gradients are evaluated on.
    pub sel_level: usize,
    /// Cell size in level-0 pixels.
    pub cell_size: u32,
    pub min_grad: u32,
    pub max_grad: u32,
    /// Level-0 border skipped during selection.
    pub border: u32,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            sel_level: 1,
            cell_size: 16,
            min_grad: 8,
            max_grad: 64,
            border: 4,
        }
    }
}

/// Pinhole intrinsics. `baseline` is 0 for monocular setups.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CameraConfig {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    #[serde(default)]
    pub baseline: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub num_levels: usize,
    /// Divides raw 16-bit depth images to get metres.
    pub depth_scale: f64,
    pub camera: Option<CameraConfig>,
    pub select: SelectConfig,
    pub keyframe: KeyframeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_levels: 4,
            depth_scale: 1000.0,
            camera: None,
            select: SelectConfig::default(),
            keyframe: KeyframeConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: Self = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_levels == 0 {
            bail!("num_levels must be positive");
        }
        if self.select.cell_size == 0 {
            bail!("select.cell_size must be positive");
        }
        if self.select.sel_level >= self.num_levels {
            bail!(
                "select.sel_level {} must be below num_levels {}",
                self.select.sel_level,
                self.num_levels
            );
        }
        if self.select.min_grad > self.select.max_grad {
            bail!(
                "select.min_grad {} exceeds select.max_grad {}",
                self.select.min_grad,
                self.select.max_grad
            );
        }
        let kf = &self.keyframe;
        if !(kf.min_depth > 0.0 && kf.min_depth < kf.max_depth) {
            bail!(
                "keyframe depth range [{}, {}] is invalid",
                kf.min_depth,
                kf.max_depth
            );
        }
        if kf.prior_depth <= 0.0 {
            bail!("keyframe.prior_depth must be positive");
        }
        if self.depth_scale <= 0.0 {
            bail!("depth_scale must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
num_levels: 5
select:
  cell_size: 32
keyframe:
  min_depth: 0.4
camera:
  fx: 458.0
  fy: 457.0
  cx: 367.0
  cy: 248.0
"#;
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.num_levels, 5);
        assert_eq!(config.select.cell_size, 32);
        assert_eq!(config.select.min_grad, SelectConfig::default().min_grad);
        assert_eq!(config.keyframe.min_depth, 0.4);
        assert_eq!(config.keyframe.group_size, 1);

        let camera = config.camera.unwrap();
        assert_eq!(camera.fx, 458.0);
        assert_eq!(camera.baseline, 0.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(PipelineConfig::from_yaml_str("num_levels: 0").is_err());
        assert!(PipelineConfig::from_yaml_str("num_levels: 2\nselect:\n  sel_level: 2").is_err());
        assert!(PipelineConfig::from_yaml_str("keyframe:\n  min_depth: -1.0").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::from_yaml_file("/nonexistent/pipeline.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }
}
