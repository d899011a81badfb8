use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use image::GrayImage;
use tracing::{info, warn};

use direct_vo::camera::CameraModel;
use direct_vo::config::PipelineConfig;
use direct_vo::frame::{Frame, Keyframe};
use direct_vo::geometry::SE3;
use direct_vo::pyramid::{make_image_pyramid, DepthMap, ImageSize};
use direct_vo::select::PixelSelector;

fn load_gray(path: &Path) -> Result<GrayImage> {
    let image = image::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    Ok(image.to_luma8())
}

/// Raw 16-bit depth image divided by `depth_scale`. Zero stays zero (no depth).
fn load_depth(path: &Path, depth_scale: f64) -> Result<DepthMap> {
    let raw = image::open(path)
        .with_context(|| format!("Failed to open {:?}", path))?
        .to_luma16();
    let (width, height) = raw.dimensions();
    Ok(DepthMap::from_fn(width, height, |x, y| {
        image::Luma([(raw.get_pixel(x, y)[0] as f64 / depth_scale) as f32])
    }))
}

fn make_camera(config: &PipelineConfig, size: ImageSize) -> CameraModel {
    match &config.camera {
        Some(cam) => CameraModel::new(size, [cam.fx, cam.fy, cam.cx, cam.cy], cam.baseline),
        None => {
            warn!("No camera in config, guessing intrinsics from image size {}", size);
            let (w, h) = (size.width as f64, size.height as f64);
            CameraModel::new(size, [w, w, w / 2.0, h / 2.0], 0.0)
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args.len() > 5 {
        bail!("usage: {} <config.yaml> <left.png> [right.png|-] [depth.png]", args[0]);
    }

    let config = PipelineConfig::from_yaml_file(&args[1])?;
    info!("Loaded config from {}", args[1]);

    let left = load_gray(Path::new(&args[2]))?;
    let size = ImageSize::of(&left);
    let camera = make_camera(&config, size);
    info!("Left image {}, camera fx={:.1} baseline={}", size, camera.fx, camera.baseline);

    let t_pyramid = Instant::now();
    let grays_l = make_image_pyramid(&left, config.num_levels);
    // "-" skips the right image so a mono run can still pass depth
    let frame = match args.get(3).filter(|p| p.as_str() != "-") {
        Some(right_path) => {
            let right = load_gray(Path::new(right_path))?;
            let grays_r = make_image_pyramid(&right, config.num_levels);
            Frame::stereo(grays_l, grays_r, SE3::identity())?
        }
        None => Frame::mono(grays_l, SE3::identity())?,
    };
    info!(
        "Built {} frame with {} levels in {:.2?}",
        if frame.is_stereo() { "stereo" } else { "mono" },
        frame.levels(),
        t_pyramid.elapsed()
    );

    let t_select = Instant::now();
    let mut selector = PixelSelector::new(config.select.clone());
    let n_selected = selector.select(frame.grays_l());
    info!(
        "Selected {}/{} cells in {:.2?}",
        n_selected,
        selector.pixels().len(),
        t_select.elapsed()
    );

    let mut keyframe = Keyframe::new(config.keyframe.clone());
    keyframe.set_frame(frame);

    let t_precompute = Instant::now();
    if !keyframe.precompute(selector.pixels(), &camera) {
        warn!("No usable points, keyframe not precomputed");
    }
    info!("Precomputed keyframe in {:.2?}", t_precompute.elapsed());

    if let Some(depth_path) = args.get(4) {
        let depth = load_depth(Path::new(depth_path), config.depth_scale)?;
        if ImageSize::of(&depth) != size {
            bail!(
                "Depth image {:?} is {}, expected {}",
                depth_path,
                ImageSize::of(&depth),
                size
            );
        }
        let t_depth = Instant::now();
        let n_depths = keyframe.init_from_depth(&depth);
        info!("Seeded {} depths in {:.2?}", n_depths, t_depth.elapsed());
    }

    let status = keyframe.update_status();
    info!("{}", status);
    Ok(())
}
