use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use spekt_core::{load_scene, DisplacementMap, Instance, UvMapping};
use spekt_math::{EulerRot, Quat, Transformation, Vec3};
use spekt_renderer::{
    Background, Camera, FatalBackground, HdrBackground, RenderConfig, Renderer, SpecularModel, ToneMapping,
};

/// Render a scene with or without an HDR environment.
#[derive(Parser, Debug)]
#[command(name = "spekt", version)]
struct Args {
    /// Scene file (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Environment map; raycaster mode is used without one
    #[arg(short = 'H', long)]
    hdr: Option<PathBuf>,

    /// Tone mapping alpha
    #[arg(short, long, default_value_t = 0.1)]
    alpha: f32,

    /// Width and height of the image
    #[arg(short, long, default_value_t = 800)]
    resolution: u32,

    /// Axis of rotation, e.g. 0,1,0
    #[arg(short = 'n', long, value_parser = parse_vec3, default_value = "0,1,0", allow_hyphen_values = true)]
    axis: Vec3,

    /// Rotation around the axis in degrees
    #[arg(short, long, default_value_t = 0.0)]
    phi: f32,

    /// Euler angles in degrees around z, y and x (e.g. 45,0,45); overrides --axis/--phi
    #[arg(short, long, value_parser = parse_vec3, allow_hyphen_values = true)]
    euler: Option<Vec3>,

    /// Uniform scaling, only applied together with --euler
    #[arg(short, long, default_value_t = 1.0)]
    scaling: f32,

    /// Output image (PPM)
    #[arg(short, long, default_value = "out.ppm")]
    output: PathBuf,

    /// Log the first hit of every pixel
    #[arg(short, long)]
    verbose: bool,

    /// Record direct hits only (one bounce, no background)
    #[arg(short = 'R', long)]
    raycaster: bool,

    /// Rotate around the centre of the scene's bounding box
    #[arg(short, long)]
    center: bool,

    /// Rays per pixel (requires a lens)
    #[arg(long, default_value_t = 1)]
    samples: u32,

    /// Lens radius; 0 is a pinhole
    #[arg(long, default_value_t = 0.0)]
    lens_radius: f32,

    /// Distance to the plane in focus
    #[arg(long, default_value_t = 4.0)]
    focal_distance: f32,

    /// Displacement map applied to every mesh before rendering
    #[arg(short = 'd', long)]
    displacement_map: Option<PathBuf>,

    /// Overall magnification of the displacement
    #[arg(short = 'm', long, default_value_t = 0.1, allow_hyphen_values = true)]
    magnification: f32,

    /// UV mapping of the displacement map: random, sphere, cube or cylinder
    #[arg(short = 'U', long, default_value_t = UvMapping::Random)]
    uv_mapping: UvMapping,
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|e| format!("'{v}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    match values[..] {
        [x, y, z] => Ok(Vec3::new(x, y, z)),
        _ => Err(format!("expected three comma separated values, got {}", values.len())),
    }
}

/// Placement of the scene: rotation (or Euler rotation and scaling) about
/// the origin, after optionally moving the bounding box centre there.
fn instance_transformation(args: &Args, center: Option<Vec3>) -> Transformation {
    let translation = Transformation::translation(-center.unwrap_or(Vec3::ZERO));

    let rotation = match args.euler {
        Some(angles) => {
            let q = Quat::from_euler(
                EulerRot::ZYX,
                -angles.x.to_radians(),
                angles.y.to_radians(),
                -angles.z.to_radians(),
            );
            Transformation::from_trs(Vec3::ZERO, q, Vec3::splat(args.scaling))
        }
        None => Transformation::rotation(args.axis.normalize(), args.phi.to_radians()),
    };

    rotation.apply(&translation)
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();

    let raycaster = args.raycaster || args.hdr.is_none();
    if raycaster && !args.raycaster {
        log::info!("No --hdr given, raycaster mode is enabled");
    }

    log::info!("Loading {}", args.input.display());
    let mut asset = load_scene(&args.input).with_context(|| format!("Failed to load {}", args.input.display()))?;

    if let Some(path) = &args.displacement_map {
        let map = DisplacementMap::from_path(path).with_context(|| format!("Failed to load {}", path.display()))?;
        asset.displace(&map, args.magnification, args.uv_mapping, &mut rand::thread_rng());
    }
    asset.build_spatial_index();

    let center = if args.center {
        if asset.scene_roots().len() > 1 {
            log::warn!("Scene contains more than one object, automatic centering is disabled");
            None
        } else {
            log::info!("Automatic centering is enabled");
            Some(asset.bbox().center())
        }
    } else {
        None
    };

    let instance = Instance::new(Arc::new(asset), instance_transformation(&args, center));

    let mut camera = Camera::new(Vec3::new(0.0, 1.0, -4.0), Vec3::Z, Vec3::Y)
        .with_resolution(args.resolution, args.resolution)
        .with_lens(args.lens_radius, args.focal_distance)
        .with_samples(args.samples);

    let material_model = SpecularModel::default();

    let (background, mut config): (Box<dyn Background>, RenderConfig) = if raycaster {
        (Box::new(FatalBackground), RenderConfig::raycaster())
    } else {
        let path = args.hdr.as_ref().context("Missing --hdr")?;
        let hdr = HdrBackground::from_path(path).with_context(|| format!("Failed to load {}", path.display()))?;
        (Box::new(hdr), RenderConfig::default())
    };
    config.verbose = args.verbose;

    log::info!("Rendering the scene...");
    let renderer = Renderer::new(&instance, &material_model, Some(&*background), config);
    renderer.render(&mut camera).context("Rendering failed")?;

    log::info!("Saving image to {}", args.output.display());
    if raycaster {
        camera.save_raycaster(&args.output)?;
    } else {
        camera.save(&args.output, &ToneMapping::new(args.alpha))?;
    }

    Ok(())
}
