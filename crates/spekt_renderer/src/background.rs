//! Backgrounds: what a ray sees once it leaves the scene.

use std::f32::consts::{FRAC_PI_2, PI};
use std::path::Path;

use spekt_math::{Ray, Transformation, Vec3};

use crate::error::{RenderError, RenderResult};

/// Radiance source for rays that escape every object.
pub trait Background: Send + Sync {
    /// Apply the background to the ray's payload in place.
    fn hit(&self, ray: &Ray) -> RenderResult<()>;
}

/// Treats every escaping ray as an error.
///
/// Handy for checking that a camera only sees geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct FatalBackground;

impl Background for FatalBackground {
    fn hit(&self, ray: &Ray) -> RenderResult<()> {
        Err(RenderError::BackgroundHit { id: ray.id })
    }
}

/// Equirectangular environment map.
#[derive(Debug, Clone)]
pub struct HdrBackground {
    width: usize,
    height: usize,
    /// Row-major linear RGB
    pixels: Vec<[f32; 3]>,
    /// Applied to ray directions before the lookup
    rotation: Transformation,
}

impl HdrBackground {
    /// Environment from row-major RGB triples.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<f32>) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidEnvironment(format!(
                "empty image ({width}x{height})"
            )));
        }
        if pixels.len() != 3 * width * height {
            return Err(RenderError::InvalidEnvironment(format!(
                "{} values for a {width}x{height} RGB image",
                pixels.len()
            )));
        }

        Ok(Self {
            width,
            height,
            pixels: pixels.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect(),
            rotation: Transformation::rotation_x(FRAC_PI_2),
        })
    }

    /// Load an image file (Radiance `.hdr`, OpenEXR, PNG, ...) as linear RGB.
    pub fn from_path(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let image = image::open(path)?.to_rgb32f();
        let (width, height) = image.dimensions();
        log::info!("Loaded environment map {} ({width}x{height})", path.display());
        Self::from_pixels(width as usize, height as usize, image.into_raw())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// RGB seen along `direction`.
    pub fn lookup(&self, direction: Vec3) -> [f32; 3] {
        let d = self.rotation.vector_to_world(direction);
        let r = d.length();
        let theta = (d.z / r).clamp(-1.0, 1.0).acos();
        let phi = d.y.atan2(d.x);

        let x = ((phi + PI) / (2.0 * PI) * (self.width - 1) as f32).round();
        let y = (theta / PI * (self.height - 1) as f32).round();

        // NaN (zero direction) saturates to 0
        let x = (x.max(0.0) as usize).min(self.width - 1);
        let y = (y.max(0.0) as usize).min(self.height - 1);

        self.pixels[y * self.width + x]
    }
}

impl Background for HdrBackground {
    fn hit(&self, ray: &Ray) -> RenderResult<()> {
        let spectrum = ray.spectrum().ok_or(RenderError::MissingPayload {
            id: ray.id,
            found: ray.payload.name(),
        })?;

        let [red, green, blue] = self.lookup(ray.direction());
        spectrum.lock().multiply(red, green, blue);
        Ok(())
    }
}
