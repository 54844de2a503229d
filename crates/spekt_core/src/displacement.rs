//! Displacement mapping.
//!
//! A grayscale map perturbs every vertex along its normal. The offset of a
//! vertex is `(gray - mean) / mean * magnification`, where `gray` is the map
//! value at the vertex's texture coordinates and `mean` the average over the
//! whole map, so a uniform map leaves the surface in place.

use std::f32::consts::PI;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rand::Rng;
use spekt_math::Vec3;

use crate::error::{CoreError, CoreResult};

/// How vertex positions are projected onto the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UvMapping {
    /// Latitude/longitude around the y axis
    Sphere,
    /// Angle around the y axis and height
    Cylinder,
    /// Cross-shaped layout of the six faces of a unit cube
    Cube,
    /// Uniformly random texel for every vertex
    #[default]
    Random,
}

impl UvMapping {
    pub fn name(&self) -> &'static str {
        match self {
            UvMapping::Sphere => "sphere",
            UvMapping::Cylinder => "cylinder",
            UvMapping::Cube => "cube",
            UvMapping::Random => "random",
        }
    }

    /// Texture coordinates of `p`, clamped to `[0, 1]`.
    ///
    /// Positions are expected in a unit-sized frame; NaN coordinates map to 0.
    pub fn uv<R: Rng>(&self, p: Vec3, rng: &mut R) -> (f32, f32) {
        let (u, v) = match self {
            UvMapping::Sphere => {
                let v = 0.5 - p.y.asin() / PI;
                (0.5 + p.z.atan2(p.x) / (2.0 * PI), if v.is_nan() { 1.0 } else { v })
            }
            UvMapping::Cylinder => (p.x.atan2(p.z) / PI * 0.5 + 0.5, p.y / 2.0 + 0.5),
            UvMapping::Cube => {
                let (offset_u, offset_v) = cube_face_offset(p);
                (p.x / 8.0 + 1.0 / 8.0 + offset_u, p.y / 6.0 + 1.0 / 6.0 + offset_v)
            }
            UvMapping::Random => (
                rng.gen_range(0..100) as f32 / 100.0,
                rng.gen_range(0..100) as f32 / 100.0,
            ),
        };

        (clamp_unit(u), clamp_unit(v))
    }
}

impl fmt::Display for UvMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UvMapping {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sphere" => Ok(UvMapping::Sphere),
            "cylinder" => Ok(UvMapping::Cylinder),
            "cube" => Ok(UvMapping::Cube),
            "random" => Ok(UvMapping::Random),
            other => Err(CoreError::InvalidDisplacement(format!(
                "unknown UV mapping '{other}' (expected sphere, cylinder, cube or random)"
            ))),
        }
    }
}

fn clamp_unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Tile of the cube layout for the dominant axis of `p`; on ties z wins over y over x.
fn cube_face_offset(p: Vec3) -> (f32, f32) {
    let a = p.abs();
    let mut offset = (0.0, 0.0);

    if a.x >= a.y && a.x >= a.z {
        offset = if p.x > 0.0 { (0.5, 1.0 / 3.0) } else { (0.0, 1.0 / 3.0) };
    }
    if a.y >= a.x && a.y >= a.z {
        offset = if p.y > 0.0 { (0.25, 2.0 / 3.0) } else { (0.25, 0.0) };
    }
    if a.z >= a.x && a.z >= a.y {
        offset = if p.z > 0.0 { (0.25, 1.0 / 3.0) } else { (0.75, 1.0 / 3.0) };
    }

    offset
}

/// Grayscale displacement map with its mean gray value.
#[derive(Debug, Clone)]
pub struct DisplacementMap {
    width: u32,
    height: u32,
    gray: Vec<u8>,
    mean: f32,
}

impl DisplacementMap {
    /// Map from row-major gray values.
    pub fn from_gray(width: u32, height: u32, gray: Vec<u8>) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDisplacement(format!(
                "empty map ({width}x{height})"
            )));
        }
        if gray.len() != width as usize * height as usize {
            return Err(CoreError::InvalidDisplacement(format!(
                "{} values for a {width}x{height} map",
                gray.len()
            )));
        }

        let mean = gray.iter().map(|&g| g as f32).sum::<f32>() / gray.len() as f32;
        if mean <= 0.0 {
            return Err(CoreError::InvalidDisplacement("map is entirely black".into()));
        }

        Ok(Self {
            width,
            height,
            gray,
            mean,
        })
    }

    /// Load an image and convert it to gray by averaging its channels.
    pub fn from_path(path: impl AsRef<Path>) -> CoreResult<Self> {
        let rgb = image::open(path.as_ref())?.to_rgb8();
        let gray = rgb
            .pixels()
            .map(|p| ((p[0] as u32 + p[1] as u32 + p[2] as u32) / 3) as u8)
            .collect();

        log::info!(
            "Loaded displacement map {} ({}x{})",
            path.as_ref().display(),
            rgb.width(),
            rgb.height()
        );
        Self::from_gray(rgb.width(), rgb.height(), gray)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Gray value at `(u, v)`: `u` selects the column, `v` the row.
    pub fn sample(&self, u: f32, v: f32) -> u8 {
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        self.gray[(y * self.width + x) as usize]
    }

    /// Offset along the normal for a vertex at `p`.
    pub fn offset<R: Rng>(&self, p: Vec3, magnification: f32, mapping: UvMapping, rng: &mut R) -> f32 {
        let (u, v) = mapping.uv(p, rng);
        (self.sample(u, v) as f32 - self.mean) / self.mean * magnification
    }
}
