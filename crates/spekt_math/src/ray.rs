use std::sync::Arc;

use parking_lot::Mutex;

use crate::{SpectrumRgb, Vec3, Vec4};

/// Spectrum shared between a ray and its bounce descendants.
pub type SharedSpectrum = Arc<Mutex<SpectrumRgb>>;

/// Polarized RGB light: one Stokes vector `(I, Q, U, V)` per wavelength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarizedSpectrumRgb {
    pub stokes: [Vec4; 3],
}

impl PolarizedSpectrumRgb {
    /// Unpolarized light with the given intensities.
    pub fn unpolarized(red: f32, green: f32, blue: f32) -> Self {
        Self {
            stokes: [
                Vec4::new(red, 0.0, 0.0, 0.0),
                Vec4::new(green, 0.0, 0.0, 0.0),
                Vec4::new(blue, 0.0, 0.0, 0.0),
            ],
        }
    }

    /// Total intensity per wavelength.
    pub fn intensity(&self) -> SpectrumRgb {
        SpectrumRgb::new(self.stokes[0].x, self.stokes[1].x, self.stokes[2].x)
    }

    /// Degree of polarization per wavelength (0 for unpolarized or dark light).
    pub fn degree_of_polarization(&self) -> [f32; 3] {
        self.stokes.map(|s| {
            if s.x > 0.0 {
                Vec3::new(s.y, s.z, s.w).length() / s.x
            } else {
                0.0
            }
        })
    }
}

/// Ray tube: a central polarized ray plus two neighbouring rays, stored as
/// offsets of their origins and directions relative to the central ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayTube {
    pub origin_offsets: [Vec3; 2],
    pub direction_offsets: [Vec3; 2],
    pub spectrum: PolarizedSpectrumRgb,
}

/// Data carried along a ray.
///
/// The spectral payloads are reference-counted: cloning a ray (or bouncing
/// it) shares the same spectrum object instead of copying it.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    None,
    RgbUnpolarized(SharedSpectrum),
    RgbPolarized(Arc<Mutex<PolarizedSpectrumRgb>>),
    PolarizedTube(Arc<Mutex<RayTube>>),
}

impl Payload {
    /// Fresh unpolarized payload.
    pub fn rgb(spectrum: SpectrumRgb) -> Self {
        Payload::RgbUnpolarized(Arc::new(Mutex::new(spectrum)))
    }

    /// Human readable name of the payload variant.
    pub fn name(&self) -> &'static str {
        match self {
            Payload::None => "none",
            Payload::RgbUnpolarized(_) => "unpolarized RGB",
            Payload::RgbPolarized(_) => "polarized RGB",
            Payload::PolarizedTube(_) => "polarized ray tube",
        }
    }
}

/// A ray with an id, bounce count, optical path length and payload.
///
/// The reciprocal direction and per-axis sign flags are cached and kept in
/// sync with the direction; they drive the branch-free slab test in
/// [`BBox::intersect_ray`](crate::BBox::intersect_ray).
#[derive(Debug, Clone)]
pub struct Ray {
    /// Id shared by a primary ray and all of its bounces (the pixel index for cameras)
    pub id: usize,
    /// Number of bounces since the primary ray
    pub bounces: u32,
    /// Accumulated optical path length
    pub optical_path_length: f32,
    pub payload: Payload,
    origin: Vec3,
    direction: Vec3,
    inv_direction: Vec3,
    sign: [usize; 3],
}

impl Ray {
    /// Create a new primary ray without payload.
    pub fn new(id: usize, origin: Vec3, direction: Vec3) -> Self {
        let mut ray = Self {
            id,
            bounces: 0,
            optical_path_length: 0.0,
            payload: Payload::None,
            origin,
            direction: Vec3::ZERO,
            inv_direction: Vec3::ZERO,
            sign: [0; 3],
        };
        ray.set_direction(direction);
        ray
    }

    /// Builder-style payload setter.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline]
    pub fn inv_direction(&self) -> Vec3 {
        self.inv_direction
    }

    /// 1 where the direction component is negative, 0 otherwise.
    #[inline]
    pub fn sign(&self) -> [usize; 3] {
        self.sign
    }

    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction;
        self.inv_direction = direction.recip();
        self.sign = [
            (self.inv_direction.x < 0.0) as usize,
            (self.inv_direction.y < 0.0) as usize,
            (self.inv_direction.z < 0.0) as usize,
        ];
    }

    /// Point at parameter `t`: origin + t * direction.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }

    /// Child ray leaving `origin` along `direction`.
    ///
    /// Keeps the id, counts one more bounce, extends the optical path by
    /// `delta_optical_path` and shares the payload.
    pub fn bounce(&self, origin: Vec3, direction: Vec3, delta_optical_path: f32) -> Ray {
        let mut ray = Ray::new(self.id, origin, direction);
        ray.bounces = self.bounces + 1;
        ray.optical_path_length = self.optical_path_length + delta_optical_path;
        ray.payload = self.payload.clone();
        ray
    }

    /// The unpolarized spectrum, if that is what the ray carries.
    pub fn spectrum(&self) -> Option<&SharedSpectrum> {
        match &self.payload {
            Payload::RgbUnpolarized(spectrum) => Some(spectrum),
            Payload::None | Payload::RgbPolarized(_) | Payload::PolarizedTube(_) => None,
        }
    }
}
