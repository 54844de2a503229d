//! Material models: how a ray continues after hitting a surface.

use std::sync::atomic::{AtomicBool, Ordering};

use num_complex::Complex32;
use spekt_core::Intersection;
use spekt_math::{Ray, Vec3};

use crate::error::{RenderError, RenderResult};
use crate::renderer::Renderer;
use crate::sensor::Sensor;

/// Capability tag used by sensors to decide whether they can record a model's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialModelKind {
    Specular,
}

impl MaterialModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            MaterialModelKind::Specular => "specular",
        }
    }
}

/// Surface interaction shared by every material in the scene.
///
/// Must be thread-safe because it's called from rayon workers.
pub trait MaterialModel: Send + Sync {
    fn kind(&self) -> MaterialModelKind;

    /// Child rays leaving the hit described by `intersection`.
    ///
    /// May mutate the payload shared by `ray` and its children.
    fn bounce(
        &self,
        ray: &Ray,
        intersection: &Intersection<'_>,
        sensor: &dyn Sensor,
        renderer: &Renderer<'_>,
    ) -> RenderResult<Vec<Ray>>;
}

/// Mirror reflection of `incident` about `normal`, normalized.
#[inline]
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    (incident - 2.0 * normal.dot(incident) * normal).normalize()
}

/// Fresnel reflectance `(rp, rs)` at an interface with relative complex
/// refractive index `n` for incidence cosine `cos_theta`.
pub fn fresnel_reflection(n: Complex32, cos_theta: f32) -> (f32, f32) {
    let n2 = n * n;
    let sin2 = 1.0 - cos_theta * cos_theta;
    let root = (n2 - sin2).sqrt();

    let rp = (n2 * cos_theta - root) / (n2 * cos_theta + root);
    let rs = (cos_theta - root) / (cos_theta + root);

    (rp.norm_sqr(), rs.norm_sqr())
}

/// What to do when neither the shading nor the geometric normal faces the ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecularConfig {
    /// Flip the normal and continue; otherwise the path ends
    pub flip_negative_normals: bool,
    /// Log the first occurrence
    pub warn_negative_cosine: bool,
}

impl Default for SpecularConfig {
    fn default() -> Self {
        Self {
            flip_negative_normals: true,
            warn_negative_cosine: true,
        }
    }
}

/// Perfect mirror reflection weighted by the unpolarized Fresnel reflectance.
#[derive(Debug, Default)]
pub struct SpecularModel {
    config: SpecularConfig,
    warned: AtomicBool,
}

impl SpecularModel {
    pub fn new(config: SpecularConfig) -> Self {
        Self {
            config,
            warned: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SpecularConfig {
        &self.config
    }

    /// Incidence cosine for unit `incident`, or `None` when the path ends.
    ///
    /// Interpolated normals can face away from the ray near silhouettes; the
    /// geometric normal is tried next, then the configured policy applies.
    fn incidence_cosine(&self, incident: Vec3, normal: Vec3, flat_normal: Vec3) -> Option<f32> {
        let cos_theta = -incident.dot(normal);
        if cos_theta > 1.0 {
            return Some(1.0);
        }
        if cos_theta >= 0.0 {
            return Some(cos_theta);
        }

        let cos_theta = -incident.dot(flat_normal);
        if cos_theta >= 0.0 {
            return Some(cos_theta.min(1.0));
        }

        if self.config.warn_negative_cosine && !self.warned.swap(true, Ordering::Relaxed) {
            log::warn!("Negative cosine of incidence angle {cos_theta} with shading and geometric normal");
        }

        if self.config.flip_negative_normals {
            Some((-cos_theta).min(1.0))
        } else {
            None
        }
    }
}

impl MaterialModel for SpecularModel {
    fn kind(&self) -> MaterialModelKind {
        MaterialModelKind::Specular
    }

    fn bounce(
        &self,
        ray: &Ray,
        intersection: &Intersection<'_>,
        _sensor: &dyn Sensor,
        _renderer: &Renderer<'_>,
    ) -> RenderResult<Vec<Ray>> {
        let missing_material = || RenderError::MissingMaterial { id: ray.id };
        let material = intersection.material().ok_or_else(missing_material)?;
        let normal = intersection.normal().ok_or_else(missing_material)?;
        let flat_normal = intersection.flat_normal().ok_or_else(missing_material)?;
        // Zero vertex normals interpolate to NaN
        let normal = if normal.is_finite() { normal } else { flat_normal };

        let incident = ray.direction().normalize();
        let Some(cos_theta) = self.incidence_cosine(incident, normal, flat_normal) else {
            return Ok(Vec::new());
        };

        let reflected = reflect(incident, normal);
        let child = ray.bounce(intersection.point(), reflected, intersection.separation());

        let spectrum = child.spectrum().ok_or(RenderError::MissingPayload {
            id: ray.id,
            found: ray.payload.name(),
        })?;

        {
            let mut spectrum = spectrum.lock();
            for (wavelength, radiance) in spectrum.iter_mut() {
                let (n, k) = material.refractive_index(wavelength)?;
                let (rp, rs) = fresnel_reflection(Complex32::new(n, k), cos_theta);
                *radiance *= (rp + rs) / 2.0;
            }
        }

        Ok(vec![child])
    }
}
