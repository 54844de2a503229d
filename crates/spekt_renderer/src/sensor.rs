//! Sensors generate primary rays and collect their results.

use spekt_core::Intersection;
use spekt_math::Ray;

use crate::error::RenderResult;
use crate::material_model::MaterialModelKind;
use crate::renderer::Renderer;

/// Source of primary rays and sink for finished ones.
///
/// The renderer asks for batches until an empty one comes back, tracing each
/// batch in parallel. Reporting therefore happens from several threads at
/// once and must only need `&self`.
pub trait Sensor: Send + Sync {
    /// Next batch of primary rays; empty when the sensor is done.
    fn primary_rays(&mut self) -> Vec<Ray>;

    /// Called once every ray of `rays` has been traced.
    fn cleanup_primary_rays(&mut self, _rays: &[Ray]) {}

    /// Accumulate the final payload of a traced ray.
    fn report_primary_ray(&self, ray: &Ray) -> RenderResult<()>;

    fn report_primary_rays(&self, rays: &[Ray]) -> RenderResult<()> {
        for ray in rays {
            self.report_primary_ray(ray)?;
        }
        Ok(())
    }

    /// Whether results of the given material model can be recorded.
    fn is_compatible(&self, kind: MaterialModelKind) -> bool;

    /// Whether the renderer should call [`Sensor::hook`] for every traced ray.
    fn call_sensor(&self) -> bool {
        false
    }

    /// Per-ray callback with the raw (possibly missed) intersection.
    ///
    /// Returning `false` stops the renderer from processing the ray further.
    fn hook(&self, _renderer: &Renderer<'_>, _ray: &mut Ray, _intersection: &Intersection<'_>) -> RenderResult<bool> {
        Ok(true)
    }
}
