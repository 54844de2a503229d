//! Spekt math - value types shared by the scene graph and the renderer.
//!
//! Everything here is single precision (`f32`) and built on glam.

// Re-export glam for convenience
pub use glam::*;

mod bbox;
pub mod constants;
mod interpolation;
mod ray;
mod sampling;
mod spectrum;
mod transformation;

pub use bbox::BBox;
pub use interpolation::{Interpolation, InterpolationError, InterpolationKind};
pub use ray::{Payload, PolarizedSpectrumRgb, Ray, RayTube, SharedSpectrum};
pub use sampling::sample_concentric_disk;
pub use spectrum::{SpectrumRgb, RGB_WAVELENGTHS, WAVELENGTH_BLUE, WAVELENGTH_GREEN, WAVELENGTH_RED};
pub use transformation::Transformation;
