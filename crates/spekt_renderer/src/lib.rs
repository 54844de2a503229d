//! Spekt renderer - specular ray tracing with spectral Fresnel weights.
//!
//! A sensor hands out primary rays, the renderer traces each one against a
//! placed geometry asset, and the material model decides how rays continue
//! after a hit. Rays that escape the scene pick up the background and are
//! reported back to the sensor.

mod background;
mod camera;
mod error;
mod material_model;
mod renderer;
mod sensor;
mod tonemap;

pub use background::{Background, FatalBackground, HdrBackground};
pub use camera::{Camera, CameraConfig};
pub use error::{RenderError, RenderResult};
pub use material_model::{fresnel_reflection, reflect, MaterialModel, MaterialModelKind, SpecularConfig, SpecularModel};
pub use renderer::{RenderConfig, Renderer};
pub use sensor::Sensor;
pub use tonemap::ToneMapping;
