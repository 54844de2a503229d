//! Surface materials.

use std::sync::Arc;

use crate::error::CoreResult;
use crate::ior::MaterialIor;

/// A physical material: refractive index data evaluated at a fixed temperature.
#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,

    /// Temperature in kelvin used for every index lookup
    pub temperature: f32,

    /// Shared between materials referencing the same data file
    pub ior: Arc<MaterialIor>,
}

impl Material {
    pub fn new(name: impl Into<String>, temperature: f32, ior: Arc<MaterialIor>) -> Self {
        Self {
            name: name.into(),
            temperature,
            ior,
        }
    }

    /// Complex index of refraction `(n, k)` at `wavelength` (meters).
    pub fn refractive_index(&self, wavelength: f32) -> CoreResult<(f32, f32)> {
        self.ior.refractive_index(self.temperature, wavelength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_material_uses_its_temperature() {
        let material = Material::new("glass", 300.0, Arc::new(MaterialIor::constant(1.5, 0.0)));
        assert_eq!(material.refractive_index(500e-9).unwrap(), (1.5, 0.0));

        let frozen = Material::new("glass", -5.0, material.ior.clone());
        assert!(matches!(
            frozen.refractive_index(500e-9),
            Err(CoreError::IorOutOfDomain { temperature, .. }) if temperature == -5.0
        ));
    }
}
