//! Three-wavelength RGB spectrum.

/// Wavelength of the red sample in meters.
pub const WAVELENGTH_RED: f32 = 650e-9;
/// Wavelength of the green sample in meters.
pub const WAVELENGTH_GREEN: f32 = 510e-9;
/// Wavelength of the blue sample in meters.
pub const WAVELENGTH_BLUE: f32 = 440e-9;

pub const RGB_WAVELENGTHS: [f32; 3] = [WAVELENGTH_RED, WAVELENGTH_GREEN, WAVELENGTH_BLUE];

/// Radiance sampled at red (650nm), green (510nm) and blue (440nm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumRgb {
    radiance: [f32; 3],
}

impl SpectrumRgb {
    pub fn new(red: f32, green: f32, blue: f32) -> Self {
        Self {
            radiance: [red, green, blue],
        }
    }

    /// Component-wise multiplication.
    pub fn multiply(&mut self, red: f32, green: f32, blue: f32) {
        self.radiance[0] *= red;
        self.radiance[1] *= green;
        self.radiance[2] *= blue;
    }

    pub fn to_rgb(&self) -> [f32; 3] {
        self.radiance
    }

    /// Mean radiance over the three samples.
    pub fn mean(&self) -> f32 {
        (self.radiance[0] + self.radiance[1] + self.radiance[2]) / 3.0
    }

    pub fn len(&self) -> usize {
        self.radiance.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// `(wavelength, radiance)` of sample `i`.
    pub fn get(&self, i: usize) -> (f32, f32) {
        (RGB_WAVELENGTHS[i], self.radiance[i])
    }

    /// Iterate over `(wavelength, &mut radiance)`.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (f32, &mut f32)> {
        RGB_WAVELENGTHS.into_iter().zip(self.radiance.iter_mut())
    }
}
