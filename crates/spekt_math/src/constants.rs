//! Physical constants (SI units unless noted).

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Reduced Planck constant (J s)
pub const HBAR: f64 = 1.0545718e-34;

/// Reduced Planck constant (eV s)
pub const HBAR_EV: f64 = 6.582119514e-16;

/// Boltzmann constant (J/K)
pub const BOLTZMANN: f64 = 1.38064852e-23;

/// Elementary charge (C)
pub const ELEMENTARY_CHARGE: f64 = 1.60217662e-19;
