//! Complex refractive index data.
//!
//! A material's index of refraction `n + ik` is stored per temperature. Each
//! temperature record may carry tabulated `n` and `k` curves over wavelength
//! and a Lorentz oscillator model covering its own wavelength range; tables
//! win where both apply.

use std::path::Path;

use num_complex::Complex64;
use serde::Deserialize;
use spekt_math::constants::SPEED_OF_LIGHT;
use spekt_math::{Interpolation, InterpolationKind};

use crate::error::{CoreError, CoreResult};

const IOR_DATA_EXTENSION: &str = "OpenMaterial_ior_data";
const TITLE_POINTER: &str = "/asset/extensions/OpenMaterial_asset_info/title";

/// Sum of Lorentz oscillators describing the dielectric function.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LorentzModel {
    /// Wavelength range `[min, max]` (meters) where the model is valid
    pub range: [f32; 2],

    /// `[plasma_frequency², resonance_term, damping]` per oscillator
    pub oscillators: Vec<[f64; 3]>,
}

impl LorentzModel {
    fn contains(&self, wavelength: f32) -> bool {
        self.range[0] <= wavelength && wavelength <= self.range[1]
    }

    /// `(n, k)` at `wavelength` from `eps(w) = 1 + sum wp² / (w1 - i w gamma - w²)`.
    pub fn refractive_index(&self, wavelength: f32) -> (f32, f32) {
        let omega = 2.0 * std::f64::consts::PI * SPEED_OF_LIGHT / f64::from(wavelength);
        let omega2 = omega * omega;

        let eps = self.oscillators.iter().fold(
            Complex64::new(1.0, 0.0),
            |eps, &[plasma2, resonance, damping]| {
                eps + plasma2 / Complex64::new(resonance - omega2, -omega * damping)
            },
        );

        let s = eps.re.hypot(eps.im);
        let n = (0.5 * (s + eps.re)).sqrt();
        let k = (0.5 * (s - eps.re)).max(0.0).sqrt();
        (n as f32, k as f32)
    }
}

/// Refractive index data for a single temperature.
#[derive(Debug, Clone)]
pub struct IorRecord {
    pub temperature: f32,
    n: Interpolation,
    k: Interpolation,
    /// Overlap of the `n` and `k` tables, if both exist
    table_range: Option<(f32, f32)>,
    lorentz: Option<LorentzModel>,
}

impl IorRecord {
    /// Record from tabulated `(wavelength, n)` and `(wavelength, k)` samples.
    pub fn from_tables(
        temperature: f32,
        n: impl IntoIterator<Item = (f32, f32)>,
        k: impl IntoIterator<Item = (f32, f32)>,
    ) -> Self {
        let n = Interpolation::from_points(InterpolationKind::Linear, n);
        let k = Interpolation::from_points(InterpolationKind::Linear, k);

        let table_range = match (n.x_min(), n.x_max(), k.x_min(), k.x_max()) {
            (Some(n_min), Some(n_max), Some(k_min), Some(k_max)) => {
                Some((n_min.max(k_min), n_max.min(k_max)))
            }
            _ => None,
        };

        Self {
            temperature,
            n,
            k,
            table_range,
            lorentz: None,
        }
    }

    pub fn with_lorentz(mut self, lorentz: LorentzModel) -> Self {
        self.lorentz = Some(lorentz);
        self
    }

    fn refractive_index(&self, wavelength: f32) -> CoreResult<Option<(f32, f32)>> {
        if let Some((min, max)) = self.table_range {
            if min <= wavelength && wavelength <= max {
                return Ok(Some((self.n.get(wavelength)?, self.k.get(wavelength)?)));
            }
        }

        Ok(self
            .lorentz
            .as_ref()
            .filter(|lorentz| lorentz.contains(wavelength))
            .map(|lorentz| lorentz.refractive_index(wavelength)))
    }

    /// Smallest and largest wavelength covered by either model.
    fn domain(&self) -> Option<(f32, f32)> {
        let lorentz = self.lorentz.as_ref().map(|l| (l.range[0], l.range[1]));
        match (self.table_range, lorentz) {
            (Some(a), Some(b)) => Some((a.0.min(b.0), a.1.max(b.1))),
            (a, b) => a.or(b),
        }
    }
}

/// Complex refractive index of a material over wavelength and temperature.
#[derive(Debug, Clone, Default)]
pub struct MaterialIor {
    pub title: String,
    /// Sorted by temperature
    records: Vec<IorRecord>,
}

#[derive(Deserialize)]
struct IorDocument {
    #[serde(default)]
    title: Option<String>,
    data: Vec<IorEntry>,
}

#[derive(Deserialize)]
struct IorEntry {
    temperature: f32,
    #[serde(default)]
    n: Option<Vec<(f32, f32)>>,
    #[serde(default)]
    k: Option<Vec<(f32, f32)>>,
    #[serde(default)]
    lorentz: Option<LorentzModel>,
}

impl MaterialIor {
    /// Data set from explicit records.
    pub fn new(title: impl Into<String>, records: Vec<IorRecord>) -> CoreResult<Self> {
        if records.is_empty() {
            return Err(CoreError::InvalidIor("no temperature records".into()));
        }
        if let Some(record) = records.iter().find(|r| r.temperature.is_nan() || r.temperature < 0.0) {
            return Err(CoreError::InvalidIor(format!(
                "temperature must be non-negative, got {}",
                record.temperature
            )));
        }

        let mut records = records;
        records.sort_by(|a, b| a.temperature.total_cmp(&b.temperature));

        Ok(Self {
            title: title.into(),
            records,
        })
    }

    /// Wavelength-independent index `n + ik` between 100 nm and 100 µm.
    pub fn constant(n: f32, k: f32) -> Self {
        let range = [100e-9, 100e-6];
        Self {
            title: format!("constant n={n} k={k}"),
            records: vec![IorRecord::from_tables(
                300.0,
                range.map(|wavelength| (wavelength, n)),
                range.map(|wavelength| (wavelength, k)),
            )],
        }
    }

    /// Parse IOR JSON.
    ///
    /// Accepts either a bare `{ "data": [...] }` document or a glTF-style
    /// document carrying the data under `extensions.OpenMaterial_ior_data`.
    /// Each data entry has a `temperature`, optional `n` and `k` tables of
    /// `[wavelength, value]` pairs and an optional `lorentz` model.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }

    /// Same as [`from_json_str`](Self::from_json_str) for an already parsed document.
    pub fn from_json_value(value: &serde_json::Value) -> CoreResult<Self> {
        let title = value
            .pointer(TITLE_POINTER)
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        let document = match value.get("extensions").and_then(|e| e.get(IOR_DATA_EXTENSION)) {
            Some(data) => IorDocument::deserialize(data)?,
            None => IorDocument::deserialize(value)?,
        };

        let records = document
            .data
            .into_iter()
            .map(|entry| {
                let record = match (entry.n, entry.k) {
                    (Some(n), Some(k)) => IorRecord::from_tables(entry.temperature, n, k),
                    _ => IorRecord::from_tables(entry.temperature, Vec::new(), Vec::new()),
                };
                match entry.lorentz {
                    Some(lorentz) => record.with_lorentz(lorentz),
                    None => record,
                }
            })
            .collect();

        Self::new(title.or(document.title).unwrap_or_default(), records)
    }

    pub fn from_path(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let ior = Self::from_json_str(&json)?;
        log::debug!("Loaded IOR '{}' from {}", ior.title, path.display());
        Ok(ior)
    }

    pub fn records(&self) -> &[IorRecord] {
        &self.records
    }

    /// Record with the temperature closest to `temperature` (lower on ties).
    fn closest(&self, temperature: f32) -> Option<&IorRecord> {
        self.records.iter().fold(None, |best: Option<&IorRecord>, record| match best {
            Some(best) if (best.temperature - temperature).abs() <= (record.temperature - temperature).abs() => {
                Some(best)
            }
            _ => Some(record),
        })
    }

    /// `(n, k)` at `wavelength` (meters) for the record closest to `temperature` (kelvin).
    ///
    /// Tabulated data is linearly interpolated; outside the tables the Lorentz
    /// model is used if it covers the wavelength. Anything else is an error.
    pub fn refractive_index(&self, temperature: f32, wavelength: f32) -> CoreResult<(f32, f32)> {
        let out_of_domain = CoreError::IorOutOfDomain {
            wavelength,
            temperature,
        };
        if temperature.is_nan() || temperature < 0.0 {
            return Err(out_of_domain);
        }

        self.closest(temperature)
            .map(|record| record.refractive_index(wavelength))
            .transpose()?
            .flatten()
            .ok_or(out_of_domain)
    }

    /// Wavelength range covered at `temperature`.
    pub fn domain(&self, temperature: f32) -> Option<(f32, f32)> {
        self.closest(temperature).and_then(IorRecord::domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLD_GLTF: &str = r#"{
        "asset": {
            "version": "2.0",
            "extensions": { "OpenMaterial_asset_info": { "title": "IOR gold", "creator": "test" } }
        },
        "extensions": {
            "OpenMaterial_ior_data": {
                "data": [
                    {
                        "temperature": 400,
                        "n": [[4e-7, 2.0], [8e-7, 3.0]],
                        "k": [[4e-7, 1.0], [8e-7, 1.0]]
                    },
                    {
                        "temperature": 300,
                        "n": [[8e-7, 0.2], [2e-7, 1.4], [6e-7, 0.4]],
                        "k": [[3e-7, 2.0], [9e-7, 6.0]]
                    }
                ]
            }
        }
    }"#;

    #[test]
    fn test_interpolates_tabulated_data() {
        let ior = MaterialIor::from_json_str(GOLD_GLTF).unwrap();
        assert_eq!(ior.title, "IOR gold");
        assert_eq!(ior.records()[0].temperature, 300.0);

        let (n, k) = ior.refractive_index(300.0, 7e-7).unwrap();
        assert!((n - 0.3).abs() < 1e-5);
        assert!((k - 14.0 / 3.0).abs() < 1e-5);

        // Domain is the overlap of the n and k tables
        let (min, max) = ior.domain(300.0).unwrap();
        assert!((min - 3e-7).abs() < 1e-12);
        assert!((max - 8e-7).abs() < 1e-12);
        assert!(matches!(
            ior.refractive_index(300.0, 2.5e-7),
            Err(CoreError::IorOutOfDomain { .. })
        ));
    }

    #[test]
    fn test_closest_temperature_wins() {
        let ior = MaterialIor::from_json_str(GOLD_GLTF).unwrap();
        let (n, _) = ior.refractive_index(390.0, 6e-7).unwrap();
        assert!((n - 2.5).abs() < 1e-5);
        let (n, _) = ior.refractive_index(0.0, 6e-7).unwrap();
        assert!((n - 0.4).abs() < 1e-5);
        assert!(ior.refractive_index(-1.0, 6e-7).is_err());
    }

    #[test]
    fn test_bare_document_and_invalid_input() {
        let bare = r#"{ "title": "glass", "data": [ { "temperature": 293, "n": [[1e-7, 1.5], [1e-5, 1.5]], "k": [[1e-7, 0], [1e-5, 0]] } ] }"#;
        let ior = MaterialIor::from_json_str(bare).unwrap();
        assert_eq!(ior.title, "glass");
        assert_eq!(ior.refractive_index(293.0, 5e-7).unwrap(), (1.5, 0.0));

        assert!(matches!(
            MaterialIor::from_json_str(r#"{ "data": [] }"#),
            Err(CoreError::InvalidIor(_))
        ));
        assert!(matches!(
            MaterialIor::from_json_str(r#"{ "data": [ { "temperature": -3 } ] }"#),
            Err(CoreError::InvalidIor(_))
        ));
        assert!(matches!(MaterialIor::from_json_str("{"), Err(CoreError::Json(_))));
    }

    #[test]
    fn test_lorentz_model_outside_tables() {
        // Drude metal: resonance at zero, plasma frequency 1.4e16 rad/s
        let json = r#"{ "data": [ {
            "temperature": 300,
            "n": [[4e-7, 0.5], [5e-7, 0.5]],
            "k": [[4e-7, 4.0], [5e-7, 4.0]],
            "lorentz": { "range": [1e-7, 1e-5], "oscillators": [[1.96e32, 0.0, 1.0e14]] }
        } ] }"#;
        let ior = MaterialIor::from_json_str(json).unwrap();

        // Tables take precedence inside their range
        assert_eq!(ior.refractive_index(300.0, 4.5e-7).unwrap(), (0.5, 4.0));

        let (n, k) = ior.refractive_index(300.0, 1e-6).unwrap();
        let lorentz = LorentzModel {
            range: [1e-7, 1e-5],
            oscillators: vec![[1.96e32, 0.0, 1.0e14]],
        };
        assert_eq!((n, k), lorentz.refractive_index(1e-6));
        // Below the plasma frequency a metal has k >> n
        assert!(k > n);
        assert!(n > 0.0);
        let (min, max) = ior.domain(300.0).unwrap();
        assert!((min - 1e-7).abs() < 1e-12);
        assert!((max - 1e-5).abs() < 1e-10);
        assert!(ior.refractive_index(300.0, 2e-5).is_err());
    }

    #[test]
    fn test_lorentz_without_oscillators_is_vacuum() {
        let lorentz = LorentzModel {
            range: [1e-7, 1e-5],
            oscillators: Vec::new(),
        };
        let (n, k) = lorentz.refractive_index(5e-7);
        assert!((n - 1.0).abs() < 1e-6);
        assert!(k.abs() < 1e-6);
    }

    #[test]
    fn test_constant_ior() {
        let ior = MaterialIor::constant(1.5, 0.1);
        let (n, k) = ior.refractive_index(1000.0, 550e-9).unwrap();
        assert!((n - 1.5).abs() < 1e-6);
        assert!((k - 0.1).abs() < 1e-6);
        assert!(ior.refractive_index(300.0, 50e-9).is_err());
    }
}
