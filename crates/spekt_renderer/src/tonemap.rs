//! Tone mapping for the final image.

/// Maps radiance `x >= 0` into `[0, 1)` with `x / (alpha + x)`.
///
/// Smaller `alpha` brightens the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneMapping {
    pub alpha: f32,
}

impl Default for ToneMapping {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

impl ToneMapping {
    pub fn new(alpha: f32) -> Self {
        Self { alpha }
    }

    #[inline]
    pub fn apply(&self, x: f32) -> f32 {
        x / (self.alpha + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_mapping_curve() {
        let tone = ToneMapping::default();
        assert_eq!(tone.apply(0.0), 0.0);
        assert!((tone.apply(1.0) - 0.5).abs() < 1e-6);
        assert!(tone.apply(1e6) < 1.0);

        let bright = ToneMapping::new(0.1);
        assert!(bright.apply(0.5) > tone.apply(0.5));
    }
}
