//! One-dimensional interpolation over tabulated samples.

use thiserror::Error;

/// Errors from querying an [`Interpolation`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    #[error("no points have been added")]
    Empty,

    #[error("at least two points needed for linear interpolation")]
    SinglePoint,

    #[error("value {0} is below interpolation range")]
    BelowRange(f32),

    #[error("value {0} is above interpolation range")]
    AboveRange(f32),
}

/// How values between samples are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationKind {
    /// Value of the sample to the left.
    Step,
    /// Value of the closer sample (left on ties).
    Nearest,
    #[default]
    Linear,
}

/// Sorted `(x, y)` samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interpolation {
    points: Vec<(f32, f32)>,
    kind: InterpolationKind,
}

impl Interpolation {
    pub fn new(kind: InterpolationKind) -> Self {
        Self {
            points: Vec::new(),
            kind,
        }
    }

    /// Build from unsorted points.
    pub fn from_points<I: IntoIterator<Item = (f32, f32)>>(kind: InterpolationKind, points: I) -> Self {
        let mut interpolation = Self::new(kind);
        interpolation.points.extend(points);
        interpolation.sort();
        interpolation
    }

    pub fn kind(&self) -> InterpolationKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: InterpolationKind) {
        self.kind = kind;
    }

    /// Add a point. Call [`sort`](Self::sort) before querying if points
    /// were added out of order.
    pub fn add_point(&mut self, x: f32, y: f32) {
        self.points.push((x, y));
    }

    pub fn sort(&mut self) {
        self.points.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn x_min(&self) -> Option<f32> {
        self.points.first().map(|p| p.0)
    }

    pub fn x_max(&self) -> Option<f32> {
        self.points.last().map(|p| p.0)
    }

    /// True if `x` lies within the sampled range.
    pub fn contains(&self, x: f32) -> bool {
        match (self.x_min(), self.x_max()) {
            (Some(lo), Some(hi)) => lo <= x && x <= hi,
            _ => false,
        }
    }

    /// Interpolated value at `x`.
    pub fn get(&self, x: f32) -> Result<f32, InterpolationError> {
        let (lo, hi) = match (self.points.first(), self.points.last()) {
            (Some(lo), Some(hi)) => (lo.0, hi.0),
            _ => return Err(InterpolationError::Empty),
        };
        if self.points.len() == 1 && self.kind == InterpolationKind::Linear {
            return Err(InterpolationError::SinglePoint);
        }
        if x < lo {
            return Err(InterpolationError::BelowRange(x));
        }
        if x > hi {
            return Err(InterpolationError::AboveRange(x));
        }
        Ok(self.lookup(x))
    }

    /// Interpolated value at `x`, or `fallback` outside the sampled range.
    pub fn get_or(&self, x: f32, fallback: f32) -> f32 {
        self.get(x).unwrap_or(fallback)
    }

    fn lookup(&self, x: f32) -> f32 {
        if self.points.len() == 1 {
            return self.points[0].1;
        }

        // Binary search for the bracketing pair
        let mut left = 0;
        let mut right = self.points.len() - 1;
        while right - left > 1 {
            let middle = (left + right) / 2;
            if x < self.points[middle].0 {
                right = middle;
            } else {
                left = middle;
            }
        }

        let (x0, y0) = self.points[left];
        let (x1, y1) = self.points[right];
        match self.kind {
            InterpolationKind::Linear => y0 + (x - x0) * (y1 - y0) / (x1 - x0),
            InterpolationKind::Step => y0,
            InterpolationKind::Nearest => {
                if (x1 - x) < (x - x0) {
                    y1
                } else {
                    y0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_interpolation() {
        let interp = Interpolation::from_points(InterpolationKind::Linear, [(2.0, 20.0), (0.0, 0.0), (1.0, 10.0)]);
        assert!((interp.get(0.5).unwrap() - 5.0).abs() < 1e-6);
        assert!((interp.get(1.75).unwrap() - 17.5).abs() < 1e-6);
        assert_eq!(interp.get(2.0).unwrap(), 20.0);
        assert_eq!(interp.x_min(), Some(0.0));
        assert_eq!(interp.x_max(), Some(2.0));
    }

    #[test]
    fn test_step_and_nearest() {
        let points = [(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)];
        let step = Interpolation::from_points(InterpolationKind::Step, points);
        let nearest = Interpolation::from_points(InterpolationKind::Nearest, points);

        assert_eq!(step.get(0.9).unwrap(), 1.0);
        assert_eq!(step.get(1.1).unwrap(), 2.0);
        assert_eq!(nearest.get(0.4).unwrap(), 1.0);
        assert_eq!(nearest.get(0.6).unwrap(), 2.0);
        assert_eq!(nearest.get(1.5).unwrap(), 2.0);
    }

    #[test]
    fn test_interpolation_errors() {
        let empty = Interpolation::new(InterpolationKind::Linear);
        assert_eq!(empty.get(0.0), Err(InterpolationError::Empty));
        assert!(!empty.contains(0.0));

        let mut single = Interpolation::new(InterpolationKind::Linear);
        single.add_point(1.0, 5.0);
        assert_eq!(single.get(1.0), Err(InterpolationError::SinglePoint));
        single.set_kind(InterpolationKind::Step);
        assert_eq!(single.get(1.0), Ok(5.0));

        let interp = Interpolation::from_points(InterpolationKind::Linear, [(0.0, 0.0), (1.0, 1.0)]);
        assert_eq!(interp.get(-0.5), Err(InterpolationError::BelowRange(-0.5)));
        assert_eq!(interp.get(1.5), Err(InterpolationError::AboveRange(1.5)));
        assert_eq!(interp.get_or(1.5, -1.0), -1.0);
    }
}
