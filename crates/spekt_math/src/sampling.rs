//! Warping of uniform samples.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::Vec2;

/// Map a point of the unit square to the unit disk (Shirley-Chiu concentric mapping).
///
/// `u1`, `u2` are in `[0, 1)`. Preserves relative areas, so uniform input gives
/// uniform points on the disk.
pub fn sample_concentric_disk(u1: f32, u2: f32) -> Vec2 {
    let offset = Vec2::new(2.0 * u1 - 1.0, 2.0 * u2 - 1.0);
    if offset == Vec2::ZERO {
        return Vec2::ZERO;
    }

    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, FRAC_PI_4 * (offset.y / offset.x))
    } else {
        (offset.y, FRAC_PI_2 - FRAC_PI_4 * (offset.x / offset.y))
    };

    r * Vec2::new(theta.cos(), theta.sin())
}
