//! Ray-triangle intersection.
//!
//! Uses the Möller-Trumbore algorithm.

use spekt_math::Vec3;

/// Result of a successful ray-triangle test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Ray parameter of the hit point
    pub t: f32,
    /// Barycentric coordinates: hit = (1-u-v) V0 + u V1 + v V2
    pub u: f32,
    pub v: f32,
    /// +1 if the ray hits the front face (against `(V1-V0) x (V2-V0)`), -1 otherwise
    pub orientation: i8,
}

/// Intersect the ray `origin + t * direction` with triangle `(v0, v1, v2)`.
///
/// Returns `None` when the ray is parallel to the triangle, misses it, the
/// hit lies outside `[tmin, tmax]`, or (with `cull_back_faces`) the triangle
/// is seen from behind.
#[allow(clippy::too_many_arguments)]
pub fn intersect_triangle(
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    origin: Vec3,
    direction: Vec3,
    tmin: f32,
    tmax: f32,
    cull_back_faces: bool,
) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let s = origin - v0;

    let p = direction.cross(edge2);
    let det = p.dot(edge1);

    if det == 0.0 {
        return None;
    }
    if cull_back_faces && det < 0.0 {
        return None;
    }

    let u = p.dot(s) / det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = q.dot(direction) / det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = q.dot(edge2) / det;
    if t < tmin || t > tmax {
        return None;
    }

    Some(TriangleHit {
        t,
        u,
        v,
        orientation: if det > 0.0 { 1 } else { -1 },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Triangle in the plane z = -1, front face towards +z
    const V0: Vec3 = Vec3::new(-1.0, -1.0, -1.0);
    const V1: Vec3 = Vec3::new(1.0, -1.0, -1.0);
    const V2: Vec3 = Vec3::new(0.0, 1.0, -1.0);

    #[test]
    fn test_triangle_hit() {
        let hit = intersect_triangle(V0, V1, V2, Vec3::ZERO, -Vec3::Z, 0.0, f32::INFINITY, true)
            .expect("ray through the centre must hit");
        assert!((hit.t - 1.0).abs() < 1e-6);
        assert_eq!(hit.orientation, 1);

        // Barycentrics reproduce the hit point
        let p = (1.0 - hit.u - hit.v) * V0 + hit.u * V1 + hit.v * V2;
        assert!((p - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_triangle_matches_analytic_solution() {
        // Aim at known barycentric coordinates from a fixed origin
        let origin = Vec3::new(0.3, -0.2, 2.0);
        for (u, v) in [(0.1, 0.1), (0.25, 0.5), (0.7, 0.2), (0.05, 0.9)] {
            let target = (1.0 - u - v) * V0 + u * V1 + v * V2;
            let direction = target - origin;

            let hit = intersect_triangle(V0, V1, V2, origin, direction, 0.0, f32::INFINITY, true)
                .expect("aimed ray must hit");
            assert!((hit.t - 1.0).abs() < 1e-5);
            assert!((hit.u - u).abs() < 1e-5);
            assert!((hit.v - v).abs() < 1e-5);
            assert!(hit.u >= 0.0 && hit.v >= 0.0 && hit.u + hit.v <= 1.0);
        }
    }

    #[test]
    fn test_triangle_miss() {
        // Pointing away
        assert!(intersect_triangle(V0, V1, V2, Vec3::ZERO, Vec3::Z, 0.0, f32::INFINITY, true).is_none());
        // Outside the edges
        assert!(intersect_triangle(V0, V1, V2, Vec3::new(2.0, 0.0, 0.0), -Vec3::Z, 0.0, f32::INFINITY, true).is_none());
        assert!(intersect_triangle(V0, V1, V2, Vec3::new(0.0, -2.0, 0.0), -Vec3::Z, 0.0, f32::INFINITY, true).is_none());
        // Parallel
        assert!(intersect_triangle(V0, V1, V2, Vec3::ZERO, Vec3::X, 0.0, f32::INFINITY, true).is_none());
        // Beyond tmax
        assert!(intersect_triangle(V0, V1, V2, Vec3::ZERO, -Vec3::Z, 0.0, 0.5, true).is_none());
    }

    #[test]
    fn test_triangle_back_face_culling() {
        let origin = Vec3::new(0.0, 0.0, -3.0);
        assert!(intersect_triangle(V0, V1, V2, origin, Vec3::Z, 0.0, f32::INFINITY, true).is_none());

        let hit = intersect_triangle(V0, V1, V2, origin, Vec3::Z, 0.0, f32::INFINITY, false)
            .expect("back face hit without culling");
        assert_eq!(hit.orientation, -1);
        assert!((hit.t - 2.0).abs() < 1e-6);
    }
}
