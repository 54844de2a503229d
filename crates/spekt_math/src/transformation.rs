//! Affine transformations with a cached inverse.
//!
//! f(x) = M x + d. Rays, points and vectors go local -> world through M and
//! world -> local through the cached inverse; normals use the inverse
//! transpose.

use crate::{Mat3, Quat, Ray, Vec3};

/// Affine map `f(x) = m * x + d` with `m_inv = m^-1` cached.
///
/// `m` must be invertible; building one from a degenerate scale is a caller
/// error.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transformation {
    m: Mat3,
    m_inv: Mat3,
    d: Vec3,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transformation {
    pub const IDENTITY: Transformation = Transformation {
        m: Mat3::IDENTITY,
        m_inv: Mat3::IDENTITY,
        d: Vec3::ZERO,
    };

    /// Create a transformation from a matrix and a translation; the inverse is computed.
    pub fn new(m: Mat3, d: Vec3) -> Self {
        Self {
            m,
            m_inv: m.inverse(),
            d,
        }
    }

    /// Create a transformation whose inverse is already known.
    pub fn with_inverse(m: Mat3, m_inv: Mat3, d: Vec3) -> Self {
        Self { m, m_inv, d }
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn translation(d: Vec3) -> Self {
        Self::with_inverse(Mat3::IDENTITY, Mat3::IDENTITY, d)
    }

    /// Rotation around the x axis by `phi` radians.
    pub fn rotation_x(phi: f32) -> Self {
        Self::orthogonal(Mat3::from_rotation_x(phi))
    }

    pub fn rotation_y(phi: f32) -> Self {
        Self::orthogonal(Mat3::from_rotation_y(phi))
    }

    pub fn rotation_z(phi: f32) -> Self {
        Self::orthogonal(Mat3::from_rotation_z(phi))
    }

    /// Rotation around `axis` (need not be unit length) by `phi` radians.
    pub fn rotation(axis: Vec3, phi: f32) -> Self {
        Self::orthogonal(Mat3::from_axis_angle(axis.normalize(), phi))
    }

    /// Rotation given by a quaternion (normalized first).
    pub fn from_quaternion(q: Quat) -> Self {
        Self::orthogonal(Mat3::from_quat(q.normalize()))
    }

    /// Rotation about x, then y, then z (radians).
    pub fn from_euler(x: f32, y: f32, z: f32) -> Self {
        Self::rotation_z(z).apply(&Self::rotation_y(y).apply(&Self::rotation_x(x)))
    }

    pub fn scaling(s: Vec3) -> Self {
        Self::with_inverse(Mat3::from_diagonal(s), Mat3::from_diagonal(s.recip()), Vec3::ZERO)
    }

    /// Scale, then rotate, then translate.
    pub fn from_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let r = Mat3::from_quat(rotation.normalize());
        let s = Mat3::from_diagonal(scale);
        let s_inv = Mat3::from_diagonal(scale.recip());
        Self::with_inverse(r * s, s_inv * r.transpose(), translation)
    }

    fn orthogonal(m: Mat3) -> Self {
        Self::with_inverse(m, m.transpose(), Vec3::ZERO)
    }

    pub fn matrix(&self) -> Mat3 {
        self.m
    }

    pub fn inverse_matrix(&self) -> Mat3 {
        self.m_inv
    }

    pub fn translation_part(&self) -> Vec3 {
        self.d
    }

    /// The inverse map.
    pub fn inverse(&self) -> Self {
        Self::with_inverse(self.m_inv, self.m, -(self.m_inv * self.d))
    }

    /// Composition "first `other`, then `self`".
    pub fn apply(&self, other: &Transformation) -> Transformation {
        Self::with_inverse(self.m * other.m, other.m_inv * self.m_inv, self.d + self.m * other.d)
    }

    pub fn point_to_world(&self, p: Vec3) -> Vec3 {
        self.m * p + self.d
    }

    pub fn point_to_local(&self, p: Vec3) -> Vec3 {
        self.m_inv * (p - self.d)
    }

    pub fn vector_to_world(&self, v: Vec3) -> Vec3 {
        self.m * v
    }

    pub fn vector_to_local(&self, v: Vec3) -> Vec3 {
        self.m_inv * v
    }

    pub fn normal_to_world(&self, n: Vec3) -> Vec3 {
        (self.m_inv.transpose() * n).normalize()
    }

    pub fn normal_to_local(&self, n: Vec3) -> Vec3 {
        (self.m.transpose() * n).normalize()
    }

    /// Same ray expressed in local coordinates.
    ///
    /// The direction is not normalized, so a hit at parameter `t` in local
    /// space is the same hit at parameter `t` in world space.
    pub fn ray_to_local(&self, ray: &Ray) -> Ray {
        let mut local = ray.clone();
        local.set_origin(self.point_to_local(ray.origin()));
        local.set_direction(self.vector_to_local(ray.direction()));
        local
    }

    pub fn ray_to_world(&self, ray: &Ray) -> Ray {
        let mut world = ray.clone();
        world.set_origin(self.point_to_world(ray.origin()));
        world.set_direction(self.vector_to_world(ray.direction()));
        world
    }
}
