//! Closest-hit record filled in while a ray walks the scene.

use spekt_math::{Ray, Transformation, Vec3};

use crate::material::Material;
use crate::mesh::Mesh;

/// Closest hit found so far for one incident ray.
///
/// The record is bound to the world-space ray it was created from. During
/// traversal every accepted triangle overwrites the mesh, triangle and
/// barycentric fields; the geometry asset and instance fill in the
/// local-to-world transformation once traversal is complete.
#[derive(Debug, Clone)]
pub struct Intersection<'a> {
    pub hit: bool,
    pub triangle_index: usize,
    pub node_number: usize,
    /// Ray parameter of the hit (the distance when the direction has unit length)
    pub t: f32,
    pub u: f32,
    pub v: f32,
    /// Maps hit-triangle-local coordinates to world space
    pub transformation: Transformation,
    origin: Vec3,
    direction: Vec3,
    mesh: Option<&'a Mesh>,
}

impl<'a> Intersection<'a> {
    /// Empty record for `ray`.
    pub fn new(ray: &Ray) -> Self {
        Self {
            hit: false,
            triangle_index: 0,
            node_number: 0,
            t: f32::INFINITY,
            u: 0.0,
            v: 0.0,
            transformation: Transformation::IDENTITY,
            origin: ray.origin(),
            direction: ray.direction(),
            mesh: None,
        }
    }

    /// Record a triangle hit.
    pub fn set_mesh(&mut self, mesh: &'a Mesh, triangle_index: usize, t: f32, u: f32, v: f32) {
        self.hit = true;
        self.mesh = Some(mesh);
        self.triangle_index = triangle_index;
        self.t = t;
        self.u = u;
        self.v = v;
    }

    pub fn mesh(&self) -> Option<&'a Mesh> {
        self.mesh
    }

    pub fn material(&self) -> Option<&'a Material> {
        self.mesh.map(|mesh| mesh.material())
    }

    /// Origin of the incident world-space ray.
    pub fn ray_origin(&self) -> Vec3 {
        self.origin
    }

    /// Direction of the incident world-space ray.
    pub fn ray_direction(&self) -> Vec3 {
        self.direction
    }

    /// Optical distance travelled to the hit (the ray parameter).
    pub fn separation(&self) -> f32 {
        self.t
    }

    /// World-space hit point.
    pub fn point(&self) -> Vec3 {
        self.origin + self.t * self.direction
    }

    /// World-space shading normal (interpolated if the mesh has vertex normals).
    pub fn normal(&self) -> Option<Vec3> {
        self.mesh.map(|mesh| {
            self.transformation
                .normal_to_world(mesh.normal(self.triangle_index, self.u, self.v))
        })
    }

    /// World-space geometric normal of the hit triangle.
    pub fn flat_normal(&self) -> Option<Vec3> {
        self.mesh
            .map(|mesh| self.transformation.normal_to_world(mesh.flat_normal(self.triangle_index)))
    }
}
