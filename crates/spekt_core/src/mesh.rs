//! Triangle meshes and their spatial index.
//!
//! The index is an implicit, complete binary tree stored like a binary heap:
//! the children of box `i` are boxes `2i+1` and `2i+2`. Every tree position
//! owns a contiguous range of the triangle buffer; building the index sorts
//! each range along the longest axis of its box, so the lower and upper half
//! of a range are exactly the ranges of the two children. Ranges below the
//! deepest precomputed level are scanned triangle by triangle.

use std::sync::Arc;

use spekt_math::{BBox, Mat2, Ray, Transformation, Vec2, Vec3};

use crate::error::{CoreError, CoreResult};
use crate::intersection::Intersection;
use crate::material::Material;
use crate::triangle::intersect_triangle;

/// Curvature information at a point of a smooth-shaded triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curvature {
    /// Shape operator in the (xu, xv) tangent basis
    pub tensor: Mat2,
    /// World-space tangent along u
    pub xu: Vec3,
    /// World-space tangent along v
    pub xv: Vec3,
}

/// A triangle mesh with an optional per-vertex normal buffer.
///
/// Without normals the mesh is flat shaded.
#[derive(Clone, Debug)]
pub struct Mesh {
    name: String,
    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    triangles: Vec<[u32; 3]>,
    material: Arc<Material>,
    bboxes: Vec<BBox>,
}

impl Mesh {
    /// Create a mesh from flat buffers (every 3 indices form a triangle).
    ///
    /// The spatial index is not built; call
    /// [`build_spatial_index`](Self::build_spatial_index) before querying.
    pub fn new(
        name: impl Into<String>,
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        material: Arc<Material>,
    ) -> CoreResult<Self> {
        let name = name.into();
        let invalid = |reason: String| CoreError::InvalidMesh {
            name: name.clone(),
            reason,
        };

        if indices.len() % 3 != 0 {
            return Err(invalid(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(invalid(format!(
                "index {} out of range for {} vertices",
                index,
                positions.len()
            )));
        }
        if let Some(normals) = &normals {
            if normals.len() != positions.len() {
                return Err(invalid(format!(
                    "{} normals for {} vertices",
                    normals.len(),
                    positions.len()
                )));
            }
        }

        let triangles = indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();

        Ok(Self {
            name,
            positions,
            normals,
            triangles,
            material,
            bboxes: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Number of precomputed boxes in the spatial index (0 before building).
    pub fn spatial_index_len(&self) -> usize {
        self.bboxes.len()
    }

    /// Bounding box of all vertices in mesh-local coordinates.
    pub fn bbox(&self) -> BBox {
        BBox::from_points(self.positions.iter().copied())
    }

    /// Build (or rebuild) the spatial index.
    ///
    /// `max(floor(log2(n)) - 2, 0)` levels are precomputed for `n` triangles;
    /// a non-empty mesh always gets at least the root box. Rebuilding an
    /// unmodified mesh reproduces the same index.
    pub fn build_spatial_index(&mut self) {
        self.bboxes.clear();

        let triangle_count = self.triangles.len();
        if triangle_count == 0 {
            return;
        }

        let levels = triangle_count.ilog2().saturating_sub(2);
        let box_count = ((1usize << levels) - 1).max(1);
        self.bboxes.reserve(box_count);

        // Level order: a parent range is sorted before its children are boxed
        for node in 0..box_count {
            let (left, count) = self.node_range(node);
            let range = left..left + count;

            let positions = &self.positions;
            let bbox = BBox::from_points(
                self.triangles[range.clone()]
                    .iter()
                    .flat_map(|tri| tri.iter().map(|&i| positions[i as usize])),
            );

            let axis = bbox.longest_axis();
            self.triangles[range].sort_by(|a, b| {
                centroid(positions, a)[axis].total_cmp(&centroid(positions, b)[axis])
            });

            self.bboxes.push(bbox);
        }

        log::debug!(
            "Mesh '{}': {} triangles, {} index boxes",
            self.name,
            triangle_count,
            self.bboxes.len()
        );
    }

    /// Triangle range `(first, count)` owned by tree position `node`.
    ///
    /// The bits of `node + 1` below its leading one, read from the top,
    /// choose the lower (0) or upper (1) half at each level.
    fn node_range(&self, node: usize) -> (usize, usize) {
        let k = node + 1;
        let level = k.ilog2();

        let mut left = 0;
        let mut right = self.triangles.len() - 1;
        for i in 0..level {
            let middle = (left + right) / 2;
            if k & (1 << (level - i - 1)) != 0 {
                left = middle + 1;
            } else {
                right = middle;
            }
        }

        (left, right + 1 - left)
    }

    /// Find the closest hit with `tmin <= t <= tmax`.
    ///
    /// On a hit the intersection record is overwritten and `tmax` is lowered
    /// to the hit parameter, so later candidates (here or in other meshes
    /// sharing the same `tmax`) only win if they are no farther.
    pub fn intersect_ray<'a>(
        &'a self,
        ray: &Ray,
        intersection: &mut Intersection<'a>,
        tmin: f32,
        tmax: &mut f32,
    ) -> bool {
        self.intersect_node(ray, intersection, tmin, tmax, 0)
    }

    fn intersect_node<'a>(
        &'a self,
        ray: &Ray,
        intersection: &mut Intersection<'a>,
        tmin: f32,
        tmax: &mut f32,
        node: usize,
    ) -> bool {
        let Some(bbox) = self.bboxes.get(node) else {
            return false;
        };
        if !bbox.intersect_ray(ray, tmin, *tmax) {
            return false;
        }

        let left_child = 2 * node + 1;
        let right_child = 2 * node + 2;

        if right_child >= self.bboxes.len() {
            let (first, count) = self.node_range(node);
            let mut hit = false;

            for triangle_index in first..first + count {
                let [v0, v1, v2] = self.triangle_vertices(triangle_index);
                if let Some(found) =
                    intersect_triangle(v0, v1, v2, ray.origin(), ray.direction(), tmin, *tmax, true)
                {
                    hit = true;
                    *tmax = found.t;
                    intersection.set_mesh(self, triangle_index, found.t, found.u, found.v);
                }
            }

            hit
        } else {
            let hit_left = self.intersect_node(ray, intersection, tmin, tmax, left_child);
            let hit_right = self.intersect_node(ray, intersection, tmin, tmax, right_child);
            hit_left || hit_right
        }
    }

    /// Move every vertex along its normal by `offset(position)` and recompute
    /// the vertex normals afterwards.
    ///
    /// Meshes without a normal buffer get one first. The spatial index is
    /// dropped; rebuild it before the next query.
    pub fn displace(&mut self, mut offset: impl FnMut(Vec3) -> f32) {
        if self.normals.is_none() {
            self.recalculate_normals();
        }
        if let Some(normals) = &self.normals {
            for (position, normal) in self.positions.iter_mut().zip(normals) {
                *position += offset(*position) * *normal;
            }
        }

        self.recalculate_normals();
        self.bboxes.clear();
    }

    /// Replace the vertex normals by the normalized sum of the adjacent face
    /// normals. Degenerate faces contribute +x, and vertices without a usable
    /// sum get +x.
    pub fn recalculate_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for triangle in &self.triangles {
            let [v0, v1, v2] = triangle.map(|i| self.positions[i as usize]);
            let face = (v1 - v0).cross(v2 - v0).try_normalize().unwrap_or(Vec3::X);
            for &i in triangle {
                normals[i as usize] += face;
            }
        }
        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::X);
        }

        self.normals = Some(normals);
    }

    /// Vertices of a triangle (indices refer to the current, index-sorted order).
    pub fn triangle_vertices(&self, triangle_index: usize) -> [Vec3; 3] {
        self.triangles[triangle_index].map(|i| self.positions[i as usize])
    }

    fn triangle_normals(&self, triangle_index: usize) -> Option<[Vec3; 3]> {
        let normals = self.normals.as_ref()?;
        Some(self.triangles[triangle_index].map(|i| normals[i as usize]))
    }

    /// Shading normal at barycentric `(u, v)`.
    ///
    /// Interpolates the vertex normals when present (Phong shading),
    /// otherwise returns the flat normal.
    pub fn normal(&self, triangle_index: usize, u: f32, v: f32) -> Vec3 {
        match self.triangle_normals(triangle_index) {
            Some([n0, n1, n2]) => ((1.0 - u - v) * n0 + u * n1 + v * n2).normalize(),
            None => self.flat_normal(triangle_index),
        }
    }

    /// Geometric normal `(V1-V0) x (V2-V0)`, normalized.
    pub fn flat_normal(&self, triangle_index: usize) -> Vec3 {
        let [v0, v1, v2] = self.triangle_vertices(triangle_index);
        (v1 - v0).cross(v2 - v0).normalize()
    }

    /// Curvature tensor at barycentric `(u, v)`.
    ///
    /// Estimated from the vertex normals (Theisel et al., "Normal based
    /// estimation of the curvature tensor for triangular meshes"). Flat
    /// shaded meshes and degenerate tangent frames yield a zero tensor.
    pub fn curvature_tensor(
        &self,
        triangle_index: usize,
        u: f32,
        v: f32,
        transformation: &Transformation,
    ) -> Curvature {
        let zero = Curvature {
            tensor: Mat2::ZERO,
            xu: Vec3::ZERO,
            xv: Vec3::ZERO,
        };

        let Some([n0, n1, n2]) = self.triangle_normals(triangle_index) else {
            return zero;
        };
        let [v0, v1, v2] = self.triangle_vertices(triangle_index);

        let normal = transformation.normal_to_world((1.0 - u - v) * n0 + u * n1 + v * n2);
        let nu = n1 - n0;
        let nv = n2 - n0;

        let xu = transformation.vector_to_world((v1 - v0) - (v1 - v0).dot(normal) * normal);
        let xv = transformation.vector_to_world((v2 - v0) - (v2 - v0).dot(normal) * normal);

        let e = xu.dot(xu);
        let f = xu.dot(xv);
        let g = xv.dot(xv);
        let l = -nu.dot(xu);
        let m1 = -nu.dot(xv);
        let m2 = -nv.dot(xu);
        let n = -nv.dot(xv);

        let denominator = e * g - f * f;
        if denominator.abs() <= f32::EPSILON * e * g || !denominator.is_finite() {
            return Curvature { xu, xv, ..zero };
        }
        let inv = 1.0 / denominator;

        Curvature {
            tensor: Mat2::from_cols(
                Vec2::new((l * g - m1 * f) * inv, (m1 * e - l * f) * inv),
                Vec2::new((m2 * g - n * f) * inv, (n * e - m2 * f) * inv),
            ),
            xu,
            xv,
        }
    }
}

fn centroid(positions: &[Vec3], triangle: &[u32; 3]) -> Vec3 {
    (positions[triangle[0] as usize] + positions[triangle[1] as usize] + positions[triangle[2] as usize])
        / 3.0
}
