//! Scene graph nodes.
//!
//! Nodes live in the [`GeometryAsset`] arena and refer to each other and to
//! meshes by index, never by ownership.

use spekt_math::{BBox, Ray, Transformation};

use crate::geometry::GeometryAsset;
use crate::intersection::Intersection;

/// A node of the scene graph: a local transformation, an optional mesh and
/// a list of children.
#[derive(Clone, Debug, Default)]
pub struct Node {
    /// Node name (may be empty)
    pub name: String,

    /// Position of this node in the asset's node arena
    pub number: usize,

    /// Maps this node's local frame into its parent's frame
    pub transformation: Transformation,

    /// Index into the asset's mesh arena
    pub mesh: Option<usize>,

    pub parent: Option<usize>,

    pub children: Vec<usize>,
}

impl Node {
    pub fn new(number: usize, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number,
            ..Default::default()
        }
    }

    /// Intersect a ray given in the parent's frame with this subtree.
    ///
    /// The ray is carried into this node's frame, tested against the node's
    /// mesh, then handed to every child. `tmax` is shared by the whole walk,
    /// so the record ends up holding the closest hit of the subtree. The
    /// hit node's number is stamped onto the intersection.
    pub fn intersect_ray<'a>(
        &self,
        asset: &'a GeometryAsset,
        ray: &Ray,
        intersection: &mut Intersection<'a>,
        tmin: f32,
        tmax: &mut f32,
    ) -> bool {
        let local_ray = self.transformation.ray_to_local(ray);
        let mut hit = false;

        if let Some(mesh) = self.mesh.and_then(|index| asset.mesh(index)) {
            if mesh.intersect_ray(&local_ray, intersection, tmin, tmax) {
                intersection.node_number = self.number;
                hit = true;
            }
        }

        for child in self.children.iter().filter_map(|&index| asset.node(index)) {
            let child_hit = child.intersect_ray(asset, &local_ray, intersection, tmin, tmax);
            hit = hit || child_hit;
        }

        hit
    }

    /// Bounding box of every vertex in this subtree.
    ///
    /// `transformation` maps this node's parent frame to the target frame
    /// (identity for the parent frame itself). Visits every vertex, so this
    /// is expensive for large scenes.
    pub fn bbox_with(&self, asset: &GeometryAsset, transformation: &Transformation) -> BBox {
        let transformation = transformation.apply(&self.transformation);

        let mut bbox = match self.mesh.and_then(|index| asset.mesh(index)) {
            Some(mesh) => BBox::from_points(
                (0..mesh.triangle_count())
                    .flat_map(|triangle| mesh.triangle_vertices(triangle))
                    .map(|vertex| transformation.point_to_world(vertex)),
            ),
            None => BBox::EMPTY,
        };

        for child in self.children.iter().filter_map(|&index| asset.node(index)) {
            bbox = bbox.surround(&child.bbox_with(asset, &transformation));
        }

        bbox
    }

    /// True if node `number` is this node's parent or any further ancestor.
    pub fn has_ancestor(&self, asset: &GeometryAsset, number: usize) -> bool {
        let mut current = self.parent;
        // Bounded by the arena size in case the parent links were corrupted
        for _ in 0..asset.node_count() {
            match current {
                Some(parent) if parent == number => return true,
                Some(parent) => current = asset.node(parent).and_then(|node| node.parent),
                None => return false,
            }
        }
        false
    }
}
