//! Geometry assets: the arena owning every node and mesh of one loaded scene.

use rand::Rng;
use spekt_math::{BBox, Ray, Transformation};

use crate::displacement::{DisplacementMap, UvMapping};
use crate::error::{CoreError, CoreResult};
use crate::intersection::Intersection;
use crate::mesh::Mesh;
use crate::node::Node;

/// Owns all nodes and meshes of one scene plus the list of root nodes that
/// make up the active scene.
///
/// Nodes reference meshes, parents and children by index. Every mutation
/// that links two entries validates the indices, and [`add_child`] refuses
/// links that would make a node its own ancestor, so the node graph is
/// always a forest.
///
/// [`add_child`]: GeometryAsset::add_child
#[derive(Clone, Debug, Default)]
pub struct GeometryAsset {
    name: String,
    nodes: Vec<Node>,
    meshes: Vec<Mesh>,
    scene_roots: Vec<usize>,
}

impl GeometryAsset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a mesh and return its index.
    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    /// Add an unlinked node and return its number.
    pub fn add_node(&mut self, name: impl Into<String>) -> usize {
        let number = self.nodes.len();
        self.nodes.push(Node::new(number, name));
        number
    }

    pub fn node(&self, number: usize) -> Option<&Node> {
        self.nodes.get(number)
    }

    pub fn mesh(&self, index: usize) -> Option<&Mesh> {
        self.meshes.get(index)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn scene_roots(&self) -> &[usize] {
        &self.scene_roots
    }

    fn node_mut(&mut self, number: usize) -> CoreResult<&mut Node> {
        self.nodes
            .get_mut(number)
            .ok_or(CoreError::UnresolvedReference { kind: "node", index: number })
    }

    /// Attach mesh `mesh` to node `node`.
    pub fn set_mesh(&mut self, node: usize, mesh: usize) -> CoreResult<()> {
        if mesh >= self.meshes.len() {
            return Err(CoreError::UnresolvedReference { kind: "mesh", index: mesh });
        }
        self.node_mut(node)?.mesh = Some(mesh);
        Ok(())
    }

    pub fn set_transformation(&mut self, node: usize, transformation: Transformation) -> CoreResult<()> {
        self.node_mut(node)?.transformation = transformation;
        Ok(())
    }

    /// Make `child` a child of `parent`.
    ///
    /// Fails if either node does not exist, if `child` already has a parent,
    /// or if the link would close a cycle.
    pub fn add_child(&mut self, parent: usize, child: usize) -> CoreResult<()> {
        let child_node = self
            .node(child)
            .ok_or(CoreError::UnresolvedReference { kind: "node", index: child })?;
        let parent_node = self
            .node(parent)
            .ok_or(CoreError::UnresolvedReference { kind: "node", index: parent })?;

        if parent == child || parent_node.has_ancestor(self, child) {
            return Err(CoreError::CyclicNode { parent, child });
        }
        if let Some(existing) = child_node.parent {
            return Err(CoreError::MultipleParents { parent: existing, child });
        }

        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Select the root nodes of the active scene.
    pub fn set_scene_roots(&mut self, roots: Vec<usize>) -> CoreResult<()> {
        if let Some(&index) = roots.iter().find(|&&index| index >= self.nodes.len()) {
            return Err(CoreError::UnresolvedReference { kind: "node", index });
        }
        self.scene_roots = roots;
        Ok(())
    }

    /// Build the spatial index of every mesh. Must run once before the
    /// first intersection query.
    pub fn build_spatial_index(&mut self) {
        for mesh in &mut self.meshes {
            mesh.build_spatial_index();
        }

        let triangles: usize = self.meshes.iter().map(Mesh::triangle_count).sum();
        log::info!(
            "Built spatial index for '{}': {} meshes, {} triangles",
            self.name,
            self.meshes.len(),
            triangles
        );
    }

    /// Displace the vertices of every mesh with `map` and recompute their
    /// normals. Drops the spatial indices; call
    /// [`build_spatial_index`](Self::build_spatial_index) afterwards.
    pub fn displace<R: Rng>(&mut self, map: &DisplacementMap, magnification: f32, mapping: UvMapping, rng: &mut R) {
        log::info!(
            "Displacing '{}' ({}x{} map, magnification {}, {} mapping)",
            self.name,
            map.width(),
            map.height(),
            magnification,
            mapping
        );

        for mesh in &mut self.meshes {
            mesh.displace(|p| map.offset(p, magnification, mapping, &mut *rng));
        }
    }

    /// Bounding box of the active scene in asset coordinates.
    pub fn bbox(&self) -> BBox {
        self.scene_roots
            .iter()
            .filter_map(|&root| self.node(root))
            .fold(BBox::EMPTY, |bbox, node| {
                bbox.surround(&node.bbox_with(self, &Transformation::IDENTITY))
            })
    }

    /// Intersect a ray given in asset coordinates with the active scene.
    ///
    /// On a hit the intersection holds the closest triangle and its
    /// transformation maps that triangle's mesh frame to asset coordinates.
    pub fn intersect_ray<'a>(
        &'a self,
        ray: &Ray,
        intersection: &mut Intersection<'a>,
        tmin: f32,
        tmax: f32,
    ) -> bool {
        let mut tmax = tmax;
        let mut hit = false;

        for root in self.scene_roots.iter().filter_map(|&root| self.node(root)) {
            let root_hit = root.intersect_ray(self, ray, intersection, tmin, &mut tmax);
            hit = hit || root_hit;
        }

        if hit {
            intersection.transformation = self.local_to_asset(intersection.node_number);
        }

        hit
    }

    /// Composed transformation from node `number`'s frame to asset coordinates.
    pub fn local_to_asset(&self, number: usize) -> Transformation {
        let mut current = self.node(number);
        let mut transformation = Transformation::IDENTITY;

        while let Some(node) = current {
            transformation = node.transformation.apply(&transformation);
            current = node.parent.and_then(|parent| self.node(parent));
        }

        transformation
    }
}
