//! World placement of geometry assets.

use std::sync::Arc;

use spekt_math::{BBox, Ray, Transformation};

use crate::geometry::GeometryAsset;
use crate::intersection::Intersection;

/// A geometry asset placed in the world.
///
/// This is what the renderer intersects rays against. Several instances may
/// share one asset.
#[derive(Clone, Debug)]
pub struct Instance {
    asset: Arc<GeometryAsset>,
    /// Maps asset coordinates to world coordinates
    pub transformation: Transformation,
}

impl Instance {
    pub fn new(asset: Arc<GeometryAsset>, transformation: Transformation) -> Self {
        Self {
            asset,
            transformation,
        }
    }

    pub fn asset(&self) -> &GeometryAsset {
        &self.asset
    }

    /// Intersect a world-space ray with the instance.
    ///
    /// On a hit the intersection's transformation maps the hit triangle's
    /// mesh frame straight to world space.
    pub fn intersect_ray<'a>(
        &'a self,
        ray: &Ray,
        intersection: &mut Intersection<'a>,
        tmin: f32,
        tmax: f32,
    ) -> bool {
        let local_ray = self.transformation.ray_to_local(ray);
        let hit = self.asset.intersect_ray(&local_ray, intersection, tmin, tmax);

        if hit {
            intersection.transformation = self.transformation.apply(&intersection.transformation);
        }

        hit
    }

    /// World-space bounding box.
    pub fn bbox(&self) -> BBox {
        self.asset
            .scene_roots()
            .iter()
            .filter_map(|&root| self.asset.node(root))
            .fold(BBox::EMPTY, |bbox, node| {
                bbox.surround(&node.bbox_with(&self.asset, &self.transformation))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ior::MaterialIor;
    use crate::material::Material;
    use crate::mesh::Mesh;
    use spekt_math::{Quat, Vec3};
    use std::f32::consts::FRAC_PI_2;

    fn single_triangle_asset() -> Arc<GeometryAsset> {
        let material = Arc::new(Material::new("mirror", 300.0, Arc::new(MaterialIor::constant(0.1, 5.0))));
        let mesh = Mesh::new(
            "tri",
            vec![Vec3::new(-1.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, -1.0, 0.0)],
            vec![0, 1, 2],
            None,
            material,
        )
        .unwrap();

        let mut asset = GeometryAsset::new("triangle");
        let mesh = asset.add_mesh(mesh);
        let node = asset.add_node("node");
        asset.set_mesh(node, mesh).unwrap();
        asset
            .set_transformation(node, Transformation::translation(Vec3::new(0.0, 0.0, 1.0)))
            .unwrap();
        asset.set_scene_roots(vec![node]).unwrap();
        asset.build_spatial_index();
        Arc::new(asset)
    }

    #[test]
    fn test_instance_prepends_its_transformation() {
        let placement = Transformation::from_trs(Vec3::new(0.0, 0.0, 3.0), Quat::from_rotation_z(FRAC_PI_2), Vec3::splat(2.0));
        let instance = Instance::new(single_triangle_asset(), placement);

        // Triangle plane: z = 3 + 2 * 1 = 5
        let ray = Ray::new(7, Vec3::new(0.1, -0.2, 0.0), Vec3::Z);
        let mut intersection = Intersection::new(&ray);
        assert!(instance.intersect_ray(&ray, &mut intersection, 0.0, f32::INFINITY));
        assert!((intersection.t - 5.0).abs() < 1e-5);
        assert!((intersection.point() - Vec3::new(0.1, -0.2, 5.0)).length() < 1e-5);

        // Mesh-local vertex 0 lands where placement(node(v0)) puts it
        let expected = placement.point_to_world(Vec3::new(-1.0, -1.0, 1.0));
        let actual = intersection.transformation.point_to_world(Vec3::new(-1.0, -1.0, 0.0));
        assert!((expected - actual).length() < 1e-5);
        assert!((intersection.normal().unwrap().z.abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_instance_respects_tmax() {
        let instance = Instance::new(single_triangle_asset(), Transformation::IDENTITY);
        let ray = Ray::new(0, Vec3::new(0.0, 0.0, -1.0), Vec3::Z);
        let mut intersection = Intersection::new(&ray);
        assert!(!instance.intersect_ray(&ray, &mut intersection, 0.0, 1.5));
        assert!(instance.intersect_ray(&ray, &mut intersection, 0.0, 2.5));
    }

    #[test]
    fn test_instance_bbox() {
        let instance = Instance::new(single_triangle_asset(), Transformation::translation(Vec3::new(5.0, 0.0, 0.0)));
        let bbox = instance.bbox();
        assert!((bbox.min - Vec3::new(4.0, -1.0, 1.0)).length() < 1e-6);
        assert!((bbox.max - Vec3::new(6.0, 1.0, 1.0)).length() < 1e-6);
    }
}
