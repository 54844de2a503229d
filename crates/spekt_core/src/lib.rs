//! Spekt core - scene graph, meshes and material data.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh` with its spatial index, `Node`, `GeometryAsset`, `Instance`
//! - **Displacement**: grayscale maps moving vertices along their normals
//! - **Queries**: ray/triangle test and the closest-hit `Intersection` record
//! - **Materials**: `Material` and its complex refractive index data (`MaterialIor`)
//! - **Loading**: JSON scene and IOR files
//!
//! # Example
//!
//! ```ignore
//! use spekt_core::{load_scene, Instance, Intersection};
//! use spekt_math::{Ray, Transformation, Vec3};
//! use std::sync::Arc;
//!
//! let mut asset = load_scene("cube.json")?;
//! asset.build_spatial_index();
//! let instance = Instance::new(Arc::new(asset), Transformation::IDENTITY);
//!
//! let ray = Ray::new(0, Vec3::new(0.0, 0.0, -4.0), Vec3::Z);
//! let mut intersection = Intersection::new(&ray);
//! if instance.intersect_ray(&ray, &mut intersection, 0.0, f32::INFINITY) {
//!     println!("hit at {:?}", intersection.point());
//! }
//! ```

pub mod displacement;
pub mod error;
pub mod geometry;
pub mod instance;
pub mod intersection;
pub mod ior;
pub mod material;
pub mod mesh;
pub mod node;
pub mod scene;
pub mod triangle;

// Re-export commonly used types
pub use displacement::{DisplacementMap, UvMapping};
pub use error::{CoreError, CoreResult};
pub use geometry::GeometryAsset;
pub use instance::Instance;
pub use intersection::Intersection;
pub use ior::{IorRecord, LorentzModel, MaterialIor};
pub use material::Material;
pub use mesh::{Curvature, Mesh};
pub use node::Node;
pub use scene::{load_scene, SceneDescription};
pub use triangle::{intersect_triangle, TriangleHit};
