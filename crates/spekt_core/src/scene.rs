//! JSON scene descriptions.
//!
//! A scene file lists materials, meshes and nodes and names the root nodes of
//! the active scene:
//!
//! ```json
//! {
//!   "name": "cube",
//!   "materials": [ { "name": "gold", "temperature": 300, "ior": { "file": "gold_ior.json" } } ],
//!   "meshes": [ { "name": "cube", "positions": [0, 0, 0, ...], "indices": [0, 1, 2, ...], "material": "gold" } ],
//!   "nodes": [ { "name": "root", "mesh": 0, "translation": [0, 0, 0], "children": [] } ],
//!   "scene": [0]
//! }
//! ```
//!
//! Loading resolves every reference and checks the node graph, so a
//! [`GeometryAsset`] built here is always a valid forest.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use spekt_math::{Quat, Transformation, Vec3};

use crate::error::{CoreError, CoreResult};
use crate::geometry::GeometryAsset;
use crate::ior::MaterialIor;
use crate::material::Material;
use crate::mesh::Mesh;

fn default_temperature() -> f32 {
    300.0
}

/// Root of a scene file.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub materials: Vec<MaterialDescription>,
    #[serde(default)]
    pub meshes: Vec<MeshDescription>,
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    /// Root nodes of the active scene; every parentless node when absent
    #[serde(default)]
    pub scene: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialDescription {
    pub name: String,
    /// Kelvin
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    pub ior: IorSource,
}

/// Where a material's refractive index comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IorSource {
    /// IOR JSON file, relative to the scene file
    File { file: PathBuf },
    /// Wavelength-independent index
    Constant { n: f32, k: f32 },
    /// IOR document embedded in the scene
    Inline(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeshDescription {
    #[serde(default)]
    pub name: String,
    /// Flat `x, y, z` triples
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
    /// Flat `x, y, z` triples, one per vertex
    #[serde(default)]
    pub normals: Option<Vec<f32>>,
    pub material: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mesh: Option<usize>,
    #[serde(default)]
    pub translation: Option<[f32; 3]>,
    /// Quaternion `[x, y, z, w]`
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
    #[serde(default)]
    pub children: Vec<usize>,
}

impl NodeDescription {
    /// Scale, then rotate, then translate.
    pub fn transformation(&self) -> Transformation {
        let translation = self.translation.map(Vec3::from_array).unwrap_or(Vec3::ZERO);
        let rotation = self.rotation.map(Quat::from_array).unwrap_or(Quat::IDENTITY);
        let scale = self.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE);
        Transformation::from_trs(translation, rotation, scale)
    }
}

fn to_vec3s(name: &str, what: &str, values: &[f32]) -> CoreResult<Vec<Vec3>> {
    if values.len() % 3 != 0 {
        return Err(CoreError::InvalidMesh {
            name: name.to_owned(),
            reason: format!("{} {} is not a multiple of 3", values.len(), what),
        });
    }
    Ok(values
        .chunks_exact(3)
        .map(|v| Vec3::new(v[0], v[1], v[2]))
        .collect())
}

impl SceneDescription {
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> CoreResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Resolve every reference and build the asset.
    ///
    /// Relative IOR file paths are resolved against `base_dir`. The spatial
    /// index is not built.
    pub fn into_asset(self, base_dir: &Path) -> CoreResult<GeometryAsset> {
        let mut ior_cache: HashMap<PathBuf, Arc<MaterialIor>> = HashMap::new();
        let mut materials: HashMap<String, Arc<Material>> = HashMap::new();

        for description in self.materials {
            let ior = match description.ior {
                IorSource::File { file } => {
                    let path = base_dir.join(file);
                    match ior_cache.get(&path) {
                        Some(ior) => ior.clone(),
                        None => {
                            let ior = Arc::new(MaterialIor::from_path(&path)?);
                            ior_cache.insert(path, ior.clone());
                            ior
                        }
                    }
                }
                IorSource::Constant { n, k } => Arc::new(MaterialIor::constant(n, k)),
                IorSource::Inline(value) => Arc::new(MaterialIor::from_json_value(&value)?),
            };

            let material = Material::new(description.name.clone(), description.temperature, ior);
            materials.insert(description.name, Arc::new(material));
        }

        let mut asset = GeometryAsset::new(self.name);

        for description in self.meshes {
            let material = materials
                .get(&description.material)
                .cloned()
                .ok_or_else(|| CoreError::UnresolvedName {
                    kind: "material",
                    name: description.material.clone(),
                })?;

            let positions = to_vec3s(&description.name, "position values", &description.positions)?;
            let normals = description
                .normals
                .as_deref()
                .map(|normals| to_vec3s(&description.name, "normal values", normals))
                .transpose()?;

            let mesh = Mesh::new(description.name, positions, description.indices, normals, material)?;
            asset.add_mesh(mesh);
        }

        for description in &self.nodes {
            let number = asset.add_node(description.name.clone());
            asset.set_transformation(number, description.transformation())?;
            if let Some(mesh) = description.mesh {
                asset.set_mesh(number, mesh)?;
            }
        }

        for (parent, description) in self.nodes.iter().enumerate() {
            for &child in &description.children {
                asset.add_child(parent, child)?;
            }
        }

        let roots = match self.scene {
            Some(roots) => roots,
            None => asset
                .nodes()
                .iter()
                .filter(|node| node.parent.is_none())
                .map(|node| node.number)
                .collect(),
        };
        asset.set_scene_roots(roots)?;

        log::info!(
            "Loaded scene '{}': {} nodes, {} meshes, {} materials",
            asset.name(),
            asset.node_count(),
            asset.mesh_count(),
            materials.len()
        );

        Ok(asset)
    }
}

/// Load a scene file into an asset (spatial index not yet built).
pub fn load_scene(path: impl AsRef<Path>) -> CoreResult<GeometryAsset> {
    let path = path.as_ref();
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    SceneDescription::from_path(path)?.into_asset(base_dir)
}
