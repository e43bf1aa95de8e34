//! glTF/GLB scene provider
//!
//! Loads the document and its buffers; images are never decoded, only their
//! names and URIs are used as texture references. Every node carrying a mesh
//! becomes one instance, its parent node acting as the containing group.

use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3, Vec4};
use gltf::mesh::Mode;

use super::{
    group_priority, MaterialSettings, MeshGeometry, MeshInstanceProvider, PixelEngineMode,
    SceneMaterial, Triangle, WrapMode,
};
use crate::error::{ExportError, GeometryError};
use crate::model::{MAX_COLOR_CHANNELS, MAX_UV_CHANNELS};

/// glTF Y-up to authoring Z-up: (x, y, z) -> (x, -z, y).
fn y_up_to_z_up() -> Mat4 {
    Mat4::from_cols(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.0, -1.0, 0.0, 0.0),
        Vec4::W,
    )
}

const WHITE: [f32; 4] = [1.0; 4];

#[derive(Debug, Clone)]
struct NodeInstance {
    name: String,
    mesh: usize,
    world: Mat4,
    priority: i32,
}

/// Scene backed by a `.gltf` or `.glb` file.
pub struct GltfScene {
    path: PathBuf,
    document: gltf::Document,
    buffers: Vec<gltf::buffer::Data>,
    instances: Vec<NodeInstance>,
}

impl GltfScene {
    /// Load a glTF document and its buffers.
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let scene_load = |source| ExportError::SceneLoad {
            path: path.to_path_buf(),
            source,
        };

        let gltf::Gltf { document, blob } = gltf::Gltf::open(path).map_err(scene_load)?;
        let buffers = gltf::import_buffers(&document, path.parent(), blob).map_err(scene_load)?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| ExportError::EmptyScene {
                path: path.to_path_buf(),
            })?;

        let mut instances = Vec::new();
        for node in scene.nodes() {
            collect_instances(&node, None, y_up_to_z_up(), &mut instances);
        }

        tracing::info!(
            "Loaded glTF scene {:?}: {} mesh instances, {} materials",
            path,
            instances.len(),
            document.materials().count()
        );

        Ok(Self {
            path: path.to_path_buf(),
            document,
            buffers,
            instances,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn mesh(&self, instance: usize) -> Option<gltf::Mesh<'_>> {
        let mesh = self.instances.get(instance)?.mesh;
        self.document.meshes().nth(mesh)
    }

    /// Distinct primitive materials of a mesh in first-use order.
    /// `None` stands for the glTF default material.
    fn slot_keys(mesh: &gltf::Mesh<'_>) -> Vec<Option<usize>> {
        let mut keys = Vec::new();
        for primitive in mesh.primitives() {
            let key = primitive.material().index();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

fn collect_instances(
    node: &gltf::Node<'_>,
    parent: Option<&str>,
    parent_world: Mat4,
    out: &mut Vec<NodeInstance>,
) {
    let world = parent_world * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let name = node
            .name()
            .or(mesh.name())
            .map(str::to_string)
            .unwrap_or_else(|| format!("node{}", node.index()));
        out.push(NodeInstance {
            name,
            mesh: mesh.index(),
            world,
            priority: parent.map_or(0, group_priority),
        });
    }

    for child in node.children() {
        collect_instances(&child, node.name(), world, out);
    }
}

fn wrap_mode(mode: gltf::texture::WrappingMode) -> WrapMode {
    use gltf::texture::WrappingMode;
    match mode {
        WrappingMode::Repeat => WrapMode::Repeat,
        WrappingMode::MirroredRepeat => WrapMode::Mirror,
        WrappingMode::ClampToEdge => WrapMode::Clamp,
    }
}

fn pixel_engine_mode(mode: gltf::material::AlphaMode) -> PixelEngineMode {
    use gltf::material::AlphaMode;
    match mode {
        AlphaMode::Opaque => PixelEngineMode::Opaque,
        AlphaMode::Mask => PixelEngineMode::Outline,
        AlphaMode::Blend => PixelEngineMode::Translucent,
    }
}

fn scene_material(material: &gltf::Material<'_>) -> SceneMaterial {
    let name = material
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("material{}", material.index().unwrap_or_default()));

    let mut settings = MaterialSettings {
        display_back: material.double_sided(),
        pe: pixel_engine_mode(material.alpha_mode()),
        ..MaterialSettings::default()
    };

    let mut scene_material = SceneMaterial::new(name);
    if let Some(info) = material.pbr_metallic_roughness().base_color_texture() {
        let texture = info.texture();
        let sampler = texture.sampler();
        settings.wrap_u = wrap_mode(sampler.wrap_s());
        settings.wrap_v = wrap_mode(sampler.wrap_t());

        let image = texture.source();
        let reference = match image.name() {
            Some(name) => Some(name.to_string()),
            None => match image.source() {
                gltf::image::Source::Uri { uri, .. } => Some(uri.to_string()),
                gltf::image::Source::View { .. } => None,
            },
        };
        scene_material.texture = reference;
    }
    scene_material.with_settings(settings)
}

/// Triangle corner indices for a primitive topology.
fn triangle_indices(mode: Mode, indices: &[u32]) -> Result<Vec<[u32; 3]>, GeometryError> {
    let n = indices.len();
    let triangles = match mode {
        Mode::Triangles => indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect(),
        Mode::TriangleStrip => (0..n.saturating_sub(2))
            .map(|i| {
                if i % 2 == 0 {
                    [indices[i], indices[i + 1], indices[i + 2]]
                } else {
                    [indices[i], indices[i + 2], indices[i + 1]]
                }
            })
            .collect(),
        Mode::TriangleFan => (0..n.saturating_sub(2))
            .map(|i| [indices[i + 1], indices[i + 2], indices[0]])
            .collect(),
        other => return Err(GeometryError::UnsupportedTopology(format!("{:?}", other))),
    };
    Ok(triangles)
}

/// Number of consecutive attribute sets (`COLOR_0`, `COLOR_1`, ...) present.
fn set_count(
    primitive: &gltf::Primitive<'_>,
    max: usize,
    semantic: fn(u32) -> gltf::Semantic,
) -> usize {
    (0..max as u32)
        .take_while(|&set| primitive.get(&semantic(set)).is_some())
        .count()
}

/// Area-weighted vertex normals from face normals.
fn compute_normals(positions: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for &[a, b, c] in triangles {
        let (a, b, c) = (a as usize, b as usize, c as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Z))
        .collect()
}

impl MeshInstanceProvider for GltfScene {
    type Instance = usize;

    fn instances(&self) -> Vec<(usize, i32)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, inst)| (i, inst.priority))
            .collect()
    }

    fn instance_name(&self, instance: &usize) -> String {
        self.instances[*instance].name.clone()
    }

    fn world_matrix(&self, instance: &usize) -> Mat4 {
        self.instances[*instance].world
    }

    fn triangulate(&self, instance: &usize) -> Result<MeshGeometry, GeometryError> {
        let mesh = self
            .mesh(*instance)
            .ok_or_else(|| GeometryError::Triangulation("node mesh not found".into()))?;
        let slots = Self::slot_keys(&mesh);

        // Layer counts are the maximum over primitives; missing data is padded
        let color_sets = mesh
            .primitives()
            .map(|p| set_count(&p, MAX_COLOR_CHANNELS, gltf::Semantic::Colors))
            .max()
            .unwrap_or(0);
        let uv_sets = mesh
            .primitives()
            .map(|p| set_count(&p, MAX_UV_CHANNELS, gltf::Semantic::TexCoords))
            .max()
            .unwrap_or(0);

        let mut geometry = MeshGeometry {
            color_layers: vec![Vec::new(); color_sets],
            uv_layers: vec![Vec::new(); uv_sets],
            ..MeshGeometry::default()
        };

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| {
                self.buffers
                    .get(buffer.index())
                    .map(|data| data.0.as_slice())
            });

            let positions: Vec<Vec3> = reader
                .read_positions()
                .ok_or(GeometryError::MissingPositions)?
                .map(Vec3::from)
                .collect();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };
            let triangles = triangle_indices(primitive.mode(), &indices)?;

            let normals: Vec<Vec3> = match reader.read_normals() {
                Some(normals) => normals.map(Vec3::from).collect(),
                None => compute_normals(&positions, &triangles),
            };
            let colors: Vec<Vec<[f32; 4]>> = (0..color_sets as u32)
                .map(|set| {
                    reader
                        .read_colors(set)
                        .map(|c| c.into_rgba_f32().collect())
                        .unwrap_or_default()
                })
                .collect();
            let uvs: Vec<Vec<[f32; 2]>> = (0..uv_sets as u32)
                .map(|set| {
                    reader
                        .read_tex_coords(set)
                        .map(|t| t.into_f32().collect())
                        .unwrap_or_default()
                })
                .collect();

            let count = positions.len();
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= count) {
                return Err(GeometryError::IndexOutOfRange { index, count });
            }

            let base = geometry.positions.len() as u32;
            let material_index = slots
                .iter()
                .position(|&key| key == primitive.material().index())
                .unwrap_or_default();

            for corners in &triangles {
                for &vertex in corners {
                    let v = vertex as usize;
                    for (layer, source) in geometry.color_layers.iter_mut().zip(&colors) {
                        layer.push(source.get(v).copied().unwrap_or(WHITE));
                    }
                    for (layer, source) in geometry.uv_layers.iter_mut().zip(&uvs) {
                        layer.push(source.get(v).copied().unwrap_or([0.0, 0.0]));
                    }
                }
                geometry.triangles.push(Triangle {
                    vertices: corners.map(|v| v + base),
                    material_index,
                });
            }

            geometry.normals.extend(
                normals
                    .into_iter()
                    .chain(std::iter::repeat(Vec3::Z))
                    .take(count),
            );
            geometry.positions.extend(positions);
        }

        geometry.validate()?;
        Ok(geometry)
    }

    fn material_slots(&self, instance: &usize) -> Vec<Option<SceneMaterial>> {
        let Some(mesh) = self.mesh(*instance) else {
            return Vec::new();
        };
        Self::slot_keys(&mesh)
            .into_iter()
            .map(|key| {
                key.and_then(|index| self.document.materials().nth(index))
                    .map(|material| scene_material(&material))
            })
            .collect()
    }
}

impl std::fmt::Debug for GltfScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GltfScene")
            .field("path", &self.path)
            .field("instances", &self.instances.len())
            .field("buffers", &self.buffers.len())
            .finish()
    }
}
