//! Scene source seam
//!
//! The exporter never touches a host scene graph directly. Scene sources
//! implement [`MeshInstanceProvider`], which yields mesh instances with their
//! priority, evaluated triangulated geometry, material slots and per-slot
//! texture resolution.
//!
//! Geometry is expressed in the authoring convention (right-handed, Z-up);
//! the flattener converts it to the Y-up target space.

mod gltf_scene;
mod memory;

pub use gltf_scene::GltfScene;
pub use memory::{MemoryInstance, MemoryScene};

use std::path::PathBuf;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Texture coordinate wrap mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapMode {
    #[default]
    Repeat,
    Mirror,
    Clamp,
}

impl WrapMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WrapMode::Repeat => "repeat",
            WrapMode::Mirror => "mirror",
            WrapMode::Clamp => "clamp",
        }
    }
}

/// Pixel engine (alpha) mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelEngineMode {
    /// No alpha
    #[default]
    Opaque,
    /// Binary alpha: a texel is either opaque or fully transparent
    Outline,
    /// Full range of alpha
    Translucent,
}

impl PixelEngineMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PixelEngineMode::Opaque => "opaque",
            PixelEngineMode::Outline => "outline",
            PixelEngineMode::Translucent => "translucent",
        }
    }
}

/// Per-material export settings carried by the scene source.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSettings {
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
    pub display_front: bool,
    pub display_back: bool,
    pub pe: PixelEngineMode,
    /// -1 = no lightset
    pub lightset: i32,
    pub fog: i32,
    /// External material preset (.rspreset file or .mdl0mat folder)
    pub preset_path: Option<PathBuf>,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            wrap_u: WrapMode::Repeat,
            wrap_v: WrapMode::Repeat,
            display_front: true,
            display_back: false,
            pe: PixelEngineMode::Opaque,
            lightset: -1,
            fog: 0,
            preset_path: None,
        }
    }
}

/// A material bound to one slot of a mesh instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneMaterial {
    pub name: String,
    /// Raw texture reference (image name, file name or path), if any.
    pub texture: Option<String>,
    pub settings: MaterialSettings,
}

impl SceneMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            texture: None,
            settings: MaterialSettings::default(),
        }
    }

    pub fn with_texture(mut self, texture: impl Into<String>) -> Self {
        self.texture = Some(texture.into());
        self
    }

    pub fn with_settings(mut self, settings: MaterialSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// One triangle of an evaluated mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [u32; 3],
    /// Index into the instance's material slots.
    pub material_index: usize,
}

/// Evaluated, triangulated mesh in the instance's local space.
///
/// Positions and normals are per vertex. Color and UV layers are per corner,
/// indexed by `triangle * 3 + corner`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub triangles: Vec<Triangle>,
    pub color_layers: Vec<Vec<[f32; 4]>>,
    pub uv_layers: Vec<Vec<[f32; 2]>>,
}

impl MeshGeometry {
    pub fn corner_count(&self) -> usize {
        self.triangles.len() * 3
    }

    /// Check that every index and per-corner layer is consistent.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.positions.is_empty() {
            return Err(GeometryError::MissingPositions);
        }
        if self.normals.len() != self.positions.len() {
            return Err(GeometryError::Triangulation(format!(
                "{} normals for {} vertices",
                self.normals.len(),
                self.positions.len()
            )));
        }

        let count = self.positions.len();
        for triangle in &self.triangles {
            if let Some(&index) = triangle.vertices.iter().find(|&&v| v as usize >= count) {
                return Err(GeometryError::IndexOutOfRange { index, count });
            }
        }

        let expected = self.corner_count();
        let layers = self
            .color_layers
            .iter()
            .map(|l| ("color", l.len()))
            .enumerate()
            .chain(self.uv_layers.iter().map(|l| ("uv", l.len())).enumerate());
        for (layer, (channel, found)) in layers {
            if found != expected {
                return Err(GeometryError::ChannelLength {
                    channel,
                    layer,
                    found,
                    expected,
                });
            }
        }
        Ok(())
    }
}

/// Source of renderable mesh instances.
pub trait MeshInstanceProvider {
    /// Opaque instance handle.
    type Instance;

    /// Every renderable mesh instance with its draw priority, in export order.
    fn instances(&self) -> Vec<(Self::Instance, i32)>;

    fn instance_name(&self, instance: &Self::Instance) -> String;

    /// Local-to-world transform in authoring space.
    fn world_matrix(&self, instance: &Self::Instance) -> Mat4;

    /// Evaluated (post-modifier) geometry, triangulated.
    fn triangulate(&self, instance: &Self::Instance) -> Result<MeshGeometry, GeometryError>;

    /// Material slots in slot order; `None` for an unassigned slot.
    fn material_slots(&self, instance: &Self::Instance) -> Vec<Option<SceneMaterial>>;

    /// Texture key of a material, or `None` when it has no usable texture.
    fn resolve_texture(&self, material: &SceneMaterial) -> Option<String> {
        material.texture.as_deref().and_then(texture_key)
    }
}

/// Texture key for a texture reference: its file name up to the first dot.
///
/// `"textures/grass.png"` → `"grass"`, `"rock.001.png"` → `"rock"`.
pub fn texture_key(reference: &str) -> Option<String> {
    let file_name = reference
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(reference);
    let stem = file_name.split('.').next().unwrap_or(file_name);
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Draw priority encoded in a group name as `"<name>:<priority>"`.
///
/// Groups without a suffix get priority 0, as do unparsable suffixes.
pub fn group_priority(group: &str) -> i32 {
    let Some((_, suffix)) = group.split_once(':') else {
        return 0;
    };
    let suffix = suffix.split(':').next().unwrap_or(suffix).trim();
    match suffix.parse() {
        Ok(priority) => priority,
        Err(_) => {
            tracing::warn!(
                "Group {:?} has a non-numeric priority suffix, using 0",
                group
            );
            0
        }
    }
}
