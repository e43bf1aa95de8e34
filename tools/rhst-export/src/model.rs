//! Flattened model document and its builder
//!
//! A [`Body`] holds the materials, polygons, weights and the single root bone
//! whose draw list references them by id. [`ModelBuilder`] assigns the ids:
//! polygons get one id per insertion, materials are deduplicated by texture
//! key with the first insertion winning.

use std::path::PathBuf;

use glam::Vec3;
use hashbrown::HashMap;
use rhst_common::{Dict, Value};

use crate::options::Srt;
use crate::scene::{PixelEngineMode, SceneMaterial, WrapMode};

/// Length of the vertex-component descriptor.
pub const DESCRIPTOR_LEN: usize = 21;
/// Descriptor slot of the position attribute.
pub const POSITION_SLOT: usize = 9;
/// Descriptor slot of the normal attribute.
pub const NORMAL_SLOT: usize = 10;
/// First color slot.
pub const COLOR_SLOT: usize = 11;
pub const MAX_COLOR_CHANNELS: usize = 2;
/// First texture coordinate slot.
pub const UV_SLOT: usize = 13;
pub const MAX_UV_CHANNELS: usize = 8;
/// Matrix slots per matrix primitive; -1 marks an unused slot.
pub const MATRIX_SLOTS: usize = 10;

/// Which attributes every facepoint of a polygon carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexDescriptor {
    flags: [bool; DESCRIPTOR_LEN],
}

impl VertexDescriptor {
    /// Position + normal, plus the given number of color and UV channels
    /// (clamped to the format maxima).
    pub fn new(color_channels: usize, uv_channels: usize) -> Self {
        let mut flags = [false; DESCRIPTOR_LEN];
        flags[POSITION_SLOT] = true;
        flags[NORMAL_SLOT] = true;
        for slot in flags
            .iter_mut()
            .skip(COLOR_SLOT)
            .take(color_channels.min(MAX_COLOR_CHANNELS))
        {
            *slot = true;
        }
        for slot in flags
            .iter_mut()
            .skip(UV_SLOT)
            .take(uv_channels.min(MAX_UV_CHANNELS))
        {
            *slot = true;
        }
        Self { flags }
    }

    pub fn has(&self, slot: usize) -> bool {
        self.flags.get(slot).copied().unwrap_or(false)
    }

    pub fn color_channels(&self) -> usize {
        (COLOR_SLOT..COLOR_SLOT + MAX_COLOR_CHANNELS)
            .filter(|&s| self.flags[s])
            .count()
    }

    pub fn uv_channels(&self) -> usize {
        (UV_SLOT..UV_SLOT + MAX_UV_CHANNELS)
            .filter(|&s| self.flags[s])
            .count()
    }

    /// Number of attributes in each facepoint.
    pub fn arity(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.flags.iter().map(|&f| Value::from(f as i32)).collect())
    }
}

/// One vertex's attributes, in descriptor order.
#[derive(Debug, Clone, PartialEq)]
pub struct Facepoint {
    pub position: Vec3,
    pub normal: Vec3,
    pub colors: Vec<[f32; 4]>,
    /// V already flipped to target texture space.
    pub uvs: Vec<[f32; 2]>,
}

impl Facepoint {
    pub fn arity(&self) -> usize {
        2 + self.colors.len() + self.uvs.len()
    }

    pub fn to_value(&self) -> Value {
        let mut attributes = Vec::with_capacity(self.arity());
        attributes.push(Value::from(self.position.to_array()));
        attributes.push(Value::from(self.normal.to_array()));
        attributes.extend(self.colors.iter().map(|&c| Value::from(c)));
        attributes.extend(self.uvs.iter().map(|&uv| Value::from(uv)));
        Value::Array(attributes)
    }
}

/// Triangle list. The only primitive topology the exporter writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub facepoints: Vec<Facepoint>,
}

/// Primitives sharing one set of matrix slots.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixPrimitive {
    pub matrix: [i32; MATRIX_SLOTS],
    pub primitives: Vec<Primitive>,
}

/// Polygon-level topology tag. The consumer reads the per-primitive topology.
const POLYGON_PRIMITIVE_TYPE: &str = "triangle_fan";
const PRIMITIVE_TYPE: &str = "triangles";
/// Name written for matrix primitives and primitives.
const UNNAMED: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub name: String,
    pub current_matrix: i32,
    pub descriptor: VertexDescriptor,
    pub matrix_primitives: Vec<MatrixPrimitive>,
}

impl Polygon {
    /// A single-primitive triangle list with no matrix slots in use.
    pub fn triangles(
        name: impl Into<String>,
        descriptor: VertexDescriptor,
        facepoints: Vec<Facepoint>,
    ) -> Self {
        Self {
            name: name.into(),
            current_matrix: 0,
            descriptor,
            matrix_primitives: vec![MatrixPrimitive {
                matrix: [-1; MATRIX_SLOTS],
                primitives: vec![Primitive { facepoints }],
            }],
        }
    }

    pub fn facepoints(&self) -> impl Iterator<Item = &Facepoint> {
        self.matrix_primitives
            .iter()
            .flat_map(|mp| &mp.primitives)
            .flat_map(|p| &p.facepoints)
    }

    pub fn facepoint_count(&self) -> usize {
        self.facepoints().count()
    }

    pub fn to_value(&self) -> Value {
        let matrix_primitives: Vec<Value> = self
            .matrix_primitives
            .iter()
            .map(|mp| {
                let primitives: Vec<Value> = mp
                    .primitives
                    .iter()
                    .map(|p| {
                        let facepoints: Vec<Value> =
                            p.facepoints.iter().map(Facepoint::to_value).collect();
                        Dict::named(UNNAMED)
                            .with("primitive_type", PRIMITIVE_TYPE)
                            .with("facepoints", facepoints)
                            .into()
                    })
                    .collect();
                Dict::named(UNNAMED)
                    .with("matrix", mp.matrix)
                    .with("primitives", primitives)
                    .into()
            })
            .collect();

        Dict::named(self.name.as_str())
            .with("primitive_type", POLYGON_PRIMITIVE_TYPE)
            .with("current_matrix", self.current_matrix)
            .with("facepoint_format", self.descriptor.to_value())
            .with("matrix_primitives", matrix_primitives)
            .into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// Identity key for deduplication.
    pub texture: String,
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
    pub display_front: bool,
    pub display_back: bool,
    pub pe: PixelEngineMode,
    pub lightset: i32,
    pub fog: i32,
    pub preset_path: Option<PathBuf>,
}

impl Material {
    pub fn from_scene(material: &SceneMaterial, texture: impl Into<String>) -> Self {
        let settings = &material.settings;
        Self {
            name: material.name.clone(),
            texture: texture.into(),
            wrap_u: settings.wrap_u,
            wrap_v: settings.wrap_v,
            display_front: settings.display_front,
            display_back: settings.display_back,
            pe: settings.pe,
            lightset: settings.lightset,
            fog: settings.fog,
            preset_path: settings.preset_path.clone(),
        }
    }

    pub fn to_value(&self) -> Value {
        let preset = self
            .preset_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        Dict::named(self.name.as_str())
            .with("texture", self.texture.as_str())
            .with("wrap_u", self.wrap_u.as_str())
            .with("wrap_v", self.wrap_v.as_str())
            .with("display_front", self.display_front)
            .with("display_back", self.display_back)
            .with("pe", self.pe.as_str())
            .with("lightset", self.lightset)
            .with("fog", self.fog)
            // Key kept for consumer compatibility; accepts .mdl0mat or .rspreset
            .with("preset_path_mdl0mat", preset)
            .into()
    }
}

/// One draw of a polygon with a material, in draw-list order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drawcall {
    pub material: usize,
    pub polygon: usize,
    pub priority: i32,
}

impl Drawcall {
    pub fn to_value(&self) -> Value {
        Value::Array(vec![
            Value::from(self.material),
            Value::from(self.polygon),
            Value::from(self.priority),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Billboard {
    #[default]
    None,
}

impl Billboard {
    pub fn as_str(self) -> &'static str {
        match self {
            Billboard::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// -1 = none
    pub parent: i32,
    /// -1 = none
    pub child: i32,
    pub transform: Srt,
    pub min: Vec3,
    pub max: Vec3,
    pub billboard: Billboard,
    pub draws: Vec<Drawcall>,
}

impl Bone {
    /// Parentless, childless bone with an empty draw list.
    pub fn root(name: impl Into<String>, transform: Srt) -> Self {
        Self {
            name: name.into(),
            parent: -1,
            child: -1,
            transform,
            min: Vec3::ZERO,
            max: Vec3::ZERO,
            billboard: Billboard::None,
            draws: Vec::new(),
        }
    }

    pub fn to_value(&self) -> Value {
        let draws: Vec<Value> = self.draws.iter().map(Drawcall::to_value).collect();
        Dict::named(self.name.as_str())
            .with("parent", self.parent)
            .with("child", self.child)
            .with("scale", self.transform.scale)
            .with("rotate", self.transform.rotate)
            .with("translate", self.transform.translate)
            .with("min", self.min.to_array())
            .with("max", self.max.to_array())
            .with("billboard", self.billboard.as_str())
            .with("draws", draws)
            .into()
    }
}

/// Generator metadata. Informational only.
#[derive(Debug, Clone, PartialEq)]
pub struct Head {
    pub generator: String,
    pub format_type: String,
    pub version: String,
}

impl Head {
    pub fn to_value(&self) -> Value {
        Dict::named("head")
            .with("generator", self.generator.as_str())
            .with("type", self.format_type.as_str())
            .with("version", self.version.as_str())
            .into()
    }
}

/// Bone influence: (bone index, weight percent).
pub type Influence = (i32, i32);

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub materials: Vec<Material>,
    pub polygons: Vec<Polygon>,
    /// Weight matrices, each a list of influences.
    pub weights: Vec<Vec<Influence>>,
    pub bones: Vec<Bone>,
}

impl Body {
    pub fn to_value(&self) -> Value {
        let materials: Vec<Value> = self.materials.iter().map(Material::to_value).collect();
        let polygons: Vec<Value> = self.polygons.iter().map(Polygon::to_value).collect();
        let weights: Vec<Value> = self
            .weights
            .iter()
            .map(|matrix| {
                Value::Array(
                    matrix
                        .iter()
                        .map(|&(bone, influence)| Value::from([bone, influence]))
                        .collect(),
                )
            })
            .collect();
        let bones: Vec<Value> = self.bones.iter().map(Bone::to_value).collect();

        // `name` goes last: the body is named after it is assembled
        Dict::new()
            .with("materials", materials)
            .with("polygons", polygons)
            .with("weights", weights)
            .with("bones", bones)
            .with("name", "body")
            .into()
    }
}

/// Complete in-memory document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub head: Head,
    pub body: Body,
}

/// Accumulates polygons and materials and records draws on the root bone.
#[derive(Debug)]
pub struct ModelBuilder {
    materials: Vec<Material>,
    polygons: Vec<Polygon>,
    bone: Bone,
    material_remap: HashMap<String, usize>,
}

impl ModelBuilder {
    pub fn new(root: Bone) -> Self {
        Self {
            materials: Vec::new(),
            polygons: Vec::new(),
            bone: root,
            material_remap: HashMap::new(),
        }
    }

    /// Store a polygon; ids are dense and follow call order.
    pub fn add_mesh(&mut self, polygon: Polygon) -> usize {
        self.polygons.push(polygon);
        self.polygons.len() - 1
    }

    /// Store a material unless one with the same texture key exists.
    ///
    /// Returns the id of the first material stored for the key; the fields of
    /// any later material with that key are dropped.
    pub fn add_material(&mut self, material: Material) -> usize {
        if let Some(&id) = self.material_remap.get(&material.texture) {
            return id;
        }
        let id = self.materials.len();
        self.material_remap.insert(material.texture.clone(), id);
        self.materials.push(material);
        id
    }

    /// Append a draw to the root bone's draw list.
    pub fn append_drawcall(&mut self, material: usize, polygon: usize, priority: i32) {
        self.bone.draws.push(Drawcall {
            material,
            polygon,
            priority,
        });
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn draws(&self) -> &[Drawcall] {
        &self.bone.draws
    }

    /// Finish into a body with the single root bone fully weighted.
    pub fn finish(self) -> Body {
        Body {
            materials: self.materials,
            polygons: self.polygons,
            weights: vec![vec![(0, 100)]],
            bones: vec![self.bone],
        }
    }
}
