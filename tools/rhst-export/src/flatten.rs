//! Scene flattening
//!
//! Converts each mesh instance into target-space polygons, one per exported
//! material slot, and registers them with a [`ModelBuilder`].
//!
//! Target space is Y-up. Positions go through
//! `Scale(magnification) * AxisConversion * World`; normals go through the
//! inverse-transpose of the same transform. The axis conversion mirrors
//! handedness, so every triangle is flipped afterwards: normals are negated
//! and corner order is reversed.

use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::error::GeometryError;
use crate::model::{
    Facepoint, Material, ModelBuilder, Polygon, VertexDescriptor, MAX_COLOR_CHANNELS,
    MAX_UV_CHANNELS,
};
use crate::options::ExportOptions;
use crate::scene::{MeshGeometry, MeshInstanceProvider, Triangle};

/// Opaque white, used for synthesized color channels.
const DUMMY_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Corner emission order for a flipped triangle.
const FLIPPED_CORNERS: [usize; 3] = [0, 2, 1];

/// Recoverable problem found while flattening. The export continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Diagnostic {
    #[error("{instance}: skipped, {source}")]
    GeometryFailure {
        instance: String,
        #[source]
        source: GeometryError,
    },

    #[error("{instance}: material slot {slot} has no material")]
    MissingMaterial { instance: String, slot: usize },

    #[error("{instance}: material slot {slot} has no triangles")]
    EmptySlot { instance: String, slot: usize },

    #[error("{instance}: material {material:?} (slot {slot}) has no resolvable texture")]
    UnresolvedTexture {
        instance: String,
        slot: usize,
        material: String,
    },
}

impl Diagnostic {
    pub fn instance(&self) -> &str {
        match self {
            Diagnostic::GeometryFailure { instance, .. }
            | Diagnostic::MissingMaterial { instance, .. }
            | Diagnostic::EmptySlot { instance, .. }
            | Diagnostic::UnresolvedTexture { instance, .. } => instance,
        }
    }
}

/// Authoring Z-up to target Y-up: (x, y, z) -> (x, z, -y).
pub fn axis_conversion() -> Mat4 {
    Mat4::from_cols(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, -1.0, 0.0),
        Vec4::new(0.0, 1.0, 0.0, 0.0),
        Vec4::W,
    )
}

/// Flattens instances into a [`ModelBuilder`].
#[derive(Debug, Clone)]
pub struct SceneFlattener {
    global: Mat4,
    split_by_material: bool,
    add_dummy_colors: bool,
}

impl SceneFlattener {
    pub fn new(options: &ExportOptions) -> Self {
        Self {
            global: Mat4::from_scale(Vec3::splat(options.magnification)) * axis_conversion(),
            split_by_material: options.split_mesh_by_material,
            add_dummy_colors: options.add_dummy_colors,
        }
    }

    /// Scale and axis conversion applied on top of every world transform.
    pub fn global_matrix(&self) -> Mat4 {
        self.global
    }

    /// Flatten one instance. Returns the number of polygons added.
    pub fn flatten_instance<P: MeshInstanceProvider>(
        &self,
        provider: &P,
        instance: &P::Instance,
        priority: i32,
        model: &mut ModelBuilder,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> usize {
        let name = provider.instance_name(instance);

        // Facepoint lookup indexes by vertex and corner, so check provider output first.
        let triangulated = provider
            .triangulate(instance)
            .and_then(|geometry| geometry.validate().map(|()| geometry));
        let geometry = match triangulated {
            Ok(geometry) => geometry,
            Err(source) => {
                report(
                    diagnostics,
                    Diagnostic::GeometryFailure {
                        instance: name,
                        source,
                    },
                );
                return 0;
            }
        };

        let combined = self.global * provider.world_matrix(instance);
        let mesh = TransformedMesh::new(&geometry, combined);

        let color_channels = geometry.color_layers.len().min(MAX_COLOR_CHANNELS);
        let uv_channels = geometry.uv_layers.len().min(MAX_UV_CHANNELS);
        let dummy_colors = color_channels == 0 && self.add_dummy_colors;
        let descriptor = VertexDescriptor::new(
            if dummy_colors { 1 } else { color_channels },
            uv_channels,
        );

        tracing::debug!(
            "Flattening {:?}: {} triangles, {} color / {} uv channels{}",
            name,
            geometry.triangles.len(),
            color_channels,
            uv_channels,
            if dummy_colors { " (dummy colors)" } else { "" }
        );

        let mut added = 0;
        for (slot, material) in provider.material_slots(instance).iter().enumerate() {
            let Some(material) = material else {
                report(
                    diagnostics,
                    Diagnostic::MissingMaterial {
                        instance: name.clone(),
                        slot,
                    },
                );
                continue;
            };

            let facepoints: Vec<Facepoint> = geometry
                .triangles
                .iter()
                .enumerate()
                .filter(|(_, tri)| !self.split_by_material || tri.material_index == slot)
                .flat_map(|(t, tri)| {
                    FLIPPED_CORNERS.map(|corner| mesh.facepoint(t, tri, corner, dummy_colors))
                })
                .collect();
            if facepoints.is_empty() {
                report(
                    diagnostics,
                    Diagnostic::EmptySlot {
                        instance: name.clone(),
                        slot,
                    },
                );
                continue;
            }

            let Some(texture) = provider.resolve_texture(material) else {
                report(
                    diagnostics,
                    Diagnostic::UnresolvedTexture {
                        instance: name.clone(),
                        slot,
                        material: material.name.clone(),
                    },
                );
                continue;
            };

            tracing::debug!(
                "  slot {}: {:?} -> {:?}, {} facepoints",
                slot,
                material.name,
                texture,
                facepoints.len()
            );

            let polygon = Polygon::triangles(
                format!("{}___{}", name, texture),
                descriptor,
                facepoints,
            );
            let polygon_id = model.add_mesh(polygon);
            let material_id = model.add_material(Material::from_scene(material, texture));
            model.append_drawcall(material_id, polygon_id, priority);
            added += 1;

            if !self.split_by_material {
                break;
            }
        }
        added
    }
}

fn report(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    tracing::warn!("{}", diagnostic);
    diagnostics.push(diagnostic);
}

/// Geometry with positions and normals already in target space.
struct TransformedMesh<'a> {
    geometry: &'a MeshGeometry,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
}

impl<'a> TransformedMesh<'a> {
    fn new(geometry: &'a MeshGeometry, transform: Mat4) -> Self {
        let normal_matrix = normal_matrix(transform);
        Self {
            geometry,
            positions: geometry
                .positions
                .iter()
                .map(|&p| transform.transform_point3(p))
                .collect(),
            normals: geometry
                .normals
                .iter()
                .map(|&n| -(normal_matrix * n).normalize_or_zero())
                .collect(),
        }
    }

    fn facepoint(
        &self,
        triangle: usize,
        tri: &Triangle,
        corner: usize,
        dummy_colors: bool,
    ) -> Facepoint {
        let vertex = tri.vertices[corner] as usize;
        let loop_index = triangle * 3 + corner;

        let colors = if dummy_colors {
            vec![DUMMY_COLOR]
        } else {
            self.geometry
                .color_layers
                .iter()
                .take(MAX_COLOR_CHANNELS)
                .map(|layer| layer[loop_index])
                .collect()
        };
        let uvs = self
            .geometry
            .uv_layers
            .iter()
            .take(MAX_UV_CHANNELS)
            .map(|layer| {
                let [u, v] = layer[loop_index];
                [u, 1.0 - v]
            })
            .collect();

        Facepoint {
            position: self.positions[vertex],
            normal: self.normals[vertex],
            colors,
            uvs,
        }
    }
}

/// Inverse-transpose of the upper 3x3, falling back to the plain 3x3 for
/// degenerate transforms.
fn normal_matrix(transform: Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(transform);
    if linear.determinant().abs() <= f32::EPSILON {
        linear
    } else {
        linear.inverse().transpose()
    }
}
