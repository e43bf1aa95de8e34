//! In-memory scene provider

use glam::Mat4;

use super::{group_priority, MeshGeometry, MeshInstanceProvider, SceneMaterial};
use crate::error::GeometryError;

/// A mesh instance built programmatically.
#[derive(Debug, Clone)]
pub struct MemoryInstance {
    pub name: String,
    /// Containing group; its `:<n>` suffix sets the draw priority.
    pub group: Option<String>,
    pub world: Mat4,
    /// `None` models an instance whose mesh cannot be evaluated.
    pub geometry: Option<MeshGeometry>,
    pub materials: Vec<Option<SceneMaterial>>,
}

impl MemoryInstance {
    pub fn new(name: impl Into<String>, geometry: MeshGeometry) -> Self {
        Self {
            name: name.into(),
            group: None,
            world: Mat4::IDENTITY,
            geometry: Some(geometry),
            materials: Vec::new(),
        }
    }

    /// An instance whose geometry cannot be evaluated.
    pub fn unevaluable(name: impl Into<String>) -> Self {
        Self {
            geometry: None,
            ..Self::new(name, MeshGeometry::default())
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_world(mut self, world: Mat4) -> Self {
        self.world = world;
        self
    }

    /// Append a material slot (`None` leaves the slot unassigned).
    pub fn with_material(mut self, material: Option<SceneMaterial>) -> Self {
        self.materials.push(material);
        self
    }
}

/// Scene held entirely in memory. Instance handles are insertion indices.
#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    instances: Vec<MemoryInstance>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instance: MemoryInstance) -> usize {
        self.instances.push(instance);
        self.instances.len() - 1
    }

    pub fn with(mut self, instance: MemoryInstance) -> Self {
        self.push(instance);
        self
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl MeshInstanceProvider for MemoryScene {
    type Instance = usize;

    fn instances(&self) -> Vec<(usize, i32)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, inst)| (i, inst.group.as_deref().map_or(0, group_priority)))
            .collect()
    }

    fn instance_name(&self, instance: &usize) -> String {
        self.instances[*instance].name.clone()
    }

    fn world_matrix(&self, instance: &usize) -> Mat4 {
        self.instances[*instance].world
    }

    fn triangulate(&self, instance: &usize) -> Result<MeshGeometry, GeometryError> {
        let instance = &self.instances[*instance];
        let geometry = instance.geometry.clone().ok_or_else(|| {
            GeometryError::Triangulation(format!("{} has no evaluated mesh", instance.name))
        })?;
        geometry.validate()?;
        Ok(geometry)
    }

    fn material_slots(&self, instance: &usize) -> Vec<Option<SceneMaterial>> {
        self.instances[*instance].materials.clone()
    }
}
