//! Export options
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file) yields a working configuration.

use std::path::Path;

use anyhow::{Context, Result};
use rhst_common::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};

/// Scale / rotate / translate triple written into the root bone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Srt {
    pub scale: [f32; 3],
    /// Euler angles in degrees
    pub rotate: [f32; 3],
    pub translate: [f32; 3],
}

impl Default for Srt {
    fn default() -> Self {
        Self {
            scale: [1.0; 3],
            rotate: [0.0; 3],
            translate: [0.0; 3],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Uniform scale applied to all geometry.
    pub magnification: f32,

    /// Emit one polygon per material slot. When false, the first exported
    /// slot of each instance receives all of its triangles.
    pub split_mesh_by_material: bool,

    /// Declare a color channel for meshes without vertex colors, filled
    /// with opaque white.
    pub add_dummy_colors: bool,

    pub root_transform: Srt,

    /// Stream capacity in bytes.
    pub capacity: usize,

    pub generator: String,
    pub format_type: String,
    pub format_version: String,

    /// Name of the single root bone.
    pub bone_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            magnification: 1000.0,
            split_mesh_by_material: true,
            add_dummy_colors: true,
            root_transform: Srt::default(),
            capacity: DEFAULT_CAPACITY,
            generator: "RiiStudio Blender".to_string(),
            format_type: "JMDL".to_string(),
            format_version: "Beta 1".to_string(),
            bone_name: "blender_root".to_string(),
        }
    }
}

impl ExportOptions {
    /// Load options from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read export options: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid export options: {}", path.display()))
    }

    /// Parse options from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let options: Self = toml::from_str(content).context("Failed to parse export options")?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.magnification.is_finite() || self.magnification <= 0.0 {
            anyhow::bail!(
                "magnification must be a positive number, got {}",
                self.magnification
            );
        }
        if self.capacity == 0 {
            anyhow::bail!("capacity must be greater than zero");
        }
        if self.bone_name.is_empty() {
            anyhow::bail!("bone_name must not be empty");
        }
        Ok(())
    }
}
