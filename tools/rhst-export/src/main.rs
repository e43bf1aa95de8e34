//! rhst-export - scene to RHST exporter
//!
//! Loads a glTF/GLB scene and writes an `.rhst` intermediate stream for the
//! downstream model converter.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use rhst_export::{export_scene, ExportOptions, GltfScene, MeshInstanceProvider};

#[derive(Parser)]
#[command(name = "rhst-export")]
#[command(about = "Scene to RHST intermediate exporter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene to an .rhst stream
    Export {
        /// Input scene (glTF/GLB)
        input: PathBuf,

        /// Output .rhst file (default: input with .rhst extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export options file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Uniform scale applied to all geometry
        #[arg(long)]
        magnification: Option<f32>,

        /// Put all of a mesh's triangles in its first material's polygon
        #[arg(long)]
        no_split: bool,

        /// Don't synthesize a white color channel for meshes without colors
        #[arg(long)]
        no_dummy_colors: bool,

        /// Stream capacity in bytes
        #[arg(long)]
        capacity: Option<usize>,
    },

    /// List the mesh instances of a scene without exporting
    List {
        /// Input scene (glTF/GLB)
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match cli.command {
        Commands::Export {
            input,
            output,
            config,
            magnification,
            no_split,
            no_dummy_colors,
            capacity,
        } => {
            let mut options = match &config {
                Some(path) => ExportOptions::load(path)?,
                None => ExportOptions::default(),
            };
            if let Some(magnification) = magnification {
                options.magnification = magnification;
            }
            if no_split {
                options.split_mesh_by_material = false;
            }
            if no_dummy_colors {
                options.add_dummy_colors = false;
            }
            if let Some(capacity) = capacity {
                options.capacity = capacity;
            }
            options.validate().context("Invalid export options")?;

            let output = output.unwrap_or_else(|| default_output(&input));
            export(&input, &output, &options)
        }
        Commands::List { input } => list(&input),
    }
}

fn default_output(input: &Path) -> PathBuf {
    input.with_extension("rhst")
}

fn export(input: &Path, output: &Path, options: &ExportOptions) -> Result<()> {
    let scene = GltfScene::load(input)?;
    let report = export_scene(&scene, output, options)
        .with_context(|| format!("Failed to export {}", input.display()))?;

    println!(
        "Exported {} -> {}",
        input.display(),
        report.destination.display()
    );
    println!(
        "  {} instances, {} materials, {} polygons, {} draws, {} bytes",
        report.instances, report.materials, report.polygons, report.draws, report.bytes_written
    );
    if !report.diagnostics.is_empty() {
        println!("  {} skipped:", report.diagnostics.len());
        for diagnostic in &report.diagnostics {
            println!("    {}", diagnostic);
        }
    }
    Ok(())
}

fn list(input: &Path) -> Result<()> {
    let scene = GltfScene::load(input)?;
    println!("{} mesh instance(s) in {}:", scene.instance_count(), input.display());
    for (instance, priority) in scene.instances() {
        let slots = scene.material_slots(&instance);
        println!(
            "  [{}] {} (priority {}, {} material slot(s))",
            instance,
            scene.instance_name(&instance),
            priority,
            slots.len()
        );
        for (slot, material) in slots.iter().enumerate() {
            match material {
                Some(material) => println!(
                    "      {}: {} -> {}",
                    slot,
                    material.name,
                    scene
                        .resolve_texture(material)
                        .unwrap_or_else(|| "<no texture>".to_string())
                ),
                None => println!("      {}: <none>", slot),
            }
        }
    }
    Ok(())
}
