//! Export orchestration
//!
//! One export owns one [`WriterRegistry`]. The destination stream is opened
//! first and the header and head written; the scene is then flattened and the
//! body serialized. Any fatal error force-closes every registered stream and
//! removes the partially written destination, so a failed export never leaves
//! a file behind.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rhst_common::{TreeEncoder, Value, WriterRegistry};

use crate::error::ExportError;
use crate::flatten::{Diagnostic, SceneFlattener};
use crate::model::{Bone, Document, Head, ModelBuilder};
use crate::options::ExportOptions;
use crate::scene::MeshInstanceProvider;

/// Summary of a successful export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub destination: PathBuf,
    pub instances: usize,
    pub materials: usize,
    pub polygons: usize,
    pub draws: usize,
    pub bytes_written: usize,
    /// Skipped instances and slots, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
}

/// Head record for the given options.
pub fn build_head(options: &ExportOptions) -> Head {
    Head {
        generator: options.generator.clone(),
        format_type: options.format_type.clone(),
        version: options.format_version.clone(),
    }
}

/// Flatten every instance of `provider` into an in-memory document.
pub fn build_document<P: MeshInstanceProvider>(
    provider: &P,
    options: &ExportOptions,
) -> (Document, Vec<Diagnostic>) {
    let (document, diagnostics, _) = flatten_scene(provider, options);
    (document, diagnostics)
}

/// Walks the provider's instances once; also returns how many there were.
fn flatten_scene<P: MeshInstanceProvider>(
    provider: &P,
    options: &ExportOptions,
) -> (Document, Vec<Diagnostic>, usize) {
    let flattener = SceneFlattener::new(options);
    let mut model = ModelBuilder::new(Bone::root(
        options.bone_name.as_str(),
        options.root_transform,
    ));
    let mut diagnostics = Vec::new();

    let instances = provider.instances();
    let count = instances.len();
    for (instance, priority) in instances {
        flattener.flatten_instance(provider, &instance, priority, &mut model, &mut diagnostics);
    }

    let document = Document {
        head: build_head(options),
        body: model.finish(),
    };
    (document, diagnostics, count)
}

/// Export `provider` to an RHST stream at `destination`.
///
/// On error the destination must not be used; it has already been removed.
pub fn export_scene<P: MeshInstanceProvider>(
    provider: &P,
    destination: &Path,
    options: &ExportOptions,
) -> Result<ExportReport, ExportError> {
    let start = Instant::now();
    let report = guarded(destination, |registry, opened| {
        write_scene(registry, opened, provider, destination, options)
    })?;

    tracing::info!(
        "Exported {:?}: {} materials, {} polygons, {} draws, {} bytes in {:.1} ms ({} skipped)",
        destination,
        report.materials,
        report.polygons,
        report.draws,
        report.bytes_written,
        start.elapsed().as_secs_f64() * 1000.0,
        report.diagnostics.len()
    );
    Ok(report)
}

/// Write an already built head and body as a complete RHST document.
///
/// Same cleanup guarantees as [`export_scene`]. Returns the bytes written.
pub fn export_document(
    head: &Value,
    body: &Value,
    destination: &Path,
    capacity: usize,
) -> Result<usize, ExportError> {
    guarded(destination, |registry, opened| {
        let id = registry.open(destination, capacity)?;
        *opened = true;
        TreeEncoder::new(registry.get_mut(id)?).write_document(head, body)?;
        Ok(registry.close(id)?)
    })
}

/// Run one export against a fresh registry. On failure every stream is
/// force-closed and, once the destination has been opened, it is removed.
fn guarded<T>(
    destination: &Path,
    export: impl FnOnce(&mut WriterRegistry, &mut bool) -> Result<T, ExportError>,
) -> Result<T, ExportError> {
    let mut registry = WriterRegistry::new();
    let mut opened = false;

    export(&mut registry, &mut opened).inspect_err(|e| {
        let closed = registry.close_all();
        tracing::debug!("Export failed ({}), closed {} stream(s)", e, closed);
        if opened {
            remove_partial(destination);
        }
    })
}

fn write_scene<P: MeshInstanceProvider>(
    registry: &mut WriterRegistry,
    opened: &mut bool,
    provider: &P,
    destination: &Path,
    options: &ExportOptions,
) -> Result<ExportReport, ExportError> {
    let id = registry.open(destination, options.capacity)?;
    *opened = true;

    {
        let mut encoder = TreeEncoder::new(registry.get_mut(id)?);
        encoder.begin_document()?;
        encoder.encode(&build_head(options).to_value())?;
    }

    let (document, diagnostics, instances) = flatten_scene(provider, options);
    let body = &document.body;

    let serialize_start = Instant::now();
    {
        let mut encoder = TreeEncoder::new(registry.get_mut(id)?);
        encoder.encode(&body.to_value())?;
        encoder.end_document()?;
    }
    let bytes_written = registry.close(id)?;
    tracing::info!(
        "Serialized body in {:.1} ms",
        serialize_start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(ExportReport {
        destination: destination.to_path_buf(),
        instances,
        materials: body.materials.len(),
        polygons: body.polygons.len(),
        draws: body.bones.iter().map(|b| b.draws.len()).sum(),
        bytes_written,
        diagnostics,
    })
}

fn remove_partial(destination: &Path) {
    match std::fs::remove_file(destination) {
        Ok(()) => tracing::debug!("Removed partial output {:?}", destination),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial output {:?}: {}", destination, e),
    }
}
