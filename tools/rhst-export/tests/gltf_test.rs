//! glTF scene export tests
//!
//! Tests the complete flow:
//! 1. Write a glTF scene with an external buffer
//! 2. Load it through `GltfScene` and export
//! 3. Decode the stream and validate structure and vertex data

#[path = "support/gltf_generator.rs"]
mod gltf_generator;
#[path = "../../../rhst-common/tests/support/reader.rs"]
mod reader;

use std::process::Command;

use reader::Reader;
use rhst_export::scene::{PixelEngineMode, WrapMode};
use rhst_export::{
    export_scene, Diagnostic, ExportOptions, GeometryError, GltfScene, MeshInstanceProvider,
    Value,
};
use tempfile::tempdir;

fn unit_options() -> ExportOptions {
    ExportOptions {
        magnification: 1.0,
        ..ExportOptions::default()
    }
}

fn floats(value: &Value) -> Vec<f32> {
    value
        .as_array()
        .expect("expected a list")
        .iter()
        .map(|v| match v {
            Value::Float(f) => *f,
            other => panic!("expected a float, got {:?}", other),
        })
        .collect()
}

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-5, "{:?} != {:?}", actual, expected);
    }
}

#[test]
fn test_load_instances_and_priority() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = gltf_generator::write_test_scene(dir.path());

    let scene = GltfScene::load(&path).expect("Failed to load glTF");
    let instances = scene.instances();
    assert_eq!(instances, [(0, 2), (1, 0)]);
    assert_eq!(scene.instance_name(&0), "floor");
    assert_eq!(scene.instance_name(&1), "wire");
}

#[test]
fn test_material_slots() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = gltf_generator::write_test_scene(dir.path());
    let scene = GltfScene::load(&path).expect("Failed to load glTF");

    let slots = scene.material_slots(&0);
    assert_eq!(slots.len(), 2);

    let grass = slots[0].as_ref().expect("slot 0 has a material");
    assert_eq!(grass.name, "grass");
    assert_eq!(grass.settings.wrap_u, WrapMode::Clamp);
    assert_eq!(grass.settings.wrap_v, WrapMode::Repeat);
    assert_eq!(grass.settings.pe, PixelEngineMode::Opaque);
    assert!(!grass.settings.display_back);
    assert_eq!(scene.resolve_texture(grass).as_deref(), Some("grass"));

    let stone = slots[1].as_ref().expect("slot 1 has a material");
    assert_eq!(stone.settings.pe, PixelEngineMode::Translucent);
    assert!(stone.settings.display_back);
    // Image name wins over the URI
    assert_eq!(scene.resolve_texture(stone).as_deref(), Some("stone"));
}

#[test]
fn test_triangulate_lists_and_fans() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = gltf_generator::write_test_scene(dir.path());
    let scene = GltfScene::load(&path).expect("Failed to load glTF");

    let geometry = scene.triangulate(&0).expect("floor triangulates");
    assert_eq!(geometry.positions.len(), 8);
    assert_eq!(geometry.triangles.len(), 4);
    assert_eq!(geometry.uv_layers.len(), 1);
    assert_eq!(geometry.uv_layers[0].len(), 12);
    assert!(geometry.color_layers.is_empty());

    let slots: Vec<_> = geometry.triangles.iter().map(|t| t.material_index).collect();
    assert_eq!(slots, [0, 0, 1, 1]);
    // Fan over vertices 4..8
    assert_eq!(geometry.triangles[2].vertices, [5, 6, 4]);
    assert_eq!(geometry.triangles[3].vertices, [6, 7, 4]);

    assert!(matches!(
        scene.triangulate(&1),
        Err(GeometryError::UnsupportedTopology(_))
    ));
}

#[test]
fn test_gltf_export_end_to_end() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = gltf_generator::write_test_scene(dir.path());
    let output = dir.path().join("scene.rhst");

    let scene = GltfScene::load(&path).expect("Failed to load glTF");
    let report = export_scene(&scene, &output, &unit_options()).expect("Export failed");

    assert_eq!(report.instances, 2);
    assert_eq!(report.materials, 2);
    assert_eq!(report.polygons, 2);
    assert_eq!(report.draws, 2);
    assert_eq!(report.diagnostics.len(), 1);
    assert!(matches!(
        &report.diagnostics[0],
        Diagnostic::GeometryFailure { instance, .. } if instance == "wire"
    ));

    let data = std::fs::read(&output).expect("Failed to read output");
    let document = Reader::new(&data).read_document();

    let polygons = document.body.get("polygons").and_then(Value::as_array).unwrap();
    let grass = polygons[0].as_dict().unwrap();
    assert_eq!(grass.name(), Some(&Value::from("floor___grass")));

    let matrix_primitive = grass.get("matrix_primitives").and_then(Value::as_array).unwrap()[0]
        .as_dict()
        .unwrap();
    let primitive = matrix_primitive.get("primitives").and_then(Value::as_array).unwrap()[0]
        .as_dict()
        .unwrap();
    let facepoints = primitive.get("facepoints").and_then(Value::as_array).unwrap();
    assert_eq!(facepoints.len(), 6);

    // Corner 0 of the first triangle: glTF vertex 0 moved by the parent node.
    // Y-up input and Y-up output cancel, so coordinates match glTF space.
    let first = facepoints[0].as_array().unwrap();
    let [tx, ty, tz] = gltf_generator::PARENT_TRANSLATION;
    assert_close(&floats(&first[0]), &[tx, ty, tz]);
    assert_close(&floats(&first[1]), &[0.0, -1.0, 0.0]);
    // Dummy white color, then V-flipped UV
    assert_close(&floats(&first[2]), &[1.0, 1.0, 1.0, 1.0]);
    assert_close(&floats(&first[3]), &[0.0, 1.0]);

    // Second emitted corner is vertex 2 (reversed winding)
    let second = facepoints[1].as_array().unwrap();
    let [x, y, z] = gltf_generator::POSITIONS[2];
    assert_close(&floats(&second[0]), &[x + tx, y + ty, z + tz]);

    let materials = document.body.get("materials").and_then(Value::as_array).unwrap();
    let grass_material = materials[0].as_dict().unwrap();
    assert_eq!(grass_material.get("wrap_u"), Some(&Value::from("clamp")));
    let stone_material = materials[1].as_dict().unwrap();
    assert_eq!(stone_material.get("pe"), Some(&Value::from("translucent")));
    assert_eq!(stone_material.get("display_back"), Some(&Value::Int(1)));

    let bone = document.body.get("bones").and_then(Value::as_array).unwrap()[0]
        .as_dict()
        .unwrap();
    let draws = bone.get("draws").and_then(Value::as_array).unwrap();
    assert_eq!(
        draws[1],
        Value::Array(vec![Value::Int(1), Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let err = GltfScene::load(&dir.path().join("nope.gltf")).unwrap_err();
    assert!(err.to_string().contains("failed to load scene"));
}

#[test]
fn test_load_file_without_scene() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("bare.gltf");
    std::fs::write(&path, r#"{"asset":{"version":"2.0"}}"#).unwrap();

    let err = GltfScene::load(&path).unwrap_err();
    assert!(matches!(err, rhst_export::ExportError::EmptyScene { .. }));
    assert!(err.to_string().ends_with("defines no scene"), "{}", err);
}

#[test]
fn test_cli_export() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = gltf_generator::write_test_scene(dir.path());
    let output = dir.path().join("cli.rhst");

    let status = Command::new(env!("CARGO_BIN_EXE_rhst-export"))
        .arg("export")
        .arg(&path)
        .arg("-o")
        .arg(&output)
        .args(["--magnification", "16", "--no-split"])
        .status()
        .expect("Failed to run rhst-export");
    assert!(status.success(), "rhst-export export failed");

    let data = std::fs::read(&output).expect("Failed to read output");
    let document = Reader::new(&data).read_document();
    let polygons = document.body.get("polygons").and_then(Value::as_array).unwrap();
    assert_eq!(polygons.len(), 1);
}

#[test]
fn test_cli_default_output_and_config() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = gltf_generator::write_test_scene(dir.path());
    let config = dir.path().join("export.toml");
    std::fs::write(&config, "bone_name = \"level_root\"\nadd_dummy_colors = false\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_rhst-export"))
        .arg("export")
        .arg(&path)
        .arg("--config")
        .arg(&config)
        .status()
        .expect("Failed to run rhst-export");
    assert!(status.success(), "rhst-export export failed");

    let data = std::fs::read(dir.path().join("scene.rhst")).expect("Default output missing");
    let document = Reader::new(&data).read_document();
    let bone = document.body.get("bones").and_then(Value::as_array).unwrap()[0]
        .as_dict()
        .unwrap();
    assert_eq!(bone.name(), Some(&Value::from("level_root")));
}

#[test]
fn test_cli_list_and_failure() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = gltf_generator::write_test_scene(dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_rhst-export"))
        .arg("list")
        .arg(&path)
        .output()
        .expect("Failed to run rhst-export");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("floor"));
    assert!(stdout.contains("grass"));

    let status = Command::new(env!("CARGO_BIN_EXE_rhst-export"))
        .arg("export")
        .arg(dir.path().join("missing.gltf"))
        .status()
        .expect("Failed to run rhst-export");
    assert!(!status.success());
}
