//! Writes a small glTF scene (JSON + external .bin buffer) for tests.
//!
//! Layout:
//! - node "level:2" (no mesh, translation +1 X) with child node "floor"
//!   - mesh "floor": indexed triangle quad using material "grass", plus a
//!     triangle fan over the same vertices using material "stone"
//! - node "wire": a LINES primitive, which cannot be triangulated
//!
//! The quad lies in the glTF XZ plane facing +Y.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::json;

pub const POSITIONS: [[f32; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 0.0, -1.0],
    [0.0, 0.0, -1.0],
];
pub const UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
pub const INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];
pub const PARENT_TRANSLATION: [f32; 3] = [1.0, 0.0, 0.0];

const GL_FLOAT: u32 = 5126;
const GL_UNSIGNED_SHORT: u32 = 5123;
const GL_CLAMP_TO_EDGE: u32 = 33071;
const GL_REPEAT: u32 = 10497;

const MODE_LINES: u32 = 1;
const MODE_TRIANGLES: u32 = 4;
const MODE_TRIANGLE_FAN: u32 = 6;

fn push_f32s(buffer: &mut Vec<u8>, values: impl IntoIterator<Item = f32>) {
    for v in values {
        buffer.extend_from_slice(&v.to_le_bytes());
    }
}

/// Write `scene.gltf` and `scene.bin` into `dir`; returns the .gltf path.
pub fn write_test_scene(dir: &Path) -> PathBuf {
    let mut buffer = Vec::new();
    push_f32s(&mut buffer, POSITIONS.iter().flatten().copied());
    let normals_offset = buffer.len();
    push_f32s(&mut buffer, [0.0f32, 1.0, 0.0].repeat(4));
    let uvs_offset = buffer.len();
    push_f32s(&mut buffer, UVS.iter().flatten().copied());
    let indices_offset = buffer.len();
    for index in INDICES {
        buffer.extend_from_slice(&index.to_le_bytes());
    }
    let indices_len = buffer.len() - indices_offset;
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }

    let document = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0, 2] }],
        "nodes": [
            { "name": "level:2", "translation": PARENT_TRANSLATION, "children": [1] },
            { "name": "floor", "mesh": 0 },
            { "name": "wire", "mesh": 1 }
        ],
        "meshes": [
            {
                "name": "floor",
                "primitives": [
                    {
                        "attributes": { "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2 },
                        "indices": 3,
                        "material": 0,
                        "mode": MODE_TRIANGLES
                    },
                    {
                        "attributes": { "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2 },
                        "material": 1,
                        "mode": MODE_TRIANGLE_FAN
                    }
                ]
            },
            {
                "name": "wire",
                "primitives": [
                    { "attributes": { "POSITION": 0 }, "mode": MODE_LINES }
                ]
            }
        ],
        "materials": [
            {
                "name": "grass",
                "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } }
            },
            {
                "name": "stone",
                "alphaMode": "BLEND",
                "doubleSided": true,
                "pbrMetallicRoughness": { "baseColorTexture": { "index": 1 } }
            }
        ],
        "textures": [
            { "source": 0, "sampler": 0 },
            { "source": 1, "sampler": 1 }
        ],
        "samplers": [
            { "wrapS": GL_CLAMP_TO_EDGE, "wrapT": GL_REPEAT },
            {}
        ],
        "images": [
            { "uri": "textures/grass.png" },
            { "name": "stone", "uri": "stone_diffuse.png" }
        ],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": GL_FLOAT,
                "count": 4,
                "type": "VEC3",
                "min": [0.0, 0.0, -1.0],
                "max": [1.0, 0.0, 0.0]
            },
            { "bufferView": 1, "componentType": GL_FLOAT, "count": 4, "type": "VEC3" },
            { "bufferView": 2, "componentType": GL_FLOAT, "count": 4, "type": "VEC2" },
            { "bufferView": 3, "componentType": GL_UNSIGNED_SHORT, "count": 6, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": normals_offset },
            { "buffer": 0, "byteOffset": normals_offset, "byteLength": uvs_offset - normals_offset },
            { "buffer": 0, "byteOffset": uvs_offset, "byteLength": indices_offset - uvs_offset },
            { "buffer": 0, "byteOffset": indices_offset, "byteLength": indices_len }
        ],
        "buffers": [{ "uri": "scene.bin", "byteLength": buffer.len() }]
    });

    std::fs::write(dir.join("scene.bin"), &buffer).expect("Failed to write buffer");
    let path = dir.join("scene.gltf");
    let text = serde_json::to_string_pretty(&document).expect("Failed to serialize glTF");
    std::fs::write(&path, text).expect("Failed to write glTF");
    path
}
