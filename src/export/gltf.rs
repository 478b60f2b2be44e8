//! glTF 2.0 writer: `<path>` (JSON) plus `<path>.bin` (raw buffer).
//!
//! Shape matches `original_source/src/gltf.c` exactly: one buffer, two
//! buffer views (`ARRAY_BUFFER` then `ELEMENT_ARRAY_BUFFER`), two accessors
//! (`VEC3`/`F32` positions, `SCALAR`/`U32` indices), one mesh with one
//! primitive, one node, one default scene. Quads are always triangulated —
//! glTF 2.0 primitives have no quad mode.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gltf_json as json;
use json::validation::Checked::Valid;

use crate::error::ExportError;
use crate::scene::Scene;

fn bin_bytes(positions: &[f32], indices: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(positions.len() * 4 + indices.len() * 4);
    for p in positions {
        bytes.extend_from_slice(&p.to_le_bytes());
    }
    for i in indices {
        bytes.extend_from_slice(&i.to_le_bytes());
    }
    bytes
}

fn bounds(scene: &Scene) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for v in scene.vertices.chunks_exact(3) {
        for k in 0..3 {
            min[k] = min[k].min(v[k]);
            max[k] = max[k].max(v[k]);
        }
    }
    if scene.vertex_count() == 0 {
        return ([0.0; 3], [0.0; 3]);
    }
    (min, max)
}

fn sibling_bin_path(path: &Path) -> Result<(PathBuf, String), ExportError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ExportError::Custom("export path has no file name".to_string()))?;
    let bin_name = format!("{}.bin", file_name);
    Ok((path.with_file_name(&bin_name), bin_name))
}

/// Writes `path` (the glTF JSON) and `<path>.bin` (the raw buffer) next to
/// it, per spec.md §6. Always triangulates the mesh's quads first.
pub fn export_gltf(scene: &Scene, path: &Path) -> Result<(), ExportError> {
    let indices: Vec<u32> = scene.triangles().into_iter().flatten().collect();
    let positions_bytes = (scene.vertices.len() * 4) as u32;
    let indices_bytes = (indices.len() * 4) as u32;

    let (bin_path, bin_name) = sibling_bin_path(path)?;
    std::fs::write(&bin_path, bin_bytes(&scene.vertices, &indices))?;

    let (min, max) = bounds(scene);
    let mut root = json::Root::default();

    let buffer = root.push(json::Buffer {
        byte_length: positions_bytes + indices_bytes,
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri: Some(bin_name),
    });

    let position_view = root.push(json::buffer::View {
        buffer,
        byte_length: positions_bytes,
        byte_offset: Some(0),
        byte_stride: None,
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        target: Some(Valid(json::buffer::Target::ArrayBuffer)),
    });

    let index_view = root.push(json::buffer::View {
        buffer,
        byte_length: indices_bytes,
        byte_offset: Some(positions_bytes),
        byte_stride: None,
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        target: Some(Valid(json::buffer::Target::ElementArrayBuffer)),
    });

    let positions = root.push(json::Accessor {
        buffer_view: Some(position_view),
        byte_offset: Some(0),
        count: scene.vertex_count() as u32,
        component_type: Valid(json::accessor::GenericComponentType(
            json::accessor::ComponentType::F32,
        )),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(json::accessor::Type::Vec3),
        min: Some(json::serialize::to_value(min.to_vec()).map_err(ExportError::Json)?),
        max: Some(json::serialize::to_value(max.to_vec()).map_err(ExportError::Json)?),
        name: None,
        normalized: false,
        sparse: None,
    });

    let index_accessor = root.push(json::Accessor {
        buffer_view: Some(index_view),
        byte_offset: Some(0),
        count: indices.len() as u32,
        component_type: Valid(json::accessor::GenericComponentType(
            json::accessor::ComponentType::U32,
        )),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(json::accessor::Type::Scalar),
        min: None,
        max: None,
        name: None,
        normalized: false,
        sparse: None,
    });

    let mut attributes = BTreeMap::new();
    attributes.insert(Valid(json::mesh::Semantic::Positions), positions);

    let primitive = json::mesh::Primitive {
        attributes,
        extensions: Default::default(),
        extras: Default::default(),
        indices: Some(index_accessor),
        material: None,
        mode: Valid(json::mesh::Mode::Triangles),
        targets: None,
    };

    let mesh = root.push(json::Mesh {
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        primitives: vec![primitive],
        weights: None,
    });

    let node = root.push(json::Node {
        mesh: Some(mesh),
        ..Default::default()
    });

    let scene_index = root.push(json::Scene {
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        nodes: vec![node],
    });
    root.scene = Some(scene_index);

    let json_string = serde_json::to_string_pretty(&root).map_err(ExportError::Json)?;
    std::fs::write(path, json_string)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_bytes_lays_out_positions_then_indices() {
        let bytes = bin_bytes(&[1.0, 2.0], &[7]);
        assert_eq!(bytes.len(), 4 + 4 + 4);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[8..12], &7u32.to_le_bytes());
    }

    #[test]
    fn sibling_bin_path_appends_extension() {
        let (p, name) = sibling_bin_path(Path::new("out/model.gltf")).unwrap();
        assert_eq!(name, "model.gltf.bin");
        assert_eq!(p, Path::new("out/model.gltf.bin"));
    }
}
