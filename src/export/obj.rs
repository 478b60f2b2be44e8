//! Wavefront OBJ writer: `v` lines for vertices, `f` lines (1-based indices)
//! for faces, quads kept as 4-gons unless `triangulate` is set.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::ExportError;
use crate::scene::Scene;

pub fn export_obj(scene: &Scene, path: &Path, triangulate: bool) -> Result<(), ExportError> {
    let mut out = String::new();
    for v in scene.vertices.chunks_exact(3) {
        let _ = writeln!(out, "v {} {} {}", v[0], v[1], v[2]);
    }
    if triangulate {
        for t in scene.triangles() {
            let _ = writeln!(out, "f {} {} {}", t[0] + 1, t[1] + 1, t[2] + 1);
        }
    } else {
        for q in scene.quads.chunks_exact(4) {
            let _ = writeln!(out, "f {} {} {} {}", q[0] + 1, q[1] + 1, q[2] + 1, q[3] + 1);
        }
    }
    std::fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn one_quad_scene() -> Scene {
        let mut m = crate::mesh::QMesh::new();
        m.add_vertex(Vec3::new(0.0, 0.0, 0.0));
        m.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        m.add_vertex(Vec3::new(1.0, 1.0, 0.0));
        m.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        m.add_quad(0, 1, 2, 3);
        Scene::from(&m)
    }

    #[test]
    fn writes_quad_faces_by_default() {
        let dir = std::env::temp_dir().join("topolang_obj_quad_test.obj");
        export_obj(&one_quad_scene(), &dir, false).unwrap();
        let text = std::fs::read_to_string(&dir).unwrap();
        assert!(text.contains("f 1 2 3 4"));
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn writes_triangle_faces_when_requested() {
        let dir = std::env::temp_dir().join("topolang_obj_tri_test.obj");
        export_obj(&one_quad_scene(), &dir, true).unwrap();
        let text = std::fs::read_to_string(&dir).unwrap();
        assert!(text.contains("f 1 2 3"));
        assert!(text.contains("f 1 3 4"));
        let _ = std::fs::remove_file(&dir);
    }
}
