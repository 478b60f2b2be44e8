//! Scene conversion: the arena/builder-owned final `QMesh` crosses into a
//! caller-owned, heap-backed flat representation (spec.md §4.9).
//!
//! Mirrors `original_source/src/topolang.c`'s `topo_execute` copy loop
//! (`scene->vertices[3*V]`, `scene->quads[4*Q]`) — here `Vec<f32>`/`Vec<u32>`
//! stand in for the caller-freed heap arrays; Rust's ownership already gives
//! the "separate, heap-owned resource" spec.md asks for without a matching
//! `free_scene`.

use crate::mesh::QMesh;

/// A mesh exported out of the interpreter: flat, caller-owned, no arena ties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// `[x0,y0,z0, x1,y1,z1, ...]`, length `3 * vertex_count()`.
    pub vertices: Vec<f32>,
    /// `[a0,b0,c0,d0, a1,b1,c1,d1, ...]`, length `4 * quad_count()`.
    pub quads: Vec<u32>,
}

impl Scene {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn quad_count(&self) -> usize {
        self.quads.len() / 4
    }

    /// Every quad as two CCW triangles, for exporters that need triangles.
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        let mut out = Vec::with_capacity(self.quad_count() * 2);
        for q in self.quads.chunks_exact(4) {
            out.push([q[0], q[1], q[2]]);
            out.push([q[0], q[2], q[3]]);
        }
        out
    }
}

impl From<&QMesh> for Scene {
    fn from(m: &QMesh) -> Self {
        let mut vertices = Vec::with_capacity(m.v_count() * 3);
        for p in &m.v {
            vertices.push(p.x);
            vertices.push(p.y);
            vertices.push(p.z);
        }
        let mut quads = Vec::with_capacity(m.q_count() * 4);
        for q in &m.q {
            quads.push(q.a as u32);
            quads.push(q.b as u32);
            quads.push(q.c as u32);
            quads.push(q.d as u32);
        }
        Scene { vertices, quads }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn converts_vertex_and_quad_arrays() {
        let mut m = QMesh::new();
        m.add_vertex(Vec3::new(1.0, 2.0, 3.0));
        m.add_vertex(Vec3::new(4.0, 5.0, 6.0));
        m.add_vertex(Vec3::new(7.0, 8.0, 9.0));
        m.add_vertex(Vec3::new(10.0, 11.0, 12.0));
        m.add_quad(0, 1, 2, 3);

        let scene = Scene::from(&m);
        assert_eq!(scene.vertex_count(), 4);
        assert_eq!(scene.quad_count(), 1);
        assert_eq!(scene.vertices[3..6], [4.0, 5.0, 6.0]);
        assert_eq!(scene.quads, vec![0, 1, 2, 3]);
    }

    #[test]
    fn triangulates_each_quad_into_two_triangles() {
        let mut m = QMesh::new();
        for _ in 0..4 {
            m.add_vertex(Vec3::ZERO);
        }
        m.add_quad(0, 1, 2, 3);
        let scene = Scene::from(&m);
        assert_eq!(scene.triangles(), vec![[0, 1, 2], [0, 2, 3]]);
    }
}
