//! Execution host: the builder mesh plus the mesh/ring handle tables.
//!
//! Mirrors `original_source/include/intrinsics.h`'s `Host` (`arena`,
//! `build`, allocator trampoline) minus the arena trampoline, which Rust's
//! ownership already gives us for free. "Builder" is the shared mutable
//! `QMesh` intrinsics like `vertex`/`ring` write into (spec.md §4.8); it is
//! lazily created, process-local to one execution, and never exposed to the
//! caller directly — only by the handles it hands out.

use crate::mesh::{QMesh, Ring};
use crate::value::{MeshId, RingId};

#[derive(Debug, Default)]
pub struct Host {
    builder: Option<QMesh>,
    meshes: Vec<QMesh>,
    rings: Vec<Ring>,
}

impl Host {
    pub fn new() -> Self {
        Host::default()
    }

    /// The shared vertex pool for rings created during this execution,
    /// created on first use (spec.md §4.8's "lazily created").
    pub fn builder_mut(&mut self) -> &mut QMesh {
        self.builder.get_or_insert_with(QMesh::new)
    }

    pub fn builder(&self) -> Option<&QMesh> {
        self.builder.as_ref()
    }

    pub fn alloc_mesh(&mut self, m: QMesh) -> MeshId {
        self.meshes.push(m);
        MeshId(self.meshes.len() - 1)
    }

    pub fn alloc_ring(&mut self, r: Ring) -> RingId {
        self.rings.push(r);
        RingId(self.rings.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> &QMesh {
        &self.meshes[id.0]
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> &mut QMesh {
        &mut self.meshes[id.0]
    }

    pub fn ring(&self, id: RingId) -> &Ring {
        &self.rings[id.0]
    }

    /// Rough byte footprint of every mesh/ring this execution has allocated
    /// (builder included), used to charge the public API's arena budget
    /// (spec.md §5/§7: "exactly one allocator for all language-visible data").
    pub fn total_bytes(&self) -> usize {
        const VERTEX_BYTES: usize = std::mem::size_of::<glam::Vec3>();
        const QUAD_BYTES: usize = std::mem::size_of::<[usize; 4]>();
        const RING_IDX_BYTES: usize = std::mem::size_of::<usize>();

        let mesh_bytes = |m: &QMesh| m.v_count() * VERTEX_BYTES + m.q_count() * QUAD_BYTES;
        let builder = self.builder.as_ref().map(mesh_bytes).unwrap_or(0);
        let meshes: usize = self.meshes.iter().map(mesh_bytes).sum();
        let rings: usize = self.rings.iter().map(|r| r.len() * RING_IDX_BYTES).sum();
        builder + meshes + rings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_is_created_lazily_and_shared() {
        let mut h = Host::new();
        assert!(h.builder().is_none());
        h.builder_mut().add_vertex(glam::Vec3::ZERO);
        assert_eq!(h.builder().unwrap().v_count(), 1);
    }

    #[test]
    fn mesh_and_ring_handles_round_trip() {
        let mut h = Host::new();
        let mid = h.alloc_mesh(QMesh::new());
        let rid = h.alloc_ring(Ring::default());
        assert_eq!(h.mesh(mid).v_count(), 0);
        assert_eq!(h.ring(rid).len(), 0);
    }

    #[test]
    fn total_bytes_grows_as_meshes_are_allocated() {
        let mut h = Host::new();
        assert_eq!(h.total_bytes(), 0);
        let mut m = QMesh::new();
        m.add_vertex(glam::Vec3::ZERO);
        h.alloc_mesh(m);
        assert!(h.total_bytes() > 0);
    }
}
