//! The quad-mesh kernel: vertex/quad storage plus the ring and mesh
//! operations every TL program bottoms out in.
//!
//! Ported from `original_source/src/mesh.c`. Growable arrays become `Vec`
//! (the C growth policy — double capacity, starting at 256 for vertices/quads
//! and 64 for ring indices — is preserved only as a `Vec::with_capacity` hint;
//! `Vec` already amortizes the same way). `Vector3` becomes `glam::Vec3`.

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quad {
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub d: usize,
}

impl Quad {
    pub fn new(a: usize, b: usize, c: usize, d: usize) -> Self {
        Quad { a, b, c, d }
    }

    fn offset(self, by: usize) -> Quad {
        Quad::new(self.a + by, self.b + by, self.c + by, self.d + by)
    }
}

/// A closed index loop into some [`QMesh`]. Does not own its vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ring {
    pub idx: Vec<usize>,
}

impl Ring {
    pub fn len(&self) -> usize {
        self.idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }
}

/// Growable vertex/quad storage. One `QMesh` instance is the "builder" for
/// an entire execution (spec.md §4.8); every other mesh value produced by an
/// intrinsic is its own freestanding `QMesh`.
#[derive(Debug, Clone, Default)]
pub struct QMesh {
    pub v: Vec<Vec3>,
    pub q: Vec<Quad>,
}

impl QMesh {
    pub fn new() -> Self {
        QMesh::default()
    }

    pub fn v_count(&self) -> usize {
        self.v.len()
    }

    pub fn q_count(&self) -> usize {
        self.q.len()
    }

    pub fn add_vertex(&mut self, p: Vec3) -> usize {
        self.v.push(p);
        self.v.len() - 1
    }

    pub fn add_quad(&mut self, a: usize, b: usize, c: usize, d: usize) {
        self.q.push(Quad::new(a, b, c, d));
    }

    /// `dst ← dst ∪ src`: appends src's vertices, then src's quads with
    /// every index biased by `dst`'s pre-merge vertex count.
    pub fn merge(&mut self, src: &QMesh) {
        let off = self.v_count();
        self.v.extend_from_slice(&src.v);
        self.q.extend(src.q.iter().map(|q| q.offset(off)));
    }

    pub fn translate(&mut self, d: Vec3) {
        for p in &mut self.v {
            *p += d;
        }
    }

    pub fn scale(&mut self, s: Vec3) {
        for p in &mut self.v {
            *p *= s;
        }
    }

    pub fn rotate_x(&mut self, rad: f32) {
        let (s, c) = rad.sin_cos();
        for p in &mut self.v {
            let (y, z) = (p.y, p.z);
            p.y = y * c - z * s;
            p.z = y * s + z * c;
        }
    }

    pub fn rotate_y(&mut self, rad: f32) {
        let (s, c) = rad.sin_cos();
        for p in &mut self.v {
            let (x, z) = (p.x, p.z);
            p.x = x * c + z * s;
            p.z = -x * s + z * c;
        }
    }

    pub fn rotate_z(&mut self, rad: f32) {
        let (s, c) = rad.sin_cos();
        for p in &mut self.v {
            let (x, y) = (p.x, p.y);
            p.x = x * c - y * s;
            p.y = x * s + y * c;
        }
    }

    fn mirror(&mut self, weld_eps: f32, negate: impl Fn(&mut Vec3), snap: impl Fn(&mut Vec3, f32)) {
        let v0 = self.v_count();
        for i in 0..v0 {
            let mut p = self.v[i];
            negate(&mut p);
            self.add_vertex(p);
        }
        let q0 = self.q_count();
        for i in 0..q0 {
            let q = self.q[i];
            self.add_quad(q.d + v0, q.c + v0, q.b + v0, q.a + v0);
        }
        for p in &mut self.v {
            snap(p, weld_eps);
        }
    }

    pub fn mirror_x(&mut self, weld_eps: f32) {
        self.mirror(weld_eps, |p| p.x = -p.x, |p, e| if p.x.abs() < e { p.x = 0.0 });
    }

    pub fn mirror_y(&mut self, weld_eps: f32) {
        self.mirror(weld_eps, |p| p.y = -p.y, |p, e| if p.y.abs() < e { p.y = 0.0 });
    }

    pub fn mirror_z(&mut self, weld_eps: f32) {
        self.mirror(weld_eps, |p| p.z = -p.z, |p, e| if p.z.abs() < e { p.z = 0.0 });
    }

    /// Collapse vertex pairs within `eps` using a spatial hash grid, then
    /// remap quads and compact surviving vertices. Hash constants and bucket
    /// count match `original_source/src/mesh.c::mesh_weld_by_distance`
    /// exactly; spec.md §4.2 notes correctness must not depend on them, only
    /// on the distance predicate, so any collision-free hash would do.
    pub fn weld_by_distance(&mut self, eps: f32) {
        if self.v.is_empty() {
            return;
        }
        let n = self.v.len();
        let cap = n * 2 + 64;
        let mut head = vec![-1i64; cap];
        let mut next = vec![-1i64; n];
        let mut rep = vec![0usize; n];

        let inv = 1.0 / eps;
        for i in 0..n {
            let p = self.v[i];
            let gx = (p.x * inv).floor() as i64;
            let gy = (p.y * inv).floor() as i64;
            let gz = (p.z * inv).floor() as i64;
            let u = (gx.wrapping_mul(73_856_093)
                ^ gy.wrapping_mul(19_349_663)
                ^ gz.wrapping_mul(83_492_791)) as i64;
            let bucket = u.rem_euclid(cap as i64) as usize;

            let mut found: Option<usize> = None;
            let mut j = head[bucket];
            while j != -1 {
                let ju = j as usize;
                let q = self.v[ju];
                let d = p - q;
                if d.length_squared() <= eps * eps {
                    found = Some(ju);
                    break;
                }
                j = next[ju];
            }
            match found {
                None => {
                    next[i] = head[bucket];
                    head[bucket] = i as i64;
                    rep[i] = i;
                }
                Some(j) => rep[i] = j,
            }
        }

        for q in &mut self.q {
            q.a = rep[q.a];
            q.b = rep[q.b];
            q.c = rep[q.c];
            q.d = rep[q.d];
        }

        let mut new_index = vec![0usize; n];
        let mut new_count = 0usize;
        for i in 0..n {
            if rep[i] == i {
                new_index[i] = new_count;
                new_count += 1;
            }
        }
        let mut nv = vec![Vec3::ZERO; new_count];
        for i in 0..n {
            if rep[i] == i {
                nv[new_index[i]] = self.v[i];
            }
        }
        for q in &mut self.q {
            q.a = new_index[q.a];
            q.b = new_index[q.b];
            q.c = new_index[q.c];
            q.d = new_index[q.d];
        }
        self.v = nv;
    }

    /// `n` vertices at angles `2πk/n`, `z=0`, in a new ring.
    pub fn ring_ellipse(&mut self, cx: f32, cy: f32, rx: f32, ry: f32, segs: usize) -> Ring {
        let mut r = Ring::default();
        for k in 0..segs {
            let t = k as f32 / segs as f32 * std::f32::consts::TAU;
            let p = Vec3::new(cx + rx * t.cos(), cy + ry * t.sin(), 0.0);
            r.idx.push(self.add_vertex(p));
        }
        r
    }

    fn ring_centroid(&self, r: &Ring) -> Vec3 {
        if r.idx.is_empty() {
            return Vec3::ZERO;
        }
        let sum: Vec3 = r.idx.iter().map(|&i| self.v[i]).sum();
        sum / r.idx.len() as f32
    }

    pub fn ring_grow_out(&mut self, base: &Ring, step: f32, dz: f32) -> Ring {
        let c = self.ring_centroid(base);
        let mut out = Ring::default();
        for &i in &base.idx {
            let p = self.v[i];
            let n = (p - c).normalize_or_zero();
            let q = Vec3::new(p.x + n.x * step, p.y + n.y * step, dz);
            out.idx.push(self.add_vertex(q));
        }
        out
    }

    pub fn ring_lift_x(&mut self, r: &Ring, dx: f32) {
        for &i in &r.idx {
            self.v[i].x += dx;
        }
    }

    pub fn ring_lift_y(&mut self, r: &Ring, dy: f32) {
        for &i in &r.idx {
            self.v[i].y += dy;
        }
    }

    pub fn ring_lift_z(&mut self, r: &Ring, dz: f32) {
        for &i in &r.idx {
            self.v[i].z += dz;
        }
    }

    /// Bridge two equal-length rings with quads `(a[i], a[i+1], b[i+1], b[i])`
    /// (indices mod n). Returns `false` without mutation if counts differ.
    pub fn stitch(&mut self, a: &Ring, b: &Ring) -> bool {
        if a.len() != b.len() {
            return false;
        }
        let n = a.len();
        for i in 0..n {
            let ai = a.idx[i];
            let bi2 = a.idx[(i + 1) % n];
            let ci = b.idx[(i + 1) % n];
            let di = b.idx[i];
            self.add_quad(ai, bi2, ci, di);
        }
        true
    }

    /// A filled Coons-patch quad grid over an outer ring of length `n`
    /// (`n` a positive multiple of 4), ported from
    /// `original_source/src/mesh.c::cap_plane_build`. Returns an empty mesh
    /// when `n` doesn't satisfy that precondition.
    pub fn cap_plane(&self, outer: &Ring) -> QMesh {
        let mut cap = QMesh::new();
        let n = outer.len();
        if n < 4 || n % 4 != 0 {
            return cap;
        }
        let v: Vec<Vec3> = outer.idx.iter().map(|&i| self.v[i]).collect();
        let k = n / 4;

        let bottom: Vec<Vec3> = (0..=k).map(|i| v[i]).collect();
        let right: Vec<Vec3> = (0..=k).map(|i| v[k + i]).collect();
        let top: Vec<Vec3> = (0..=k).map(|i| v[2 * k + (k - i)]).collect();
        let left: Vec<Vec3> = (0..=k).map(|i| v[(3 * k + (k - i)) % n]).collect();

        let p00 = bottom[0];
        let p10 = bottom[k];
        let p01 = top[0];
        let p11 = top[k];

        let gw = k + 1;
        let mut grid = vec![0usize; gw * gw];

        for j in 0..=k {
            for i in 0..=k {
                let id = j * gw + i;
                let on_top = j == k;
                let on_bottom = j == 0;
                let on_left = i == 0;
                let on_right = i == k;

                grid[id] = if on_top {
                    cap.add_vertex(top[i])
                } else if on_bottom {
                    cap.add_vertex(bottom[i])
                } else if on_left {
                    cap.add_vertex(left[j])
                } else if on_right {
                    cap.add_vertex(right[j])
                } else {
                    let u = i as f32 / k as f32;
                    let v_ = j as f32 / k as f32;

                    let c0 = left[j];
                    let c1 = right[j];
                    let d0 = bottom[i];
                    let d1 = top[i];

                    let term1 = c0.lerp(c1, u);
                    let term2 = d0.lerp(d1, v_);

                    let bl0 = p00.lerp(p10, u);
                    let bl1 = p01.lerp(p11, u);
                    let bl = bl0.lerp(bl1, v_);

                    cap.add_vertex(term1 + term2 - bl)
                };
            }
        }

        for j in 0..k {
            for i in 0..k {
                let a = grid[j * gw + i];
                let b = grid[j * gw + (i + 1)];
                let c = grid[(j + 1) * gw + (i + 1)];
                let d = grid[(j + 1) * gw + i];
                cap.add_quad(a, b, c, d);
            }
        }

        cap
    }

    /// Each quad `(a,b,c,d)` becomes triangles `(a,b,c)` and `(a,c,d)`.
    pub fn triangulate(&self) -> Vec<[usize; 3]> {
        let mut tris = Vec::with_capacity(self.q.len() * 2);
        for q in &self.q {
            tris.push([q.a, q.b, q.c]);
            tris.push([q.a, q.c, q.d]);
        }
        tris
    }

    pub fn bbox(&self) -> (Vec3, Vec3) {
        if self.v.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }
        let mut min = self.v[0];
        let mut max = self.v[0];
        for &p in &self.v[1..] {
            min = min.min(p);
            max = max.max(p);
        }
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_offsets_quad_indices() {
        let mut a = QMesh::new();
        a.add_vertex(Vec3::ZERO);
        a.add_quad(0, 0, 0, 0);
        let mut b = QMesh::new();
        b.add_vertex(Vec3::ONE);
        b.add_vertex(Vec3::ONE);
        b.add_quad(0, 1, 0, 1);

        a.merge(&b);
        assert_eq!(a.v_count(), 3);
        assert_eq!(a.q_count(), 2);
        assert_eq!(a.q[1], Quad::new(1, 2, 1, 2));
    }

    #[test]
    fn mirror_x_doubles_counts_and_reverses_winding() {
        let mut m = QMesh::new();
        m.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        m.add_vertex(Vec3::new(2.0, 0.0, 0.0));
        m.add_vertex(Vec3::new(3.0, 0.0, 0.0));
        m.add_vertex(Vec3::new(4.0, 0.0, 0.0));
        m.add_quad(0, 1, 2, 3);

        m.mirror_x(1e-6);
        assert_eq!(m.v_count(), 8);
        assert_eq!(m.q_count(), 2);
        assert_eq!(m.q[1], Quad::new(4 + 3, 4 + 2, 4 + 1, 4 + 0));
    }

    #[test]
    fn stitch_bridges_equal_rings() {
        let mut m = QMesh::new();
        let a = m.ring_ellipse(0.0, 0.0, 1.0, 1.0, 8);
        let b = m.ring_ellipse(0.0, 0.0, 1.0, 1.0, 8);
        assert!(m.stitch(&a, &b));
        assert_eq!(m.q_count(), 8);
        assert_eq!(m.v_count(), 16);
    }

    #[test]
    fn stitch_rejects_unequal_rings() {
        let mut m = QMesh::new();
        let a = m.ring_ellipse(0.0, 0.0, 1.0, 1.0, 8);
        let b = m.ring_ellipse(0.0, 0.0, 1.0, 1.0, 4);
        assert!(!m.stitch(&a, &b));
        assert_eq!(m.q_count(), 0);
    }

    #[test]
    fn weld_collapses_close_pairs_and_is_idempotent() {
        let mut m = QMesh::new();
        let i0 = m.add_vertex(Vec3::ZERO);
        let i1 = m.add_vertex(Vec3::new(1e-4, 0.0, 0.0));
        m.add_quad(i0, i1, i0, i1);
        m.weld_by_distance(1e-3);
        assert_eq!(m.v_count(), 1);
        let once = m.clone();
        m.weld_by_distance(1e-3);
        assert_eq!(m.v_count(), once.v_count());
        assert_eq!(m.q, once.q);
    }

    #[test]
    fn cap_plane_on_ring_of_four_yields_one_quad() {
        let mut m = QMesh::new();
        let r = m.ring_ellipse(0.0, 0.0, 1.0, 1.0, 4);
        let cap = m.cap_plane(&r);
        assert_eq!(cap.v_count(), 4);
        assert_eq!(cap.q_count(), 1);
    }

    #[test]
    fn cap_plane_rejects_non_multiple_of_four() {
        let mut m = QMesh::new();
        let r = m.ring_ellipse(0.0, 0.0, 1.0, 1.0, 6);
        let cap = m.cap_plane(&r);
        assert_eq!(cap.v_count(), 0);
        assert_eq!(cap.q_count(), 0);
    }

    #[test]
    fn triangulate_emits_two_triangles_per_quad() {
        let mut m = QMesh::new();
        m.add_vertex(Vec3::ZERO);
        m.add_vertex(Vec3::ZERO);
        m.add_vertex(Vec3::ZERO);
        m.add_vertex(Vec3::ZERO);
        m.add_quad(0, 1, 2, 3);
        let tris = m.triangulate();
        assert_eq!(tris, vec![[0, 1, 2], [0, 2, 3]]);
    }
}
