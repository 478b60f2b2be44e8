//! The intrinsics bridge: a flat name→function table wired to the builder
//! mesh and the mesh kernel, ported near 1:1 from
//! `original_source/src/intrinsics.c`. No perfect-hash table — a linear scan
//! over ~25 entries, matching the original's own `intrinsics_table`.

use crate::arena::Arena;
use crate::error::IntrinsicError;
use crate::host::Host;
use crate::mesh::{QMesh, Ring};
use crate::value::{RingId, Value};

type IResult = Result<Value, IntrinsicError>;

fn usage(msg: &str) -> IntrinsicError {
    IntrinsicError::Usage {
        message: msg.to_string(),
    }
}

fn num(args: &[Value], i: usize) -> Option<f64> {
    args.get(i).and_then(Value::as_number)
}

fn bi_vertex(host: &mut Host, args: &[Value]) -> IResult {
    if args.len() < 3 {
        return Err(usage("vertex(x,y,z)"));
    }
    let (x, y, z) = (num(args, 0).unwrap_or(0.0), num(args, 1).unwrap_or(0.0), num(args, 2).unwrap_or(0.0));
    let idx = host
        .builder_mut()
        .add_vertex(glam::Vec3::new(x as f32, y as f32, z as f32));
    Ok(Value::Number(idx as f64))
}

fn bi_quad(host: &mut Host, args: &[Value]) -> IResult {
    if args.len() < 4 {
        return Err(usage("quad(a,b,c,d)"));
    }
    let idx: Vec<i64> = (0..4).map(|i| num(args, i).unwrap_or(-1.0) as i64).collect();
    let vcount = host.builder_mut().v_count() as i64;
    if idx.iter().any(|&i| i < 0 || i >= vcount) {
        return Err(usage("quad: vertex index out of range"));
    }
    let verts: Vec<glam::Vec3> = idx.iter().map(|&i| host.builder_mut().v[i as usize]).collect();
    let mut m = QMesh::new();
    let a = m.add_vertex(verts[0]);
    let b = m.add_vertex(verts[1]);
    let c = m.add_vertex(verts[2]);
    let d = m.add_vertex(verts[3]);
    m.add_quad(a, b, c, d);
    Ok(Value::Mesh(host.alloc_mesh(m)))
}

fn bi_mesh(host: &mut Host, args: &[Value]) -> IResult {
    let mut out = QMesh::new();
    for a in args {
        if let Some(mid) = a.as_mesh() {
            let src = host.mesh(mid).clone();
            out.merge(&src);
        }
    }
    Ok(Value::Mesh(host.alloc_mesh(out)))
}

fn bi_ring(host: &mut Host, args: &[Value]) -> IResult {
    if args.len() < 5 {
        return Err(usage("ring(cx,cy,rx,ry,segments)"));
    }
    let r = host.builder_mut().ring_ellipse(
        num(args, 0).unwrap_or(0.0) as f32,
        num(args, 1).unwrap_or(0.0) as f32,
        num(args, 2).unwrap_or(0.0) as f32,
        num(args, 3).unwrap_or(0.0) as f32,
        num(args, 4).unwrap_or(0.0).max(0.0) as usize,
    );
    Ok(Value::Ring(host.alloc_ring(r)))
}

fn bi_grow_out(host: &mut Host, args: &[Value]) -> IResult {
    let base_id = args
        .first()
        .and_then(Value::as_ring)
        .ok_or_else(|| usage("grow_out(ring, step, dz)"))?;
    if args.len() < 3 {
        return Err(usage("grow_out(ring, step, dz)"));
    }
    let base = host.ring(base_id).clone();
    let out = host
        .builder_mut()
        .ring_grow_out(&base, num(args, 1).unwrap_or(0.0) as f32, num(args, 2).unwrap_or(0.0) as f32);
    Ok(Value::Ring(host.alloc_ring(out)))
}

fn bi_lift(axis: char, host: &mut Host, args: &[Value]) -> IResult {
    let ring_id = args
        .first()
        .and_then(Value::as_ring)
        .ok_or_else(|| usage("lift_*(ring, d)"))?;
    if args.len() < 2 {
        return Err(usage("lift_*(ring, d)"));
    }
    let d = num(args, 1).unwrap_or(0.0) as f32;
    let ring = host.ring(ring_id).clone();
    match axis {
        'x' => host.builder_mut().ring_lift_x(&ring, d),
        'y' => host.builder_mut().ring_lift_y(&ring, d),
        _ => host.builder_mut().ring_lift_z(&ring, d),
    }
    Ok(Value::Ring(ring_id))
}

fn bi_stitch(host: &mut Host, args: &[Value]) -> IResult {
    if args.len() == 1 {
        if let Value::RingList(rings) = &args[0] {
            return stitch_ringlist(host, rings);
        }
    }
    if args.len() == 2 {
        if let (Some(a), Some(b)) = (args[0].as_ring(), args[1].as_ring()) {
            return stitch_pair(host, a, b);
        }
    }
    Err(usage("stitch([rings...]) or stitch(rA, rB)"))
}

/// Re-emit every ring's vertices into a fresh, self-contained mesh (the
/// builder is never exported), then stitch consecutive pairs.
fn stitch_ringlist(host: &mut Host, rings: &[RingId]) -> IResult {
    if rings.len() < 2 {
        return Ok(Value::Mesh(host.alloc_mesh(QMesh::new())));
    }
    let mut m = QMesh::new();
    let mut remapped = Vec::with_capacity(rings.len());
    for &rid in rings {
        let r = host.ring(rid).clone();
        let mut out = Ring::default();
        for &old in &r.idx {
            let p = host.builder_mut().v[old];
            out.idx.push(m.add_vertex(p));
        }
        remapped.push(out);
    }
    for pair in remapped.windows(2) {
        m.stitch(&pair[0], &pair[1]);
    }
    Ok(Value::Mesh(host.alloc_mesh(m)))
}

fn stitch_pair(host: &mut Host, a_id: RingId, b_id: RingId) -> IResult {
    let a = host.ring(a_id).clone();
    let b = host.ring(b_id).clone();
    let mut m = QMesh::new();
    let mut ra = Ring::default();
    for &old in &a.idx {
        let p = host.builder_mut().v[old];
        ra.idx.push(m.add_vertex(p));
    }
    let mut rb = Ring::default();
    for &old in &b.idx {
        let p = host.builder_mut().v[old];
        rb.idx.push(m.add_vertex(p));
    }
    m.stitch(&ra, &rb);
    Ok(Value::Mesh(host.alloc_mesh(m)))
}

fn bi_merge(host: &mut Host, args: &[Value]) -> IResult {
    if args.iter().any(|a| a.as_mesh().is_none()) {
        return Err(usage("merge(mesh,...)"));
    }
    let mut out = QMesh::new();
    for a in args {
        let src = host.mesh(a.as_mesh().unwrap()).clone();
        out.merge(&src);
    }
    Ok(Value::Mesh(host.alloc_mesh(out)))
}

fn transform_mesh(host: &mut Host, args: &[Value], min_args: usize, usage_msg: &str, f: impl FnOnce(&mut QMesh, &[Value])) -> IResult {
    let mid = args
        .first()
        .and_then(Value::as_mesh)
        .ok_or_else(|| usage(usage_msg))?;
    if args.len() < min_args {
        return Err(usage(usage_msg));
    }
    let mut m = host.mesh(mid).clone();
    f(&mut m, args);
    Ok(Value::Mesh(host.alloc_mesh(m)))
}

fn bi_rotate(axis: char, host: &mut Host, args: &[Value]) -> IResult {
    transform_mesh(host, args, 2, "rotate_*(mesh, rad)", |m, a| {
        let rad = num(a, 1).unwrap_or(0.0) as f32;
        match axis {
            'x' => m.rotate_x(rad),
            'y' => m.rotate_y(rad),
            _ => m.rotate_z(rad),
        }
    })
}

fn bi_mirror(axis: char, host: &mut Host, args: &[Value]) -> IResult {
    transform_mesh(host, args, 1, "mirror_*(mesh, weld?)", |m, a| {
        let weld = num(a, 1).unwrap_or(1e-6) as f32;
        match axis {
            'x' => m.mirror_x(weld),
            'y' => m.mirror_y(weld),
            _ => m.mirror_z(weld),
        }
    })
}

fn bi_move(host: &mut Host, args: &[Value]) -> IResult {
    transform_mesh(host, args, 4, "move(mesh,dx,dy,dz)", |m, a| {
        m.translate(glam::Vec3::new(
            num(a, 1).unwrap_or(0.0) as f32,
            num(a, 2).unwrap_or(0.0) as f32,
            num(a, 3).unwrap_or(0.0) as f32,
        ))
    })
}

fn bi_scale(host: &mut Host, args: &[Value]) -> IResult {
    transform_mesh(host, args, 4, "scale(mesh,sx,sy,sz)", |m, a| {
        m.scale(glam::Vec3::new(
            num(a, 1).unwrap_or(0.0) as f32,
            num(a, 2).unwrap_or(0.0) as f32,
            num(a, 3).unwrap_or(0.0) as f32,
        ))
    })
}

fn bi_weld(host: &mut Host, args: &[Value]) -> IResult {
    let mid = args
        .first()
        .and_then(Value::as_mesh)
        .ok_or_else(|| usage("weld(mesh, eps=1e-6)"))?;
    let eps = num(args, 1).unwrap_or(1e-6) as f32;
    let mut m = host.mesh(mid).clone();
    m.weld_by_distance(eps);
    Ok(Value::Mesh(host.alloc_mesh(m)))
}

fn bi_cap_plane(host: &mut Host, args: &[Value]) -> IResult {
    let rid = args
        .first()
        .and_then(Value::as_ring)
        .ok_or_else(|| usage("cap_plane(ring)"))?;
    let ring = host.ring(rid).clone();
    let cap = host.builder_mut().cap_plane(&ring);
    Ok(Value::Mesh(host.alloc_mesh(cap)))
}

fn bi_ringlist(host: &mut Host, args: &[Value]) -> IResult {
    if args.is_empty() {
        return Err(usage("ringlist(r0,r1,...)"));
    }
    let mut ids = Vec::with_capacity(args.len());
    for a in args {
        ids.push(
            a.as_ring()
                .ok_or_else(|| usage("ringlist(r0,r1,...) accepts only rings"))?,
        );
    }
    let _ = host;
    Ok(Value::RingList(ids))
}

fn bi_ringlist_push(host: &mut Host, args: &[Value]) -> IResult {
    if args.len() != 2 {
        return Err(usage("ringlist_push(list, ring)"));
    }
    let list = match &args[0] {
        Value::RingList(rs) => rs.clone(),
        _ => return Err(usage("ringlist_push(list, ring)")),
    };
    let ring = args[1].as_ring().ok_or_else(|| usage("ringlist_push(list, ring)"))?;
    let _ = host;
    let mut out = list;
    out.push(ring);
    Ok(Value::RingList(out))
}

fn bi_first(host: &mut Host, args: &[Value]) -> IResult {
    let _ = host;
    match args {
        [Value::RingList(rs)] if !rs.is_empty() => Ok(Value::Ring(rs[0])),
        _ => Err(usage("first(ringlist)")),
    }
}

fn bi_last(host: &mut Host, args: &[Value]) -> IResult {
    let _ = host;
    match args {
        [Value::RingList(rs)] if !rs.is_empty() => Ok(Value::Ring(*rs.last().unwrap())),
        _ => Err(usage("last(ringlist)")),
    }
}

fn dispatch(host: &mut Host, name: &str, args: &[Value]) -> Option<IResult> {
    Some(match name {
        "vertex" => bi_vertex(host, args),
        "quad" => bi_quad(host, args),
        "mesh" => bi_mesh(host, args),
        "ring" => bi_ring(host, args),
        "grow_out" => bi_grow_out(host, args),
        "lift_x" => bi_lift('x', host, args),
        "lift_y" => bi_lift('y', host, args),
        "lift_z" => bi_lift('z', host, args),
        "stitch" => bi_stitch(host, args),
        "merge" => bi_merge(host, args),
        "rotate_x" => bi_rotate('x', host, args),
        "rotate_y" => bi_rotate('y', host, args),
        "rotate_z" => bi_rotate('z', host, args),
        "mirror_x" => bi_mirror('x', host, args),
        "mirror_y" => bi_mirror('y', host, args),
        "mirror_z" => bi_mirror('z', host, args),
        "move" => bi_move(host, args),
        "scale" => bi_scale(host, args),
        "ringlist" => bi_ringlist(host, args),
        "ringlist_push" => bi_ringlist_push(host, args),
        "first" => bi_first(host, args),
        "last" => bi_last(host, args),
        "cap_plane" => bi_cap_plane(host, args),
        "weld" => bi_weld(host, args),
        _ => return None,
    })
}

/// Dispatch `name(args)` against the intrinsic table, charging `arena` for
/// whatever builder/mesh/ring growth the call causes (spec.md §5/§7: "exactly
/// one allocator for all language-visible data"). `None` means the name isn't
/// an intrinsic (the evaluator then reports "unknown function").
pub fn call(host: &mut Host, arena: &mut Arena, name: &str, args: &[Value]) -> Option<IResult> {
    let before = host.total_bytes();
    let result = dispatch(host, name, args)?;
    Some(result.and_then(|v| {
        let grew = host.total_bytes().saturating_sub(before);
        arena.alloc_bytes(grew.max(1), 1)?;
        Ok(v)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arena {
        Arena::new(1 << 20)
    }

    #[test]
    fn vertex_and_quad_build_one_quad_mesh() {
        let mut h = Host::new();
        let mut a = arena();
        for i in 0..4 {
            call(&mut h, &mut a, "vertex", &[Value::Number(i as f64), Value::Number(0.0), Value::Number(0.0)]).unwrap().unwrap();
        }
        let v = call(&mut h, &mut a, "quad", &[Value::Number(0.0), Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)])
            .unwrap()
            .unwrap();
        let mid = v.as_mesh().unwrap();
        assert_eq!(h.mesh(mid).v_count(), 4);
        assert_eq!(h.mesh(mid).q_count(), 1);
    }

    #[test]
    fn mesh_with_no_args_is_empty() {
        let mut h = Host::new();
        let mut a = arena();
        let v = call(&mut h, &mut a, "mesh", &[]).unwrap().unwrap();
        assert_eq!(h.mesh(v.as_mesh().unwrap()).v_count(), 0);
    }

    #[test]
    fn ring_stitch_roundtrip() {
        let mut h = Host::new();
        let mut a = arena();
        let ra = call(&mut h, &mut a, "ring", &[Value::Number(0.0), Value::Number(0.0), Value::Number(1.0), Value::Number(1.0), Value::Number(8.0)])
            .unwrap()
            .unwrap();
        let rb = call(&mut h, &mut a, "ring", &[Value::Number(0.0), Value::Number(0.0), Value::Number(1.0), Value::Number(1.0), Value::Number(8.0)])
            .unwrap()
            .unwrap();
        let m = call(&mut h, &mut a, "stitch", &[ra, rb]).unwrap().unwrap();
        let mid = m.as_mesh().unwrap();
        assert_eq!(h.mesh(mid).q_count(), 8);
        assert_eq!(h.mesh(mid).v_count(), 16);
    }

    #[test]
    fn stitch_ringlist_of_one_is_empty() {
        let mut h = Host::new();
        let mut a = arena();
        let r = call(&mut h, &mut a, "ring", &[Value::Number(0.0), Value::Number(0.0), Value::Number(1.0), Value::Number(1.0), Value::Number(4.0)])
            .unwrap()
            .unwrap();
        let rid = r.as_ring().unwrap();
        let m = call(&mut h, &mut a, "stitch", &[Value::RingList(vec![rid])]).unwrap().unwrap();
        assert_eq!(h.mesh(m.as_mesh().unwrap()).q_count(), 0);
    }

    #[test]
    fn unknown_intrinsic_is_none() {
        let mut h = Host::new();
        let mut a = arena();
        assert!(call(&mut h, &mut a, "not_a_thing", &[]).is_none());
    }

    #[test]
    fn exhausted_arena_turns_growth_into_an_error() {
        let mut h = Host::new();
        let mut a = Arena::new(4);
        let err = call(&mut h, &mut a, "ring", &[Value::Number(0.0), Value::Number(0.0), Value::Number(1.0), Value::Number(1.0), Value::Number(16.0)])
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().contains("arena"));
    }
}
