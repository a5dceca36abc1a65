use super::{
    measure_concavity, ConcaveEdge, DecompositionError, DecompositionParameters, SplitPlane,
};
use crate::math::{Real, Vector};
use crate::mesh::{locate_edge, EdgeRef, Mesh, Vertex, VertexArena, NIL};

/// Classifies every vertex of `mesh` against `plane` and splits every edge
/// crossing it, then snaps the near-plane vertices onto the plane.
///
/// Tracked concave edges that get split are bisected; each half is measured
/// again and kept only while still concave. On return `concave` is sorted
/// canonically again.
pub(crate) fn divide_mesh(
    arena: &mut VertexArena,
    mesh: &mut Mesh,
    plane: &SplitPlane,
    concave: &mut Vec<ConcaveEdge>,
    params: &DecompositionParameters,
    depth: usize,
) -> Result<(), DecompositionError> {
    let mut halves = Vec::new();

    let mut cur = mesh.first_edge(arena);
    while let Some(at) = cur {
        let (i0, i1) = at.endpoints(arena);
        classify_vertex(arena, i0, plane, params);
        classify_vertex(arena, i1, plane, params);

        if !arena[i0].on_plane && !arena[i1].on_plane {
            let d0 = plane.signed_distance(&arena[i0].pos);
            let d1 = plane.signed_distance(&arena[i1].pos);
            if (d0 < 0.0) != (d1 < 0.0) {
                // Similar triangles give the crossing point along the edge.
                let t = d0 / (d0 - d1);
                let mid = split_edge(arena, mesh, at, t, depth)?;
                bisect_concave_edge(
                    arena,
                    concave,
                    &mut halves,
                    i0,
                    i1,
                    mid,
                    params.concave_tolerance,
                );
            }
        }
        cur = mesh.next_edge(arena, at);
    }

    concave.append(&mut halves);
    concave.sort_unstable_by_key(|e| (e.i0, e.i1));

    // Deferred snap: every classification above read original positions.
    let mut v = mesh.first_vertex();
    while v != NIL {
        if arena[v].on_plane {
            let offset = arena[v].plane_offset;
            arena[v].pos += offset;
            arena[v].plane_offset = Vector::zeros();
        }
        v = arena[v].next;
    }
    Ok(())
}

/// Resets a vertex's cut state and re-derives its relation to `plane`.
///
/// Runs once per incident edge; every run writes the same values, and
/// on-plane state left over from an enclosing cut is overwritten rather than
/// trusted.
fn classify_vertex(
    arena: &mut VertexArena,
    vertex: u32,
    plane: &SplitPlane,
    params: &DecompositionParameters,
) {
    let distance = plane.signed_distance(&arena[vertex].pos);
    let on_plane = distance.abs() <= params.point_on_plane_tolerance;
    let offset = -distance * plane.normal().into_inner();

    let vert = &mut arena[vertex];
    vert.set_id = 0;
    vert.on_plane = on_plane;
    if on_plane {
        vert.plane_offset = offset;
        vert.plane_link = NIL;
        vert.dup_link = NIL;
    } else {
        vert.plane_offset = Vector::zeros();
    }
}

/// Finds the apex vertices of the two triangles sharing the edge under
/// `at`.
///
/// In the lower endpoint's ring these are the entries flanking the upper
/// endpoint; they must show up mirrored around the lower endpoint inside the
/// upper endpoint's ring, or the mesh is not the closed 2-manifold every cut
/// relies on.
fn find_opposite_verts(
    arena: &VertexArena,
    at: EdgeRef,
    depth: usize,
) -> Result<(u32, u32), DecompositionError> {
    let (i0, i1) = at.endpoints(arena);
    let malformed = DecompositionError::MalformedAdjacency { i0, i1, depth };

    let (apex_a, apex_b) = arena[i0].ring_around(at.pos as usize);
    if apex_a == apex_b {
        return Err(malformed);
    }
    let Some(back) = arena[i1].ring_position(i0) else {
        return Err(malformed);
    };
    let (prev, next) = arena[i1].ring_around(back);
    if prev != apex_b || next != apex_a {
        return Err(malformed);
    }
    Ok((apex_a, apex_b))
}

/// Splits the edge under `at` at parameter `t`, inserting one new on-plane
/// vertex and rewiring exactly four neighbor entries.
///
/// Both endpoints swap their mutual reference for the new vertex, and both
/// triangle apexes gain it next to the edge's own vertices, so every ring
/// keeps its cyclic face ordering. Returns the new vertex's index.
pub(crate) fn split_edge(
    arena: &mut VertexArena,
    mesh: &mut Mesh,
    at: EdgeRef,
    t: Real,
    depth: usize,
) -> Result<u32, DecompositionError> {
    let (i0, i1) = at.endpoints(arena);
    let (apex_a, apex_b) = find_opposite_verts(arena, at, depth)?;

    let pos = arena[i0].pos + (arena[i1].pos - arena[i0].pos) * t;
    let mut vertex = Vertex::new(pos);
    // The crossing point lies exactly on the plane, with nothing to snap.
    vertex.on_plane = true;
    vertex
        .neighbors
        .extend_from_slice(&[apex_a, i1, apex_b, i0]);
    let mid = arena.push(vertex);
    mesh.push_vertex(arena, mid);

    arena[i0].neighbors[at.pos as usize] = mid;
    if let Some(back) = arena[i1].ring_position(i0) {
        arena[i1].neighbors[back] = mid;
    }

    let malformed = DecompositionError::MalformedAdjacency { i0, i1, depth };
    let Some(ra) = arena[apex_a].ring_position(i1) else {
        return Err(malformed);
    };
    arena[apex_a].neighbors.insert(ra + 1, mid);
    let Some(rb) = arena[apex_b].ring_position(i0) else {
        return Err(malformed);
    };
    arena[apex_b].neighbors.insert(rb + 1, mid);

    Ok(mid)
}

/// When the split edge was itself a tracked concave edge, replaces it by its
/// two halves, keeping each half only while it still measures concave.
fn bisect_concave_edge(
    arena: &VertexArena,
    concave: &mut Vec<ConcaveEdge>,
    halves: &mut Vec<ConcaveEdge>,
    i0: u32,
    i1: u32,
    mid: u32,
    tolerance: Real,
) {
    let Some(k) = concave.iter().position(|e| (e.i0, e.i1) == (i0, i1)) else {
        return;
    };
    let _ = concave.remove(k);

    for (a, b) in [(i0, mid), (mid, i1)] {
        let Some(at) = locate_edge(arena, a, b) else {
            continue;
        };
        let (concavity, bisect_dir) = measure_concavity(arena, at);
        if concavity > tolerance {
            halves.push(ConcaveEdge::new(a, b, concavity, bisect_dir));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::find_concave_edges;
    use crate::math::{Point, UnitVector};

    fn tetrahedron(arena: &mut VertexArena) -> Mesh {
        let vertices = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
        ];
        let indices = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]];
        Mesh::from_trimesh(arena, &vertices, &indices)
    }

    #[test]
    fn split_edge_rewires_four_entries() {
        let mut arena = VertexArena::new();
        let mut mesh = tetrahedron(&mut arena);

        let at = locate_edge(&arena, 0, 1).unwrap();
        let before_0 = arena[0].neighbors.len();
        let before_1 = arena[1].neighbors.len();
        let (apex_a, apex_b) = find_opposite_verts(&arena, at, 0).unwrap();
        let before_a = arena[apex_a].neighbors.len();
        let before_b = arena[apex_b].neighbors.len();

        let mid = split_edge(&mut arena, &mut mesh, at, 0.5, 0).unwrap();

        assert_eq!(arena[mid].neighbors.len(), 4);
        assert_relative_eq!(arena[mid].pos, Point::new(0.5, 0.0, 0.0));
        // Replace, not remove: both endpoint rings keep their length but
        // reference the new vertex instead of each other.
        assert_eq!(arena[0].neighbors.len(), before_0);
        assert_eq!(arena[1].neighbors.len(), before_1);
        assert!(arena[0].ring_position(1).is_none());
        assert!(arena[1].ring_position(0).is_none());
        assert!(arena[0].ring_position(mid).is_some());
        assert!(arena[1].ring_position(mid).is_some());
        // Both apexes gain exactly the new vertex.
        assert_eq!(arena[apex_a].neighbors.len(), before_a + 1);
        assert_eq!(arena[apex_b].neighbors.len(), before_b + 1);

        // The rewired mesh is still a consistent triangulation: every edge
        // of the new vertex has two well-defined apexes.
        for pos in 0..4 {
            let neighbor = arena[mid].neighbors[pos];
            let at = locate_edge(&arena, mid, neighbor).unwrap();
            assert!(find_opposite_verts(&arena, at, 0).is_ok());
        }
    }

    #[test]
    fn split_edge_reports_malformed_adjacency() {
        let mut arena = VertexArena::new();
        let mut mesh = tetrahedron(&mut arena);

        // Corrupt one ring entry so the two sides of edge (0, 1) disagree.
        let at = locate_edge(&arena, 0, 1).unwrap();
        let back = arena[1].ring_position(0).unwrap();
        arena[1].neighbors[back] = 1;

        let err = split_edge(&mut arena, &mut mesh, at, 0.5, 3).unwrap_err();
        assert_eq!(
            err,
            DecompositionError::MalformedAdjacency {
                i0: 0,
                i1: 1,
                depth: 3
            }
        );
    }

    fn u_channel() -> (Vec<Point<Real>>, Vec<[u32; 3]>) {
        let poly: [[Real; 2]; 8] = [
            [0.0, 0.0],
            [3.0, 0.0],
            [3.0, 2.0],
            [2.0, 2.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [0.0, 2.0],
        ];
        let cap: [[u32; 3]; 6] = [
            [2, 3, 4],
            [1, 2, 4],
            [1, 4, 5],
            [0, 1, 5],
            [0, 5, 6],
            [0, 6, 7],
        ];
        let n = poly.len() as u32;
        let mut vertices = Vec::new();
        for p in &poly {
            vertices.push(Point::new(p[0], p[1], 0.0));
        }
        for p in &poly {
            vertices.push(Point::new(p[0], p[1], 1.0));
        }
        let mut indices = Vec::new();
        for tri in &cap {
            indices.push([tri[0], tri[2], tri[1]]);
            indices.push([n + tri[0], n + tri[1], n + tri[2]]);
        }
        for i in 0..n {
            let j = (i + 1) % n;
            indices.push([i, j, n + j]);
            indices.push([i, n + j, n + i]);
        }
        (vertices, indices)
    }

    #[test]
    fn dividing_across_concave_edges_bisects_them() {
        let (vertices, indices) = u_channel();
        let params = DecompositionParameters::default();
        let mut arena = VertexArena::new();
        let mut mesh = Mesh::from_trimesh(&mut arena, &vertices, &indices);
        let first_new = arena.len() as u32;

        let mut concave =
            find_concave_edges(&arena, &mesh, params.concave_tolerance).unwrap();
        // The two reflex corners of the channel, bottom-to-top.
        assert_eq!(concave.len(), 2);
        assert_eq!((concave[0].i0, concave[0].i1), (4, 12));
        assert_eq!((concave[1].i0, concave[1].i1), (5, 13));

        // A horizontal cut crosses both reflex edges halfway up.
        let plane = SplitPlane::from_point_normal(
            &Point::new(0.0, 0.0, 0.5),
            UnitVector::new_normalize(Vector::new(0.0, 0.0, 1.0)),
        );
        divide_mesh(&mut arena, &mut mesh, &plane, &mut concave, &params, 0).unwrap();

        // Each reflex edge got bisected into two still-concave halves that
        // share a freshly inserted on-plane vertex.
        assert_eq!(concave.len(), 4);
        for edge in &concave {
            assert!(edge.concavity > params.concave_tolerance);
            let mid = if edge.i1 >= first_new { edge.i1 } else { edge.i0 };
            assert!(mid >= first_new);
            assert!(arena[mid].on_plane);
            assert_eq!(arena[mid].neighbors.len(), 4);
            assert_relative_eq!(arena[mid].pos.z, 0.5);
        }
    }
}
