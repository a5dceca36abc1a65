use super::{ConcaveEdge, DecompositionError};
use crate::mesh::{Mesh, VertexArena, NIL};

/// Floods every off-plane vertex of `mesh` into a connected set and threads
/// the on-plane vertices onto their link chain.
///
/// Returns the head of the on-plane chain and the highest set id handed out.
/// A vertex joins the set of the first labeled neighbor it sees, or starts a
/// new one; when a later neighbor carries a different set, the earlier set
/// is folded into it by relabeling every member. That relabel is quadratic
/// in the worst case, which is fine at the sizes cut sub-meshes reach, and
/// it leaves a gap in the id range that later stages skip.
pub(crate) fn group_verts(arena: &mut VertexArena, mesh: &Mesh) -> (u32, u32) {
    let mut plane_head = NIL;
    let mut max_set = 0;

    let mut v = mesh.first_vertex();
    while v != NIL {
        if arena[v].on_plane {
            arena[v].plane_link = plane_head;
            plane_head = v;
            v = arena[v].next;
            continue;
        }

        let mut my_set = 0;
        for k in 0..arena[v].neighbors.len() {
            let neighbor = arena[v].neighbors[k];
            let set = arena[neighbor].set_id;
            if set == 0 {
                continue;
            }
            if my_set == 0 {
                my_set = set;
            } else if set != my_set {
                // Two flood fronts met: fold the first set into the second.
                let mut w = mesh.first_vertex();
                while w != NIL {
                    if arena[w].set_id == my_set {
                        arena[w].set_id = set;
                    }
                    w = arena[w].next;
                }
                my_set = set;
            }
        }
        if my_set == 0 {
            max_set += 1;
            my_set = max_set;
        }
        arena[v].set_id = my_set;
        v = arena[v].next;
    }

    (plane_head, max_set)
}

/// Strips every ring entry linking one on-plane vertex to another, so the
/// cut plane cannot bridge the two sides it separates.
///
/// Each surviving ring is also restarted on a fan boundary (the entry right
/// after a removed one), which keeps the entries of any one side contiguous
/// and in cyclic face order for the per-set pruning that follows.
fn remove_on_plane_links(arena: &mut VertexArena, plane_head: u32) {
    let mut v = plane_head;
    while v != NIL {
        let ring = core::mem::take(&mut arena[v].neighbors);
        let len = ring.len();
        let start = (0..len)
            .find(|&k| {
                arena[ring[(k + len - 1) % len]].on_plane && !arena[ring[k]].on_plane
            })
            .unwrap_or(0);
        let mut rebuilt = smallvec::SmallVec::new();
        for k in 0..len {
            let n = ring[(start + k) % len];
            if !arena[n].on_plane {
                rebuilt.push(n);
            }
        }
        arena[v].neighbors = rebuilt;
        v = arena[v].plane_link;
    }
}

/// Duplicates every on-plane vertex once per side it touches and rewires its
/// neighborhood so each side becomes self-contained.
///
/// Concave edges referencing an on-plane vertex are re-targeted to the
/// duplicate carrying their side and tagged with that side's set id; edges
/// lying entirely on the plane are the ones the cut was chosen to kill, and
/// they are dropped here.
pub(crate) fn separate_submeshes(
    arena: &mut VertexArena,
    mesh: &mut Mesh,
    plane_head: u32,
    concave: &mut Vec<ConcaveEdge>,
    depth: usize,
) -> Result<(), DecompositionError> {
    remove_on_plane_links(arena, plane_head);

    let mut v = plane_head;
    while v != NIL {
        for k in 0..arena[v].neighbors.len() {
            let neighbor = arena[v].neighbors[k];
            let set = arena[neighbor].set_id;
            debug_assert_ne!(set, 0, "off-plane neighbors are grouped before separation");
            let duplicate = claim_duplicate(arena, mesh, v, set);
            if duplicate != v {
                if let Some(back) = arena[neighbor].ring_position(v) {
                    arena[neighbor].neighbors[back] = duplicate;
                }
            }
        }

        // Every duplicate, the original included, keeps only the neighbors
        // of its own side. The rings were restarted on a fan boundary, so
        // the kept entries stay in cyclic face order.
        let mut d = v;
        while d != NIL {
            let own = arena[d].set_id;
            let ring = core::mem::take(&mut arena[d].neighbors);
            arena[d].neighbors = ring
                .into_iter()
                .filter(|&n| arena[n].set_id == own)
                .collect();
            d = arena[d].dup_link;
        }

        v = arena[v].plane_link;
    }

    retarget_concave_edges(arena, concave, depth)
}

/// Finds the duplicate of `original` carrying `set`, claiming the first
/// uninitialized chain slot or cloning a fresh vertex when nothing matches.
///
/// The original starts with set id 0, so the first side to reach it claims
/// the vertex itself; further sides get full clones appended to the arena
/// and to the mesh view.
fn claim_duplicate(arena: &mut VertexArena, mesh: &mut Mesh, original: u32, set: u32) -> u32 {
    let mut d = original;
    loop {
        if arena[d].set_id == set {
            return d;
        }
        if arena[d].set_id == 0 {
            arena[d].set_id = set;
            return d;
        }
        if arena[d].dup_link == NIL {
            let mut clone = arena[original].clone();
            clone.set_id = set;
            clone.dup_link = NIL;
            clone.plane_link = NIL;
            let fresh = arena.push(clone);
            mesh.push_vertex(arena, fresh);
            arena[d].dup_link = fresh;
            return fresh;
        }
        d = arena[d].dup_link;
    }
}

fn retarget_concave_edges(
    arena: &VertexArena,
    concave: &mut Vec<ConcaveEdge>,
    depth: usize,
) -> Result<(), DecompositionError> {
    let mut kept = Vec::with_capacity(concave.len());
    for edge in concave.drain(..) {
        let on0 = arena[edge.i0].on_plane;
        let on1 = arena[edge.i1].on_plane;
        if on0 && on1 {
            continue;
        }

        let set = if on0 {
            arena[edge.i1].set_id
        } else {
            arena[edge.i0].set_id
        };
        debug_assert_ne!(set, 0);
        let a = if on0 {
            duplicate_for_set(arena, edge.i0, set, depth)?
        } else {
            edge.i0
        };
        let b = if on1 {
            duplicate_for_set(arena, edge.i1, set, depth)?
        } else {
            edge.i1
        };

        let mut retargeted = ConcaveEdge::new(a, b, edge.concavity, edge.bisect_dir);
        retargeted.set_id = set;
        kept.push(retargeted);
    }
    kept.sort_unstable_by_key(|e| (e.i0, e.i1));
    *concave = kept;
    Ok(())
}

fn duplicate_for_set(
    arena: &VertexArena,
    original: u32,
    set: u32,
    depth: usize,
) -> Result<u32, DecompositionError> {
    let mut d = original;
    while d != NIL {
        if arena[d].set_id == set {
            return Ok(d);
        }
        d = arena[d].dup_link;
    }
    Err(DecompositionError::DuplicateSearchExhausted {
        vertex: original,
        set_id: set,
        depth,
    })
}

/// Threads every vertex of `mesh` onto its set's own intrusive list and
/// returns the per-set views, indexed by set id minus one.
///
/// On-plane leftovers that never joined a side (set id 0, every neighbor on
/// the plane too) are dropped; nothing references them anymore.
pub(crate) fn link_submeshes(arena: &mut VertexArena, mesh: &Mesh, max_set: u32) -> Vec<Mesh> {
    let mut subs = vec![Mesh::EMPTY; max_set as usize];
    let mut v = mesh.first_vertex();
    while v != NIL {
        let next = arena[v].next;
        let set = arena[v].set_id;
        if set != 0 {
            subs[set as usize - 1].push_vertex(arena, v);
        }
        v = next;
    }
    subs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point;

    #[test]
    fn grouping_merges_sets_that_meet_late() {
        // An octahedron ordered so the two poles come first: each starts its
        // own set, and the first equatorial vertex has to merge them.
        let vertices = vec![
            Point::new(1.0, 0.0, 0.0),
            Point::new(-1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.0, -1.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            Point::new(0.0, 0.0, -1.0),
        ];
        let indices = vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ];
        let mut arena = VertexArena::new();
        let mesh = Mesh::from_trimesh(&mut arena, &vertices, &indices);

        let (plane_head, max_set) = group_verts(&mut arena, &mesh);
        assert_eq!(plane_head, NIL);
        assert_eq!(max_set, 2);

        // Vertices 0 and 1 are not adjacent, so two sets were started; the
        // merge must have relabeled everything to one of them.
        let sets: Vec<u32> = mesh.vertices(&arena).map(|v| arena[v].set_id).collect();
        assert!(sets.iter().all(|&s| s == sets[0]));
        assert_ne!(sets[0], 0);
    }
}
