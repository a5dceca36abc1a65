use super::ear_clipping::triangulate_polygon;
use super::{DecompositionError, SplitPlane};
use crate::math::{Real, Rotation};
use crate::mesh::{Mesh, VertexArena, NIL};
use na::Point2;

/// Rebuilds and fills the polygonal holes a cut left on `mesh`.
///
/// Each rim of on-plane vertices is walked once, its rim edges spliced back
/// into the adjacency, and the enclosed polygon triangulated in the plane's
/// 2D frame; every emitted triangle is spliced as well. Consumed vertices
/// lose their on-plane flag, so the mesh comes out a closed manifold again.
pub(crate) fn triangulate_holes(
    arena: &mut VertexArena,
    mesh: &Mesh,
    plane: &SplitPlane,
    depth: usize,
) -> Result<(), DecompositionError> {
    // Point the plane normal out of the mesh before projecting rims to 2D.
    let mut plane = *plane;
    let mut v = mesh.first_vertex();
    while v != NIL {
        if !arena[v].on_plane {
            if plane.signed_distance(&arena[v].pos) > 0.0 {
                plane = plane.flipped();
            }
            break;
        }
        v = arena[v].next;
    }
    let rotation = plane.rotation_to_z();

    let mut v = mesh.first_vertex();
    while v != NIL {
        if arena[v].on_plane {
            fill_hole(arena, v, &rotation, depth)?;
        }
        v = arena[v].next;
    }
    Ok(())
}

/// Walks the rim loop seeded at `seed`, splicing rim edges as it goes, then
/// fills the enclosed polygon.
///
/// After separation no two on-plane vertices are adjacent, so each rim step
/// goes through the off-plane neighbor at the front of the current fan: the
/// successor of the current vertex inside that neighbor's ring is the next
/// rim vertex, and that neighbor's ring still remembers the rim edge the
/// separation removed. A vertex the plane merely grazes has a complete ring
/// and no rim; it is unmarked and skipped.
fn fill_hole(
    arena: &mut VertexArena,
    seed: u32,
    rotation: &Rotation<Real>,
    depth: usize,
) -> Result<(), DecompositionError> {
    let mut rim = Vec::new();
    let mut cur = seed;
    arena[seed].on_plane = false;

    loop {
        rim.push(cur);
        let Some(&front) = arena[cur].neighbors.first() else {
            return Err(DecompositionError::MalformedAdjacency {
                i0: cur,
                i1: cur,
                depth,
            });
        };
        let Some(p) = arena[front].ring_position(cur) else {
            return Err(DecompositionError::MalformedAdjacency {
                i0: cur,
                i1: front,
                depth,
            });
        };
        let succ = arena[front].ring(p + 1);

        if succ == seed {
            if rim.len() < 3 {
                return Err(DecompositionError::MalformedAdjacency {
                    i0: cur,
                    i1: succ,
                    depth,
                });
            }
            splice_rim_edge(arena, cur, seed);
            break;
        }
        if !arena[succ].on_plane {
            if rim.len() == 1 {
                // The plane only grazes this vertex; there is no hole.
                return Ok(());
            }
            return Err(DecompositionError::MalformedAdjacency {
                i0: cur,
                i1: succ,
                depth,
            });
        }

        arena[succ].on_plane = false;
        splice_rim_edge(arena, cur, succ);
        cur = succ;
    }

    if rim.len() == 3 {
        // The rim splices alone closed a triangular hole.
        return Ok(());
    }

    // Seen from outside the mesh the rim walk runs clockwise; the reversed
    // loop is the counter-clockwise polygon the triangulator expects.
    let polygon: Vec<u32> = rim.iter().rev().copied().collect();
    let points: Vec<Point2<Real>> = polygon
        .iter()
        .map(|&r| {
            let p = rotation * arena[r].pos;
            Point2::new(p.x, p.y)
        })
        .collect();

    let filled = triangulate_polygon(&points, |[a, b, c], is_last| {
        // The closing triangle's three links already exist; splicing it
        // would duplicate ring entries.
        if !is_last {
            splice_fill_triangle(
                arena,
                polygon[a as usize],
                polygon[b as usize],
                polygon[c as usize],
            );
        }
    });
    if !filled {
        return Err(DecompositionError::HoleTriangulationFailed {
            num_vertices: rim.len(),
            depth,
        });
    }
    Ok(())
}

/// Restores the rim edge `from → to`: `to` becomes the front of `from`'s fan
/// and `from` the back of `to`'s, which is exactly where the two flanking
/// triangles that survived the cut expect them.
fn splice_rim_edge(arena: &mut VertexArena, from: u32, to: u32) {
    arena[from].neighbors.insert(0, to);
    arena[to].neighbors.push(from);
}

/// Splices one emitted fill triangle `(a, b, c)`, counter-clockwise seen
/// from outside, into the adjacency.
///
/// The ear tip `b` needs no change: its ring already closes over the
/// remaining hole, and the clipped ear is what that closure now means. Each
/// flank gains one entry next to `b`.
fn splice_fill_triangle(arena: &mut VertexArena, a: u32, b: u32, c: u32) {
    if let Some(p) = arena[a].ring_position(b) {
        arena[a].neighbors.insert(p + 1, c);
    } else {
        debug_assert!(false, "fill triangle flank lost its ear tip");
    }
    if let Some(p) = arena[c].ring_position(b) {
        arena[c].neighbors.insert(p, a);
    } else {
        debug_assert!(false, "fill triangle flank lost its ear tip");
    }
}
