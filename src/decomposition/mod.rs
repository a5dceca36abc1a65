//! Recursive decomposition of a closed triangle mesh into convex polytopes.
//!
//! The decomposition measures a concavity for every edge, picks the deepest
//! one, cuts the mesh with a plane chosen to kill as many concave edges as
//! possible, separates the two (or more) resulting connected pieces,
//! re-triangulates the freshly exposed cut faces and recurses into every
//! piece that still has a concave edge. The union of the returned polytopes
//! reproduces the input shape; their number is not minimal, since the
//! cutting plane is chosen greedily.
//!
//! Everything happens destructively on a single growable vertex arena;
//! pieces are lightweight [`Mesh`] views into it.

pub use self::concavity::{trimesh_is_convex, ConcaveEdge};
pub use self::error::DecompositionError;
pub use self::split_plane::SplitPlane;

pub(crate) use self::concavity::{find_concave_edges, measure_concavity, most_concave};

mod concavity;
mod divide;
mod ear_clipping;
mod error;
mod grouping;
mod hole_fill;
mod split_plane;

use self::divide::divide_mesh;
use self::grouping::{group_verts, link_submeshes, separate_submeshes};
use self::hole_fill::triangulate_holes;
use self::split_plane::find_split_plane;
use crate::math::{Point, Real};
use crate::mesh::{locate_edge, Mesh, VertexArena};

/// Tunable thresholds of the decomposition.
///
/// Both tolerances are absolute distances. They are not scaled to the mesh's
/// bounding size, so meshes far from unit scale may need adjusted values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecompositionParameters {
    /// An edge is treated as concave when its measured concavity depth
    /// exceeds this value.
    pub concave_tolerance: Real,
    /// A vertex within this distance of the cutting plane is snapped onto
    /// it.
    pub point_on_plane_tolerance: Real,
}

impl Default for DecompositionParameters {
    fn default() -> Self {
        Self {
            concave_tolerance: 0.01,
            point_on_plane_tolerance: 0.1,
        }
    }
}

/// Hooks into the interesting moments of a decomposition run.
///
/// Every method has an empty default body; implement only what you need.
/// The unit type is the no-op observer.
pub trait DecompositionObserver {
    /// A cutting plane was selected at recursion `depth`.
    fn plane_chosen(&mut self, _depth: usize, _plane: &SplitPlane) {}

    /// A connected piece with `num_vertices` vertices came out of a cut.
    fn submesh_built(&mut self, _depth: usize, _set_id: u32, _num_vertices: u32) {}

    /// A convex polytope with `num_vertices` vertices was appended to the
    /// output.
    fn polytope_emitted(&mut self, _depth: usize, _num_vertices: u32) {}
}

impl DecompositionObserver for () {}

/// Decomposes a closed triangle mesh into convex polytopes, returned as raw
/// vertex/index buffer pairs.
///
/// The input buffers must satisfy the contract of [`Mesh::from_trimesh`]:
/// counter-clockwise winding seen from outside, closed 2-manifold topology.
/// Every returned polytope is convex within the default
/// [`DecompositionParameters::concave_tolerance`].
pub fn convex_decomposition(
    vertices: &[Point<Real>],
    indices: &[[u32; 3]],
) -> Result<Vec<(Vec<Point<Real>>, Vec<[u32; 3]>)>, DecompositionError> {
    convex_decomposition_with_params(vertices, indices, &DecompositionParameters::default())
}

/// Same as [`convex_decomposition`] with explicit thresholds.
pub fn convex_decomposition_with_params(
    vertices: &[Point<Real>],
    indices: &[[u32; 3]],
    params: &DecompositionParameters,
) -> Result<Vec<(Vec<Point<Real>>, Vec<[u32; 3]>)>, DecompositionError> {
    convex_decomposition_with_observer(vertices, indices, params, &mut ())
}

/// Same as [`convex_decomposition_with_params`], reporting progress to
/// `observer`.
pub fn convex_decomposition_with_observer(
    vertices: &[Point<Real>],
    indices: &[[u32; 3]],
    params: &DecompositionParameters,
    observer: &mut dyn DecompositionObserver,
) -> Result<Vec<(Vec<Point<Real>>, Vec<[u32; 3]>)>, DecompositionError> {
    let mut arena = VertexArena::with_capacity(vertices.len() * 2);
    let mesh = Mesh::from_trimesh(&mut arena, vertices, indices);
    let polytopes = decompose_mesh(&mut arena, &mesh, params, observer)?;
    Ok(polytopes.iter().map(|m| m.to_trimesh(&arena)).collect())
}

/// Decomposes a mesh view living on `arena` into convex polytope views.
///
/// A view that is already convex is returned unchanged as the only
/// polytope. Otherwise its vertices are copied inside the arena and the copy
/// is cut up destructively, so the caller's view survives the call. The
/// output views are appended in depth-first, ascending set id order, which
/// is stable for identical input.
pub fn decompose_mesh(
    arena: &mut VertexArena,
    mesh: &Mesh,
    params: &DecompositionParameters,
    observer: &mut dyn DecompositionObserver,
) -> Result<Vec<Mesh>, DecompositionError> {
    let mut polytopes = Vec::new();
    match find_concave_edges(arena, mesh, params.concave_tolerance) {
        None => {
            log::trace!("mesh with {} vertices is already convex", mesh.len());
            observer.polytope_emitted(0, mesh.len());
            polytopes.push(*mesh);
        }
        Some(concave) => {
            log::trace!(
                "decomposing mesh with {} vertices and {} concave edges",
                mesh.len(),
                concave.len()
            );
            let (copy, remap) = mesh.duplicate_with_remap(arena);
            let mut concave: Vec<ConcaveEdge> =
                concave.iter().map(|e| e.remapped(&remap)).collect();
            concave.sort_unstable_by_key(|e| (e.i0, e.i1));
            decompose_recursive(arena, copy, concave, 0, params, observer, &mut polytopes)?;
        }
    }
    Ok(polytopes)
}

fn decompose_recursive(
    arena: &mut VertexArena,
    mut mesh: Mesh,
    mut concave: Vec<ConcaveEdge>,
    depth: usize,
    params: &DecompositionParameters,
    observer: &mut dyn DecompositionObserver,
    polytopes: &mut Vec<Mesh>,
) -> Result<(), DecompositionError> {
    // Cutting and hole filling can change the concavity of surviving edges,
    // so every measurement is refreshed before deciding anything.
    refresh_concave_edges(arena, &mut concave, params.concave_tolerance);

    if concave.is_empty() {
        log::trace!("depth {depth}: convex piece with {} vertices", mesh.len());
        observer.polytope_emitted(depth, mesh.len());
        polytopes.push(mesh);
        return Ok(());
    }

    let seed = concave[most_concave(&concave)];
    let plane = find_split_plane(arena, &concave, seed, params, depth)?;
    observer.plane_chosen(depth, &plane);

    divide_mesh(arena, &mut mesh, &plane, &mut concave, params, depth)?;
    let (plane_head, max_set) = group_verts(arena, &mesh);
    separate_submeshes(arena, &mut mesh, plane_head, &mut concave, depth)?;
    let submeshes = link_submeshes(arena, &mesh, max_set);

    // Partition the surviving concave edges among the pieces.
    let mut per_set: Vec<Vec<ConcaveEdge>> = vec![Vec::new(); max_set as usize];
    for edge in concave {
        per_set[edge.set_id as usize - 1].push(edge);
    }

    for (k, sub) in submeshes.into_iter().enumerate() {
        if sub.is_empty() {
            continue;
        }
        triangulate_holes(arena, &sub, &plane, depth)?;
        observer.submesh_built(depth, k as u32 + 1, sub.len());
        decompose_recursive(
            arena,
            sub,
            core::mem::take(&mut per_set[k]),
            depth + 1,
            params,
            observer,
            polytopes,
        )?;
    }
    Ok(())
}

/// Re-measures every tracked edge in place, dropping the ones that are no
/// longer concave (or no longer exist at all).
fn refresh_concave_edges(arena: &VertexArena, concave: &mut Vec<ConcaveEdge>, tolerance: Real) {
    concave.retain_mut(|edge| {
        let Some(at) = locate_edge(arena, edge.i0, edge.i1) else {
            return false;
        };
        let (concavity, bisect_dir) = measure_concavity(arena, at);
        edge.concavity = concavity;
        edge.bisect_dir = bisect_dir;
        concavity > tolerance
    });
}
