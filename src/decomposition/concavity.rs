use crate::math::{Point, Real, Vector};
use crate::mesh::{EdgeRef, Mesh, VertexArena};
use crate::utils::SortedPair;

/// A new best concavity must beat the running one by this margin, so float
/// noise cannot make the pick depend on enumeration order.
const MOST_CONCAVE_MARGIN: Real = 1.0e-5;

/// An edge flagged as locally concave, in canonical `i0 < i1` form.
#[derive(Clone, Copy, Debug)]
pub struct ConcaveEdge {
    /// Lower-indexed endpoint.
    pub i0: u32,
    /// Higher-indexed endpoint.
    pub i1: u32,
    /// Measured concavity depth (> 0 for a concave edge).
    pub concavity: Real,
    /// Direction bisecting the concave opening.
    pub bisect_dir: Vector<Real>,
    /// Side of the current cut this edge belongs to; only meaningful while
    /// sub-meshes are being separated.
    pub set_id: u32,
}

impl ConcaveEdge {
    pub(crate) fn new(a: u32, b: u32, concavity: Real, bisect_dir: Vector<Real>) -> Self {
        let (i0, i1) = SortedPair::new(a, b).into_tuple();
        Self {
            i0,
            i1,
            concavity,
            bisect_dir,
            set_id: 0,
        }
    }

    /// This edge with both endpoints translated through `remap`.
    pub(crate) fn remapped(&self, remap: &[u32]) -> Self {
        Self::new(
            remap[self.i0 as usize],
            remap[self.i1 as usize],
            self.concavity,
            self.bisect_dir,
        )
    }
}

/// Measures how concave the mesh is across the edge under `at`.
///
/// Returns the concavity depth together with the direction bisecting the
/// opening, or zero for a convex or flat edge. This is a local, single-ring
/// approximation of the distance to the convex hull: cheap, and good enough
/// to rank cut locations.
pub(crate) fn measure_concavity(arena: &VertexArena, at: EdgeRef) -> (Real, Vector<Real>) {
    let (i0, i1) = at.endpoints(arena);
    let (n_prev, n_next) = arena[i0].ring_around(at.pos as usize);

    let p0 = arena[i0].pos;
    let edge = arena[i1].pos - p0;
    let to_prev = arena[n_prev].pos - p0;
    let to_next = arena[n_next].pos - p0;

    if edge.dot(&to_prev.cross(&to_next)) >= 0.0 {
        // The two faces meet convex or flat across this edge.
        return (0.0, Vector::zeros());
    }

    let bridge = to_next - to_prev;
    let bisect_dir = edge.cross(&bridge).normalize();
    (bisect_dir.dot(&to_prev), bisect_dir)
}

/// Scans every edge of `mesh` once and collects those more concave than
/// `tolerance`, sorted canonically.
///
/// Returns `None` when the mesh is convex across every edge.
pub(crate) fn find_concave_edges(
    arena: &VertexArena,
    mesh: &Mesh,
    tolerance: Real,
) -> Option<Vec<ConcaveEdge>> {
    let mut edges = Vec::new();
    for at in mesh.edges(arena) {
        let (concavity, bisect_dir) = measure_concavity(arena, at);
        if concavity > tolerance {
            let (i0, i1) = at.endpoints(arena);
            edges.push(ConcaveEdge::new(i0, i1, concavity, bisect_dir));
        }
    }
    if edges.is_empty() {
        return None;
    }
    edges.sort_unstable_by_key(|e| (e.i0, e.i1));
    Some(edges)
}

/// Index of the deepest concavity in `edges`.
pub(crate) fn most_concave(edges: &[ConcaveEdge]) -> usize {
    let mut best = 0;
    for (i, edge) in edges.iter().enumerate().skip(1) {
        if edge.concavity > edges[best].concavity + MOST_CONCAVE_MARGIN {
            best = i;
        }
    }
    best
}

/// Whether the triangle mesh described by flat buffers is convex within
/// `concave_tolerance` across every edge.
///
/// The buffers must satisfy the same contract as
/// [`Mesh::from_trimesh`].
pub fn trimesh_is_convex(
    vertices: &[Point<Real>],
    indices: &[[u32; 3]],
    concave_tolerance: Real,
) -> bool {
    let mut arena = VertexArena::with_capacity(vertices.len());
    let mesh = Mesh::from_trimesh(&mut arena, vertices, indices);
    find_concave_edges(&arena, &mesh, concave_tolerance).is_none()
}
