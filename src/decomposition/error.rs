/// Failure of a decomposition run.
///
/// None of these is recovered from: each aborts the decomposition of the
/// whole input mesh, reporting the recursion depth that failed. There is no
/// partial or best-effort result.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompositionError {
    /// Every edge around the most concave edge's endpoints was collinear
    /// with it, leaving no candidate cutting plane. Well-formed input should
    /// never get here; degenerate geometry can.
    #[error("no cutting plane found around the concave edge ({i0}, {i1}) at depth {depth}")]
    NoSplitPlaneFound {
        /// Lower endpoint of the concave edge that had no candidate.
        i0: u32,
        /// Higher endpoint of the concave edge that had no candidate.
        i1: u32,
        /// Recursion depth at which the search failed.
        depth: usize,
    },

    /// The adjacency around an edge was not that of a closed 2-manifold:
    /// a triangle apex was missing, or the two sides disagreed.
    #[error("inconsistent adjacency around edge ({i0}, {i1}) at depth {depth}: the input is not a closed 2-manifold")]
    MalformedAdjacency {
        /// One endpoint of the offending edge.
        i0: u32,
        /// The other endpoint of the offending edge.
        i1: u32,
        /// Recursion depth at which the inconsistency surfaced.
        depth: usize,
    },

    /// No duplicate of an on-plane vertex carries the set a concave edge
    /// landed in. The separation step broke an internal invariant.
    #[error("vertex {vertex} has no duplicate for set {set_id} at depth {depth}")]
    DuplicateSearchExhausted {
        /// The on-plane vertex whose duplicate chain was walked.
        vertex: u32,
        /// The set id no duplicate carried.
        set_id: u32,
        /// Recursion depth at which the chain ran out.
        depth: usize,
    },

    /// A rim polygon left by a cut could not be triangulated.
    #[error("failed to triangulate a cut face with {num_vertices} rim vertices at depth {depth}")]
    HoleTriangulationFailed {
        /// Number of vertices on the rim that resisted triangulation.
        num_vertices: usize,
        /// Recursion depth at which triangulation failed.
        depth: usize,
    },
}
