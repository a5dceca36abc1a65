use crate::math::{Point, Real, Vector};
use core::ops::{Index, IndexMut};
use smallvec::SmallVec;

/// Sentinel index marking the absence of a vertex.
pub const NIL: u32 = u32::MAX;

/// A mesh vertex: a point plus the ordered, cyclic list of its neighbors.
///
/// The neighbor ring is the entire adjacency representation: every
/// consecutive pair `(neighbors[i], neighbors[i + 1])`, taken cyclically,
/// forms a triangle with the vertex itself, wound counter-clockwise seen
/// from outside the mesh. Every mutation must preserve this ordering; all
/// the cutting algorithms rely on it.
#[derive(Clone, Debug)]
pub struct Vertex {
    /// The position of this vertex.
    pub pos: Point<Real>,
    /// Indices of the neighboring vertices, in cyclic order.
    pub neighbors: SmallVec<[u32; 8]>,
    /// Identifier of the connected set this vertex belongs to while a cut is
    /// processed (0 = unassigned, or resident on the split plane).
    pub set_id: u32,
    /// `true` while this vertex lies on the active split plane.
    pub on_plane: bool,
    /// Translation that projects this vertex onto the active split plane.
    /// Recorded during classification, applied once the division pass is
    /// over so that all classifications read original positions.
    pub plane_offset: Vector<Real>,
    /// Chains the on-plane vertices discovered by the grouping pass.
    pub plane_link: u32,
    /// Chains the per-set duplicates of one original on-plane vertex.
    pub dup_link: u32,
    /// Intrusive list spine of the owning [`Mesh`](super::Mesh) view.
    pub next: u32,
}

impl Vertex {
    /// A vertex at `pos` with no adjacency.
    pub fn new(pos: Point<Real>) -> Self {
        Self {
            pos,
            neighbors: SmallVec::new(),
            set_id: 0,
            on_plane: false,
            plane_offset: Vector::zeros(),
            plane_link: NIL,
            dup_link: NIL,
            next: NIL,
        }
    }

    /// Position of `index` inside this vertex's neighbor ring.
    pub fn ring_position(&self, index: u32) -> Option<usize> {
        self.neighbors.iter().position(|&n| n == index)
    }

    /// Neighbor at `pos`, wrapping around the cyclic ring.
    pub fn ring(&self, pos: usize) -> u32 {
        self.neighbors[pos % self.neighbors.len()]
    }

    /// The two neighbors flanking ring position `pos`.
    pub fn ring_around(&self, pos: usize) -> (u32, u32) {
        let len = self.neighbors.len();
        (
            self.neighbors[(pos + len - 1) % len],
            self.neighbors[(pos + 1) % len],
        )
    }
}

/// The growable, append-only pool backing every vertex of one decomposition
/// run.
///
/// Indices handed out by [`push`](Self::push) stay valid for the whole
/// lifetime of the arena: vertices are never moved or deleted, splitting and
/// separation only ever append. The arena is dropped wholesale once the
/// decomposition's output has been extracted.
#[derive(Clone, Default)]
pub struct VertexArena {
    verts: Vec<Vertex>,
}

impl VertexArena {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty arena with room for `capacity` vertices.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            verts: Vec::with_capacity(capacity),
        }
    }

    /// The number of vertices ever created in this arena.
    pub fn len(&self) -> usize {
        self.verts.len()
    }

    /// Whether this arena holds no vertex at all.
    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    /// Appends `vertex` and returns its index.
    pub fn push(&mut self, vertex: Vertex) -> u32 {
        let id = self.verts.len() as u32;
        self.verts.push(vertex);
        id
    }
}

impl Index<u32> for VertexArena {
    type Output = Vertex;

    fn index(&self, index: u32) -> &Vertex {
        &self.verts[index as usize]
    }
}

impl IndexMut<u32> for VertexArena {
    fn index_mut(&mut self, index: u32) -> &mut Vertex {
        &mut self.verts[index as usize]
    }
}
