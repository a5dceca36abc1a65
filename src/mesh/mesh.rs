use super::{Vertex, VertexArena, NIL};
use crate::math::{Point, Real};
use smallvec::SmallVec;

/// A lightweight view over a subset of an arena's vertices.
///
/// The subset is materialized as an intrusive singly linked list threaded
/// through each member's `next` field; a mesh owns membership, never vertex
/// storage. Several views may live on one arena as long as their member sets
/// stay disjoint.
#[derive(Clone, Copy, Debug)]
pub struct Mesh {
    first: u32,
    len: u32,
}

impl Mesh {
    /// A view with no members.
    pub const EMPTY: Mesh = Mesh { first: NIL, len: 0 };

    /// The number of vertices in this view.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether this view has no members.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the first vertex of the member list.
    pub fn first_vertex(&self) -> u32 {
        self.first
    }

    /// Prepends an arena vertex to this view's member list.
    pub fn push_vertex(&mut self, arena: &mut VertexArena, vertex: u32) {
        arena[vertex].next = self.first;
        self.first = vertex;
        self.len += 1;
    }

    /// Iterates over the indices of this view's vertices.
    pub fn vertices<'a>(&self, arena: &'a VertexArena) -> VertexIds<'a> {
        VertexIds {
            arena,
            cur: self.first,
        }
    }

    /// Builds the adjacency mesh of a triangle mesh given as flat
    /// vertex/index buffers.
    ///
    /// Every triangle `(a, b, c)` must be wound counter-clockwise seen from
    /// outside, and the buffers must describe a closed 2-manifold: no
    /// boundary edges, no non-manifold vertices. Violations are not
    /// detected; they leave an adjacency the decomposition algorithms are
    /// free to misinterpret.
    pub fn from_trimesh(
        arena: &mut VertexArena,
        vertices: &[Point<Real>],
        indices: &[[u32; 3]],
    ) -> Mesh {
        let base = arena.len() as u32;

        // Each triangle (a, b, c) pins down three ring successions: c
        // follows b around a, a follows c around b, b follows a around c.
        let mut successors: Vec<SmallVec<[(u32, u32); 8]>> = vec![SmallVec::new(); vertices.len()];
        for tri in indices {
            let [a, b, c] = *tri;
            successors[a as usize].push((b, c));
            successors[b as usize].push((c, a));
            successors[c as usize].push((a, b));
        }

        for pt in vertices {
            let _ = arena.push(Vertex::new(*pt));
        }

        for (i, fan) in successors.iter().enumerate() {
            if fan.is_empty() {
                continue;
            }
            // Chain the successions into the cyclic ring, starting at the
            // smallest neighbor for a reproducible layout.
            let start = fan.iter().map(|&(from, _)| from).min().unwrap();
            let mut ring: SmallVec<[u32; 8]> = SmallVec::new();
            let mut cur = start;
            for _ in 0..fan.len() {
                ring.push(base + cur);
                match fan.iter().find(|&&(from, _)| from == cur) {
                    Some(&(_, to)) => cur = to,
                    None => break,
                }
                if cur == start {
                    break;
                }
            }
            arena[base + i as u32].neighbors = ring;
        }

        let mut mesh = Mesh::EMPTY;
        for i in (0..vertices.len()).rev() {
            mesh.push_vertex(arena, base + i as u32);
        }
        mesh
    }

    /// Clones every vertex of this view into fresh arena entries, leaving
    /// the original view untouched.
    pub fn duplicate(&self, arena: &mut VertexArena) -> Mesh {
        self.duplicate_with_remap(arena).0
    }

    /// Clones every vertex of this view into fresh arena entries.
    ///
    /// Returns the cloned view plus an arena-wide remap table from old
    /// vertex index to clone index (`NIL` outside the view). The view must
    /// be self-contained: every ring entry of a member refers to a member.
    pub(crate) fn duplicate_with_remap(&self, arena: &mut VertexArena) -> (Mesh, Vec<u32>) {
        let ids: Vec<u32> = self.vertices(arena).collect();
        let mut remap = vec![NIL; arena.len()];

        for &v in &ids {
            let clone = arena[v].clone();
            remap[v as usize] = arena.push(clone);
        }
        for &v in &ids {
            let nv = remap[v as usize];
            let mut ring = core::mem::take(&mut arena[nv].neighbors);
            for n in ring.iter_mut() {
                *n = remap[*n as usize];
            }
            arena[nv].neighbors = ring;
        }

        let mut mesh = Mesh::EMPTY;
        for &v in ids.iter().rev() {
            mesh.push_vertex(arena, remap[v as usize]);
        }
        (mesh, remap)
    }

    /// Extracts flat position/index buffers for this view.
    ///
    /// Vertices appear in member-list order; triangles are emitted in face
    /// iteration order, with indices into the returned vertex buffer.
    pub fn to_trimesh(&self, arena: &VertexArena) -> (Vec<Point<Real>>, Vec<[u32; 3]>) {
        let ids: Vec<u32> = self.vertices(arena).collect();
        let mut local = vec![NIL; arena.len()];
        let mut points = Vec::with_capacity(ids.len());
        for (k, &v) in ids.iter().enumerate() {
            local[v as usize] = k as u32;
            points.push(arena[v].pos);
        }

        let mut triangles = Vec::new();
        for face in self.faces(arena) {
            triangles.push([
                local[face[0] as usize],
                local[face[1] as usize],
                local[face[2] as usize],
            ]);
        }
        (points, triangles)
    }
}

/// Iterator over the vertex indices of a [`Mesh`] view.
pub struct VertexIds<'a> {
    arena: &'a VertexArena,
    cur: u32,
}

impl Iterator for VertexIds<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.cur == NIL {
            return None;
        }
        let id = self.cur;
        self.cur = self.arena[id].next;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point;

    fn cube() -> (Vec<Point<crate::math::Real>>, Vec<[u32; 3]>) {
        let vertices = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 0.0, 1.0),
            Point::new(1.0, 1.0, 1.0),
            Point::new(0.0, 1.0, 1.0),
        ];
        let indices = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            [3, 0, 4],
            [3, 4, 7],
        ];
        (vertices, indices)
    }

    #[test]
    fn cube_adjacency_is_a_valid_triangulation() {
        let (vertices, indices) = cube();
        let mut arena = VertexArena::new();
        let mesh = Mesh::from_trimesh(&mut arena, &vertices, &indices);
        assert_eq!(mesh.len(), 8);

        // Every consecutive ring pair must be one of the input triangles.
        let canonical: Vec<[u32; 3]> = indices
            .iter()
            .map(|t| {
                let mut rot = *t;
                while rot[0] != *t.iter().min().unwrap() {
                    rot = [rot[1], rot[2], rot[0]];
                }
                rot
            })
            .collect();

        for v in mesh.vertices(&arena) {
            let ring = &arena[v].neighbors;
            assert!(ring.len() >= 3);
            for k in 0..ring.len() {
                let face = [v, ring[k], ring[(k + 1) % ring.len()]];
                let mut rot = face;
                while rot[0] != *face.iter().min().unwrap() {
                    rot = [rot[1], rot[2], rot[0]];
                }
                assert!(
                    canonical.contains(&rot),
                    "ring pair {:?} of vertex {} is not an input triangle",
                    face,
                    v
                );
            }
        }
    }

    #[test]
    fn buffers_round_trip_in_input_order() {
        let (vertices, indices) = cube();
        let mut arena = VertexArena::new();
        let mesh = Mesh::from_trimesh(&mut arena, &vertices, &indices);
        let (points, triangles) = mesh.to_trimesh(&arena);
        assert_eq!(points, vertices);
        assert_eq!(triangles.len(), indices.len());
    }

    #[test]
    fn duplicate_preserves_structure() {
        let (vertices, indices) = cube();
        let mut arena = VertexArena::new();
        let mesh = Mesh::from_trimesh(&mut arena, &vertices, &indices);
        let copy = mesh.duplicate(&mut arena);

        assert_eq!(copy.len(), mesh.len());
        assert_eq!(arena.len(), 16);
        let (points, triangles) = copy.to_trimesh(&arena);
        assert_eq!(points, vertices);
        assert_eq!(triangles.len(), indices.len());
    }
}
