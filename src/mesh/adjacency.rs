//! Mesh topology queries via adjacency tables.
//!
//! [`Adjacency`] derives four 1-ring tables from the face list of a
//! [`TriMesh`]:
//!
//! | Table | Row per | Contents |
//! |-------|---------|----------|
//! | [`vertex_vertices`](Adjacency::vertex_vertices) | vertex | edge-connected vertices |
//! | [`vertex_faces`](Adjacency::vertex_faces) | vertex | faces containing the vertex |
//! | [`face_faces_by_vertex`](Adjacency::face_faces_by_vertex) | face | faces sharing at least one vertex |
//! | [`face_faces_by_edge`](Adjacency::face_faces_by_edge) | face | faces sharing a full edge (at most 3) |
//!
//! Rows are collected into small growable vectors and then compacted into a
//! [`RingTable`], a flat item array with per-row offsets.

use log::warn;

use super::index::{FaceId, VertexId};
use super::trimesh::TriMesh;

/// Initial capacity of a ring while it is being collected. Rings around grid
/// vertices rarely hold more than six entries.
const RING_CAPACITY: usize = 6;

/// Maximum number of faces that can share an edge with a manifold triangle.
pub const MAX_EDGE_NEIGHBORS: usize = 3;

/// Which faces count as neighbors of a face during normal diffusion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaceNeighborhood {
    /// Faces sharing at least one vertex.
    #[default]
    SharedVertex,
    /// Faces sharing a full edge.
    SharedEdge,
}

/// Variable-length rows stored back to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingTable<T> {
    /// `offsets[i]..offsets[i + 1]` is the range of row `i` in `items`.
    offsets: Vec<usize>,
    items: Vec<T>,
}

impl<T> Default for RingTable<T> {
    fn default() -> Self {
        Self {
            offsets: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl<T: Copy> RingTable<T> {
    fn from_rows(rows: Vec<Vec<T>>) -> Self {
        let total = rows.iter().map(Vec::len).sum();
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut items = Vec::with_capacity(total);

        offsets.push(0);
        for row in rows {
            items.extend_from_slice(&row);
            offsets.push(items.len());
        }

        Self { offsets, items }
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Whether the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        &self.items[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Iterate over all rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.offsets.windows(2).map(|w| &self.items[w[0]..w[1]])
    }

    /// Total number of entries over all rows.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.items.len()
    }
}

/// The four 1-ring tables of a triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    vertex_vertices: RingTable<VertexId>,
    vertex_faces: RingTable<FaceId>,
    face_faces_by_vertex: RingTable<FaceId>,
    face_faces_by_edge: RingTable<FaceId>,
    truncated: usize,
}

impl Adjacency {
    /// Build all adjacency tables of `mesh`.
    ///
    /// # Example
    /// ```
    /// use terrace::mesh::{Adjacency, FaceId, TriMesh, VertexId};
    /// use nalgebra::Point3;
    ///
    /// let vertices = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    ///     Point3::new(1.0, 1.0, 0.0),
    /// ];
    /// let mesh = TriMesh::from_triangles(&vertices, &[[0, 1, 2], [1, 3, 2]]).unwrap();
    /// let adj = Adjacency::build(&mesh);
    ///
    /// assert_eq!(adj.vertex_faces(VertexId::new(1)).len(), 2);
    /// assert_eq!(adj.face_faces_by_edge(FaceId::new(0)), &[FaceId::new(1)]);
    /// ```
    pub fn build(mesh: &TriMesh) -> Self {
        let vertex_vertices = build_vertex_vertices(mesh);
        let vertex_faces = build_vertex_faces(mesh);
        let face_faces_by_vertex = build_face_faces_by_vertex(mesh, &vertex_faces);
        let (face_faces_by_edge, truncated) = build_face_faces_by_edge(mesh, &vertex_faces);

        if truncated > 0 {
            warn!(
                "{} faces have more than {} edge neighbors (non-manifold input); extra neighbors ignored",
                truncated, MAX_EDGE_NEIGHBORS
            );
        }

        Self {
            vertex_vertices,
            vertex_faces,
            face_faces_by_vertex,
            face_faces_by_edge,
            truncated,
        }
    }

    /// Vertices connected to `v` by an edge.
    #[inline]
    pub fn vertex_vertices(&self, v: VertexId) -> &[VertexId] {
        self.vertex_vertices.row(v.index())
    }

    /// Faces containing `v`.
    #[inline]
    pub fn vertex_faces(&self, v: VertexId) -> &[FaceId] {
        self.vertex_faces.row(v.index())
    }

    /// Faces other than `f` sharing at least one vertex with it.
    #[inline]
    pub fn face_faces_by_vertex(&self, f: FaceId) -> &[FaceId] {
        self.face_faces_by_vertex.row(f.index())
    }

    /// Faces sharing a full edge with `f` (at most [`MAX_EDGE_NEIGHBORS`]).
    #[inline]
    pub fn face_faces_by_edge(&self, f: FaceId) -> &[FaceId] {
        self.face_faces_by_edge.row(f.index())
    }

    /// The face-to-face table selected by `neighborhood`.
    pub fn face_ring(&self, neighborhood: FaceNeighborhood) -> &RingTable<FaceId> {
        match neighborhood {
            FaceNeighborhood::SharedVertex => &self.face_faces_by_vertex,
            FaceNeighborhood::SharedEdge => &self.face_faces_by_edge,
        }
    }

    /// The vertex-to-face table.
    #[inline]
    pub fn vertex_face_table(&self) -> &RingTable<FaceId> {
        &self.vertex_faces
    }

    /// Number of faces whose edge-neighbor row was cut at
    /// [`MAX_EDGE_NEIGHBORS`].
    #[inline]
    pub fn truncated_faces(&self) -> usize {
        self.truncated
    }
}

fn push_unique<T: PartialEq>(row: &mut Vec<T>, item: T) {
    if !row.contains(&item) {
        row.push(item);
    }
}

fn empty_rows<T>(n: usize) -> Vec<Vec<T>> {
    (0..n).map(|_| Vec::with_capacity(RING_CAPACITY)).collect()
}

fn build_vertex_vertices(mesh: &TriMesh) -> RingTable<VertexId> {
    let mut rows: Vec<Vec<VertexId>> = empty_rows(mesh.num_vertices());

    for face in mesh.faces() {
        for i in 0..3 {
            let row = &mut rows[face[i].index()];
            push_unique(row, face[(i + 2) % 3]);
            push_unique(row, face[(i + 1) % 3]);
        }
    }

    RingTable::from_rows(rows)
}

fn build_vertex_faces(mesh: &TriMesh) -> RingTable<FaceId> {
    let mut rows: Vec<Vec<FaceId>> = empty_rows(mesh.num_vertices());

    for f in mesh.face_ids() {
        for v in mesh.face(f) {
            rows[v.index()].push(f);
        }
    }

    RingTable::from_rows(rows)
}

fn build_face_faces_by_vertex(mesh: &TriMesh, vertex_faces: &RingTable<FaceId>) -> RingTable<FaceId> {
    let rows = mesh
        .face_ids()
        .map(|f| {
            let mut row = Vec::with_capacity(3 * RING_CAPACITY);
            for v in mesh.face(f) {
                for &g in vertex_faces.row(v.index()) {
                    if g != f {
                        push_unique(&mut row, g);
                    }
                }
            }
            row
        })
        .collect();

    RingTable::from_rows(rows)
}

fn build_face_faces_by_edge(
    mesh: &TriMesh,
    vertex_faces: &RingTable<FaceId>,
) -> (RingTable<FaceId>, usize) {
    let mut truncated = 0;

    let rows = mesh
        .face_ids()
        .map(|f| {
            let corners = mesh.face(f);
            let mut row = Vec::with_capacity(MAX_EDGE_NEIGHBORS);
            let mut overflow = false;

            'edges: for i in 0..3 {
                let (u, w) = (corners[i], corners[(i + 1) % 3]);
                for &g in vertex_faces.row(u.index()) {
                    if g == f || row.contains(&g) || !mesh.face(g).contains(&w) {
                        continue;
                    }
                    if row.len() == MAX_EDGE_NEIGHBORS {
                        overflow = true;
                        break 'edges;
                    }
                    row.push(g);
                }
            }

            if overflow {
                truncated += 1;
            }
            row
        })
        .collect();

    (RingTable::from_rows(rows), truncated)
}
