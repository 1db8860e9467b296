//! Indexed triangle mesh.
//!
//! [`TriMesh`] is the single owner of vertex positions and face topology.
//! Everything derived from it (adjacency tables, normals, cell lookups) refers
//! back to it through [`VertexId`] and [`FaceId`].

use nalgebra::{Point3, Vector3};

use super::index::{FaceId, VertexId};
use super::transform::bounds;
use crate::error::{DenoiseError, Result};

/// An indexed triangle mesh with fixed topology.
///
/// Vertex positions may be moved; the vertex and face counts never change
/// after construction.
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    /// Vertex positions, indexed by [`VertexId`].
    pub(crate) positions: Vec<Point3<f64>>,

    /// Triangles as vertex triples, indexed by [`FaceId`].
    pub(crate) faces: Vec<[VertexId; 3]>,
}

impl TriMesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        Self {
            positions: Vec::with_capacity(num_vertices),
            faces: Vec::with_capacity(num_faces),
        }
    }

    /// Build a mesh from vertex positions and triangle index triples.
    ///
    /// Unlike grid construction this accepts arbitrary topology, including
    /// non-manifold fans, which makes it useful for exercising the adjacency
    /// index directly.
    ///
    /// # Example
    /// ```
    /// use terrace::mesh::TriMesh;
    /// use nalgebra::Point3;
    ///
    /// let vertices = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.5, 1.0, 0.0),
    /// ];
    /// let mesh = TriMesh::from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
    /// assert_eq!(mesh.num_faces(), 1);
    /// ```
    pub fn from_triangles(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Result<Self> {
        for (fi, face) in faces.iter().enumerate() {
            if let Some(&vi) = face.iter().find(|&&vi| vi >= vertices.len()) {
                return Err(DenoiseError::InvalidGrid(format!(
                    "face {} references invalid vertex index {}",
                    fi, vi
                )));
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                return Err(DenoiseError::InvalidGrid(format!(
                    "face {} is degenerate (has duplicate vertices)",
                    fi
                )));
            }
        }

        let mut mesh = Self::with_capacity(vertices.len(), faces.len());
        for &p in vertices {
            mesh.add_vertex(p);
        }
        for f in faces {
            mesh.add_face([VertexId::new(f[0]), VertexId::new(f[1]), VertexId::new(f[2])]);
        }
        Ok(mesh)
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.positions[v.index()]
    }

    /// All vertex positions, indexed by vertex.
    #[inline]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// Get the three vertices of a face.
    #[inline]
    pub fn face(&self, f: FaceId) -> [VertexId; 3] {
        self.faces[f.index()]
    }

    /// All faces, indexed by face.
    #[inline]
    pub fn faces(&self) -> &[[VertexId; 3]] {
        &self.faces
    }

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.positions.len()).map(VertexId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Get the positions of the three vertices of a face.
    pub fn face_positions(&self, f: FaceId) -> [Point3<f64>; 3] {
        let [v0, v1, v2] = self.face(f);
        [*self.position(v0), *self.position(v1), *self.position(v2)]
    }

    // ==================== Geometry ====================

    /// Cross product of the two edges leaving the first corner.
    ///
    /// Its direction is the face normal, its length twice the face area.
    pub fn face_cross(&self, f: FaceId) -> Vector3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        (p1 - p0).cross(&(p2 - p0))
    }

    /// Compute the centroid of a face.
    pub fn face_centroid(&self, f: FaceId) -> Point3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        Point3::from((p0.coords + p1.coords + p2.coords) / 3.0)
    }

    /// Compute the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        bounds(&self.positions)
    }

    // ==================== Construction ====================

    /// Add a new vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId {
        let id = VertexId::new(self.positions.len());
        self.positions.push(position);
        id
    }

    /// Add a new triangle and return its ID.
    pub(crate) fn add_face(&mut self, vertices: [VertexId; 3]) -> FaceId {
        let id = FaceId::new(self.faces.len());
        self.faces.push(vertices);
        id
    }

    // ==================== Validation ====================

    /// Check that every face references three distinct, existing vertices.
    pub fn is_valid(&self) -> bool {
        let n = self.positions.len();
        self.faces.iter().all(|&[a, b, c]| {
            a.index() < n && b.index() < n && c.index() < n && a != b && b != c && a != c
        })
    }
}
