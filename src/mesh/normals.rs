//! Face and vertex normals.

use nalgebra::Vector3;

use super::index::{FaceId, VertexId};
use super::trimesh::TriMesh;

/// Per-face and per-vertex unit normals of a [`TriMesh`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalField {
    /// Unit normal of every face.
    pub faces: Vec<Vector3<f64>>,
    /// Area-weighted unit normal of every vertex.
    pub vertices: Vec<Vector3<f64>>,
}

impl NormalField {
    /// Compute all normals from the current vertex positions.
    ///
    /// Faces without area and vertices whose accumulated normal cancels out
    /// keep a zero vector; callers must tolerate zero normals.
    pub fn compute(mesh: &TriMesh) -> Self {
        let mut faces = Vec::with_capacity(mesh.num_faces());
        let mut vertices = vec![Vector3::zeros(); mesh.num_vertices()];

        for f in mesh.face_ids() {
            let cross = mesh.face_cross(f);
            let area = 0.5 * cross.norm();
            let normal = normalized_or_keep(cross);

            for v in mesh.face(f) {
                vertices[v.index()] += normal * area;
            }
            faces.push(normal);
        }

        for n in &mut vertices {
            *n = normalized_or_keep(*n);
        }

        Self { faces, vertices }
    }

    /// Normal of face `f`.
    #[inline]
    pub fn face(&self, f: FaceId) -> &Vector3<f64> {
        &self.faces[f.index()]
    }

    /// Normal of vertex `v`.
    #[inline]
    pub fn vertex(&self, v: VertexId) -> &Vector3<f64> {
        &self.vertices[v.index()]
    }
}

/// Normalize `v`, or return it unchanged if it has zero length.
#[inline]
pub(crate) fn normalized_or_keep(v: Vector3<f64>) -> Vector3<f64> {
    let len = v.norm();
    if len != 0.0 {
        v / len
    } else {
        v
    }
}
