//! Triangle meshes derived from height grids.
//!
//! # Overview
//!
//! [`GridMesh::build`] turns a [`HeightGrid`](crate::grid::HeightGrid) into a
//! [`TriMesh`]: one vertex per valid cell and up to two triangles per grid
//! quad. Positions are normalized by a [`ScalingTransform`] so the smoothing
//! threshold does not depend on absolute units. [`Adjacency`] provides the
//! 1-ring tables the smoother walks, and [`NormalField`] holds face and vertex
//! normals.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`FaceId`] - Identifies a face
//!
//! # Example
//!
//! ```
//! use terrace::grid::{Grid, HeightGrid};
//! use terrace::mesh::{Adjacency, FaceNeighborhood, GridMesh};
//!
//! let grid = Grid::filled(4, 4, 1.0, 2.5).unwrap();
//! let mesh = GridMesh::build(&grid);
//! let adjacency = Adjacency::build(mesh.mesh());
//!
//! assert_eq!(mesh.mesh().num_faces(), 18);
//! assert_eq!(adjacency.face_ring(FaceNeighborhood::SharedEdge).len(), 18);
//!
//! let out = mesh.rasterize(&grid).unwrap();
//! assert!((out.value(3, 3) - 2.5).abs() < 1e-12);
//! ```

mod adjacency;
mod builder;
mod index;
mod normals;
mod raster;
mod transform;
mod trimesh;

pub use adjacency::{Adjacency, FaceNeighborhood, RingTable, MAX_EDGE_NEIGHBORS};
pub use builder::GridMesh;
pub use index::{FaceId, VertexId};
pub use normals::NormalField;
pub use transform::ScalingTransform;
pub use trimesh::TriMesh;

pub(crate) use normals::normalized_or_keep;
