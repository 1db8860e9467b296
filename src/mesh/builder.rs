//! Mesh construction from height grids.
//!
//! Every valid cell becomes one vertex, numbered in row-major scan order. Each
//! quad of four neighboring cells contributes two triangles when all corners
//! are valid, one triangle when exactly one corner is missing, and none
//! otherwise.

use log::debug;
use nalgebra::Point3;

use super::index::VertexId;
use super::normals::NormalField;
use super::transform::ScalingTransform;
use super::trimesh::TriMesh;
use crate::grid::HeightGrid;

/// A triangle mesh derived from a height grid, together with the mapping
/// back to the grid's cells.
///
/// Vertex positions are kept in the normalized frame of [`transform`]
/// (see [`ScalingTransform`]); use [`world_position`] for grid units.
///
/// [`transform`]: GridMesh::transform
/// [`world_position`]: GridMesh::world_position
#[derive(Debug, Clone)]
pub struct GridMesh {
    pub(crate) mesh: TriMesh,
    pub(crate) normals: NormalField,
    cells: Vec<Option<VertexId>>,
    nx: usize,
    ny: usize,
    transform: ScalingTransform,
}

impl GridMesh {
    /// Triangulate `grid`.
    ///
    /// Vertex `(x, y, z)` is taken from cell `(col, row)` as
    /// `(row * cellsize, col * cellsize, value)`, normalized into the unit
    /// box, and initial face and vertex normals are computed.
    ///
    /// A grid without valid cells, or without any quad of at least three
    /// valid cells, produces a mesh with no faces. Such a mesh is still
    /// usable: smoothing leaves it unchanged and rasterizing reproduces the
    /// input.
    ///
    /// # Example
    /// ```
    /// use terrace::grid::Grid;
    /// use terrace::mesh::GridMesh;
    ///
    /// let grid = Grid::filled(3, 3, 1.0, 0.0).unwrap();
    /// let mesh = GridMesh::build(&grid);
    /// assert_eq!(mesh.mesh().num_vertices(), 9);
    /// assert_eq!(mesh.mesh().num_faces(), 8);
    /// ```
    pub fn build<G: HeightGrid + ?Sized>(grid: &G) -> Self {
        let (nx, ny) = (grid.nx(), grid.ny());
        let cell_size = grid.cell_size();

        let mut mesh = TriMesh::with_capacity(
            grid.num_cells(),
            2 * nx.saturating_sub(1) * ny.saturating_sub(1),
        );
        let mut cells = Vec::with_capacity(grid.num_cells());

        for y in 0..ny {
            for x in 0..nx {
                if grid.is_no_data(x, y) {
                    cells.push(None);
                } else {
                    let p = Point3::new(
                        y as f64 * cell_size,
                        x as f64 * cell_size,
                        grid.value(x, y),
                    );
                    cells.push(Some(mesh.add_vertex(p)));
                }
            }
        }

        for y in 0..ny.saturating_sub(1) {
            for x in 0..nx.saturating_sub(1) {
                let k = x + y * nx;
                let kk = [k, k + 1, k + nx, k + nx + 1];
                let corners = kk.map(|c| cells[c]);
                let z = corners.map(|v| v.map_or(0.0, |v| mesh.position(v).z));

                triangulate_quad(corners, z, |tri| {
                    mesh.add_face(tri);
                });
            }
        }

        debug_assert!(mesh.is_valid());

        let transform = ScalingTransform::fit(mesh.positions());
        transform.apply_all(&mut mesh.positions);
        let normals = NormalField::compute(&mesh);

        debug!(
            "built grid mesh: {}x{} cells, {} vertices, {} faces, scale {:.6}",
            nx,
            ny,
            mesh.num_vertices(),
            mesh.num_faces(),
            transform.scale
        );

        Self {
            mesh,
            normals,
            cells,
            nx,
            ny,
            transform,
        }
    }

    /// The triangle mesh in normalized coordinates.
    #[inline]
    pub fn mesh(&self) -> &TriMesh {
        &self.mesh
    }

    /// The current face and vertex normals.
    #[inline]
    pub fn normals(&self) -> &NormalField {
        &self.normals
    }

    /// The transform between grid units and the normalized frame.
    #[inline]
    pub fn transform(&self) -> &ScalingTransform {
        &self.transform
    }

    /// Number of grid columns.
    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of grid rows.
    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// The vertex created for cell `(x, y)`, or `None` for a no-data cell.
    #[inline]
    pub fn cell_vertex(&self, x: usize, y: usize) -> Option<VertexId> {
        self.cells[x + y * self.nx]
    }

    /// Position of `v` in grid units.
    #[inline]
    pub fn world_position(&self, v: VertexId) -> Point3<f64> {
        self.transform.invert(self.mesh.position(v))
    }

    /// Recompute all normals from the current vertex positions.
    pub fn recompute_normals(&mut self) {
        self.normals = NormalField::compute(&self.mesh);
    }
}

/// Split one grid quad into triangles.
///
/// Corners are ordered `(x, y)`, `(x+1, y)`, `(x, y+1)`, `(x+1, y+1)`. With
/// all four present the split goes along the `1-2` diagonal only when both
/// `|z2-z0| > |z3-z1|` and `|z1-z0| > |z3-z2|` hold strictly; every other case,
/// ties included, splits along `0-3`.
fn triangulate_quad(
    corners: [Option<VertexId>; 4],
    z: [f64; 4],
    mut emit: impl FnMut([VertexId; 3]),
) {
    match corners {
        [Some(k0), Some(k1), Some(k2), Some(k3)] => {
            if (z[2] - z[0]).abs() > (z[3] - z[1]).abs()
                && (z[1] - z[0]).abs() > (z[3] - z[2]).abs()
            {
                emit([k0, k1, k2]);
                emit([k1, k3, k2]);
            } else {
                emit([k1, k3, k0]);
                emit([k0, k3, k2]);
            }
        }
        [None, Some(k1), Some(k2), Some(k3)] => emit([k1, k3, k2]),
        [Some(k0), None, Some(k2), Some(k3)] => emit([k0, k3, k2]),
        [Some(k0), Some(k1), None, Some(k3)] => emit([k1, k3, k0]),
        [Some(k0), Some(k1), Some(k2), None] => emit([k0, k1, k2]),
        _ => {}
    }
}
