//! # Terrace
//!
//! Feature-preserving denoising of height-field grids such as digital
//! elevation models.
//!
//! A grid is triangulated into a mesh with one vertex per valid cell. Face
//! normals are smoothed by anisotropic diffusion, which averages only normals
//! that are already similar, and vertices are then relaxed toward the planes
//! of their smoothed faces. Noise on gentle slopes is removed while ridges,
//! cliffs and terraces keep their shape.
//!
//! ## Features
//!
//! - **Trait-based grid access**: any raster container works through
//!   [`HeightGrid`](grid::HeightGrid) and [`HeightGridMut`](grid::HeightGridMut)
//! - **No-data aware**: missing cells never become vertices and stay missing
//! - **Parallel**: both smoothing phases run on rayon with results identical
//!   to sequential execution
//! - **File formats**: ESRI ASCII grids, PLY mesh export
//!
//! ## Quick Start
//!
//! ```no_run
//! use terrace::prelude::*;
//!
//! let grid = terrace::io::load_grid("dem.asc").unwrap();
//! let smoothed = denoise_grid(&grid, &DenoiseOptions::default()).unwrap();
//! terrace::io::save_grid(&smoothed, "dem_smooth.asc").unwrap();
//! ```
//!
//! ## Step by Step
//!
//! ```
//! use terrace::prelude::*;
//!
//! let mut grid = Grid::filled(6, 6, 25.0, 120.0).unwrap();
//! grid.set_value(3, 3, 121.5);
//! grid.set_no_data(0, 0);
//!
//! let mut mesh = GridMesh::build(&grid);
//! assert_eq!(mesh.mesh().num_vertices(), 35);
//!
//! let options = DenoiseOptions::default().with_z_only(true);
//! denoise_mesh(&mut mesh, &options, &Progress::none()).unwrap();
//!
//! let out = mesh.rasterize(&grid).unwrap();
//! assert!(out.is_no_data(0, 0));
//! assert!(out.value(3, 3) < 121.5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod grid;
pub mod io;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use terrace::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{
        denoise_grid, denoise_grid_with_progress, denoise_into, denoise_mesh,
        AnisotropicSmoother, CancelToken, DenoiseOptions, Progress,
    };
    pub use crate::error::{DenoiseError, Result};
    pub use crate::grid::{Grid, HeightGrid, HeightGridMut};
    pub use crate::mesh::{
        Adjacency, FaceId, FaceNeighborhood, GridMesh, NormalField, TriMesh, VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
