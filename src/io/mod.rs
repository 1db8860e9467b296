//! Grid and mesh file I/O.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | ESRI ASCII grid | `.asc` | ✓ | ✓ | Height grids |
//! | PLY | `.ply` | ✗ | ✓ | Meshes with vertex normals |
//!
//! # Usage
//!
//! ```no_run
//! use terrace::io::{load_grid, save_grid};
//!
//! let grid = load_grid("dem.asc").unwrap();
//! save_grid(&grid, "copy.asc").unwrap();
//! ```

pub mod asc;
pub mod ply;

use std::path::Path;

use crate::error::{DenoiseError, Result};
use crate::grid::{Grid, HeightGrid};
use crate::mesh::GridMesh;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// ESRI ASCII grid.
    AsciiGrid,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "asc" => Some(Format::AsciiGrid),
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

fn unsupported(path: &Path) -> DenoiseError {
    DenoiseError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    }
}

/// Load a height grid with automatic format detection.
pub fn load_grid<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let path = path.as_ref();
    match Format::from_path(path) {
        Some(Format::AsciiGrid) => asc::load(path),
        _ => Err(unsupported(path)),
    }
}

/// Save a height grid with automatic format detection.
pub fn save_grid<G: HeightGrid + ?Sized, P: AsRef<Path>>(grid: &G, path: P) -> Result<()> {
    let path = path.as_ref();
    match Format::from_path(path) {
        Some(Format::AsciiGrid) => asc::save(grid, path),
        _ => Err(unsupported(path)),
    }
}

/// Save a mesh with automatic format detection.
pub fn save_mesh<P: AsRef<Path>>(mesh: &GridMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match Format::from_path(path) {
        Some(Format::Ply) => ply::save(mesh, path),
        _ => Err(unsupported(path)),
    }
}
