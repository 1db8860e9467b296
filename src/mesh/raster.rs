//! Writing mesh heights back into grids.

use super::builder::GridMesh;
use crate::error::{DenoiseError, Result};
use crate::grid::{Grid, HeightGrid, HeightGridMut};

impl GridMesh {
    /// Rasterize the mesh into a new grid with the geometry of `source`.
    ///
    /// `source` is normally the grid the mesh was built from: its cell size,
    /// origin and no-data sentinel are carried over. Cells without a vertex
    /// become no-data; every other cell receives its vertex height in grid
    /// units.
    ///
    /// Fails with [`DenoiseError::DimensionMismatch`] if `source` differs in
    /// size from the grid the mesh was built from.
    pub fn rasterize<G: HeightGrid + ?Sized>(&self, source: &G) -> Result<Grid> {
        self.check_dimensions(source.nx(), source.ny())?;
        let mut out = Grid::like(source);
        self.write_cells(&mut out);
        Ok(out)
    }

    /// Rasterize the mesh into an existing grid.
    ///
    /// Fails with [`DenoiseError::DimensionMismatch`] if `target` differs in
    /// size from the grid the mesh was built from.
    pub fn rasterize_into<G: HeightGridMut + ?Sized>(&self, target: &mut G) -> Result<()> {
        self.check_dimensions(target.nx(), target.ny())?;
        self.write_cells(target);
        Ok(())
    }

    fn check_dimensions(&self, nx: usize, ny: usize) -> Result<()> {
        if nx != self.nx() || ny != self.ny() {
            return Err(DenoiseError::DimensionMismatch {
                expected_nx: self.nx(),
                expected_ny: self.ny(),
                nx,
                ny,
            });
        }
        Ok(())
    }

    fn write_cells<G: HeightGridMut + ?Sized>(&self, target: &mut G) {
        for y in 0..self.ny() {
            for x in 0..self.nx() {
                match self.cell_vertex(x, y) {
                    Some(v) => target.set_value(x, y, self.world_position(v).z),
                    None => target.set_no_data(x, y),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Grid {
        let mut grid = Grid::from_vec(
            4,
            3,
            30.0,
            vec![
                512.0, 515.5, 519.0, 522.0, //
                510.0, 514.0, 0.0, 521.5, //
                508.25, 511.0, 516.0, 520.0,
            ],
        )
        .unwrap()
        .with_origin(1000.0, 2000.0);
        grid.set_no_data(2, 1);
        grid
    }

    #[test]
    fn test_round_trip_without_smoothing() {
        let grid = sample();
        let out = GridMesh::build(&grid).rasterize(&grid).unwrap();

        assert_eq!(out.origin(), (1000.0, 2000.0));
        assert_eq!(out.cell_size(), 30.0);
        for y in 0..grid.ny() {
            for x in 0..grid.nx() {
                assert_eq!(out.is_no_data(x, y), grid.is_no_data(x, y));
                if !grid.is_no_data(x, y) {
                    assert!((out.value(x, y) - grid.value(x, y)).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_rasterize_into_overwrites_target() {
        let grid = sample();
        let mesh = GridMesh::build(&grid);
        let mut target = Grid::filled(4, 3, 30.0, 7.0).unwrap();
        mesh.rasterize_into(&mut target).unwrap();

        assert!(target.is_no_data(2, 1));
        assert!((target.value(0, 0) - 512.0).abs() < 1e-9);
    }

    #[test]
    fn test_rasterize_into_dimension_mismatch() {
        let grid = sample();
        let mesh = GridMesh::build(&grid);
        let mut target = Grid::filled(3, 4, 30.0, 0.0).unwrap();

        let err = mesh.rasterize_into(&mut target).unwrap_err();
        assert!(matches!(
            err,
            DenoiseError::DimensionMismatch {
                expected_nx: 4,
                expected_ny: 3,
                nx: 3,
                ny: 4
            }
        ));
    }

    #[test]
    fn test_rasterize_dimension_mismatch() {
        let grid = sample();
        let mesh = GridMesh::build(&grid);
        let other = Grid::filled(4, 4, 30.0, 0.0).unwrap();

        assert!(matches!(
            mesh.rasterize(&other),
            Err(DenoiseError::DimensionMismatch {
                expected_nx: 4,
                expected_ny: 3,
                nx: 4,
                ny: 4
            })
        ));
    }

    #[test]
    fn test_faceless_mesh_reproduces_heights() {
        let mut grid = Grid::from_vec(3, 1, 1.0, vec![4.0, 5.0, 6.0]).unwrap();
        grid.set_no_data(1, 0);
        let mesh = GridMesh::build(&grid);
        assert_eq!(mesh.mesh().num_faces(), 0);

        let out = mesh.rasterize(&grid).unwrap();
        assert!((out.value(0, 0) - 4.0).abs() < 1e-12);
        assert!(out.is_no_data(1, 0));
        assert!((out.value(2, 0) - 6.0).abs() < 1e-12);
    }
}
