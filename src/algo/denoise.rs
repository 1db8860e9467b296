//! Feature-preserving denoising of height fields.
//!
//! The grid is triangulated, face normals are smoothed by anisotropic
//! diffusion, and vertices are then moved so each incident face better fits
//! its smoothed normal. Finally the mesh heights are written back into a grid.
//!
//! # Algorithm
//!
//! **Normal diffusion** (`face_iterations` rounds). For every face `k` the new
//! normal is the normalized sum `Σ n_j · max(0, n_j·n_k − σ)²` over the faces
//! `j` in its 1-ring. Neighbors whose normals differ by more than the
//! threshold `σ` contribute nothing, so creases and cliffs survive. A zero sum
//! keeps the old normal.
//!
//! **Vertex relaxation** (`vertex_iterations` rounds). Every vertex `p` moves
//! by the average over its incident faces of `n_j · ((c_j − p)·n_j)`, where
//! `c_j` is the face centroid: the projection of `p` onto the plane through
//! `c_j` with normal `n_j`.
//!
//! Both phases are Jacobi updates: each round reads only the state at its
//! start, so the result does not depend on iteration order or on whether the
//! round runs in parallel.
//!
//! # Example
//!
//! ```
//! use terrace::algo::denoise::{denoise_grid, DenoiseOptions};
//! use terrace::grid::{Grid, HeightGrid};
//!
//! let grid = Grid::filled(5, 5, 1.0, 10.0).unwrap();
//! let options = DenoiseOptions::default()
//!     .with_sigma(0.5)
//!     .with_vertex_iterations(20);
//! let out = denoise_grid(&grid, &options).unwrap();
//! assert!((out.value(2, 2) - 10.0).abs() < 1e-9);
//! ```

use std::time::Instant;

use log::debug;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::error::{DenoiseError, Result};
use crate::grid::{Grid, HeightGrid, HeightGridMut};
use crate::mesh::{normalized_or_keep, Adjacency, FaceId, FaceNeighborhood, GridMesh, RingTable};

use super::Progress;

const FACE_PHASE: &str = "face normal diffusion";
const VERTEX_PHASE: &str = "vertex relaxation";

/// Options for anisotropic denoising.
#[derive(Debug, Clone, PartialEq)]
pub struct DenoiseOptions {
    /// Normal similarity threshold in `[0, 1]`. Neighbors whose normals have
    /// a dot product at or below this value do not influence each other.
    pub sigma: f64,

    /// Number of normal diffusion rounds.
    pub face_iterations: usize,

    /// Number of vertex relaxation rounds.
    pub vertex_iterations: usize,

    /// Which faces count as neighbors during normal diffusion.
    pub neighborhood: FaceNeighborhood,

    /// Only move vertices vertically.
    pub z_only: bool,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for DenoiseOptions {
    fn default() -> Self {
        Self {
            sigma: 0.9,
            face_iterations: 5,
            vertex_iterations: 50,
            neighborhood: FaceNeighborhood::SharedVertex,
            z_only: false,
            parallel: true,
        }
    }
}

impl DenoiseOptions {
    /// Set the normal similarity threshold.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    /// Set the number of normal diffusion rounds.
    pub fn with_face_iterations(mut self, iterations: usize) -> Self {
        self.face_iterations = iterations;
        self
    }

    /// Set the number of vertex relaxation rounds.
    pub fn with_vertex_iterations(mut self, iterations: usize) -> Self {
        self.vertex_iterations = iterations;
        self
    }

    /// Set the face neighborhood used for normal diffusion.
    pub fn with_neighborhood(mut self, neighborhood: FaceNeighborhood) -> Self {
        self.neighborhood = neighborhood;
        self
    }

    /// Restrict vertex movement to the z axis.
    pub fn with_z_only(mut self, z_only: bool) -> Self {
        self.z_only = z_only;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Check that all values are in range.
    pub fn validate(&self) -> Result<()> {
        if !(self.sigma.is_finite() && (0.0..=1.0).contains(&self.sigma)) {
            return Err(DenoiseError::invalid_param(
                "sigma",
                self.sigma,
                "must be within [0, 1]",
            ));
        }
        if self.face_iterations < 1 {
            return Err(DenoiseError::invalid_param(
                "face_iterations",
                self.face_iterations,
                "must be at least 1",
            ));
        }
        if self.vertex_iterations < 1 {
            return Err(DenoiseError::invalid_param(
                "vertex_iterations",
                self.vertex_iterations,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Runs both smoothing phases on a [`GridMesh`].
#[derive(Debug, Clone)]
pub struct AnisotropicSmoother {
    options: DenoiseOptions,
}

impl AnisotropicSmoother {
    /// Create a smoother, validating `options`.
    pub fn new(options: DenoiseOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// The options this smoother runs with.
    pub fn options(&self) -> &DenoiseOptions {
        &self.options
    }

    /// Total number of progress steps reported by [`smooth`](Self::smooth).
    pub fn total_rounds(&self) -> usize {
        self.options.face_iterations + self.options.vertex_iterations
    }

    /// Smooth `mesh` in place and recompute its normals.
    ///
    /// Progress is reported once after every round. Cancellation is checked
    /// before every round; a cancelled run returns
    /// [`DenoiseError::Cancelled`] and leaves `mesh` partially smoothed.
    pub fn smooth(&self, mesh: &mut GridMesh, progress: &Progress) -> Result<()> {
        let start = Instant::now();
        let adjacency = Adjacency::build(mesh.mesh());
        debug!(
            "adjacency: {} vertex ring entries, {} face ring entries in {:?}",
            adjacency.vertex_face_table().total_len(),
            adjacency.face_ring(self.options.neighborhood).total_len(),
            start.elapsed()
        );

        let start = Instant::now();
        let ring = adjacency.face_ring(self.options.neighborhood);
        let mut normals = std::mem::take(&mut mesh.normals.faces);
        let diffused = self.diffuse_face_normals(&mut normals, ring, progress);
        mesh.normals.faces = normals;
        diffused?;
        debug!(
            "{} rounds of {} in {:?}",
            self.options.face_iterations,
            FACE_PHASE,
            start.elapsed()
        );

        let start = Instant::now();
        self.relax_vertices(mesh, adjacency.vertex_face_table(), progress)?;
        mesh.recompute_normals();
        debug!(
            "{} rounds of {} in {:?}",
            self.options.vertex_iterations,
            VERTEX_PHASE,
            start.elapsed()
        );

        Ok(())
    }

    /// Diffuse face normals over `ring`, double-buffered.
    fn diffuse_face_normals(
        &self,
        normals: &mut Vec<Vector3<f64>>,
        ring: &RingTable<FaceId>,
        progress: &Progress,
    ) -> Result<()> {
        let sigma = self.options.sigma;
        let rounds = self.options.face_iterations;
        let total = self.total_rounds();
        let mut next = vec![Vector3::zeros(); normals.len()];

        for round in 0..rounds {
            check_cancelled(progress, FACE_PHASE, round)?;

            let current = &*normals;
            let update = |(k, out): (usize, &mut Vector3<f64>)| {
                *out = diffuse_normal(current, ring.row(k), k, sigma);
            };
            if self.options.parallel {
                next.par_iter_mut().enumerate().for_each(update);
            } else {
                next.iter_mut().enumerate().for_each(update);
            }
            std::mem::swap(normals, &mut next);

            progress.report(round + 1, total, "Diffusing face normals");
        }
        Ok(())
    }

    /// Move vertices toward the planes of their incident faces.
    fn relax_vertices(
        &self,
        mesh: &mut GridMesh,
        vertex_faces: &RingTable<FaceId>,
        progress: &Progress,
    ) -> Result<()> {
        let rounds = self.options.vertex_iterations;
        let offset = self.options.face_iterations;
        let total = self.total_rounds();
        let z_only = self.options.z_only;
        let normals = &mesh.normals.faces;
        let trimesh = &mut mesh.mesh;

        let mut next = trimesh.positions.clone();
        let mut centroids = vec![Point3::origin(); trimesh.num_faces()];

        for round in 0..rounds {
            check_cancelled(progress, VERTEX_PHASE, round)?;

            let current = &*trimesh;
            if self.options.parallel {
                centroids
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(f, c)| *c = current.face_centroid(FaceId::new(f)));
            } else {
                for (f, c) in centroids.iter_mut().enumerate() {
                    *c = current.face_centroid(FaceId::new(f));
                }
            }

            let update = |(i, out): (usize, &mut Point3<f64>)| {
                let p = current.positions[i];
                *out = p + displacement(&p, vertex_faces.row(i), &centroids, normals, z_only);
            };
            if self.options.parallel {
                next.par_iter_mut().enumerate().for_each(update);
            } else {
                next.iter_mut().enumerate().for_each(update);
            }
            std::mem::swap(&mut trimesh.positions, &mut next);

            progress.report(offset + round + 1, total, "Relaxing vertices");
        }
        Ok(())
    }
}

#[inline]
fn check_cancelled(progress: &Progress, phase: &'static str, round: usize) -> Result<()> {
    if progress.is_cancelled() {
        debug!("{} cancelled before round {}", phase, round);
        return Err(DenoiseError::Cancelled { phase, round });
    }
    Ok(())
}

/// Weighted average of the normals in `ring`, or the normal of `k` itself if
/// no neighbor is similar enough.
#[inline]
fn diffuse_normal(
    normals: &[Vector3<f64>],
    ring: &[FaceId],
    k: usize,
    sigma: f64,
) -> Vector3<f64> {
    let nk = normals[k];
    let sum = ring.iter().fold(Vector3::zeros(), |acc, j| {
        let nj = normals[j.index()];
        let w = (nj.dot(&nk) - sigma).max(0.0);
        acc + nj * (w * w)
    });
    if sum == Vector3::zeros() {
        nk
    } else {
        normalized_or_keep(sum)
    }
}

/// Average projection offset of `p` onto the planes of its incident faces.
#[inline]
fn displacement(
    p: &Point3<f64>,
    faces: &[FaceId],
    centroids: &[Point3<f64>],
    normals: &[Vector3<f64>],
    z_only: bool,
) -> Vector3<f64> {
    if faces.is_empty() {
        return Vector3::zeros();
    }
    let mut acc = faces.iter().fold(Vector3::zeros(), |acc, f| {
        let n = normals[f.index()];
        let t = (centroids[f.index()] - *p).dot(&n);
        acc + n * t
    });
    if z_only {
        acc.x = 0.0;
        acc.y = 0.0;
    }
    acc / faces.len() as f64
}

/// Smooth a mesh built by [`GridMesh::build`].
///
/// Validates `options` before touching the mesh.
pub fn denoise_mesh(mesh: &mut GridMesh, options: &DenoiseOptions, progress: &Progress) -> Result<()> {
    AnisotropicSmoother::new(options.clone())?.smooth(mesh, progress)
}

/// Denoise `grid` into a new grid with the same geometry.
///
/// See the [module documentation](self) for the algorithm.
pub fn denoise_grid<G: HeightGrid + ?Sized>(grid: &G, options: &DenoiseOptions) -> Result<Grid> {
    denoise_grid_with_progress(grid, options, &Progress::none())
}

/// [`denoise_grid`] with progress reporting and cancellation.
pub fn denoise_grid_with_progress<G: HeightGrid + ?Sized>(
    grid: &G,
    options: &DenoiseOptions,
    progress: &Progress,
) -> Result<Grid> {
    let smoother = AnisotropicSmoother::new(options.clone())?;
    let mut mesh = GridMesh::build(grid);
    smoother.smooth(&mut mesh, progress)?;
    mesh.rasterize(grid)
}

/// Denoise `source` into `target`, which must have the same dimensions.
///
/// Cells of `target` that are no-data in `source` are set to no-data; all
/// other cells are overwritten. `target` is left untouched on error.
pub fn denoise_into<S, T>(
    source: &S,
    target: &mut T,
    options: &DenoiseOptions,
    progress: &Progress,
) -> Result<()>
where
    S: HeightGrid + ?Sized,
    T: HeightGridMut + ?Sized,
{
    let smoother = AnisotropicSmoother::new(options.clone())?;
    if source.nx() != target.nx() || source.ny() != target.ny() {
        return Err(DenoiseError::DimensionMismatch {
            expected_nx: source.nx(),
            expected_ny: source.ny(),
            nx: target.nx(),
            ny: target.ny(),
        });
    }
    let mut mesh = GridMesh::build(source);
    smoother.smooth(&mut mesh, progress)?;
    mesh.rasterize_into(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::algo::progress::CancelToken;
    use crate::grid::DEFAULT_NO_DATA;

    fn spike(cell_size: f64) -> Grid {
        let mut grid = Grid::filled(5, 5, cell_size, 0.0).unwrap();
        grid.set_value(2, 2, 100.0);
        grid
    }

    fn bumpy() -> Grid {
        let values = (0..64)
            .map(|i| {
                let (x, y) = ((i % 8) as f64, (i / 8) as f64);
                50.0 + 3.0 * (0.9 * x).sin() + 2.0 * (1.3 * y).cos() + ((i * 7919) % 11) as f64 * 0.1
            })
            .collect();
        Grid::from_vec(8, 8, 1.0, values).unwrap()
    }

    #[test]
    fn test_defaults() {
        let options = DenoiseOptions::default();
        assert_eq!(options.sigma, 0.9);
        assert_eq!(options.face_iterations, 5);
        assert_eq!(options.vertex_iterations, 50);
        assert_eq!(options.neighborhood, FaceNeighborhood::SharedVertex);
        assert!(!options.z_only);
        assert!(options.parallel);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_invalid_parameters() {
        let bad = [
            DenoiseOptions::default().with_sigma(1.5),
            DenoiseOptions::default().with_sigma(-0.1),
            DenoiseOptions::default().with_sigma(f64::NAN),
            DenoiseOptions::default().with_face_iterations(0),
            DenoiseOptions::default().with_vertex_iterations(0),
        ];
        let grid = Grid::filled(3, 3, 1.0, 0.0).unwrap();
        for options in &bad {
            let err = denoise_grid(&grid, options).unwrap_err();
            assert!(
                matches!(err, DenoiseError::InvalidParameter { .. }),
                "{:?}",
                options
            );
        }
        // Builders never clamp
        assert_eq!(DenoiseOptions::default().with_sigma(1.5).sigma, 1.5);
    }

    #[test]
    fn test_flat_grid_is_fixed_point() {
        let grid = Grid::filled(5, 5, 1.0, 10.0).unwrap();
        let options = DenoiseOptions::default()
            .with_sigma(0.5)
            .with_face_iterations(5)
            .with_vertex_iterations(20);
        let out = denoise_grid(&grid, &options).unwrap();

        for v in out.values() {
            assert!((v - 10.0).abs() < 1e-9, "{}", v);
        }
    }

    #[test]
    fn test_gentle_spike_is_flattened() {
        // With 200 m cells the spike slopes gently and is treated as noise
        let grid = spike(200.0);
        let out = denoise_grid(&grid, &DenoiseOptions::default()).unwrap();

        let peak = out.value(2, 2);
        assert!(peak > 0.0 && peak < 100.0, "{}", peak);
    }

    #[test]
    fn test_sharp_spike_is_preserved() {
        let grid = spike(1.0);
        let out = denoise_grid(&grid, &DenoiseOptions::default()).unwrap();

        assert!((out.value(2, 2) - 100.0).abs() < 1e-6, "{}", out.value(2, 2));
        assert!(out.value(0, 0).abs() < 1e-6);
    }

    #[test]
    fn test_both_neighborhoods_flatten_gentle_spike() {
        let grid = spike(200.0);
        for neighborhood in [FaceNeighborhood::SharedVertex, FaceNeighborhood::SharedEdge] {
            let options = DenoiseOptions::default().with_neighborhood(neighborhood);
            let out = denoise_grid(&grid, &options).unwrap();
            assert!(out.value(2, 2) < 100.0, "{:?}", neighborhood);
        }
    }

    #[test]
    fn test_sigma_one_keeps_face_normals() {
        let grid = bumpy();
        let mesh = GridMesh::build(&grid);
        let before = mesh.normals().faces.clone();

        let smoother = AnisotropicSmoother::new(DenoiseOptions::default().with_sigma(1.0)).unwrap();
        let adjacency = Adjacency::build(mesh.mesh());
        let mut normals = mesh.normals().faces.clone();
        smoother
            .diffuse_face_normals(
                &mut normals,
                adjacency.face_ring(FaceNeighborhood::SharedVertex),
                &Progress::none(),
            )
            .unwrap();

        for (a, b) in before.iter().zip(&normals) {
            assert!((a - b).norm() < 1e-6);
        }
    }

    #[test]
    fn test_no_data_cells_survive() {
        let mut grid = Grid::filled(3, 3, 1.0, 5.0).unwrap();
        grid.set_no_data(1, 1);
        let out = denoise_grid(&grid, &DenoiseOptions::default()).unwrap();

        assert!(out.is_no_data(1, 1));
        assert_eq!(out.value(1, 1), DEFAULT_NO_DATA);
        assert_eq!(out.valid_cells(), 8);
        for y in 0..3 {
            for x in 0..3 {
                if (x, y) != (1, 1) {
                    assert!((out.value(x, y) - 5.0).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_z_only_keeps_horizontal_positions() {
        let grid = bumpy();
        let mut mesh = GridMesh::build(&grid);
        let before: Vec<_> = mesh.mesh().positions().to_vec();

        let options = DenoiseOptions::default().with_z_only(true);
        denoise_mesh(&mut mesh, &options, &Progress::none()).unwrap();

        let mut moved = false;
        for (a, b) in before.iter().zip(mesh.mesh().positions()) {
            assert_eq!(a.x, b.x);
            assert_eq!(a.y, b.y);
            moved |= a.z != b.z;
        }
        assert!(moved);
    }

    #[test]
    fn test_full_relaxation_moves_horizontally() {
        let grid = bumpy();
        let mut mesh = GridMesh::build(&grid);
        let before: Vec<_> = mesh.mesh().positions().to_vec();

        denoise_mesh(&mut mesh, &DenoiseOptions::default(), &Progress::none()).unwrap();

        assert!(before
            .iter()
            .zip(mesh.mesh().positions())
            .any(|(a, b)| a.x != b.x || a.y != b.y));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let grid = bumpy();
        let options = DenoiseOptions::default().with_vertex_iterations(10);
        let parallel = denoise_grid(&grid, &options).unwrap();
        let sequential = denoise_grid(&grid, &options.clone().sequential()).unwrap();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_progress_reported_once_per_round() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let progress = Progress::new(move |current, total, _| {
            sink.lock().unwrap().push((current, total));
        });

        let options = DenoiseOptions::default()
            .with_face_iterations(3)
            .with_vertex_iterations(4);
        denoise_grid_with_progress(&bumpy(), &options, &progress).unwrap();

        let calls = calls.lock().unwrap();
        let expected: Vec<_> = (1..=7).map(|c| (c, 7)).collect();
        assert_eq!(*calls, expected);
    }

    #[test]
    fn test_cancel_between_rounds() {
        let token = CancelToken::new();
        let trigger = token.clone();
        let progress = Progress::new(move |current, _, _| {
            if current == 2 {
                trigger.cancel();
            }
        })
        .with_cancel_token(token);

        let err = denoise_grid_with_progress(&bumpy(), &DenoiseOptions::default(), &progress)
            .unwrap_err();
        assert!(matches!(
            err,
            DenoiseError::Cancelled {
                phase: FACE_PHASE,
                round: 2
            }
        ));
    }

    #[test]
    fn test_cancel_during_relaxation() {
        let token = CancelToken::new();
        let trigger = token.clone();
        let progress = Progress::new(move |current, _, _| {
            if current == 6 {
                trigger.cancel();
            }
        })
        .with_cancel_token(token);

        let err = denoise_grid_with_progress(&bumpy(), &DenoiseOptions::default(), &progress)
            .unwrap_err();
        assert!(matches!(
            err,
            DenoiseError::Cancelled {
                phase: VERTEX_PHASE,
                round: 1
            }
        ));
    }

    #[test]
    fn test_denoise_into() {
        let grid = spike(200.0);
        let mut target = Grid::filled(5, 5, 200.0, -1.0).unwrap();
        denoise_into(&grid, &mut target, &DenoiseOptions::default(), &Progress::none()).unwrap();

        let expected = denoise_grid(&grid, &DenoiseOptions::default()).unwrap();
        assert_eq!(target.values().collect::<Vec<_>>(), expected.values().collect::<Vec<_>>());
    }

    #[test]
    fn test_denoise_into_dimension_mismatch() {
        let grid = spike(1.0);
        let mut target = Grid::filled(4, 5, 1.0, -1.0).unwrap();
        let err = denoise_into(&grid, &mut target, &DenoiseOptions::default(), &Progress::none())
            .unwrap_err();

        assert!(matches!(err, DenoiseError::DimensionMismatch { .. }));
        assert!(target.values().all(|v| v == -1.0));
    }

    #[test]
    fn test_faceless_grid_is_unchanged() {
        let grid = Grid::from_vec(4, 1, 1.0, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let out = denoise_grid(&grid, &DenoiseOptions::default()).unwrap();
        for (a, b) in grid.values().zip(out.values()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
