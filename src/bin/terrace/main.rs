//! Terrace CLI - height grid denoising command-line tool.
//!
//! Usage: terrace <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `terrace --help` for available commands. Set `RUST_LOG=debug` for
//! timings and mesh statistics.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

use terrace::algo::{denoise_mesh, DenoiseOptions, Progress};
use terrace::grid::HeightGrid;
use terrace::io;
use terrace::mesh::{FaceNeighborhood, GridMesh};

#[derive(Parser)]
#[command(name = "terrace")]
#[command(author, version, about = "Feature-preserving denoising of height grids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Denoise a height grid
    Denoise {
        /// Input grid file (.asc)
        input: PathBuf,

        /// Output grid file (.asc)
        output: PathBuf,

        /// Normal similarity threshold (0.0 to 1.0)
        #[arg(short, long, default_value = "0.9")]
        sigma: f64,

        /// Number of face normal diffusion rounds
        #[arg(short, long, default_value = "5")]
        iterations: usize,

        /// Number of vertex relaxation rounds
        #[arg(short, long, default_value = "50")]
        vertex_iterations: usize,

        /// Faces that count as neighbors during normal diffusion
        #[arg(short, long, value_enum, default_value = "vertex")]
        neighborhood: Neighborhood,

        /// Only move vertices vertically
        #[arg(short, long)]
        z_only: bool,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,

        /// Also write the denoised mesh to this file (.ply)
        #[arg(short, long)]
        mesh: Option<PathBuf>,
    },

    /// Display grid information
    Info {
        /// Input grid file (.asc)
        input: PathBuf,
    },

    /// Export the triangulated grid without denoising
    Mesh {
        /// Input grid file (.asc)
        input: PathBuf,

        /// Output mesh file (.ply)
        output: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Neighborhood {
    /// Faces sharing at least one vertex
    Vertex,
    /// Faces sharing an edge
    Edge,
}

impl From<Neighborhood> for FaceNeighborhood {
    fn from(n: Neighborhood) -> Self {
        match n {
            Neighborhood::Vertex => FaceNeighborhood::SharedVertex,
            Neighborhood::Edge => FaceNeighborhood::SharedEdge,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Denoise {
            ref input,
            ref output,
            ref mesh,
            ..
        } => {
            let options = denoise_options(&cli.command).ok_or("not a denoise command")?;
            cmd_denoise(input, output, mesh.as_deref(), &options)?;
        }

        Commands::Info { ref input } => {
            cmd_info(input)?;
        }

        Commands::Mesh {
            ref input,
            ref output,
        } => {
            cmd_mesh(input, output)?;
        }
    }

    Ok(())
}

/// Map the flags of a `denoise` command onto [`DenoiseOptions`].
fn denoise_options(command: &Commands) -> Option<DenoiseOptions> {
    match *command {
        Commands::Denoise {
            sigma,
            iterations,
            vertex_iterations,
            neighborhood,
            z_only,
            sequential,
            ..
        } => Some(
            DenoiseOptions::default()
                .with_sigma(sigma)
                .with_face_iterations(iterations)
                .with_vertex_iterations(vertex_iterations)
                .with_neighborhood(neighborhood.into())
                .with_z_only(z_only)
                .with_parallel(!sequential),
        ),
        _ => None,
    }
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Monotonic: the bar never moves backwards
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= previous && raw_percent != 100 {
            return;
        }
        let percent = raw_percent.max(previous);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {:<24}", bar, space, percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn cmd_denoise(
    input: &Path,
    output: &Path,
    mesh_output: Option<&Path>,
    options: &DenoiseOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    options.validate()?;

    let grid = io::load_grid(input)?;
    println!(
        "Loaded: {}x{} cells ({} valid)",
        grid.nx(),
        grid.ny(),
        grid.valid_cells()
    );

    let mut mesh = GridMesh::build(&grid);
    println!(
        "Mesh: {} vertices, {} faces",
        mesh.mesh().num_vertices(),
        mesh.mesh().num_faces()
    );

    let mode = if options.parallel { "parallel" } else { "sequential" };
    println!(
        "Denoising (sigma={}, {} face / {} vertex rounds, {})...",
        options.sigma, options.face_iterations, options.vertex_iterations, mode
    );
    denoise_mesh(&mut mesh, options, &create_progress())?;

    io::save_grid(&mesh.rasterize(&grid)?, output)?;
    if let Some(path) = mesh_output {
        io::save_mesh(&mesh, path)?;
        println!("Saved mesh: {}", path.display());
    }

    println!("Saved: {} ({:.2?})", output.display(), start.elapsed());
    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let grid = io::load_grid(input)?;
    let (xll, yll) = grid.origin();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {}", grid.nx(), grid.ny());
    println!("Cell size: {}", grid.cell_size());
    println!("Origin: ({}, {})", xll, yll);
    println!("No-data value: {}", grid.no_data_value());
    println!(
        "Valid cells: {} of {}",
        grid.valid_cells(),
        grid.num_cells()
    );
    match grid.value_range() {
        Some((lo, hi)) => println!("Height range: [{:.3}, {:.3}]", lo, hi),
        None => println!("Height range: (no data)"),
    }

    let mesh = GridMesh::build(&grid);
    println!("Vertices: {}", mesh.mesh().num_vertices());
    println!("Faces: {}", mesh.mesh().num_faces());
    Ok(())
}

fn cmd_mesh(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let grid = io::load_grid(input)?;
    let mesh = GridMesh::build(&grid);
    io::save_mesh(&mesh, output)?;

    println!(
        "Saved: {} ({} vertices, {} faces, {:.2?})",
        output.display(),
        mesh.mesh().num_vertices(),
        mesh.mesh().num_faces(),
        start.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_denoise_defaults() {
        let cli = parse(&["terrace", "denoise", "in.asc", "out.asc"]);
        assert_eq!(denoise_options(&cli.command), Some(DenoiseOptions::default()));
    }

    #[test]
    fn test_denoise_flags() {
        let cli = parse(&[
            "terrace",
            "denoise",
            "in.asc",
            "out.asc",
            "--sigma",
            "0.5",
            "--iterations",
            "3",
            "--vertex-iterations",
            "20",
            "--neighborhood",
            "edge",
            "--z-only",
            "--sequential",
            "--mesh",
            "out.ply",
        ]);
        let options = denoise_options(&cli.command).unwrap();

        assert_eq!(options.sigma, 0.5);
        assert_eq!(options.face_iterations, 3);
        assert_eq!(options.vertex_iterations, 20);
        assert_eq!(options.neighborhood, FaceNeighborhood::SharedEdge);
        assert!(options.z_only);
        assert!(!options.parallel);
        match cli.command {
            Commands::Denoise { mesh, .. } => assert_eq!(mesh, Some(PathBuf::from("out.ply"))),
            _ => panic!("expected denoise command"),
        }
    }

    #[test]
    fn test_out_of_range_sigma_is_rejected_at_run_time() {
        let cli = parse(&["terrace", "denoise", "in.asc", "out.asc", "--sigma", "2"]);
        let options = denoise_options(&cli.command).unwrap();
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_other_commands() {
        assert!(denoise_options(&parse(&["terrace", "info", "in.asc"]).command).is_none());
        assert!(Cli::try_parse_from(["terrace", "mesh", "in.asc"]).is_err());
        assert!(Cli::try_parse_from(["terrace", "denoise", "in.asc", "out.asc", "-n", "face"]).is_err());
    }

    #[test]
    fn test_denoise_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.asc");
        let output = dir.path().join("out.asc");
        let mesh = dir.path().join("out.ply");
        std::fs::write(
            &input,
            "ncols 3\nnrows 3\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -9999\n\
             10 10 10\n10 -9999 10\n10 10 10\n",
        )
        .unwrap();

        let options = DenoiseOptions::default().sequential();
        cmd_denoise(&input, &output, Some(&mesh), &options).unwrap();

        let out = io::load_grid(&output).unwrap();
        assert!(out.is_no_data(1, 1));
        assert!((out.value(0, 0) - 10.0).abs() < 1e-9);
        assert!(mesh.exists());
    }
}
