//! Height field processing algorithms.
//!
//! - **Denoising**: anisotropic face-normal diffusion followed by vertex
//!   relaxation ([`denoise`])
//! - **Progress**: per-round progress callbacks and cooperative cancellation
//!   ([`progress`])

pub mod denoise;
pub mod progress;

pub use denoise::{
    denoise_grid, denoise_grid_with_progress, denoise_into, denoise_mesh, AnisotropicSmoother,
    DenoiseOptions,
};
pub use progress::{CancelToken, Progress};
