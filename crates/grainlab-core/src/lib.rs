//! grainlab-core: deterministic, physically-based film grain simulation.
//!
//! This crate implements the monochrome, linear-light simulation described
//! in the crate's design notes: Poisson-disk grain synthesis, a spatial
//! index over the grain population, kernel-sampled exposure integration,
//! two-phase density calculation, and Beer-Lambert compositing with
//! lightness compensation. The public surface is a single operation,
//! [`process::process`], taking a raster image and [`settings::Settings`]
//! and returning a same-sized monochrome raster.
//!
//! # Example
//!
//! ```
//! use grainlab_core::{FilmType, RasterImage, Settings, process};
//!
//! let image = RasterImage::filled(64, 64, [180, 180, 180, 255]).unwrap();
//! let settings = Settings::new(400, FilmType::Kodak)
//!     .unwrap()
//!     .with_seed(42);
//!
//! let grainy = process(&image, &settings).unwrap();
//! assert_eq!(grainy.width, 64);
//! assert_eq!(grainy.height, 64);
//! ```
//!
//! # Determinism
//!
//! Given identical `(image, settings, seed)`, `process` returns
//! byte-identical output. All stochastic draws flow through
//! [`rng::DeterministicRng`] (PCG32), with per-grain and per-stage
//! sub-seeds derived via BLAKE3 so the algorithm stays reproducible even if
//! a future backend parallelizes grain-local work.

pub mod color;
pub mod compositor;
pub mod density;
pub mod error;
pub mod exposure;
pub mod film;
pub mod grain;
pub mod grid;
pub mod image;
pub mod kernel;
pub mod png_io;
pub mod process;
pub mod resample;
pub mod rng;
pub mod settings;

pub use error::{PngError, ProcessError};
pub use film::FilmType;
pub use image::{LinearField, RasterImage};
pub use png_io::{load_png, save_png};
pub use process::process;
pub use rng::DeterministicRng;
pub use settings::Settings;
