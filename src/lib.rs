//! # Unmix - TRUST unmixing of thermal hyperspectral images
//!
//! `unmix` estimates, for every pixel of a thermal hyperspectral image, the
//! fractional abundance and subpixel temperature of each material present in
//! the pixel. It implements the TRUST algorithm (Cubero-Castan et al.,
//! "A physics-based unmixing method to estimate subpixel temperatures on
//! mixed pixels", TGRS 2015): for each pixel it tests every plausible
//! material subset up to a bounded cardinality, solves a simplex-constrained
//! optimization for the abundances within each subset, inverts the
//! radiative-transfer model for the subpixel temperatures, and keeps the
//! subset with the smallest reconstruction error.
//!
//! ## Quick Start
//!
//! ```rust
//! use nalgebra::{DMatrix, DVector};
//! use unmix::{run_trust, AtmosphericTerms, RadianceImage, TrustSettings};
//!
//! // Three bands, two materials.
//! let atmosphere = AtmosphericTerms::new(
//!     DVector::from_vec(vec![9.0, 10.5, 12.0]),   // wavelength, um
//!     DVector::from_vec(vec![0.9, 0.92, 0.88]),   // upward transmittance
//!     DVector::from_vec(vec![0.3, 0.25, 0.35]),   // upward path radiance
//!     DVector::from_vec(vec![1.0, 0.9, 1.1]),     // downward radiance
//! )?;
//! let emissivity = DMatrix::from_row_slice(2, 3, &[
//!     0.96, 0.95, 0.97, // material 1
//!     0.70, 0.74, 0.78, // material 2
//! ]);
//! let mean_temperature = DVector::from_vec(vec![295.0, 310.0]);
//!
//! // One pixel, synthesized as pure material 1 at its mean temperature.
//! let pixel: Vec<f64> = (0..3)
//!     .map(|j| {
//!         let e = emissivity[(0, j)];
//!         let l = unmix::planck::radiance(atmosphere.wavelength()[j], 295.0);
//!         e * l * atmosphere.tu()[j]
//!             + (1.0 - e) * atmosphere.ld()[j]
//!             + atmosphere.lu()[j]
//!     })
//!     .collect();
//! let image = RadianceImage::from_matrix(DMatrix::from_row_slice(1, 3, &pixel));
//!
//! let output = run_trust(
//!     &image,
//!     &emissivity,
//!     &mean_temperature,
//!     &atmosphere,
//!     &TrustSettings::default(),
//! )?;
//!
//! // The pixel is attributed entirely to material 1.
//! assert_eq!(output.abundance.as_matrix()[(0, 0)], 1.0);
//! assert_eq!(output.abundance.as_matrix()[(0, 1)], 0.0);
//! # Ok::<(), unmix::TrustError>(())
//! ```
//!
//! ## Modules
//!
//! - **[`api`]**: the [`run_trust`] entry point and its output maps
//! - **[`combinations`]**: candidate material-subset enumeration
//! - **[`planck`]**: black-body radiance model and its temperature derivative
//! - **[`cest`]**: per-candidate temperature inversion and error scoring
//! - **[`abundance`]**: simplex-constrained abundance optimizer
//! - **[`atmosphere`]** / **[`materials`]**: validated input structures
//! - **[`settings`]**: run configuration and defaults
//!
//! Failure semantics: malformed top-level inputs abort the run with
//! [`TrustError`]; numerical failures inside the search never do. NaN in the
//! output maps is the documented signal for "no valid reconstruction", and is
//! distinct from a valid zero abundance.

pub mod abundance;
pub mod api;
pub mod atmosphere;
pub mod cest;
pub mod combinations;
pub mod error;
pub mod materials;
pub mod planck;
pub mod settings;
pub mod types;

mod trust;

#[cfg(test)]
mod testutil;

// Re-export the high-level API.
pub use api::{run_trust, TrustOutput};

// Re-export the types appearing in its signature.
pub use atmosphere::AtmosphericTerms;
pub use cest::{solve_candidate, CandidateFit};
pub use combinations::enumerate_subsets;
pub use error::TrustError;
pub use materials::MaterialLibrary;
pub use settings::{OptimizerSettings, TrustSettings};
pub use types::{DataMatrix, ImageShape, OutputMap, RadianceImage, SpectralVector};
