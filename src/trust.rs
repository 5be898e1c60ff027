//! Pixel-level search driver.
//!
//! For every valid pixel, iterates over the shared candidate subsets,
//! optimizing abundances and inverting the subpixel temperature for each,
//! then keeps the minimum-error candidate. Pixels are independent, so the
//! search runs as a rayon parallel map with per-task scratch state; results
//! are written back sequentially, one output row per pixel.
//!
//! Failure is a value here, not control flow: an infeasible candidate leaves
//! a NaN in the error vector, and a pixel with no feasible candidate at all
//! gets NaN abundance and temperature while the run continues.

use nalgebra::DVector;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::abundance::optimize_abundance;
use crate::atmosphere::AtmosphericTerms;
use crate::cest::solve_candidate;
use crate::materials::MaterialLibrary;
use crate::settings::TrustSettings;
use crate::types::{DataMatrix, SpectralVector};

/// Flat (pixels-by-layers) result matrices of the driver.
pub(crate) struct UnmixMaps {
    pub abundance: DataMatrix,
    pub temperature: DataMatrix,
    pub error: DataMatrix,
}

/// Best candidate found for one pixel.
struct PixelFit {
    abundance: SpectralVector,
    temperature: SpectralVector,
    errors: SpectralVector,
}

/// Run the candidate search over every pixel of a pixels-by-bands matrix.
pub(crate) fn unmix_pixels(
    pixels: &DataMatrix,
    library: &MaterialLibrary,
    atmosphere: &AtmosphericTerms,
    subsets: &[Vec<usize>],
    settings: &TrustSettings,
) -> UnmixMaps {
    let npix = pixels.nrows();
    let n_materials = library.materials();
    let n_candidates = subsets.len();

    // Subset emissivities and temperatures are extracted once and shared
    // read-only by all pixel tasks.
    let subset_data: Vec<(DataMatrix, SpectralVector)> = subsets
        .iter()
        .map(|s| (library.subset_emissivity(s), library.subset_temperature(s)))
        .collect();

    let mut abundance = DataMatrix::zeros(npix, n_materials);
    let mut temperature = DataMatrix::from_element(npix, n_materials, f64::NAN);
    let mut error = DataMatrix::from_element(npix, n_candidates, f64::NAN);

    // A pixel is valid when its band sum is finite; NaN/Inf sentinels from
    // upstream missing data skip the search and propagate NaN outputs.
    let (valid, invalid): (Vec<usize>, Vec<usize>) = (0..npix)
        .partition(|&p| pixels.row(p).iter().copied().sum::<f64>().is_finite());

    debug!(
        pixels = npix,
        valid = valid.len(),
        candidates = n_candidates,
        "starting per-pixel candidate search"
    );

    let outcomes: Vec<(usize, Option<PixelFit>)> = valid
        .par_iter()
        .map(|&p| {
            let fit = search_pixel(
                p,
                pixels,
                subsets,
                &subset_data,
                n_materials,
                atmosphere,
                settings,
            );
            (p, fit)
        })
        .collect();

    for (p, outcome) in outcomes {
        match outcome {
            Some(fit) => {
                for m in 0..n_materials {
                    abundance[(p, m)] = fit.abundance[m];
                    temperature[(p, m)] = fit.temperature[m];
                }
                for l in 0..n_candidates {
                    error[(p, l)] = fit.errors[l];
                }
            }
            None => {
                warn!(pixel = p, "no feasible candidate subset");
                abundance.row_mut(p).fill(f64::NAN);
            }
        }
    }
    for p in invalid {
        abundance.row_mut(p).fill(f64::NAN);
    }

    UnmixMaps {
        abundance,
        temperature,
        error,
    }
}

/// Search all candidate subsets for one pixel.
///
/// Returns `None` when no candidate produced a finite error. Ties on the
/// minimum error resolve to the earliest candidate in enumeration order
/// (smallest cardinality first, then lexicographic).
fn search_pixel(
    pixel: usize,
    pixels: &DataMatrix,
    subsets: &[Vec<usize>],
    subset_data: &[(DataMatrix, SpectralVector)],
    n_materials: usize,
    atmosphere: &AtmosphericTerms,
    settings: &TrustSettings,
) -> Option<PixelFit> {
    let observed: SpectralVector = pixels.row(pixel).transpose();
    let noise_inv = settings.noise_covariance_inverse.as_ref();
    let n_candidates = subsets.len();

    let mut errors = DVector::from_element(n_candidates, f64::NAN);
    let mut abundances = DataMatrix::zeros(n_candidates, n_materials);
    let mut temperatures = DataMatrix::from_element(n_candidates, n_materials, f64::NAN);

    for (l, subset) in subsets.iter().enumerate() {
        let (emissivity, mean_temperature) = &subset_data[l];

        let s = match optimize_abundance(
            &observed,
            emissivity,
            mean_temperature,
            atmosphere,
            noise_inv,
            &settings.optimizer,
        ) {
            Ok(s) => s,
            Err(_) => continue,
        };
        // Solver overshoot past the simplex marks the candidate infeasible.
        if s.iter().any(|&v| v < 0.0) {
            continue;
        }

        let fit = match solve_candidate(
            &s,
            &observed,
            emissivity,
            mean_temperature,
            atmosphere,
            settings.gamma,
            noise_inv,
            false,
        ) {
            Ok(fit) => fit,
            Err(_) => continue,
        };
        if !fit.error.is_finite() {
            continue;
        }

        errors[l] = fit.error;
        for (i, &m) in subset.iter().enumerate() {
            abundances[(l, m - 1)] = s[i];
            temperatures[(l, m - 1)] = fit.temperature[i];
        }
    }

    let mut best: Option<(usize, f64)> = None;
    for l in 0..n_candidates {
        let e = errors[l];
        if e.is_finite() && best.is_none_or(|(_, b)| e < b) {
            best = Some((l, e));
        }
    }
    let (best_l, _) = best?;

    Some(PixelFit {
        abundance: abundances.row(best_l).transpose(),
        temperature: temperatures.row(best_l).transpose(),
        errors,
    })
}
