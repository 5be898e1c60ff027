//! Simplex-constrained abundance search for one candidate subset.
//!
//! Minimizes the per-candidate reconstruction error over the abundance
//! vector, subject to the simplex constraint (components in a strict
//! interior box, summing to one). The equality constraint is handled
//! exactly by eliminating the last component; the box bounds are enforced
//! by a feasible-point backtracking line search. Gradients come from
//! forward finite differences of the candidate objective, so no analytic
//! derivative of the radiative-transfer inversion is needed.
//!
//! Singleton subsets skip the search entirely: the simplex degenerates to
//! the single point `S = [1]`.

use argmin::core::{CostFunction, Gradient};
use nalgebra::DVector;

use crate::atmosphere::AtmosphericTerms;
use crate::cest::solve_candidate;
use crate::error::TrustError;
use crate::settings::OptimizerSettings;
use crate::types::{DataMatrix, SpectralVector};

/// Candidate reconstruction error as a function of the free simplex
/// coordinates (all subset abundances except the last, which is pinned to
/// `1 - Σ` of the others).
///
/// The inner objective is always evaluated with `gamma = 0`; the
/// temperature regularizer only enters the final scoring of the optimized
/// abundance.
pub struct AbundanceObjective<'a> {
    observed: &'a SpectralVector,
    emissivity: &'a DataMatrix,
    mean_temperature: &'a SpectralVector,
    atmosphere: &'a AtmosphericTerms,
    noise_covariance_inverse: Option<&'a DataMatrix>,
    lower_bound: f64,
    upper_bound: f64,
    fd_step: f64,
}

impl AbundanceObjective<'_> {
    /// Reconstruct the full abundance vector from the free coordinates.
    fn full_abundance(&self, free: &DVector<f64>) -> SpectralVector {
        let k = free.len() + 1;
        let mut s = DVector::zeros(k);
        let mut sum = 0.0;
        for i in 0..free.len() {
            s[i] = free[i];
            sum += free[i];
        }
        s[k - 1] = 1.0 - sum;
        s
    }

    fn is_feasible(&self, s: &SpectralVector) -> bool {
        s.iter()
            .all(|&v| v >= self.lower_bound - 1e-12 && v <= self.upper_bound + 1e-12)
    }
}

impl CostFunction for AbundanceObjective<'_> {
    type Param = DVector<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        // Clamp into the box so finite-difference probes just outside the
        // feasible region still evaluate; iterates themselves stay feasible
        // through the line search.
        let mut s = self.full_abundance(param);
        for v in s.iter_mut() {
            *v = v.clamp(self.lower_bound, self.upper_bound);
        }

        match solve_candidate(
            &s,
            self.observed,
            self.emissivity,
            self.mean_temperature,
            self.atmosphere,
            0.0,
            self.noise_covariance_inverse,
            false,
        ) {
            Ok(fit) if fit.error.is_finite() => Ok(fit.error),
            _ => Ok(f64::INFINITY),
        }
    }
}

impl Gradient for AbundanceObjective<'_> {
    type Param = DVector<f64>;
    type Gradient = DVector<f64>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let mut grad = DVector::<f64>::zeros(param.len());
        let base = self.cost(param)?;
        for i in 0..param.len() {
            let mut probe = param.clone();
            probe[i] += self.fd_step;
            grad[i] = (self.cost(&probe)? - base) / self.fd_step;
        }
        Ok(grad)
    }
}

/// Find the abundance vector minimizing the candidate reconstruction error
/// for a fixed subset.
///
/// Starts from the uniform mixture and performs projected descent with a
/// backtracking line search that only accepts feasible iterates. Exhausting
/// the iteration budget returns the best feasible point found; only a
/// non-finite objective at the starting point is a hard failure.
pub fn optimize_abundance(
    observed: &SpectralVector,
    emissivity: &DataMatrix,
    mean_temperature: &SpectralVector,
    atmosphere: &AtmosphericTerms,
    noise_covariance_inverse: Option<&DataMatrix>,
    settings: &OptimizerSettings,
) -> Result<SpectralVector, TrustError> {
    let k = mean_temperature.len();
    if k == 1 {
        // Zero-dimensional simplex: the only admissible abundance is 1.
        return Ok(DVector::from_element(1, 1.0));
    }

    let objective = AbundanceObjective {
        observed,
        emissivity,
        mean_temperature,
        atmosphere,
        noise_covariance_inverse,
        lower_bound: settings.lower_bound,
        upper_bound: settings.upper_bound,
        fd_step: settings.finite_difference_step,
    };

    let mut free = DVector::from_element(k - 1, 1.0 / k as f64);
    let mut cost = objective
        .cost(&free)
        .map_err(|_| TrustError::OptimizerNonConvergence)?;
    if !cost.is_finite() {
        return Err(TrustError::OptimizerNonConvergence);
    }

    for _ in 0..settings.max_iterations {
        let grad = objective
            .gradient(&free)
            .map_err(|_| TrustError::OptimizerNonConvergence)?;
        let grad_norm = grad.norm();
        if !grad_norm.is_finite() || grad_norm < settings.gradient_tolerance {
            break;
        }

        // Backtrack from a step that moves at most 0.25 in abundance space.
        let mut alpha = 0.25 / grad_norm;
        let mut improved = false;
        for _ in 0..40 {
            let trial = &free - alpha * &grad;
            if objective.is_feasible(&objective.full_abundance(&trial)) {
                let trial_cost = objective
                    .cost(&trial)
                    .map_err(|_| TrustError::OptimizerNonConvergence)?;
                if trial_cost < cost {
                    free = trial;
                    cost = trial_cost;
                    improved = true;
                    break;
                }
            }
            alpha *= 0.5;
        }
        if !improved {
            break;
        }
    }

    Ok(objective.full_abundance(&free))
}
