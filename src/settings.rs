//! Configuration for the TRUST pipeline.
//!
//! Every recognized option and its default lives here; validation happens
//! once at the [`run_trust`](crate::api::run_trust) boundary, so the inner
//! loops never re-check configuration.

use crate::error::TrustError;
use crate::types::DataMatrix;

/// Knobs of the simplex-constrained abundance search.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerSettings {
    /// Maximum number of descent iterations per candidate subset.
    pub max_iterations: usize,
    /// Stop once the finite-difference gradient norm drops below this.
    pub gradient_tolerance: f64,
    /// Step used for forward finite differences.
    pub finite_difference_step: f64,
    /// Lower box bound on each abundance component.
    pub lower_bound: f64,
    /// Upper box bound on each abundance component.
    pub upper_bound: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            gradient_tolerance: 1e-8,
            finite_difference_step: 1e-6,
            lower_bound: 0.01,
            upper_bound: 0.99,
        }
    }
}

/// Main configuration object for a TRUST run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustSettings {
    /// Cardinality cap on candidate material subsets. A cap of 1 switches
    /// the run into hard classification mode.
    pub max_materials_per_pixel: usize,
    /// Weight of the temperature-deviation regularizer in the candidate
    /// reconstruction error.
    pub gamma: f64,
    /// Whether to also return the per-candidate error map.
    pub return_error_map: bool,
    /// Inverse of the band noise covariance. Identity when absent.
    pub noise_covariance_inverse: Option<DataMatrix>,
    /// Abundance optimizer configuration.
    pub optimizer: OptimizerSettings,
}

impl Default for TrustSettings {
    fn default() -> Self {
        Self {
            max_materials_per_pixel: 3,
            gamma: 0.0,
            return_error_map: false,
            noise_covariance_inverse: None,
            optimizer: OptimizerSettings::default(),
        }
    }
}

impl TrustSettings {
    /// Validate the configuration against the image's band count.
    pub(crate) fn validate(&self, bands: usize) -> Result<(), TrustError> {
        if self.max_materials_per_pixel < 1 {
            return Err(TrustError::InvalidParameter(
                "max_materials_per_pixel must be at least 1".into(),
            ));
        }
        if !self.gamma.is_finite() || self.gamma < 0.0 {
            return Err(TrustError::InvalidParameter(format!(
                "gamma must be a finite non-negative value, got {}",
                self.gamma
            )));
        }
        if let Some(c) = &self.noise_covariance_inverse {
            if c.nrows() != bands || c.ncols() != bands {
                return Err(TrustError::InvalidShape(format!(
                    "noise covariance inverse is {}x{}, expected {}x{}",
                    c.nrows(),
                    c.ncols(),
                    bands,
                    bands
                )));
            }
        }
        let opt = &self.optimizer;
        if opt.max_iterations == 0
            || !(opt.lower_bound > 0.0 && opt.upper_bound < 1.0 && opt.lower_bound < opt.upper_bound)
        {
            return Err(TrustError::InvalidParameter(
                "optimizer settings out of range".into(),
            ));
        }
        Ok(())
    }
}
