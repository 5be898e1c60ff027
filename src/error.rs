//! Error taxonomy for the TRUST pipeline.
//!
//! Only `InvalidShape` and `InvalidParameter` ever reach the caller of
//! [`run_trust`](crate::api::run_trust); they are raised during input
//! validation, before any pixel is processed. The remaining variants are
//! produced (and recovered) inside the per-pixel search: a singular Fisher
//! matrix or a non-converging abundance optimizer marks the current candidate
//! subset as infeasible, and the search moves on.

use thiserror::Error;

/// Errors produced by the TRUST pipeline.
#[derive(Debug, Error)]
pub enum TrustError {
    /// An input array has the wrong rank or inconsistent dimensions.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// A configuration value is out of its documented domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The Fisher matrix of the temperature inversion is numerically
    /// singular for the current candidate subset.
    #[error("singular Fisher matrix in temperature inversion")]
    SingularFisherMatrix,

    /// The abundance optimizer could not produce a feasible point.
    #[error("abundance optimizer failed to converge")]
    OptimizerNonConvergence,
}
