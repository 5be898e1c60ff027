//! Material spectra: per-class emissivities and mean temperatures.
//!
//! Shape normalization happens exactly once, here. The documented input
//! orientation is materials-by-bands; a bands-by-materials matrix is
//! accepted when the band axis identifies the orientation unambiguously,
//! and anything else, the square case included, is rejected instead of
//! guessed at.

use nalgebra::DVector;

use crate::error::TrustError;
use crate::types::{DataMatrix, SpectralVector};

/// Emissivity spectra and mean temperatures for all material classes.
///
/// Emissivities are stored bands-by-materials internally so that a candidate
/// subset maps to a column selection.
#[derive(Debug, Clone)]
pub struct MaterialLibrary {
    emissivity: DataMatrix,
    mean_temperature: SpectralVector,
}

impl MaterialLibrary {
    /// Normalize and validate the material inputs against the band count.
    ///
    /// `emissivity` is materials-by-bands (the documented orientation) or
    /// bands-by-materials; a square matrix is ambiguous and rejected rather
    /// than guessed at. `mean_temperature` must hold one positive value per
    /// material.
    pub fn new(
        emissivity: DataMatrix,
        mean_temperature: SpectralVector,
        bands: usize,
    ) -> Result<Self, TrustError> {
        let emissivity = if emissivity.nrows() == bands && emissivity.ncols() == bands {
            return Err(TrustError::InvalidShape(format!(
                "square {bands}x{bands} emissivity is ambiguous between \
                 materials-by-bands and bands-by-materials"
            )));
        } else if emissivity.ncols() == bands {
            // materials x bands: transpose into column-per-material form.
            emissivity.transpose()
        } else if emissivity.nrows() == bands {
            emissivity
        } else {
            return Err(TrustError::InvalidShape(format!(
                "emissivity is {}x{}, but neither axis matches {} bands",
                emissivity.nrows(),
                emissivity.ncols(),
                bands
            )));
        };

        let materials = emissivity.ncols();
        if materials == 0 {
            return Err(TrustError::InvalidShape(
                "at least one material class is required".into(),
            ));
        }
        if mean_temperature.len() != materials {
            return Err(TrustError::InvalidShape(format!(
                "{} mean temperatures given for {} materials",
                mean_temperature.len(),
                materials
            )));
        }
        if mean_temperature.iter().any(|&t| !t.is_finite() || t <= 0.0) {
            return Err(TrustError::InvalidParameter(
                "mean temperatures must be finite and positive".into(),
            ));
        }

        Ok(Self {
            emissivity,
            mean_temperature,
        })
    }

    /// Number of material classes.
    pub fn materials(&self) -> usize {
        self.emissivity.ncols()
    }

    /// Number of spectral bands.
    pub fn bands(&self) -> usize {
        self.emissivity.nrows()
    }

    /// Full bands-by-materials emissivity matrix.
    pub fn emissivity(&self) -> &DataMatrix {
        &self.emissivity
    }

    /// Mean temperature per material class, in kelvin.
    pub fn mean_temperature(&self) -> &SpectralVector {
        &self.mean_temperature
    }

    /// Emissivity columns for a 1-based candidate subset.
    pub fn subset_emissivity(&self, subset: &[usize]) -> DataMatrix {
        let cols: Vec<usize> = subset.iter().map(|&m| m - 1).collect();
        self.emissivity.select_columns(cols.iter())
    }

    /// Mean temperatures for a 1-based candidate subset.
    pub fn subset_temperature(&self, subset: &[usize]) -> SpectralVector {
        DVector::from_iterator(
            subset.len(),
            subset.iter().map(|&m| self.mean_temperature[m - 1]),
        )
    }
}
