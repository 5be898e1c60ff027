//! Atmospheric correction terms.
//!
//! A named structure validated once at construction, so every consumer can
//! rely on the four per-band series sharing the same ordering and length.

use crate::error::TrustError;
use crate::types::SpectralVector;

/// Per-band atmospheric terms: wavelength, upward transmittance, upward path
/// radiance, and downward atmospheric radiance.
#[derive(Debug, Clone)]
pub struct AtmosphericTerms {
    wavelength: SpectralVector,
    tu: SpectralVector,
    lu: SpectralVector,
    ld: SpectralVector,
}

impl AtmosphericTerms {
    /// Build the structure, checking that all four series share one length.
    pub fn new(
        wavelength: SpectralVector,
        tu: SpectralVector,
        lu: SpectralVector,
        ld: SpectralVector,
    ) -> Result<Self, TrustError> {
        let n = wavelength.len();
        if n == 0 {
            return Err(TrustError::InvalidShape(
                "atmospheric terms must cover at least one band".into(),
            ));
        }
        if tu.len() != n || lu.len() != n || ld.len() != n {
            return Err(TrustError::InvalidShape(format!(
                "atmospheric series lengths differ: wavelength {}, Tu {}, Lu {}, Ld {}",
                n,
                tu.len(),
                lu.len(),
                ld.len()
            )));
        }
        Ok(Self {
            wavelength,
            tu,
            lu,
            ld,
        })
    }

    /// Number of spectral bands covered.
    pub fn bands(&self) -> usize {
        self.wavelength.len()
    }

    /// Band center wavelengths.
    pub fn wavelength(&self) -> &SpectralVector {
        &self.wavelength
    }

    /// Upward transmittance per band.
    pub fn tu(&self) -> &SpectralVector {
        &self.tu
    }

    /// Upward path radiance per band.
    pub fn lu(&self) -> &SpectralVector {
        &self.lu
    }

    /// Downward atmospheric radiance per band.
    pub fn ld(&self) -> &SpectralVector {
        &self.ld
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    #[test]
    fn mismatched_series_are_rejected() {
        let err = AtmosphericTerms::new(
            DVector::from_vec(vec![9.0, 10.0, 11.0]),
            DVector::from_vec(vec![0.9, 0.9]),
            DVector::zeros(3),
            DVector::zeros(3),
        )
        .unwrap_err();
        assert!(matches!(err, TrustError::InvalidShape(_)));
    }

    #[test]
    fn empty_series_are_rejected() {
        let err = AtmosphericTerms::new(
            DVector::zeros(0),
            DVector::zeros(0),
            DVector::zeros(0),
            DVector::zeros(0),
        )
        .unwrap_err();
        assert!(matches!(err, TrustError::InvalidShape(_)));
    }
}
