//! Shared fixtures for the unit-test suites: a small atmosphere, a
//! two-material emissivity library, and an independent hand-rolled forward
//! model to synthesize observations from known abundances and temperatures.

use nalgebra::DVector;

use crate::atmosphere::AtmosphericTerms;
use crate::planck::radiance;
use crate::types::{DataMatrix, SpectralVector};

pub(crate) fn test_atmosphere() -> AtmosphericTerms {
    AtmosphericTerms::new(
        DVector::from_vec(vec![8.5, 9.5, 10.5, 11.5, 12.5]),
        DVector::from_vec(vec![0.85, 0.9, 0.92, 0.88, 0.8]),
        DVector::from_vec(vec![0.4, 0.3, 0.25, 0.35, 0.5]),
        DVector::from_vec(vec![1.2, 1.0, 0.9, 1.1, 1.4]),
    )
    .unwrap()
}

/// Bands-by-materials emissivities for two spectrally distinct materials.
pub(crate) fn test_emissivity() -> DataMatrix {
    DataMatrix::from_row_slice(
        5,
        2,
        &[
            0.96, 0.70, //
            0.95, 0.74, //
            0.97, 0.78, //
            0.94, 0.72, //
            0.96, 0.68,
        ],
    )
}

/// At-sensor radiance of one pixel under the mixing model, written
/// independently of the production forward model.
pub(crate) fn synthesize(
    abundance: &[f64],
    temperatures: &[f64],
    emissivity: &DataMatrix,
    atmosphere: &AtmosphericTerms,
) -> SpectralVector {
    DVector::from_fn(atmosphere.bands(), |j, _| {
        let mut acc = 0.0;
        for (m, (&s, &t)) in abundance.iter().zip(temperatures.iter()).enumerate() {
            let e = emissivity[(j, m)];
            let l = radiance(atmosphere.wavelength()[j], t);
            acc += e * l * s * atmosphere.tu()[j]
                + (1.0 - e) * atmosphere.ld()[j] * s
                + s * atmosphere.lu()[j];
        }
        acc
    })
}
