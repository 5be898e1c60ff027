//! Black-body radiance model.
//!
//! Pure functions of wavelength and temperature: the Planck spectral
//! radiance and its analytic temperature derivative, in the units of the
//! TRUST formulation (W·m⁻²·sr⁻¹·µm⁻¹, wavelengths in µm, temperatures in
//! K). The functions return non-finite values when `wavelength * temperature`
//! approaches zero; callers are expected to guard their inputs.

use nalgebra::DVector;

use crate::types::{DataMatrix, SpectralVector};

/// First radiation constant in the chosen unit system.
pub const C1: f64 = 1.1904e8;
/// Second radiation constant in the chosen unit system.
pub const C2: f64 = 1.4388e4;

/// Planck spectral radiance `L(λ, T)`.
pub fn radiance(wavelength: f64, temperature: f64) -> f64 {
    let x = C2 / (wavelength * temperature);
    C1 / (wavelength.powi(5) * (x.exp() - 1.0))
}

/// Analytic temperature derivative `∂L/∂T(λ, T)`.
pub fn radiance_derivative(wavelength: f64, temperature: f64) -> f64 {
    let x = C2 / (wavelength * temperature);
    let ex = x.exp();
    (C1 / wavelength.powi(5))
        * (C2 / (wavelength * temperature * temperature))
        * ex
        / ((ex - 1.0) * (ex - 1.0))
}

/// Radiance evaluated over a (temperatures x wavelengths) grid.
pub fn radiance_grid(wavelengths: &SpectralVector, temperatures: &SpectralVector) -> DataMatrix {
    DataMatrix::from_fn(temperatures.len(), wavelengths.len(), |m, j| {
        radiance(wavelengths[j], temperatures[m])
    })
}

/// Temperature derivative evaluated over a (temperatures x wavelengths) grid.
pub fn radiance_derivative_grid(
    wavelengths: &SpectralVector,
    temperatures: &SpectralVector,
) -> DataMatrix {
    DataMatrix::from_fn(temperatures.len(), wavelengths.len(), |m, j| {
        radiance_derivative(wavelengths[j], temperatures[m])
    })
}

/// Convenience: radiance of every band at a single temperature.
pub fn radiance_spectrum(wavelengths: &SpectralVector, temperature: f64) -> SpectralVector {
    DVector::from_iterator(
        wavelengths.len(),
        wavelengths.iter().map(|&l| radiance(l, temperature)),
    )
}
