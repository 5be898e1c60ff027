//! High-level entry point for the TRUST unmixing pipeline.
//!
//! [`run_trust`] validates and normalizes every input exactly once, runs the
//! pixel-level search, and hands back the output maps in the caller's image
//! layout.

use tracing::debug;

use crate::atmosphere::AtmosphericTerms;
use crate::combinations::enumerate_subsets;
use crate::error::TrustError;
use crate::materials::MaterialLibrary;
use crate::settings::TrustSettings;
use crate::trust::unmix_pixels;
use crate::types::{DataMatrix, OutputMap, RadianceImage, SpectralVector};

/// Output of a TRUST run.
#[derive(Debug, Clone)]
pub struct TrustOutput {
    /// Per-pixel abundances, one layer per material. In hard classification
    /// mode (`max_materials_per_pixel == 1`) this collapses to a single
    /// layer holding the 0-based class index, NaN where unassigned.
    pub abundance: OutputMap,
    /// Per-pixel subpixel temperatures, one layer per material; NaN outside
    /// the selected subset and for failed pixels.
    pub temperature: OutputMap,
    /// Per-pixel reconstruction error of every candidate subset, in
    /// enumeration order; present when requested in the settings.
    pub error: Option<OutputMap>,
}

/// Estimate per-pixel material abundances and subpixel temperatures.
///
/// * `image` - at-sensor radiance, already normalized to pixels-by-bands
///   with its original layout attached.
/// * `emissivity` - materials-by-bands emissivity spectra (bands-by-materials
///   also accepted when unambiguous).
/// * `mean_temperature` - one mean class temperature per material, in kelvin.
/// * `atmosphere` - per-band atmospheric correction terms.
/// * `settings` - search configuration; see [`TrustSettings`] for defaults.
///
/// A malformed input fails fast with `InvalidShape`/`InvalidParameter`
/// before any pixel is touched. Per-pixel or per-candidate numerical
/// failures never abort the run; they surface as NaN in the output maps.
pub fn run_trust(
    image: &RadianceImage,
    emissivity: &DataMatrix,
    mean_temperature: &SpectralVector,
    atmosphere: &AtmosphericTerms,
    settings: &TrustSettings,
) -> Result<TrustOutput, TrustError> {
    let bands = image.bands();
    if bands == 0 {
        return Err(TrustError::InvalidShape(
            "image must have at least one band".into(),
        ));
    }
    if atmosphere.bands() != bands {
        return Err(TrustError::InvalidShape(format!(
            "atmosphere covers {} bands but the image has {}",
            atmosphere.bands(),
            bands
        )));
    }
    settings.validate(bands)?;

    let library = MaterialLibrary::new(emissivity.clone(), mean_temperature.clone(), bands)?;
    let subsets = enumerate_subsets(library.materials(), settings.max_materials_per_pixel)?;

    debug!(
        materials = library.materials(),
        bands,
        candidates = subsets.len(),
        "running TRUST"
    );

    let maps = unmix_pixels(image.pixels(), &library, atmosphere, &subsets, settings);

    let abundance = if settings.max_materials_per_pixel == 1 {
        collapse_to_class_map(&maps.abundance)
    } else {
        maps.abundance
    };

    Ok(TrustOutput {
        abundance: OutputMap::new(abundance, image.shape()),
        temperature: OutputMap::new(maps.temperature, image.shape()),
        error: settings
            .return_error_map
            .then(|| OutputMap::new(maps.error, image.shape())),
    })
}

/// Hard classification: each pixel was assigned essentially entirely to one
/// material, so the abundance stack collapses to a single 0-based
/// class-index layer. The dominant material (abundance above one half, at
/// most one per row) identifies the class; pixels without one stay NaN.
fn collapse_to_class_map(abundance: &DataMatrix) -> DataMatrix {
    DataMatrix::from_fn(abundance.nrows(), 1, |p, _| {
        (0..abundance.ncols())
            .find(|&m| abundance[(p, m)] > 0.5)
            .map_or(f64::NAN, |m| m as f64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn test_atmosphere(bands: usize) -> AtmosphericTerms {
        AtmosphericTerms::new(
            DVector::from_fn(bands, |j, _| 8.5 + j as f64),
            DVector::from_element(bands, 0.9),
            DVector::from_element(bands, 0.3),
            DVector::from_element(bands, 1.0),
        )
        .unwrap()
    }

    #[test]
    fn band_mismatch_between_image_and_atmosphere_is_fatal() {
        let image = RadianceImage::from_matrix(DataMatrix::zeros(2, 4));
        let result = run_trust(
            &image,
            &DataMatrix::from_element(2, 4, 0.9),
            &DVector::from_vec(vec![300.0, 310.0]),
            &test_atmosphere(3),
            &TrustSettings::default(),
        );
        assert!(matches!(result, Err(TrustError::InvalidShape(_))));
    }

    #[test]
    fn invalid_settings_fail_before_processing() {
        let image = RadianceImage::from_matrix(DataMatrix::zeros(2, 3));
        let settings = TrustSettings {
            gamma: f64::NAN,
            ..TrustSettings::default()
        };
        let result = run_trust(
            &image,
            &DataMatrix::from_element(2, 3, 0.9),
            &DVector::from_vec(vec![300.0, 310.0]),
            &test_atmosphere(3),
            &settings,
        );
        assert!(matches!(result, Err(TrustError::InvalidParameter(_))));
    }

    #[test]
    fn class_map_collapse_keeps_class_zero() {
        let mut abundance = DataMatrix::zeros(3, 2);
        abundance[(0, 0)] = 1.0;
        abundance[(1, 1)] = 1.0;
        abundance.row_mut(2).fill(f64::NAN);

        let classes = collapse_to_class_map(&abundance);
        assert_eq!(classes[(0, 0)], 0.0);
        assert_eq!(classes[(1, 0)], 1.0);
        assert!(classes[(2, 0)].is_nan());
    }

    #[test]
    fn class_map_collapse_tolerates_near_unit_abundance() {
        let mut abundance = DataMatrix::zeros(2, 2);
        abundance[(0, 0)] = 1.0 - 1e-9;
        abundance[(0, 1)] = 1e-9;
        abundance[(1, 1)] = 1.0;

        let classes = collapse_to_class_map(&abundance);
        assert_eq!(classes[(0, 0)], 0.0);
        assert_eq!(classes[(1, 0)], 1.0);
    }
}
