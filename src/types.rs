//! Core shared types for the TRUST unmixing pipeline.
//!
//! Images are handled internally as a pixels-by-bands matrix; the original
//! layout (flat pixel list or rows-by-cols grid) is carried alongside so the
//! output maps can be read back in the caller's geometry.

use nalgebra::{DMatrix, DVector};

use crate::error::TrustError;

/// Dynamic matrix of `f64` used for images, emissivities, and output maps.
pub type DataMatrix = DMatrix<f64>;

/// Dynamic vector of `f64` used for spectra and per-material quantities.
pub type SpectralVector = DVector<f64>;

/// Outer layout of an image or output map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageShape {
    /// A flat list of pixels (pixels x bands input).
    Flat { pixels: usize },
    /// A rows-by-cols grid (rows x cols x bands input).
    Grid { rows: usize, cols: usize },
}

impl ImageShape {
    /// Total number of pixels described by this shape.
    pub fn pixel_count(&self) -> usize {
        match *self {
            ImageShape::Flat { pixels } => pixels,
            ImageShape::Grid { rows, cols } => rows * cols,
        }
    }
}

/// At-sensor radiance image, normalized to a pixels-by-bands matrix.
///
/// Constructed either from a 2-D pixels-by-bands matrix or from a 3-D
/// rows-by-cols-by-bands cube. Any other rank is rejected at construction,
/// so the pipeline itself only ever sees the normalized layout.
#[derive(Debug, Clone)]
pub struct RadianceImage {
    data: DataMatrix,
    shape: ImageShape,
}

impl RadianceImage {
    /// Wrap an already-flat pixels-by-bands matrix.
    pub fn from_matrix(data: DataMatrix) -> Self {
        let shape = ImageShape::Flat {
            pixels: data.nrows(),
        };
        Self { data, shape }
    }

    /// Build from a rows-by-cols-by-bands cube stored contiguously with the
    /// band axis last: `data[(row * cols + col) * bands + band]`.
    pub fn from_cube(
        rows: usize,
        cols: usize,
        bands: usize,
        data: &[f64],
    ) -> Result<Self, TrustError> {
        if data.len() != rows * cols * bands {
            return Err(TrustError::InvalidShape(format!(
                "cube data has {} elements, expected {} ({}x{}x{})",
                data.len(),
                rows * cols * bands,
                rows,
                cols,
                bands
            )));
        }
        let pixels = rows * cols;
        let matrix = DataMatrix::from_fn(pixels, bands, |p, b| data[p * bands + b]);
        Ok(Self {
            data: matrix,
            shape: ImageShape::Grid { rows, cols },
        })
    }

    /// Number of spectral bands.
    pub fn bands(&self) -> usize {
        self.data.ncols()
    }

    /// Original outer layout.
    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    /// The normalized pixels-by-bands matrix.
    pub fn pixels(&self) -> &DataMatrix {
        &self.data
    }
}

/// A per-pixel output stack (abundances, temperatures, or candidate errors)
/// with the same outer layout as the input image and one layer per material
/// (or per candidate subset, for the error map).
#[derive(Debug, Clone)]
pub struct OutputMap {
    data: DataMatrix,
    shape: ImageShape,
}

impl OutputMap {
    pub(crate) fn new(data: DataMatrix, shape: ImageShape) -> Self {
        debug_assert_eq!(data.nrows(), shape.pixel_count());
        Self { data, shape }
    }

    /// Number of layers (last axis length).
    pub fn layers(&self) -> usize {
        self.data.ncols()
    }

    /// Outer layout, matching the input image.
    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    /// The underlying pixels-by-layers matrix.
    pub fn as_matrix(&self) -> &DataMatrix {
        &self.data
    }

    /// Value at a grid position. Returns `None` for flat maps or
    /// out-of-range indices.
    pub fn value_at(&self, row: usize, col: usize, layer: usize) -> Option<f64> {
        match self.shape {
            ImageShape::Grid { rows, cols } if row < rows && col < cols => {
                let pixel = row * cols + col;
                if layer < self.data.ncols() {
                    Some(self.data[(pixel, layer)])
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Flatten back to the cube layout used by [`RadianceImage::from_cube`]:
    /// `out[(row * cols + col) * layers + layer]`.
    pub fn to_cube(&self) -> Vec<f64> {
        let layers = self.data.ncols();
        let mut out = Vec::with_capacity(self.data.nrows() * layers);
        for p in 0..self.data.nrows() {
            for l in 0..layers {
                out.push(self.data[(p, l)]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_round_trip_preserves_order() {
        let data: Vec<f64> = (0..2 * 3 * 4).map(|v| v as f64).collect();
        let image = RadianceImage::from_cube(2, 3, 4, &data).unwrap();
        assert_eq!(image.bands(), 4);
        assert_eq!(image.shape(), ImageShape::Grid { rows: 2, cols: 3 });

        // Pixel (1, 2) is flat index 5; band 3 of that pixel is element 23.
        assert_eq!(image.pixels()[(5, 3)], 23.0);

        let map = OutputMap::new(image.pixels().clone(), image.shape());
        assert_eq!(map.to_cube(), data);
        assert_eq!(map.value_at(1, 2, 3), Some(23.0));
        assert_eq!(map.value_at(2, 0, 0), None);
    }

    #[test]
    fn cube_with_wrong_length_is_rejected() {
        let err = RadianceImage::from_cube(2, 2, 3, &[0.0; 11]).unwrap_err();
        assert!(matches!(err, TrustError::InvalidShape(_)));
    }

    #[test]
    fn flat_map_has_no_grid_accessor() {
        let map = OutputMap::new(DataMatrix::zeros(4, 2), ImageShape::Flat { pixels: 4 });
        assert_eq!(map.value_at(0, 0, 0), None);
        assert_eq!(map.layers(), 2);
    }
}
