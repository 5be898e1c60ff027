//! Candidate subset enumeration.
//!
//! Every plausible material combination for a pixel is a subset of the
//! material indices `{1..n}` with size up to the cardinality cap. The
//! collection is generated once per run, shared read-only across all pixels,
//! and ordered so that candidate selection and tie-breaking are
//! deterministic: ascending cardinality first, then ascending lexicographic
//! element order.

use crate::error::TrustError;

/// Enumerate all subsets of `{1..=n_materials}` of size `1..=min(n, cap)`.
///
/// Indices are 1-based. Each subset appears exactly once, sorted
/// internally, and the sequence is ordered by cardinality then
/// lexicographically.
pub fn enumerate_subsets(
    n_materials: usize,
    max_cardinality: usize,
) -> Result<Vec<Vec<usize>>, TrustError> {
    if n_materials < 1 {
        return Err(TrustError::InvalidParameter(
            "material count must be at least 1".into(),
        ));
    }
    if max_cardinality < 1 {
        return Err(TrustError::InvalidParameter(
            "subset cardinality cap must be at least 1".into(),
        ));
    }

    let cap = max_cardinality.min(n_materials);
    let mut subsets = Vec::new();
    for size in 1..=cap {
        push_combinations(n_materials, size, &mut subsets);
    }
    Ok(subsets)
}

/// Append all `size`-element subsets of `{1..=n}` in lexicographic order.
fn push_combinations(n: usize, size: usize, out: &mut Vec<Vec<usize>>) {
    let mut current: Vec<usize> = (1..=size).collect();
    loop {
        out.push(current.clone());

        // Advance to the lexicographic successor.
        let mut i = size;
        while i > 0 && current[i - 1] == n - size + i {
            i -= 1;
        }
        if i == 0 {
            return;
        }
        current[i - 1] += 1;
        for j in i..size {
            current[j] = current[j - 1] + 1;
        }
    }
}
