use crate::domain::{DenseField, GridShape, MillerIndex, PostError, PostResult, SparseCoefficient};
use crate::numerics::Fft3d;
use num_complex::Complex64;
use tracing::{debug, warn};

/// Imaginary residual, relative to the largest real magnitude, above which
/// the reconstruction logs a warning.
pub const IMAGINARY_RESIDUAL_WARN_RATIO: f64 = 1.0e-6;

/// What to do when two coefficients land on the same grid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DuplicateMillerPolicy {
    /// Fail with a format error naming the colliding index.
    #[default]
    Reject,
    /// Keep the coefficient that appears last in the input.
    LastWriteWins,
}

/// Rebuilds a real-space field from sparse reciprocal-space coefficients
/// with the default [`DuplicateMillerPolicy::Reject`] policy.
pub fn reconstruct(
    indices: &[MillerIndex],
    coefficients: &[Complex64],
    shape: GridShape,
) -> PostResult<DenseField> {
    reconstruct_with_policy(indices, coefficients, shape, DuplicateMillerPolicy::Reject)
}

/// Scatters `coefficients` onto a zeroed grid at their (wrapped) Miller
/// positions, applies the normalized inverse 3D transform, multiplies by
/// `nr1 * nr2 * nr3` and keeps the real part.
pub fn reconstruct_with_policy(
    indices: &[MillerIndex],
    coefficients: &[Complex64],
    shape: GridShape,
    policy: DuplicateMillerPolicy,
) -> PostResult<DenseField> {
    let mut grid = scatter_coefficients(indices, coefficients, shape, policy)?;

    let [nr1, nr2, nr3] = shape.dims();
    Fft3d::new(nr1, nr2, nr3).inverse(&mut grid);
    let scale = shape.len() as f64;
    grid.iter_mut().for_each(|value| *value *= scale);

    report_imaginary_residual(&grid, shape);
    let values = grid.into_iter().map(|value| value.re).collect();
    DenseField::from_values(shape, values)
}

pub fn reconstruct_sparse(
    coefficients: &[SparseCoefficient],
    shape: GridShape,
    policy: DuplicateMillerPolicy,
) -> PostResult<DenseField> {
    let (indices, values): (Vec<MillerIndex>, Vec<Complex64>) = coefficients
        .iter()
        .map(|entry| (entry.index, entry.coefficient))
        .unzip();
    reconstruct_with_policy(&indices, &values, shape, policy)
}

fn scatter_coefficients(
    indices: &[MillerIndex],
    coefficients: &[Complex64],
    shape: GridShape,
    policy: DuplicateMillerPolicy,
) -> PostResult<Vec<Complex64>> {
    if indices.len() != coefficients.len() {
        return Err(PostError::format(
            "FORMAT.COEFFICIENT_COUNT",
            format!(
                "{} Miller indices paired with {} coefficients",
                indices.len(),
                coefficients.len()
            ),
        ));
    }

    let mut grid = zeroed_grid(shape)?;
    let mut occupied = vec![false; shape.len()];
    let mut overwritten = 0_usize;

    for (miller, coefficient) in indices.iter().zip(coefficients) {
        let slot = shape.wrap_miller(*miller).ok_or_else(|| {
            PostError::format(
                "FORMAT.MILLER_RANGE",
                format!("Miller index {miller} does not fit grid {shape}"),
            )
        })?;

        if occupied[slot] {
            match policy {
                DuplicateMillerPolicy::Reject => {
                    return Err(PostError::format(
                        "FORMAT.DUPLICATE_MILLER",
                        format!("Miller index {miller} repeats a grid point of {shape}"),
                    ));
                }
                DuplicateMillerPolicy::LastWriteWins => overwritten += 1,
            }
        }

        occupied[slot] = true;
        grid[slot] = *coefficient;
    }

    if overwritten > 0 {
        warn!(
            overwritten,
            grid = %shape,
            "duplicate Miller indices overwrote earlier coefficients"
        );
    }
    debug!(
        coefficients = indices.len(),
        grid = %shape,
        "scattered reciprocal-space coefficients"
    );

    Ok(grid)
}

fn zeroed_grid(shape: GridShape) -> PostResult<Vec<Complex64>> {
    let mut grid = Vec::new();
    grid.try_reserve_exact(shape.len()).map_err(|error| {
        PostError::internal(
            "INTERNAL.GRID_ALLOCATION",
            format!("cannot allocate a work buffer for grid {shape}: {error}"),
        )
    })?;
    grid.resize(shape.len(), Complex64::new(0.0, 0.0));
    Ok(grid)
}

fn report_imaginary_residual(grid: &[Complex64], shape: GridShape) {
    let max_real = grid.iter().map(|value| value.re.abs()).fold(0.0, f64::max);
    let max_imag = grid.iter().map(|value| value.im.abs()).fold(0.0, f64::max);
    if max_imag > IMAGINARY_RESIDUAL_WARN_RATIO * max_real.max(f64::MIN_POSITIVE) {
        warn!(
            max_imag,
            max_real,
            grid = %shape,
            "reconstructed field has a non-negligible imaginary part; it is discarded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{DuplicateMillerPolicy, reconstruct, reconstruct_sparse, reconstruct_with_policy};
    use crate::domain::{GridShape, MillerIndex, SparseCoefficient};
    use num_complex::Complex64;
    use std::f64::consts::PI;

    #[test]
    fn empty_coefficients_give_zero_field() {
        let shape = GridShape::new(3, 4, 5).expect("shape");
        let field = reconstruct(&[], &[], shape).expect("reconstruct");
        assert_eq!(field.shape(), shape);
        assert!(field.is_zero());
    }

    #[test]
    fn constant_term_fills_grid_with_that_value() {
        let shape = GridShape::new(2, 3, 4).expect("shape");
        let field = reconstruct(
            &[MillerIndex::new(0, 0, 0)],
            &[Complex64::new(0.75, 0.0)],
            shape,
        )
        .expect("reconstruct");

        for value in field.values() {
            assert!((value - 0.75).abs() < 1.0e-12);
        }
    }

    #[test]
    fn conjugate_pair_produces_cosine_wave() {
        let shape = GridShape::new(8, 2, 2).expect("shape");
        let field = reconstruct(
            &[MillerIndex::new(1, 0, 0), MillerIndex::new(-1, 0, 0)],
            &[Complex64::new(0.5, 0.0), Complex64::new(0.5, 0.0)],
            shape,
        )
        .expect("reconstruct");

        for x in 0..8 {
            let expected = (2.0 * PI * x as f64 / 8.0).cos();
            for z in 0..2 {
                for y in 0..2 {
                    let actual = field.get(x, y, z).expect("in range");
                    assert!((actual - expected).abs() < 1.0e-12, "x={x}: {actual} vs {expected}");
                }
            }
        }
    }

    #[test]
    fn reconstruction_is_bit_identical_across_calls() {
        let shape = GridShape::new(6, 5, 4).expect("shape");
        let indices = [
            MillerIndex::new(0, 0, 0),
            MillerIndex::new(1, 2, -1),
            MillerIndex::new(-2, 1, 1),
            MillerIndex::new(2, -2, 0),
        ];
        let coefficients = [
            Complex64::new(1.0, 0.0),
            Complex64::new(0.2, -0.1),
            Complex64::new(-0.3, 0.4),
            Complex64::new(0.05, 0.05),
        ];

        let first = reconstruct(&indices, &coefficients, shape).expect("first");
        let second = reconstruct(&indices, &coefficients, shape).expect("second");
        let first_bits: Vec<u64> = first.values().iter().map(|value| value.to_bits()).collect();
        let second_bits: Vec<u64> = second.values().iter().map(|value| value.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn mismatched_lengths_are_format_errors() {
        let shape = GridShape::new(2, 2, 2).expect("shape");
        let error = reconstruct(&[MillerIndex::new(0, 0, 0)], &[], shape)
            .expect_err("length mismatch should fail");
        assert_eq!(error.placeholder(), "FORMAT.COEFFICIENT_COUNT");
    }

    #[test]
    fn out_of_range_indices_are_format_errors() {
        let shape = GridShape::new(2, 2, 2).expect("shape");
        let error = reconstruct(&[MillerIndex::new(2, 0, 0)], &[Complex64::new(1.0, 0.0)], shape)
            .expect_err("index outside grid should fail");
        assert_eq!(error.placeholder(), "FORMAT.MILLER_RANGE");
    }

    #[test]
    fn unallocatable_grids_fail_instead_of_aborting() {
        let shape = GridShape::new(100_000, 100_000, 100_000).expect("shape");
        let error = reconstruct(&[], &[], shape).expect_err("no machine holds this grid");
        assert_eq!(error.placeholder(), "INTERNAL.GRID_ALLOCATION");
    }

    #[test]
    fn duplicates_are_rejected_by_default_and_overwrite_on_request() {
        let shape = GridShape::new(2, 2, 2).expect("shape");
        // -2 wraps onto 0 for an axis of length 2.
        let indices = [MillerIndex::new(0, 0, 0), MillerIndex::new(-2, 0, 0)];
        let coefficients = [Complex64::new(1.0, 0.0), Complex64::new(3.0, 0.0)];

        let error = reconstruct(&indices, &coefficients, shape).expect_err("duplicate");
        assert_eq!(error.placeholder(), "FORMAT.DUPLICATE_MILLER");

        let field = reconstruct_with_policy(
            &indices,
            &coefficients,
            shape,
            DuplicateMillerPolicy::LastWriteWins,
        )
        .expect("last write wins");
        assert!(field.values().iter().all(|value| (value - 3.0).abs() < 1.0e-12));
    }

    #[test]
    fn sparse_entries_match_split_inputs() {
        let shape = GridShape::new(3, 3, 3).expect("shape");
        let entries = [
            SparseCoefficient::new(MillerIndex::new(0, 0, 0), Complex64::new(2.0, 0.0)),
            SparseCoefficient::new(MillerIndex::new(0, 1, 0), Complex64::new(0.0, 1.0)),
        ];
        let from_entries =
            reconstruct_sparse(&entries, shape, DuplicateMillerPolicy::Reject).expect("entries");
        let from_slices = reconstruct(
            &[entries[0].index, entries[1].index],
            &[entries[0].coefficient, entries[1].coefficient],
            shape,
        )
        .expect("slices");
        assert_eq!(from_entries, from_slices);
    }
}
