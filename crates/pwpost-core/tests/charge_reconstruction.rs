use num_complex::Complex64;
use pwpost_core::container::MemoryContainer;
use pwpost_core::domain::{GridShape, MillerIndex, SpinComponent};
use pwpost_core::modules::charge::{
    DuplicateMillerPolicy, read_charge_density, read_charge_density_with_policy, reconstruct,
};
use pwpost_core::modules::dump::{FileHeader, read_field, write_field_dump};
use std::f64::consts::PI;
use tempfile::TempDir;

/// Direct evaluation of `sum_G c_G exp(+2 pi i G.r)` at grid point `(x, y, z)`.
fn direct_sum(
    shape: GridShape,
    indices: &[MillerIndex],
    coefficients: &[Complex64],
    point: [usize; 3],
) -> f64 {
    let [nr1, nr2, nr3] = shape.dims();
    indices
        .iter()
        .zip(coefficients)
        .map(|(miller, coefficient)| {
            let phase = 2.0
                * PI
                * (miller.h as f64 * point[0] as f64 / nr1 as f64
                    + miller.k as f64 * point[1] as f64 / nr2 as f64
                    + miller.l as f64 * point[2] as f64 / nr3 as f64);
            (coefficient * Complex64::from_polar(1.0, phase)).re
        })
        .sum()
}

fn hermitian_set() -> (Vec<MillerIndex>, Vec<Complex64>) {
    let mut indices = vec![MillerIndex::new(0, 0, 0)];
    let mut coefficients = vec![Complex64::new(8.0, 0.0)];
    for (miller, value) in [
        (MillerIndex::new(1, 0, 0), Complex64::new(0.5, 0.25)),
        (MillerIndex::new(0, 2, -1), Complex64::new(-0.3, 0.1)),
        (MillerIndex::new(1, -1, 2), Complex64::new(0.05, -0.2)),
    ] {
        indices.push(miller);
        coefficients.push(value);
        indices.push(MillerIndex::new(-miller.h, -miller.k, -miller.l));
        coefficients.push(value.conj());
    }
    (indices, coefficients)
}

#[test]
fn reconstruction_matches_direct_fourier_sum_on_mixed_radix_grid() {
    let shape = GridShape::new(6, 5, 7).expect("shape");
    let (indices, coefficients) = hermitian_set();
    let field = reconstruct(&indices, &coefficients, shape).expect("reconstruct");

    for z in 0..7 {
        for y in 0..5 {
            for x in 0..6 {
                let expected = direct_sum(shape, &indices, &coefficients, [x, y, z]);
                let actual = field.get(x, y, z).expect("in range");
                assert!(
                    (expected - actual).abs() < 1.0e-10,
                    "({x},{y},{z}): {expected} vs {actual}"
                );
            }
        }
    }
    // The average of the field is the G = 0 coefficient.
    assert!((field.sum() / shape.len() as f64 - 8.0).abs() < 1.0e-10);
}

#[test]
fn container_charge_flows_into_a_dump_file() {
    let (indices, coefficients) = hermitian_set();
    let flat_indices: Vec<i32> = indices
        .iter()
        .flat_map(|miller| [miller.h, miller.k, miller.l])
        .collect();
    let flat_total: Vec<f64> = coefficients
        .iter()
        .flat_map(|value| [value.re, value.im])
        .collect();
    let flat_difference: Vec<f64> = coefficients
        .iter()
        .flat_map(|value| [0.5 * value.re, 0.5 * value.im])
        .collect();

    let container = MemoryContainer::new("charge-density")
        .with_attribute("", "ngm_g", indices.len() as i64)
        .with_dataset_i32("MillerIndices", flat_indices)
        .with_dataset_f64("rhotot_g", flat_total)
        .with_dataset_f64("rhodiff_g", flat_difference);

    let shape = GridShape::new(4, 6, 5).expect("shape");
    let charge = read_charge_density(&container, shape).expect("charge density");
    assert!(charge.is_magnetic());

    let up = charge.component(SpinComponent::Up);
    let down = charge.component(SpinComponent::Down);
    for ((total, up), down) in charge.total.values().iter().zip(up.values()).zip(down.values()) {
        assert!((up - 0.75 * total).abs() < 1.0e-10);
        assert!((down - 0.25 * total).abs() < 1.0e-10);
    }

    let temp = TempDir::new().expect("tempdir should be created");
    let path = temp.path().join("charge_up.dat");
    write_field_dump(&path, &FileHeader::new("hermitian", shape), &up).expect("write dump");
    let restored = read_field(&path).expect("read dump");
    for (expected, actual) in up.values().iter().zip(restored.values()) {
        assert!((expected - actual).abs() <= 1.0e-9 * expected.abs().max(1.0e-300));
    }
}

#[test]
fn duplicate_indices_follow_the_selected_policy() {
    let container = MemoryContainer::new("charge-density")
        .with_attribute("", "ngm_g", 2_i64)
        .with_dataset_i32("MillerIndices", vec![1, 0, 0, -2, 0, 0])
        .with_dataset_f64("rhotot_g", vec![1.0, 0.0, 2.0, 0.0]);
    let shape = GridShape::new(3, 1, 1).expect("shape");

    let error = read_charge_density(&container, shape).expect_err("1 and -2 collide on 3 points");
    assert_eq!(error.placeholder(), "FORMAT.DUPLICATE_MILLER");

    let charge =
        read_charge_density_with_policy(&container, shape, DuplicateMillerPolicy::LastWriteWins)
            .expect("last write wins");
    let expected = |x: usize| 2.0 * (2.0 * PI * x as f64 / 3.0).cos();
    for x in 0..3 {
        let actual = charge.total.get(x, 0, 0).expect("in range");
        assert!((actual - expected(x)).abs() < 1.0e-12);
    }
}
