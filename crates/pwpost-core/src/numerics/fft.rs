use num_complex::Complex64;
use rayon::prelude::*;
use std::f64::consts::PI;

const PARALLEL_MIN_LEN: usize = 8192;

#[inline]
fn use_parallel_for_len(len: usize) -> bool {
    len >= PARALLEL_MIN_LEN && rayon::current_num_threads() > 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FftDirection {
    /// `exp(-2 pi i k n / N)` kernel.
    Forward,
    /// `exp(+2 pi i k n / N)` kernel, unnormalized.
    Backward,
}

impl FftDirection {
    const fn sign(self) -> f64 {
        match self {
            Self::Forward => -1.0,
            Self::Backward => 1.0,
        }
    }
}

/// One-dimensional mixed-radix transform of a fixed length.
///
/// Lengths are split into prime factors (smallest first); each stage is a
/// decimation-in-time Cooley-Tukey pass and prime-length leaves fall back
/// to a direct DFT. No normalization is applied in either direction.
#[derive(Debug, Clone)]
pub struct FftPlan {
    len: usize,
    direction: FftDirection,
    factors: Vec<usize>,
    twiddles: Vec<Complex64>,
}

impl FftPlan {
    pub fn new(len: usize, direction: FftDirection) -> Self {
        let sign = direction.sign();
        let twiddles = (0..len)
            .map(|t| {
                let angle = sign * 2.0 * PI * t as f64 / len as f64;
                Complex64::new(angle.cos(), angle.sin())
            })
            .collect();
        Self {
            len,
            direction,
            factors: prime_factors(len),
            twiddles,
        }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn direction(&self) -> FftDirection {
        self.direction
    }

    pub fn factors(&self) -> &[usize] {
        &self.factors
    }

    /// Transforms `buffer` in place. `buffer.len()` must equal the plan length.
    pub fn process(&self, buffer: &mut [Complex64]) {
        debug_assert_eq!(buffer.len(), self.len);
        if self.len <= 1 {
            return;
        }
        let input = buffer.to_vec();
        self.transform(&input, 0, 1, buffer, &self.factors);
    }

    #[inline]
    fn twiddle(&self, exponent: usize, sub_len: usize) -> Complex64 {
        self.twiddles[(exponent % sub_len) * (self.len / sub_len)]
    }

    fn transform(
        &self,
        input: &[Complex64],
        offset: usize,
        stride: usize,
        output: &mut [Complex64],
        factors: &[usize],
    ) {
        let n = output.len();
        if n == 1 {
            output[0] = input[offset];
            return;
        }

        if factors.len() <= 1 {
            for (k, slot) in output.iter_mut().enumerate() {
                let mut sum = Complex64::new(0.0, 0.0);
                for j in 0..n {
                    sum += input[offset + j * stride] * self.twiddle(j * k, n);
                }
                *slot = sum;
            }
            return;
        }

        let radix = factors[0];
        let m = n / radix;
        for (r, chunk) in output.chunks_mut(m).enumerate() {
            self.transform(input, offset + r * stride, stride * radix, chunk, &factors[1..]);
        }

        let partial = output.to_vec();
        for k in 0..m {
            for q in 0..radix {
                let target = k + m * q;
                let mut sum = Complex64::new(0.0, 0.0);
                for r in 0..radix {
                    sum += partial[r * m + k] * self.twiddle(r * target, n);
                }
                output[target] = sum;
            }
        }
    }
}

fn prime_factors(mut n: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    let mut p = 2;
    while p * p <= n {
        while n % p == 0 {
            factors.push(p);
            n /= p;
        }
        p += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Three-dimensional transform over data laid out first-axis-fastest,
/// `index = i + n1 * (j + n2 * k)`.
#[derive(Debug, Clone)]
pub struct Fft3d {
    dims: [usize; 3],
    forward: [FftPlan; 3],
    backward: [FftPlan; 3],
}

impl Fft3d {
    pub fn new(n1: usize, n2: usize, n3: usize) -> Self {
        let dims = [n1, n2, n3];
        Self {
            dims,
            forward: dims.map(|n| FftPlan::new(n, FftDirection::Forward)),
            backward: dims.map(|n| FftPlan::new(n, FftDirection::Backward)),
        }
    }

    pub const fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub const fn len(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unnormalized forward transform.
    pub fn forward(&self, data: &mut [Complex64]) {
        self.apply(data, &self.forward);
    }

    /// Unnormalized backward transform.
    pub fn backward(&self, data: &mut [Complex64]) {
        self.apply(data, &self.backward);
    }

    /// Inverse transform normalized by `1 / (n1 * n2 * n3)`, so that
    /// `inverse(forward(x)) == x`.
    pub fn inverse(&self, data: &mut [Complex64]) {
        self.backward(data);
        let scale = 1.0 / self.len() as f64;
        data.iter_mut().for_each(|value| *value *= scale);
    }

    fn apply(&self, data: &mut [Complex64], plans: &[FftPlan; 3]) {
        assert_eq!(
            data.len(),
            self.len(),
            "3D transform buffer does not match grid"
        );
        if data.is_empty() {
            return;
        }
        let [n1, n2, _] = self.dims;
        let plane_len = n1 * n2;

        let transform_plane = |plane: &mut [Complex64]| {
            for line in plane.chunks_mut(n1) {
                plans[0].process(line);
            }
            let mut column = vec![Complex64::new(0.0, 0.0); n2];
            for i in 0..n1 {
                for (j, slot) in column.iter_mut().enumerate() {
                    *slot = plane[i + n1 * j];
                }
                plans[1].process(&mut column);
                for (j, value) in column.iter().enumerate() {
                    plane[i + n1 * j] = *value;
                }
            }
        };
        if use_parallel_for_len(data.len()) {
            data.par_chunks_mut(plane_len).for_each(transform_plane);
        } else {
            data.chunks_mut(plane_len).for_each(transform_plane);
        }

        self.apply_third_axis(data, &plans[2]);
    }

    fn apply_third_axis(&self, data: &mut [Complex64], plan: &FftPlan) {
        let [n1, n2, n3] = self.dims;
        let plane_len = n1 * n2;
        let gather = |offset: usize| {
            let mut line: Vec<Complex64> = (0..n3).map(|k| data[offset + plane_len * k]).collect();
            plan.process(&mut line);
            line
        };

        let lines: Vec<Vec<Complex64>> = if use_parallel_for_len(data.len()) {
            (0..plane_len).into_par_iter().map(gather).collect()
        } else {
            (0..plane_len).map(gather).collect()
        };

        for (offset, line) in lines.into_iter().enumerate() {
            for (k, value) in line.into_iter().enumerate() {
                data[offset + plane_len * k] = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Fft3d, FftDirection, FftPlan, prime_factors};
    use num_complex::Complex64;
    use std::f64::consts::PI;

    fn naive_dft(input: &[Complex64], sign: f64) -> Vec<Complex64> {
        let n = input.len();
        (0..n)
            .map(|k| {
                input
                    .iter()
                    .enumerate()
                    .map(|(j, value)| {
                        let angle = sign * 2.0 * PI * (j * k) as f64 / n as f64;
                        value * Complex64::new(angle.cos(), angle.sin())
                    })
                    .sum::<Complex64>()
            })
            .collect()
    }

    fn sample(len: usize) -> Vec<Complex64> {
        (0..len)
            .map(|i| {
                let x = i as f64;
                Complex64::new((x * 0.37).sin() + 0.1 * x, (x * 1.3).cos())
            })
            .collect()
    }

    fn assert_close(actual: &[Complex64], expected: &[Complex64], tolerance: f64) {
        assert_eq!(actual.len(), expected.len());
        for (index, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!(
                (a - e).norm() <= tolerance,
                "index {index}: actual {a}, expected {e}"
            );
        }
    }

    #[test]
    fn factorization_is_smallest_first() {
        assert_eq!(prime_factors(1), Vec::<usize>::new());
        assert_eq!(prime_factors(12), vec![2, 2, 3]);
        assert_eq!(prime_factors(45), vec![3, 3, 5]);
        assert_eq!(prime_factors(97), vec![97]);

        let plan = FftPlan::new(60, FftDirection::Backward);
        assert_eq!(plan.factors(), &[2, 2, 3, 5]);
        assert_eq!(plan.direction(), FftDirection::Backward);
    }

    #[test]
    fn mixed_radix_matches_direct_dft() {
        for len in [1, 2, 3, 5, 8, 12, 15, 18, 27, 45, 49, 60, 97] {
            let input = sample(len);
            for direction in [FftDirection::Forward, FftDirection::Backward] {
                let plan = FftPlan::new(len, direction);
                let mut buffer = input.clone();
                plan.process(&mut buffer);
                let sign = if plan.direction() == FftDirection::Forward { -1.0 } else { 1.0 };
                assert_close(&buffer, &naive_dft(&input, sign), 1.0e-9 * len as f64);
            }
        }
    }

    #[test]
    fn three_dimensional_transform_matches_direct_sum() {
        let (n1, n2, n3) = (3, 4, 5);
        let fft = Fft3d::new(n1, n2, n3);
        let input = sample(n1 * n2 * n3);
        let mut data = input.clone();
        fft.backward(&mut data);

        for k3 in 0..n3 {
            for k2 in 0..n2 {
                for k1 in 0..n1 {
                    let mut expected = Complex64::new(0.0, 0.0);
                    for z in 0..n3 {
                        for y in 0..n2 {
                            for x in 0..n1 {
                                let phase = 2.0
                                    * PI
                                    * ((x * k1) as f64 / n1 as f64
                                        + (y * k2) as f64 / n2 as f64
                                        + (z * k3) as f64 / n3 as f64);
                                expected += input[x + n1 * (y + n2 * z)]
                                    * Complex64::new(phase.cos(), phase.sin());
                            }
                        }
                    }
                    let actual = data[k1 + n1 * (k2 + n2 * k3)];
                    assert!((actual - expected).norm() < 1.0e-9);
                }
            }
        }
    }

    #[test]
    fn inverse_undoes_forward() {
        let fft = Fft3d::new(4, 6, 3);
        let input = sample(fft.len());
        let mut data = input.clone();
        fft.forward(&mut data);
        fft.inverse(&mut data);
        assert_close(&data, &input, 1.0e-12);
    }

    #[test]
    fn large_grids_are_deterministic_across_calls() {
        let fft = Fft3d::new(24, 24, 20);
        let input = sample(fft.len());
        let mut first = input.clone();
        let mut second = input;
        fft.backward(&mut first);
        fft.backward(&mut second);
        assert_eq!(first, second);
    }
}
