pub mod errors;

pub use errors::{PostError, PostErrorCategory, PostResult};

use crate::numerics::stable_sum;
use num_complex::Complex64;
use std::fmt::{Display, Formatter};

/// Real-space grid dimensions `(nr1, nr2, nr3)`.
///
/// Dense data on this grid is stored with the first axis varying fastest:
/// `index = x + nr1 * (y + nr2 * z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    nr1: usize,
    nr2: usize,
    nr3: usize,
    len: usize,
}

/// Largest number of grid points whose complex work buffer is addressable.
pub const MAX_GRID_POINTS: usize = isize::MAX as usize / std::mem::size_of::<Complex64>();

impl GridShape {
    pub fn new(nr1: usize, nr2: usize, nr3: usize) -> PostResult<Self> {
        if nr1 == 0 || nr2 == 0 || nr3 == 0 {
            return Err(PostError::format(
                "FORMAT.GRID_SHAPE",
                format!("grid dimensions must be positive, got ({nr1}, {nr2}, {nr3})"),
            ));
        }
        let len = nr1
            .checked_mul(nr2)
            .and_then(|plane| plane.checked_mul(nr3))
            .filter(|len| *len <= MAX_GRID_POINTS)
            .ok_or_else(|| {
                PostError::format(
                    "FORMAT.GRID_SHAPE",
                    format!("grid ({nr1}, {nr2}, {nr3}) has too many points"),
                )
            })?;
        Ok(Self { nr1, nr2, nr3, len })
    }

    pub fn from_dims(dims: [usize; 3]) -> PostResult<Self> {
        Self::new(dims[0], dims[1], dims[2])
    }

    pub const fn dims(&self) -> [usize; 3] {
        [self.nr1, self.nr2, self.nr3]
    }

    pub const fn nr1(&self) -> usize {
        self.nr1
    }

    pub const fn nr2(&self) -> usize {
        self.nr2
    }

    pub const fn nr3(&self) -> usize {
        self.nr3
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn linear_index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.nr1 * (y + self.nr2 * z)
    }

    /// Inverse of [`GridShape::linear_index`].
    pub const fn coordinates(&self, index: usize) -> [usize; 3] {
        let x = index % self.nr1;
        let y = (index / self.nr1) % self.nr2;
        let z = index / (self.nr1 * self.nr2);
        [x, y, z]
    }

    /// Maps a Miller index onto the grid, wrapping negative components the
    /// way reciprocal-space grids store them (`-1` is the last plane).
    pub fn wrap_miller(&self, miller: MillerIndex) -> Option<usize> {
        let x = wrap_component(miller.h, self.nr1)?;
        let y = wrap_component(miller.k, self.nr2)?;
        let z = wrap_component(miller.l, self.nr3)?;
        Some(self.linear_index(x, y, z))
    }
}

impl Display for GridShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.nr1, self.nr2, self.nr3)
    }
}

fn wrap_component(value: i32, length: usize) -> Option<usize> {
    let length = i64::try_from(length).ok()?;
    let value = i64::from(value);
    let wrapped = if value < 0 { value + length } else { value };
    if (0..length).contains(&wrapped) {
        usize::try_from(wrapped).ok()
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MillerIndex {
    pub h: i32,
    pub k: i32,
    pub l: i32,
}

impl MillerIndex {
    pub const fn new(h: i32, k: i32, l: i32) -> Self {
        Self { h, k, l }
    }
}

impl From<[i32; 3]> for MillerIndex {
    fn from(value: [i32; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

impl Display for MillerIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.h, self.k, self.l)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseCoefficient {
    pub index: MillerIndex,
    pub coefficient: Complex64,
}

impl SparseCoefficient {
    pub const fn new(index: MillerIndex, coefficient: Complex64) -> Self {
        Self { index, coefficient }
    }
}

/// Real scalar field sampled on a [`GridShape`].
#[derive(Debug, Clone, PartialEq)]
pub struct DenseField {
    shape: GridShape,
    values: Vec<f64>,
}

impl DenseField {
    pub fn zeros(shape: GridShape) -> Self {
        Self {
            shape,
            values: vec![0.0; shape.len()],
        }
    }

    pub fn from_values(shape: GridShape, values: Vec<f64>) -> PostResult<Self> {
        if values.len() != shape.len() {
            return Err(PostError::format(
                "FORMAT.FIELD_LENGTH",
                format!(
                    "grid {} holds {} values, got {}",
                    shape,
                    shape.len(),
                    values.len()
                ),
            ));
        }
        Ok(Self { shape, values })
    }

    pub fn from_fn(shape: GridShape, mut f: impl FnMut(usize, usize, usize) -> f64) -> Self {
        let values = (0..shape.len())
            .map(|index| {
                let [x, y, z] = shape.coordinates(index);
                f(x, y, z)
            })
            .collect();
        Self { shape, values }
    }

    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Values with the first axis varying fastest.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<f64> {
        let [nr1, nr2, nr3] = self.shape.dims();
        if x >= nr1 || y >= nr2 || z >= nr3 {
            return None;
        }
        Some(self.values[self.shape.linear_index(x, y, z)])
    }

    pub fn sum(&self) -> f64 {
        stable_sum(&self.values)
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|value| *value == 0.0)
    }

    fn combine(&self, other: &DenseField, f: impl Fn(f64, f64) -> f64) -> DenseField {
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| f(*a, *b))
            .collect();
        DenseField {
            shape: self.shape,
            values,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpinComponent {
    #[default]
    Total,
    Up,
    Down,
}

impl SpinComponent {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "total" | "0" => Some(Self::Total),
            "up" | "1" => Some(Self::Up),
            "down" | "2" => Some(Self::Down),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Total charge and spin-difference fields of one dataset.
///
/// `spin_difference` is all zeros when the source carried no difference
/// dataset; `is_magnetic` records which case applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeDensity {
    pub total: DenseField,
    pub spin_difference: DenseField,
    magnetic: bool,
}

impl ChargeDensity {
    pub fn new(total: DenseField, spin_difference: Option<DenseField>) -> PostResult<Self> {
        match spin_difference {
            Some(difference) => {
                if difference.shape() != total.shape() {
                    return Err(PostError::format(
                        "FORMAT.CHARGE_SHAPE",
                        format!(
                            "spin difference grid {} does not match total grid {}",
                            difference.shape(),
                            total.shape()
                        ),
                    ));
                }
                Ok(Self {
                    total,
                    spin_difference: difference,
                    magnetic: true,
                })
            }
            None => {
                let spin_difference = DenseField::zeros(total.shape());
                Ok(Self {
                    total,
                    spin_difference,
                    magnetic: false,
                })
            }
        }
    }

    pub const fn shape(&self) -> GridShape {
        self.total.shape()
    }

    pub const fn is_magnetic(&self) -> bool {
        self.magnetic
    }

    pub fn component(&self, component: SpinComponent) -> DenseField {
        match component {
            SpinComponent::Total => self.total.clone(),
            SpinComponent::Up => self
                .total
                .combine(&self.spin_difference, |total, diff| 0.5 * (total + diff)),
            SpinComponent::Down => self
                .total
                .combine(&self.spin_difference, |total, diff| 0.5 * (total - diff)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChargeDensity, DenseField, GridShape, MillerIndex, SpinComponent};

    #[test]
    fn grid_shape_rejects_zero_dimensions() {
        let error = GridShape::new(4, 0, 2).expect_err("zero axis should fail");
        assert!(error.is_format());
        assert_eq!(error.placeholder(), "FORMAT.GRID_SHAPE");
    }

    #[test]
    fn grid_shape_rejects_point_counts_that_overflow() {
        let error = GridShape::new(1 << 32, 1 << 32, 2).expect_err("product overflows usize");
        assert_eq!(error.placeholder(), "FORMAT.GRID_SHAPE");

        let error = GridShape::new(usize::MAX, 1, 1).expect_err("buffer is not addressable");
        assert_eq!(error.placeholder(), "FORMAT.GRID_SHAPE");
    }

    #[test]
    fn linear_index_runs_first_axis_fastest() {
        let shape = GridShape::new(2, 3, 4).expect("shape");
        assert_eq!(shape.linear_index(1, 0, 0), 1);
        assert_eq!(shape.linear_index(0, 1, 0), 2);
        assert_eq!(shape.linear_index(0, 0, 1), 6);
        assert_eq!(shape.coordinates(23), [1, 2, 3]);
        assert_eq!(shape.len(), 24);
    }

    #[test]
    fn miller_indices_wrap_negative_components() {
        let shape = GridShape::new(4, 5, 6).expect("shape");
        assert_eq!(
            shape.wrap_miller(MillerIndex::new(-1, 0, 0)),
            Some(shape.linear_index(3, 0, 0))
        );
        assert_eq!(
            shape.wrap_miller(MillerIndex::new(2, -5, -6)),
            Some(shape.linear_index(2, 0, 0))
        );
        assert_eq!(shape.wrap_miller(MillerIndex::new(4, 0, 0)), None);
        assert_eq!(shape.wrap_miller(MillerIndex::new(0, -6, 0)), None);
    }

    #[test]
    fn dense_field_rejects_wrong_value_count() {
        let shape = GridShape::new(2, 2, 2).expect("shape");
        let error = DenseField::from_values(shape, vec![0.0; 7]).expect_err("length mismatch");
        assert_eq!(error.placeholder(), "FORMAT.FIELD_LENGTH");
    }

    #[test]
    fn missing_spin_difference_defaults_to_zero_field() {
        let shape = GridShape::new(2, 1, 1).expect("shape");
        let total = DenseField::from_values(shape, vec![1.0, 3.0]).expect("field");
        let charge = ChargeDensity::new(total.clone(), None).expect("charge");

        assert!(!charge.is_magnetic());
        assert!(charge.spin_difference.is_zero());
        assert_eq!(charge.spin_difference.shape(), shape);
        assert_eq!(charge.component(SpinComponent::Total), total);
    }

    #[test]
    fn spin_components_split_total_and_difference() {
        let shape = GridShape::new(2, 1, 1).expect("shape");
        let total = DenseField::from_values(shape, vec![4.0, 2.0]).expect("field");
        let diff = DenseField::from_values(shape, vec![2.0, -2.0]).expect("field");
        let charge = ChargeDensity::new(total, Some(diff)).expect("charge");

        assert!(charge.is_magnetic());
        assert_eq!(charge.component(SpinComponent::Up).values(), &[3.0, 0.0]);
        assert_eq!(charge.component(SpinComponent::Down).values(), &[1.0, 2.0]);
    }

    #[test]
    fn spin_component_names_parse() {
        assert_eq!(SpinComponent::from_name("UP"), Some(SpinComponent::Up));
        assert_eq!(SpinComponent::from_name("2"), Some(SpinComponent::Down));
        assert_eq!(SpinComponent::from_name("sideways"), None);
    }
}
