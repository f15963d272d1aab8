use crate::domain::{DenseField, GridShape};

#[derive(Debug, Clone, PartialEq)]
pub struct AtomicPosition {
    pub species: String,
    pub coords: [f64; 3],
}

impl AtomicPosition {
    pub fn new(species: impl Into<String>, coords: [f64; 3]) -> Self {
        Self {
            species: species.into(),
            coords,
        }
    }
}

/// Descriptive header of a field dump. Atom and species counts are the
/// lengths of `positions` and `species`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub prefix: String,
    pub grid: [usize; 3],
    pub smooth_grid: [usize; 3],
    pub ibrav: i32,
    pub celldm: [f64; 6],
    pub species: Vec<String>,
    pub positions: Vec<AtomicPosition>,
}

impl FileHeader {
    /// Header for a field on `shape` with no cell or atom information.
    pub fn new(prefix: impl Into<String>, shape: GridShape) -> Self {
        Self {
            prefix: prefix.into(),
            grid: shape.dims(),
            smooth_grid: shape.dims(),
            ibrav: 0,
            celldm: [0.0; 6],
            species: Vec::new(),
            positions: Vec::new(),
        }
    }

    pub fn nat(&self) -> usize {
        self.positions.len()
    }

    pub fn ntyp(&self) -> usize {
        self.species.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDump {
    pub header: FileHeader,
    pub field: DenseField,
}
