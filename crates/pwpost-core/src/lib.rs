//! Post-processing of plane-wave electronic-structure output: rebuilding
//! real-space fields from sparse reciprocal-space coefficients, reading
//! pseudopotentials, and the text formats fields and series are exchanged in.

pub mod config;
pub mod container;
pub mod domain;
pub mod modules;
pub mod numerics;

pub use config::{FieldMetadata, MetadataError, load_field_metadata};
pub use domain::{
    ChargeDensity, DenseField, GridShape, MillerIndex, PostError, PostErrorCategory, PostResult,
    SparseCoefficient, SpinComponent,
};
