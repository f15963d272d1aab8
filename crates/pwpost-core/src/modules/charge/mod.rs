mod parser;
mod reconstruct;

pub use parser::{
    DIFFERENCE_DATASET, MILLER_DATASET, NGM_ATTRIBUTE, TOTAL_DATASET, decode_complex_pairs,
    read_charge_density, read_charge_density_with_policy,
};
pub use reconstruct::{
    DuplicateMillerPolicy, IMAGINARY_RESIDUAL_WARN_RATIO, reconstruct, reconstruct_sparse,
    reconstruct_with_policy,
};
