use super::reconstruct::{DuplicateMillerPolicy, reconstruct_with_policy};
use crate::container::{FieldContainer, require_non_negative};
use crate::domain::{ChargeDensity, GridShape, MillerIndex, PostError, PostResult};
use num_complex::Complex64;
use tracing::{debug, info};

pub const NGM_ATTRIBUTE: &str = "ngm_g";
pub const MILLER_DATASET: &str = "MillerIndices";
pub const TOTAL_DATASET: &str = "rhotot_g";
pub const DIFFERENCE_DATASET: &str = "rhodiff_g";

pub fn read_charge_density(
    container: &dyn FieldContainer,
    shape: GridShape,
) -> PostResult<ChargeDensity> {
    read_charge_density_with_policy(container, shape, DuplicateMillerPolicy::Reject)
}

/// Reads the total charge and, when present, the spin-difference charge
/// from a container and rebuilds both on `shape`.
///
/// An absent difference dataset is not an error: the result carries an
/// all-zero difference field and reports `is_magnetic() == false`.
pub fn read_charge_density_with_policy(
    container: &dyn FieldContainer,
    shape: GridShape,
    policy: DuplicateMillerPolicy,
) -> PostResult<ChargeDensity> {
    let ngm = container
        .attribute_i64("", NGM_ATTRIBUTE)?
        .ok_or_else(|| {
            PostError::missing_data(
                "MISSING.CHARGE_NGM_G",
                format!(
                    "{} has no '{}' attribute",
                    container.describe(),
                    NGM_ATTRIBUTE
                ),
            )
        })?;
    let ngm = require_non_negative(container, "", NGM_ATTRIBUTE, ngm)?;
    debug!(ngm, grid = %shape, source = %container.describe(), "reading charge density");

    let miller = read_miller_indices(container, ngm)?;

    let total = container.dataset_f64(TOTAL_DATASET)?.ok_or_else(|| {
        PostError::missing_data(
            "MISSING.CHARGE_TOTAL",
            format!(
                "{} has no '{}' dataset",
                container.describe(),
                TOTAL_DATASET
            ),
        )
    })?;
    let total = decode_counted_pairs(&total, ngm, TOTAL_DATASET)?;
    let total = reconstruct_with_policy(&miller, &total, shape, policy)?;

    let difference = match container.dataset_f64(DIFFERENCE_DATASET)? {
        Some(raw) => {
            let coefficients = decode_counted_pairs(&raw, ngm, DIFFERENCE_DATASET)?;
            Some(reconstruct_with_policy(
                &miller,
                &coefficients,
                shape,
                policy,
            )?)
        }
        None => {
            debug!(
                dataset = DIFFERENCE_DATASET,
                "spin difference absent; using zero field"
            );
            None
        }
    };

    let charge = ChargeDensity::new(total, difference)?;
    info!(
        grid = %shape,
        magnetic = charge.is_magnetic(),
        total_charge_sum = charge.total.sum(),
        "charge density reconstructed"
    );
    Ok(charge)
}

/// Reinterprets a flat `[re0, im0, re1, im1, ...]` array as complex values.
pub fn decode_complex_pairs(raw: &[f64]) -> PostResult<Vec<Complex64>> {
    if raw.len() % 2 != 0 {
        return Err(PostError::format(
            "FORMAT.COMPLEX_PAIRS",
            format!("complex data needs an even number of reals, got {}", raw.len()),
        ));
    }
    Ok(raw
        .chunks_exact(2)
        .map(|pair| Complex64::new(pair[0], pair[1]))
        .collect())
}

fn decode_counted_pairs(raw: &[f64], count: usize, dataset: &str) -> PostResult<Vec<Complex64>> {
    if count.checked_mul(2) != Some(raw.len()) {
        return Err(PostError::format(
            "FORMAT.CHARGE_DATASET_LENGTH",
            format!(
                "dataset '{}' holds {} reals, expected two per coefficient for {} coefficients",
                dataset,
                raw.len(),
                count
            ),
        ));
    }
    decode_complex_pairs(raw)
}

fn read_miller_indices(
    container: &dyn FieldContainer,
    count: usize,
) -> PostResult<Vec<MillerIndex>> {
    let raw = container.dataset_i32(MILLER_DATASET)?.ok_or_else(|| {
        PostError::missing_data(
            "MISSING.CHARGE_MILLER",
            format!(
                "{} has no '{}' dataset",
                container.describe(),
                MILLER_DATASET
            ),
        )
    })?;
    if count.checked_mul(3) != Some(raw.len()) {
        return Err(PostError::format(
            "FORMAT.CHARGE_DATASET_LENGTH",
            format!(
                "dataset '{}' holds {} integers, expected three per index for {} triples",
                MILLER_DATASET,
                raw.len(),
                count
            ),
        ));
    }
    Ok(raw
        .chunks_exact(3)
        .map(|triple| MillerIndex::new(triple[0], triple[1], triple[2]))
        .collect())
}
