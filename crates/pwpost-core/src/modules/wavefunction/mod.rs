//! Plane-wave coefficients per k-point from a wavefunction container.

use crate::container::{FieldContainer, join_path, require_non_negative};
use crate::domain::{PostError, PostResult};
use crate::modules::charge::decode_complex_pairs;
use num_complex::Complex64;
use tracing::{debug, info};

pub const KPOINT_GROUP_PREFIX: &str = "KPOINT";
pub const BAND_DATASET_PREFIX: &str = "BAND";

#[derive(Debug, Clone, PartialEq)]
pub struct KPointWavefunctions {
    pub label: String,
    pub gamma_only: bool,
    pub igwx: usize,
    pub ik: i64,
    pub ispin: i64,
    pub ngw: usize,
    pub nk: usize,
    pub nbnd: usize,
    pub nspin: usize,
    pub scale_factor: f64,
    /// `bands[i]` holds the coefficients of dataset `BAND{i+1}`.
    pub bands: Vec<Vec<Complex64>>,
}

/// Reads `KPOINT1`, `KPOINT2`, ... until the first absent group.
pub fn read_wavefunctions(container: &dyn FieldContainer) -> PostResult<Vec<KPointWavefunctions>> {
    let mut kpoints = Vec::new();
    loop {
        let label = format!("{KPOINT_GROUP_PREFIX}{}", kpoints.len() + 1);
        if !container.contains(&label) {
            break;
        }
        kpoints.push(read_kpoint(container, &label)?);
    }

    if kpoints.is_empty() {
        return Err(PostError::missing_data(
            "MISSING.WFC_KPOINT",
            format!("{} has no '{}1' group", container.describe(), KPOINT_GROUP_PREFIX),
        ));
    }
    info!(
        source = %container.describe(),
        kpoints = kpoints.len(),
        "read wavefunctions"
    );
    Ok(kpoints)
}

fn read_kpoint(container: &dyn FieldContainer, label: &str) -> PostResult<KPointWavefunctions> {
    let integer = |name: &str| -> PostResult<i64> {
        container
            .attribute_i64(label, name)?
            .ok_or_else(|| missing_attribute(container, label, name))
    };
    let count = |name: &str| -> PostResult<usize> {
        require_non_negative(container, label, name, integer(name)?)
    };

    let nbnd = count("nbnd")?;
    let scale_factor = container
        .attribute_f64(label, "scale_factor")?
        .ok_or_else(|| missing_attribute(container, label, "scale_factor"))?;

    let bands = (1..=nbnd)
        .map(|band| {
            let path = join_path(label, &format!("{BAND_DATASET_PREFIX}{band}"));
            let raw = container.dataset_f64(&path)?.ok_or_else(|| {
                PostError::missing_data(
                    "MISSING.WFC_BAND",
                    format!("{} has no dataset '{}'", container.describe(), path),
                )
            })?;
            decode_complex_pairs(&raw)
        })
        .collect::<PostResult<Vec<_>>>()?;

    let kpoint = KPointWavefunctions {
        label: label.to_string(),
        gamma_only: integer("gamma_only")? != 0,
        igwx: count("igwx")?,
        ik: integer("ik")?,
        ispin: integer("ispin")?,
        ngw: count("ngw")?,
        nk: count("nk")?,
        nbnd,
        nspin: count("nspin")?,
        scale_factor,
        bands,
    };
    debug!(kpoint = label, bands = kpoint.nbnd, igwx = kpoint.igwx, "read k-point");
    Ok(kpoint)
}

fn missing_attribute(container: &dyn FieldContainer, label: &str, name: &str) -> PostError {
    PostError::missing_data(
        "MISSING.WFC_ATTRIBUTE",
        format!(
            "group '{}' in {} has no '{}' attribute",
            label,
            container.describe(),
            name
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::read_wavefunctions;
    use crate::container::MemoryContainer;
    use num_complex::Complex64;

    fn kpoint(container: MemoryContainer, label: &str, ik: i64) -> MemoryContainer {
        let mut container = container;
        for (name, value) in [
            ("gamma_only", 0_i64),
            ("igwx", 2),
            ("ik", ik),
            ("ispin", 1),
            ("ngw", 2),
            ("nk", 2),
            ("nbnd", 2),
            ("nspin", 1),
        ] {
            container.set_attribute(label, name, value);
        }
        container
            .with_attribute(label, "scale_factor", 1.0)
            .with_dataset_f64(&format!("{label}/BAND1"), vec![1.0, 0.0, 0.0, 1.0])
            .with_dataset_f64(&format!("{label}/BAND2"), vec![0.5, -0.5, 0.25, 0.0])
    }

    #[test]
    fn kpoints_are_read_until_the_first_gap() {
        let container = kpoint(kpoint(MemoryContainer::new("wfc"), "KPOINT1", 1), "KPOINT2", 2);
        let kpoints = read_wavefunctions(&container).expect("wavefunctions");

        assert_eq!(kpoints.len(), 2);
        assert_eq!(kpoints[1].label, "KPOINT2");
        assert_eq!(kpoints[1].ik, 2);
        assert!(!kpoints[0].gamma_only);
        assert_eq!(
            kpoints[0].bands[1],
            vec![Complex64::new(0.5, -0.5), Complex64::new(0.25, 0.0)]
        );
    }

    #[test]
    fn missing_attribute_is_missing_data() {
        let container = MemoryContainer::new("wfc")
            .with_attribute("KPOINT1", "nbnd", 0_i64)
            .with_attribute("KPOINT1", "scale_factor", 1.0);
        let error = read_wavefunctions(&container).expect_err("gamma_only missing");
        assert!(error.is_missing_data());
        assert_eq!(error.placeholder(), "MISSING.WFC_ATTRIBUTE");
    }

    #[test]
    fn missing_band_dataset_is_missing_data() {
        let container = kpoint(MemoryContainer::new("wfc"), "KPOINT1", 1).with_attribute(
            "KPOINT1",
            "nbnd",
            3_i64,
        );
        let error = read_wavefunctions(&container).expect_err("BAND3 missing");
        assert_eq!(error.placeholder(), "MISSING.WFC_BAND");
    }

    #[test]
    fn empty_container_has_no_kpoints() {
        let error = read_wavefunctions(&MemoryContainer::new("wfc")).expect_err("empty");
        assert_eq!(error.placeholder(), "MISSING.WFC_KPOINT");
    }
}
