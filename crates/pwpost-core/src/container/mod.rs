//! Read access to hierarchical binary containers (charge-density and
//! wavefunction files).
//!
//! Paths use `/` separators relative to the root; the empty path names the
//! root group itself. Absent attributes and datasets are reported as
//! `Ok(None)` so callers decide whether the absence is an error.

#[cfg(feature = "hdf5")]
mod hdf5;
mod memory;

#[cfg(feature = "hdf5")]
pub use self::hdf5::Hdf5Container;
pub use memory::{AttributeValue, MemoryContainer};

use crate::domain::{PostError, PostResult};
use std::path::Path;

pub trait FieldContainer {
    /// Human-readable origin used in diagnostics.
    fn describe(&self) -> String;

    fn contains(&self, path: &str) -> bool;

    fn attribute_i64(&self, path: &str, name: &str) -> PostResult<Option<i64>>;

    fn attribute_f64(&self, path: &str, name: &str) -> PostResult<Option<f64>>;

    fn dataset_i32(&self, path: &str) -> PostResult<Option<Vec<i32>>>;

    fn dataset_f64(&self, path: &str) -> PostResult<Option<Vec<f64>>>;
}

#[cfg(feature = "hdf5")]
pub fn open_hdf5_container(path: &Path) -> PostResult<Hdf5Container> {
    Hdf5Container::open(path)
}

#[cfg(not(feature = "hdf5"))]
pub fn open_hdf5_container(path: &Path) -> PostResult<MemoryContainer> {
    Err(PostError::io(
        "IO.HDF5_UNAVAILABLE",
        format!(
            "cannot open '{}': built without the `hdf5` feature",
            path.display()
        ),
    ))
}

pub(crate) fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}/{child}")
    }
}

pub(crate) fn require_non_negative(
    container: &dyn FieldContainer,
    path: &str,
    name: &str,
    value: i64,
) -> PostResult<usize> {
    usize::try_from(value).map_err(|_| {
        PostError::format(
            "FORMAT.CONTAINER_ATTRIBUTE",
            format!(
                "attribute '{}' at '{}' in {} must be non-negative, got {}",
                name,
                display_path(path),
                container.describe(),
                value
            ),
        )
    })
}

pub(crate) fn display_path(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}

#[cfg(test)]
mod tests {
    use super::{MemoryContainer, display_path, join_path};

    #[test]
    fn paths_join_relative_to_root() {
        assert_eq!(join_path("", "KPOINT1"), "KPOINT1");
        assert_eq!(join_path("KPOINT1", "BAND2"), "KPOINT1/BAND2");
        assert_eq!(display_path(""), "/");
    }

    #[test]
    fn negative_counts_are_format_errors() {
        let container = MemoryContainer::new("memory");
        let error = super::require_non_negative(&container, "", "ngm_g", -3)
            .expect_err("negative count should fail");
        assert!(error.is_format());
    }

    #[cfg(not(feature = "hdf5"))]
    #[test]
    fn hdf5_open_reports_missing_feature_as_io_error() {
        use super::open_hdf5_container;
        use std::path::Path;

        let error = open_hdf5_container(Path::new("charge-density.hdf5"))
            .expect_err("feature is disabled");
        assert_eq!(error.placeholder(), "IO.HDF5_UNAVAILABLE");
    }
}
