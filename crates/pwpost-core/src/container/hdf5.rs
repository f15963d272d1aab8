use super::{FieldContainer, display_path};
use crate::domain::{PostError, PostResult};
use hdf5::{File, H5Type, Location};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read-only view of an HDF5 file.
pub struct Hdf5Container {
    file: File,
    path: PathBuf,
}

impl Hdf5Container {
    pub fn open(path: &Path) -> PostResult<Self> {
        let file = File::open(path).map_err(|source| {
            PostError::io(
                "IO.HDF5_OPEN",
                format!("failed to open HDF5 file '{}': {}", path.display(), source),
            )
        })?;
        debug!(path = %path.display(), "opened HDF5 container");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    fn read_error(&self, path: &str, source: hdf5::Error) -> PostError {
        PostError::io(
            "IO.HDF5_READ",
            format!(
                "failed to read '{}' from '{}': {}",
                display_path(path),
                self.path.display(),
                source
            ),
        )
    }

    fn location(&self, path: &str) -> Option<Location> {
        if path.is_empty() {
            return Some((**self.file).clone());
        }
        if !self.file.link_exists(path) {
            return None;
        }
        if let Ok(group) = self.file.group(path) {
            return Some((*group).clone());
        }
        self.file
            .dataset(path)
            .ok()
            .map(|dataset| (**dataset).clone())
    }

    fn attribute<T: H5Type>(&self, path: &str, name: &str) -> PostResult<Option<T>> {
        let Some(location) = self.location(path) else {
            return Ok(None);
        };
        let names = location
            .attr_names()
            .map_err(|source| self.read_error(path, source))?;
        if !names.iter().any(|candidate| candidate == name) {
            return Ok(None);
        }
        let attribute = location
            .attr(name)
            .map_err(|source| self.read_error(path, source))?;
        attribute
            .read_scalar::<T>()
            .map(Some)
            .map_err(|source| self.read_error(path, source))
    }

    fn dataset<T: H5Type>(&self, path: &str) -> PostResult<Option<Vec<T>>> {
        if !self.file.link_exists(path) {
            return Ok(None);
        }
        let dataset = self
            .file
            .dataset(path)
            .map_err(|source| self.read_error(path, source))?;
        dataset
            .read_raw::<T>()
            .map(Some)
            .map_err(|source| self.read_error(path, source))
    }
}

impl FieldContainer for Hdf5Container {
    fn describe(&self) -> String {
        format!("HDF5 file '{}'", self.path.display())
    }

    fn contains(&self, path: &str) -> bool {
        path.is_empty() || self.file.link_exists(path)
    }

    fn attribute_i64(&self, path: &str, name: &str) -> PostResult<Option<i64>> {
        self.attribute::<i64>(path, name)
    }

    fn attribute_f64(&self, path: &str, name: &str) -> PostResult<Option<f64>> {
        self.attribute::<f64>(path, name)
    }

    fn dataset_i32(&self, path: &str) -> PostResult<Option<Vec<i32>>> {
        self.dataset::<i32>(path)
    }

    fn dataset_f64(&self, path: &str) -> PostResult<Option<Vec<f64>>> {
        self.dataset::<f64>(path)
    }
}
