//! JSON description of the calculation a field belongs to: grid sizes,
//! cell and atoms. Feeds both the reconstruction grid and the dump header.

use crate::domain::{GridShape, PostError, PostResult};
use crate::modules::dump::{AtomicPosition, FileHeader};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldMetadata {
    pub prefix: String,
    pub grid: [usize; 3],
    /// Defaults to `grid` when absent.
    #[serde(rename = "smoothGrid", default, skip_serializing_if = "Option::is_none")]
    pub smooth_grid: Option<[usize; 3]>,
    #[serde(default)]
    pub ibrav: i32,
    #[serde(default)]
    pub celldm: [f64; 6],
    #[serde(default)]
    pub species: Vec<String>,
    #[serde(default)]
    pub positions: Vec<MetadataPosition>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetadataPosition {
    pub name: String,
    pub coords: [f64; 3],
}

impl FieldMetadata {
    pub fn grid_shape(&self) -> PostResult<GridShape> {
        GridShape::from_dims(self.grid)
    }

    pub fn file_header(&self) -> PostResult<FileHeader> {
        let shape = self.grid_shape()?;
        Ok(FileHeader {
            prefix: self.prefix.clone(),
            grid: shape.dims(),
            smooth_grid: self.smooth_grid.unwrap_or(self.grid),
            ibrav: self.ibrav,
            celldm: self.celldm,
            species: self.species.clone(),
            positions: self
                .positions
                .iter()
                .map(|position| AtomicPosition::new(position.name.clone(), position.coords))
                .collect(),
        })
    }

    fn validate(&self) -> Result<(), String> {
        if self.grid.contains(&0) {
            return Err(format!("grid {:?} has a zero dimension", self.grid));
        }
        if let Some(smooth) = self.smooth_grid
            && smooth.contains(&0)
        {
            return Err(format!("smoothGrid {smooth:?} has a zero dimension"));
        }
        if !self.species.is_empty()
            && let Some(position) = self
                .positions
                .iter()
                .find(|position| !self.species.contains(&position.name))
        {
            return Err(format!(
                "position species '{}' is not listed in species",
                position.name
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("failed to read field metadata '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse field metadata '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid field metadata '{}': {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

impl From<MetadataError> for PostError {
    fn from(error: MetadataError) -> Self {
        match &error {
            MetadataError::Read { .. } => PostError::io("IO.METADATA_READ", error.to_string()),
            MetadataError::Parse { .. } => {
                PostError::format("FORMAT.METADATA_PARSE", error.to_string())
            }
            MetadataError::Invalid { .. } => {
                PostError::format("FORMAT.METADATA_INVALID", error.to_string())
            }
        }
    }
}

pub fn load_field_metadata(path: impl AsRef<Path>) -> Result<FieldMetadata, MetadataError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| MetadataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let metadata: FieldMetadata =
        serde_json::from_str(&source).map_err(|source| MetadataError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    metadata
        .validate()
        .map_err(|message| MetadataError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
    debug!(
        path = %path.display(),
        prefix = %metadata.prefix,
        grid = ?metadata.grid,
        "loaded field metadata"
    );
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::{MetadataError, load_field_metadata};
    use crate::domain::PostError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn metadata_builds_the_dump_header() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("si.json");
        fs::write(
            &path,
            r#"{
                "prefix": "si",
                "grid": [4, 4, 6],
                "ibrav": 2,
                "celldm": [10.2, 0, 0, 0, 0, 0],
                "species": ["Si"],
                "positions": [
                    {"name": "Si", "coords": [0, 0, 0]},
                    {"name": "Si", "coords": [0.25, 0.25, 0.25]}
                ]
            }"#,
        )
        .expect("write metadata");

        let metadata = load_field_metadata(&path).expect("metadata should load");
        let header = metadata.file_header().expect("header");
        assert_eq!(header.grid, [4, 4, 6]);
        assert_eq!(header.smooth_grid, [4, 4, 6]);
        assert_eq!(header.nat(), 2);
        assert_eq!(header.ntyp(), 1);
        assert_eq!(header.positions[1].coords, [0.25, 0.25, 0.25]);
    }

    #[test]
    fn failures_map_onto_error_categories() {
        let temp = TempDir::new().expect("tempdir should be created");

        let missing = load_field_metadata(temp.path().join("absent.json")).expect_err("absent");
        assert!(matches!(missing, MetadataError::Read { .. }));
        assert_eq!(PostError::from(missing).exit_code(), 4);

        let broken = temp.path().join("broken.json");
        fs::write(&broken, "{ \"prefix\": ").expect("write");
        let parse = load_field_metadata(&broken).expect_err("broken json");
        assert_eq!(PostError::from(parse).placeholder(), "FORMAT.METADATA_PARSE");

        let zero = temp.path().join("zero.json");
        fs::write(&zero, r#"{"prefix": "x", "grid": [0, 2, 2]}"#).expect("write");
        let invalid = load_field_metadata(&zero).expect_err("zero grid");
        assert!(matches!(invalid, MetadataError::Invalid { .. }));

        let stray = temp.path().join("stray.json");
        fs::write(
            &stray,
            r#"{"prefix": "x", "grid": [2, 2, 2], "species": ["O"], "positions": [{"name": "H", "coords": [0, 0, 0]}]}"#,
        )
        .expect("write");
        assert!(matches!(
            load_field_metadata(&stray),
            Err(MetadataError::Invalid { .. })
        ));
    }
}
