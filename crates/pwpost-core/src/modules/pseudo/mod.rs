//! Pseudopotential (UPF) reading: a small markup parser producing a
//! [`PseudoNode`] tree, and the mapping of that tree onto
//! [`PseudoPotential`].

mod model;
mod tags;

pub use model::{
    Attributes, PpArray, PpAugmentation, PpHeader, PpInfo, PpMesh, PpNonlocal, PseudoPotential,
    UpfVersion, extract_pseudopotential,
};
pub use tags::{
    DOCUMENT_ROOT_TAG, PseudoNode, TagParseError, escape_input_ampersand, parse_tag_tree,
    tag_line,
};

use crate::domain::{PostError, PostResult};
use crate::modules::serialization::read_text_artifact;
use std::path::Path;
use tracing::{debug, info};

impl From<TagParseError> for PostError {
    fn from(error: TagParseError) -> Self {
        PostError::format("FORMAT.PSEUDO_TAGS", error.to_string())
    }
}

pub fn parse_pseudo_source(source: &str) -> PostResult<PseudoPotential> {
    let version = UpfVersion::detect(source);
    let escaped = escape_input_ampersand(source);
    let root = parse_tag_tree(&escaped)?;
    debug!(
        version = version.as_str(),
        root = %root.tag,
        sections = root.children.len(),
        "parsed pseudopotential tag tree"
    );
    extract_pseudopotential(&root, version)
}

pub fn read_pseudo_file(path: &Path) -> PostResult<PseudoPotential> {
    let source = read_text_artifact(path, "IO.PSEUDO_READ")?;
    let pseudo = parse_pseudo_source(&source)?;
    info!(
        path = %path.display(),
        version = pseudo.version.as_str(),
        mesh = pseudo.mesh_len(),
        betas = pseudo.beta_count(),
        "read pseudopotential"
    );
    Ok(pseudo)
}
