use super::tags::{PseudoNode, tag_line};
use crate::domain::{PostError, PostResult};
use crate::modules::serialization::parse_real;
use std::collections::BTreeMap;

pub type Attributes = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpfVersion {
    /// Bare sequence of `PP_*` sections.
    V1,
    /// Single `<UPF version="...">` root with attribute-based headers.
    V2,
}

impl UpfVersion {
    /// Looks at the first line that [`tag_line`] accepts.
    pub fn detect(source: &str) -> Self {
        match source.lines().find_map(tag_line) {
            Some(tag) if tag.starts_with("UPF") => Self::V2,
            _ => Self::V1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "UPF v1",
            Self::V2 => "UPF v2",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PpInfo {
    pub text: String,
    /// Generation input echoed inside `PP_INPUTFILE`; empty when absent.
    pub input_file: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PpHeader {
    pub attributes: Attributes,
    pub text: String,
}

impl PpHeader {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PpMesh {
    pub attributes: Attributes,
    pub r: Vec<f64>,
    pub rab: Vec<f64>,
}

/// A tagged numeric array together with its attributes (projectors and
/// augmentation functions).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PpArray {
    pub tag: String,
    pub attributes: Attributes,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PpAugmentation {
    pub attributes: Attributes,
    pub qijl: Vec<PpArray>,
    pub qij: Vec<PpArray>,
    pub q: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PpNonlocal {
    pub betas: Vec<PpArray>,
    pub dij: Option<Vec<f64>>,
    pub augmentation: Option<PpAugmentation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PseudoPotential {
    pub version: UpfVersion,
    pub info: PpInfo,
    pub header: PpHeader,
    pub mesh: PpMesh,
    pub local: Option<Vec<f64>>,
    pub rho_atom: Option<Vec<f64>>,
    pub nonlocal: Option<PpNonlocal>,
}

impl PseudoPotential {
    pub fn element(&self) -> Option<&str> {
        self.header.get("element").map(str::trim)
    }

    pub fn mesh_len(&self) -> usize {
        self.mesh.r.len()
    }

    pub fn beta_count(&self) -> usize {
        self.nonlocal.as_ref().map_or(0, |nonlocal| nonlocal.betas.len())
    }
}

/// Maps a parsed tag tree onto the known pseudopotential sections.
///
/// `PP_INFO`, `PP_HEADER`, `PP_MESH`, `PP_MESH/PP_R` and `PP_MESH/PP_RAB`
/// are required; the remaining sections resolve to `None` when absent.
pub fn extract_pseudopotential(
    root: &PseudoNode,
    version: UpfVersion,
) -> PostResult<PseudoPotential> {
    let info_node = required(root, "PP_INFO")?;
    let info = PpInfo {
        text: info_node.text().to_string(),
        input_file: info_node
            .child("PP_INPUTFILE")
            .map(|node| node.text().to_string())
            .unwrap_or_default(),
    };

    let header_node = required(root, "PP_HEADER")?;
    let header = PpHeader {
        attributes: header_node.attributes.clone(),
        text: header_node.text().to_string(),
    };

    let mesh_node = required(root, "PP_MESH")?;
    let mesh = PpMesh {
        attributes: mesh_node.attributes.clone(),
        r: numeric_payload(required(root, "PP_MESH/PP_R")?)?,
        rab: numeric_payload(required(root, "PP_MESH/PP_RAB")?)?,
    };

    let local = root.child("PP_LOCAL").map(numeric_payload).transpose()?;
    let rho_atom = root.child("PP_RHOATOM").map(numeric_payload).transpose()?;
    let nonlocal = root.child("PP_NONLOCAL").map(extract_nonlocal).transpose()?;

    Ok(PseudoPotential {
        version,
        info,
        header,
        mesh,
        local,
        rho_atom,
        nonlocal,
    })
}

fn extract_nonlocal(node: &PseudoNode) -> PostResult<PpNonlocal> {
    let mut nonlocal = PpNonlocal::default();
    for child in &node.children {
        if child.tag.contains("PP_BETA") {
            nonlocal.betas.push(tagged_array(child)?);
        } else if child.tag.contains("PP_DIJ") {
            nonlocal.dij = Some(numeric_payload(child)?);
        } else if child.tag.contains("PP_AUGMENTATION") {
            nonlocal.augmentation = Some(extract_augmentation(child)?);
        }
    }
    Ok(nonlocal)
}

fn extract_augmentation(node: &PseudoNode) -> PostResult<PpAugmentation> {
    let mut augmentation = PpAugmentation {
        attributes: node.attributes.clone(),
        ..PpAugmentation::default()
    };
    for child in &node.children {
        // PP_QIJL must be tested first: every PP_QIJL tag also contains PP_QIJ.
        if child.tag.contains("PP_QIJL") {
            augmentation.qijl.push(tagged_array(child)?);
        } else if child.tag.contains("PP_QIJ") {
            augmentation.qij.push(tagged_array(child)?);
        } else if child.tag == "PP_Q" {
            augmentation.q = Some(numeric_payload(child)?);
        }
    }
    Ok(augmentation)
}

fn tagged_array(node: &PseudoNode) -> PostResult<PpArray> {
    Ok(PpArray {
        tag: node.tag.clone(),
        attributes: node.attributes.clone(),
        values: numeric_payload(node)?,
    })
}

fn required<'a>(root: &'a PseudoNode, path: &str) -> PostResult<&'a PseudoNode> {
    root.find(path).ok_or_else(|| {
        PostError::format(
            "FORMAT.PSEUDO_MISSING_SECTION",
            format!("pseudopotential has no <{path}> section"),
        )
    })
}

/// Whitespace-separated reals of a node's text, checked against its
/// `size` attribute when one is present.
fn numeric_payload(node: &PseudoNode) -> PostResult<Vec<f64>> {
    let values = node
        .text()
        .split_whitespace()
        .map(|token| {
            parse_real(token).ok_or_else(|| {
                PostError::format(
                    "FORMAT.PSEUDO_NUMBER",
                    format!("<{}> holds non-numeric token '{}'", node.tag, token),
                )
            })
        })
        .collect::<PostResult<Vec<f64>>>()?;

    if let Some(size) = node.attribute("size") {
        let expected = size.trim().parse::<usize>().map_err(|_| {
            PostError::format(
                "FORMAT.PSEUDO_ARRAY_SIZE",
                format!("<{}> has non-integer size '{}'", node.tag, size),
            )
        })?;
        if expected != values.len() {
            return Err(PostError::format(
                "FORMAT.PSEUDO_ARRAY_SIZE",
                format!(
                    "<{}> declares size {} but holds {} values",
                    node.tag,
                    expected,
                    values.len()
                ),
            ));
        }
    }

    Ok(values)
}
