use super::model::FileHeader;
use super::{HEADER_PLACEHOLDER_LINE, VALUES_PER_LINE};
use crate::domain::{DenseField, PostError, PostResult};
use crate::modules::serialization::{format_scientific, write_text_artifact};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

const VALUE_PRECISION: usize = 9;
const HEADER_PRECISION: usize = 6;

pub fn render_header(header: &FileHeader) -> String {
    let [nr1, nr2, nr3] = header.grid;
    let [nrs1, nrs2, nrs3] = header.smooth_grid;

    let mut text = format!("# {}\n", header.prefix);
    text.push_str(&format!(
        "# {nr1:8} {nr2:8} {nr3:8} {nrs1:8} {nrs2:8} {nrs3:8} {:8} {:8}\n",
        header.nat(),
        header.ntyp()
    ));
    let celldm = header
        .celldm
        .map(|parameter| format_scientific(parameter, HEADER_PRECISION));
    text.push_str(&format!("# {:6}    {}\n", header.ibrav, celldm.join("  ")));
    text.push_str(HEADER_PLACEHOLDER_LINE);
    text.push('\n');

    for (index, species) in header.species.iter().enumerate() {
        text.push_str(&format!("# {:4} {}\n", index + 1, species));
    }
    for (index, position) in header.positions.iter().enumerate() {
        let [x, y, z] = position.coords.map(|value| format_scientific(value, HEADER_PRECISION));
        text.push_str(&format!(
            "# {:4}   {x} {y} {z}  {}\n",
            index + 1,
            position.species
        ));
    }
    text
}

/// Header followed by the field values, first axis fastest, five values
/// per line; the last line is terminated even when it holds fewer.
pub fn render_field_dump(header: &FileHeader, field: &DenseField) -> PostResult<String> {
    let dims = field.shape().dims();
    if header.grid != dims {
        return Err(PostError::format(
            "FORMAT.DUMP_HEADER_GRID",
            format!(
                "header grid {:?} does not match field grid {}",
                header.grid,
                field.shape()
            ),
        ));
    }

    let mut text = render_header(header);
    for (count, value) in field.values().iter().enumerate() {
        let _ = write!(text, "  {}", format_scientific(*value, VALUE_PRECISION));
        if (count + 1) % VALUES_PER_LINE == 0 {
            text.push('\n');
        }
    }
    if field.values().len() % VALUES_PER_LINE != 0 {
        text.push('\n');
    }
    Ok(text)
}

pub fn write_field_dump(path: &Path, header: &FileHeader, field: &DenseField) -> PostResult<()> {
    let text = render_field_dump(header, field)?;
    write_text_artifact(path, &text)?;
    info!(
        path = %path.display(),
        grid = %field.shape(),
        values = field.values().len(),
        "wrote field dump"
    );
    Ok(())
}
