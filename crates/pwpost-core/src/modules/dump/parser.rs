use super::model::{AtomicPosition, FieldDump, FileHeader};
use crate::domain::{DenseField, GridShape, PostError, PostResult};
use crate::modules::serialization::{parse_real, read_text_artifact};
use std::path::Path;
use tracing::{debug, info};

/// Index of the first species line among the header lines.
const SPECIES_LINE: usize = 4;

#[derive(Debug)]
struct HeaderLine<'a> {
    source_line: usize,
    raw: &'a str,
    tokens: Vec<&'a str>,
}

#[derive(Debug)]
struct DumpLayout<'a> {
    header: Vec<HeaderLine<'a>>,
    values: Vec<f64>,
}

pub fn parse_field_dump(source: &str) -> PostResult<FieldDump> {
    let layout = split_layout(source)?;
    let header = parse_header(&layout.header)?;
    let shape = GridShape::from_dims(header.grid)?;
    let field = fold_values(shape, layout.values)?;
    Ok(FieldDump { header, field })
}

/// Reads only the values, taking the grid from the second header line and
/// ignoring the rest of the header.
pub fn parse_field(source: &str) -> PostResult<DenseField> {
    let layout = split_layout(source)?;
    let shape = header_grid(&layout.header)?;
    fold_values(shape, layout.values)
}

pub fn read_field_dump(path: &Path) -> PostResult<FieldDump> {
    let source = read_text_artifact(path, "IO.DUMP_READ")?;
    let dump = parse_field_dump(&source)?;
    info!(
        path = %path.display(),
        prefix = %dump.header.prefix,
        grid = %dump.field.shape(),
        "read field dump"
    );
    Ok(dump)
}

pub fn read_field(path: &Path) -> PostResult<DenseField> {
    let source = read_text_artifact(path, "IO.DUMP_READ")?;
    let field = parse_field(&source)?;
    info!(path = %path.display(), grid = %field.shape(), "read field values");
    Ok(field)
}

fn split_layout(source: &str) -> PostResult<DumpLayout<'_>> {
    let mut header = Vec::new();
    let mut values = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let source_line = index + 1;
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            continue;
        };

        if *first == "#" {
            if !values.is_empty() {
                return Err(PostError::format(
                    "FORMAT.DUMP_LAYOUT",
                    format!("header line {source_line} follows field values"),
                ));
            }
            header.push(HeaderLine {
                source_line,
                raw,
                tokens,
            });
            continue;
        }

        for token in tokens {
            let value = parse_real(token).ok_or_else(|| {
                PostError::format(
                    "FORMAT.DUMP_NUMBER",
                    format!("line {source_line}: '{token}' is not a number"),
                )
            })?;
            values.push(value);
        }
    }

    debug!(
        header_lines = header.len(),
        values = values.len(),
        "split field dump"
    );
    Ok(DumpLayout { header, values })
}

fn header_grid(header: &[HeaderLine<'_>]) -> PostResult<GridShape> {
    let line = header.get(1).ok_or_else(|| {
        PostError::missing_data(
            "MISSING.DUMP_GRID",
            "field dump has no grid line before its values",
        )
    })?;
    let dims = [
        integer_token(line, 1)?,
        integer_token(line, 2)?,
        integer_token(line, 3)?,
    ];
    GridShape::from_dims(dims)
}

fn parse_header(header: &[HeaderLine<'_>]) -> PostResult<FileHeader> {
    let grid = header_grid(header)?.dims();
    let prefix = header
        .first()
        .and_then(|line| line.raw.trim().strip_prefix('#'))
        .map(|prefix| prefix.trim().to_string())
        .unwrap_or_default();

    let counts = &header[1];
    let smooth_grid = [
        integer_token(counts, 4)?,
        integer_token(counts, 5)?,
        integer_token(counts, 6)?,
    ];
    let nat = integer_token(counts, 7)?;
    let ntyp = integer_token(counts, 8)?;

    let cell = header_line(header, 2)?;
    let ibrav = token(cell, 1)?.parse::<i32>().map_err(|_| malformed(cell, 1))?;
    let mut celldm = [0.0; 6];
    for (slot, parameter) in celldm.iter_mut().enumerate() {
        *parameter = real_token(cell, slot + 2)?;
    }

    let expected_lines = SPECIES_LINE + ntyp + nat;
    if header.len() < expected_lines {
        return Err(PostError::format(
            "FORMAT.DUMP_HEADER",
            format!(
                "header declares {} species and {} atoms but has only {} lines",
                ntyp,
                nat,
                header.len()
            ),
        ));
    }

    let species = header[SPECIES_LINE..SPECIES_LINE + ntyp]
        .iter()
        .map(|line| token(line, 2).map(str::to_string))
        .collect::<PostResult<Vec<_>>>()?;
    let positions = header[SPECIES_LINE + ntyp..expected_lines]
        .iter()
        .map(|line| -> PostResult<AtomicPosition> {
            Ok(AtomicPosition::new(
                token(line, 5)?,
                [real_token(line, 2)?, real_token(line, 3)?, real_token(line, 4)?],
            ))
        })
        .collect::<PostResult<Vec<_>>>()?;

    Ok(FileHeader {
        prefix,
        grid,
        smooth_grid,
        ibrav,
        celldm,
        species,
        positions,
    })
}

fn fold_values(shape: GridShape, values: Vec<f64>) -> PostResult<DenseField> {
    if values.len() != shape.len() {
        return Err(PostError::format(
            "FORMAT.DUMP_VALUE_COUNT",
            format!(
                "grid {} needs {} values, found {}",
                shape,
                shape.len(),
                values.len()
            ),
        ));
    }
    // File order and storage order agree: first axis fastest.
    DenseField::from_values(shape, values)
}

fn header_line<'h, 'a>(
    header: &'h [HeaderLine<'a>],
    index: usize,
) -> PostResult<&'h HeaderLine<'a>> {
    header.get(index).ok_or_else(|| {
        PostError::format(
            "FORMAT.DUMP_HEADER",
            format!("field dump header has no line {}", index + 1),
        )
    })
}

fn token<'a>(line: &HeaderLine<'a>, index: usize) -> PostResult<&'a str> {
    line.tokens
        .get(index)
        .copied()
        .ok_or_else(|| malformed(line, index))
}

fn integer_token(line: &HeaderLine<'_>, index: usize) -> PostResult<usize> {
    token(line, index)?
        .parse::<usize>()
        .map_err(|_| malformed(line, index))
}

fn real_token(line: &HeaderLine<'_>, index: usize) -> PostResult<f64> {
    parse_real(token(line, index)?).ok_or_else(|| malformed(line, index))
}

fn malformed(line: &HeaderLine<'_>, index: usize) -> PostError {
    PostError::format(
        "FORMAT.DUMP_HEADER",
        format!(
            "header line {} has no valid field {}: '{}'",
            line.source_line,
            index,
            line.raw.trim()
        ),
    )
}
