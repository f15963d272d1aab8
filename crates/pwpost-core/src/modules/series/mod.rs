//! Two-column `(x, y)` series, e.g. volume/energy pairs.

use crate::domain::{PostError, PostResult};
use crate::modules::serialization::{parse_real, read_text_artifact};
use std::path::Path;
use tracing::info;

/// Parses every non-blank line as exactly two numbers, in file order.
pub fn parse_series(source: &str) -> PostResult<Vec<(f64, f64)>> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_pair(index + 1, line))
        .collect()
}

pub fn read_series(path: &Path) -> PostResult<Vec<(f64, f64)>> {
    let source = read_text_artifact(path, "IO.SERIES_READ")?;
    let series = parse_series(&source)?;
    info!(path = %path.display(), points = series.len(), "read series");
    Ok(series)
}

pub fn split_columns(series: &[(f64, f64)]) -> (Vec<f64>, Vec<f64>) {
    series.iter().copied().unzip()
}

/// Point with the smallest `y`; the first one wins ties.
pub fn minimum(series: &[(f64, f64)]) -> Option<(f64, f64)> {
    series
        .iter()
        .copied()
        .reduce(|best, point| if point.1 < best.1 { point } else { best })
}

fn parse_pair(source_line: usize, line: &str) -> PostResult<(f64, f64)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [x, y] = tokens.as_slice() else {
        return Err(PostError::format(
            "FORMAT.SERIES_LINE",
            format!(
                "line {} has {} columns, expected 2",
                source_line,
                tokens.len()
            ),
        ));
    };
    Ok((number(source_line, x)?, number(source_line, y)?))
}

fn number(source_line: usize, token: &str) -> PostResult<f64> {
    parse_real(token).ok_or_else(|| {
        PostError::format(
            "FORMAT.SERIES_NUMBER",
            format!("line {source_line}: '{token}' is not a number"),
        )
    })
}
