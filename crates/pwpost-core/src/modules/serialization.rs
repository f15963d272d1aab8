use crate::domain::{PostError, PostResult};
use std::fs;
use std::path::Path;

/// Formats `value` in upper-case scientific notation with `precision`
/// fractional digits and a signed exponent of at least two digits, e.g.
/// `format_scientific(12.5, 3) == "1.250E+01"`.
pub fn format_scientific(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "NAN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() { "-INF" } else { "INF" }.to_string();
    }

    let rendered = format!("{value:.precision$E}");
    let Some((mantissa, exponent)) = rendered.split_once('E') else {
        return rendered;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}E{sign}{digits:0>2}")
}

/// Parses a real number, also accepting Fortran `D`/`d` exponent markers.
pub fn parse_real(token: &str) -> Option<f64> {
    token
        .parse::<f64>()
        .ok()
        .or_else(|| token.replace(['D', 'd'], "E").parse::<f64>().ok())
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> PostResult<()> {
    fs::write(path, normalize_text_artifact(content)).map_err(|source| {
        PostError::io(
            "IO.TEXT_WRITE",
            format!("failed to write '{}': {}", path.display(), source),
        )
    })
}

pub fn read_text_artifact(path: &Path, placeholder: &'static str) -> PostResult<String> {
    fs::read_to_string(path).map_err(|source| {
        PostError::io(
            placeholder,
            format!("failed to read '{}': {}", path.display(), source),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{
        format_scientific, normalize_text_artifact, parse_real, read_text_artifact,
        write_text_artifact,
    };
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scientific_notation_uses_signed_two_digit_exponents() {
        assert_eq!(format_scientific(1.0, 9), "1.000000000E+00");
        assert_eq!(format_scientific(-0.00123, 9), "-1.230000000E-03");
        assert_eq!(format_scientific(12.5, 6), "1.250000E+01");
        assert_eq!(format_scientific(0.0, 6), "0.000000E+00");
        assert_eq!(format_scientific(6.02e123, 2), "6.02E+123");
        assert_eq!(format_scientific(f64::NEG_INFINITY, 3), "-INF");
    }

    #[test]
    fn fortran_exponents_are_accepted() {
        assert_eq!(parse_real("1.5D-02"), Some(0.015));
        assert_eq!(parse_real("-2.0d+01"), Some(-20.0));
        assert_eq!(parse_real("3.25"), Some(3.25));
        assert_eq!(parse_real("abc"), None);
    }

    #[test]
    fn normalize_text_artifact_uses_canonical_line_endings() {
        let normalized = normalize_text_artifact("alpha\r\nbeta\rgamma");
        assert_eq!(normalized, "alpha\nbeta\ngamma\n");
    }

    #[test]
    fn repeated_text_writes_produce_identical_bytes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("artifact.dat");
        let input = "line 1\r\nline 2\rline 3";

        write_text_artifact(&path, input).expect("first write should succeed");
        let first = fs::read(&path).expect("artifact should be readable");

        write_text_artifact(&path, input).expect("second write should succeed");
        let second = fs::read(&path).expect("artifact should be readable");

        assert_eq!(first, second);
        assert_eq!(first, b"line 1\nline 2\nline 3\n");
    }

    #[test]
    fn missing_files_surface_as_io_errors() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = read_text_artifact(&temp.path().join("absent.dat"), "IO.TEST_READ")
            .expect_err("file does not exist");
        assert_eq!(error.placeholder(), "IO.TEST_READ");
        assert_eq!(error.exit_code(), 4);
    }
}
