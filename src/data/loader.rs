use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use num_complex::Complex64;

use super::error::{Result, SpectrumError};
use super::model::{ColumnTable, CorrelationFileName, CorrelationRecord, Parameters};

/// File name prefix of per-distance correlation files.
pub const CORRELATION_PREFIX: &str = "corr";
/// File name prefix of the magnetization file.
pub const MAGNETIZATION_PREFIX: &str = "mag";
/// File name suffix of the optional parameter file.
pub const PARAMETER_SUFFIX: &str = ".in";

// ---------------------------------------------------------------------------
// Scalar element types
// ---------------------------------------------------------------------------

/// Element type of a [`ColumnTable`]: how one whitespace-free token is read.
pub trait Scalar: Copy + Send + Sync + 'static {
    /// Human-readable type name used in error messages.
    const KIND: &'static str;

    fn parse_token(token: &str) -> Option<Self>;

    /// Inverse of `parse_token`.
    fn format_token(&self) -> String;
}

impl Scalar for f64 {
    const KIND: &'static str = "real";

    fn parse_token(token: &str) -> Option<Self> {
        token.parse().ok()
    }

    fn format_token(&self) -> String {
        self.to_string()
    }
}

impl Scalar for i64 {
    const KIND: &'static str = "integer";

    fn parse_token(token: &str) -> Option<Self> {
        token.parse().ok()
    }

    fn format_token(&self) -> String {
        self.to_string()
    }
}

impl Scalar for Complex64 {
    const KIND: &'static str = "complex";

    fn parse_token(token: &str) -> Option<Self> {
        parse_complex(token)
    }

    fn format_token(&self) -> String {
        format!("({},{})", self.re, self.im)
    }
}

/// Parse a `(re,im)` literal. Anything else, bare reals included, is `None`.
pub fn parse_complex(token: &str) -> Option<Complex64> {
    let inner = token.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (re, im) = inner.split_once(',')?;
    Some(Complex64::new(re.trim().parse().ok()?, im.trim().parse().ok()?))
}

// ---------------------------------------------------------------------------
// Table parser
// ---------------------------------------------------------------------------

/// Read a headered, whitespace-delimited output file:
///
/// ```text
///          XX Corr.    XY Corr.   ...
///   1      (a,b)       (c,d)      ...
///   2      ...
/// ```
///
/// Header names are split over two tokens and re-joined; the first token
/// of each data row is a 1-based index and is dropped.
pub fn parse_table<T: Scalar>(path: &Path) -> Result<ColumnTable<T>> {
    let text = std::fs::read_to_string(path).map_err(|e| SpectrumError::io(path, e))?;
    let table = parse_table_str(&text, path)?;
    debug!(
        "parsed {}: {} columns x {} rows ({})",
        path.display(),
        table.ncols(),
        table.nrows(),
        T::KIND
    );
    Ok(table)
}

/// Parse table text already in memory. `source` only labels errors.
pub fn parse_table_str<T: Scalar>(text: &str, source: &Path) -> Result<ColumnTable<T>> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let (header_line, header) = lines
        .next()
        .ok_or_else(|| SpectrumError::parse(source, 0, "missing header line"))?;
    let names = header_names(header)
        .map_err(|message| SpectrumError::parse(source, header_line, message))?;
    let ncol = names.len();

    let mut columns: Vec<Vec<T>> = vec![Vec::new(); ncol];
    for (line_no, line) in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != ncol + 1 {
            return Err(SpectrumError::parse(
                source,
                line_no,
                format!(
                    "expected index plus {ncol} values, found {} tokens",
                    tokens.len()
                ),
            ));
        }
        if tokens[0].parse::<i64>().is_err() {
            return Err(SpectrumError::parse(
                source,
                line_no,
                format!("row index '{}' is not an integer", tokens[0]),
            ));
        }
        for (column, token) in columns.iter_mut().zip(&tokens[1..]) {
            let value = T::parse_token(token).ok_or_else(|| {
                SpectrumError::parse(
                    source,
                    line_no,
                    format!("'{token}' is not a {} literal", T::KIND),
                )
            })?;
            column.push(value);
        }
    }

    ColumnTable::from_columns(names.into_iter().zip(columns).collect()).map_err(|e| match e {
        SpectrumError::InvalidTable(message) => SpectrumError::parse(source, header_line, message),
        other => other,
    })
}

/// Pair up header tokens: `"XX" "Corr."` becomes `XXCorr`.
fn header_names(header: &str) -> std::result::Result<Vec<String>, String> {
    let tokens: Vec<&str> = header.split_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(format!(
            "header has {} tokens, expected an even number",
            tokens.len()
        ));
    }
    Ok(tokens
        .chunks_exact(2)
        .map(|pair| format!("{}{}", pair[0], pair[1]).trim_end_matches('.').to_string())
        .collect())
}

// ---------------------------------------------------------------------------
// Correlation files
// ---------------------------------------------------------------------------

/// Decode `<base>-r<n>.out` into the base name and the 0-based distance `n - 1`.
pub fn parse_correlation_file_name(path: &Path) -> Result<CorrelationFileName> {
    let pattern_error = || SpectrumError::FilenamePattern {
        path: path.to_path_buf(),
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(pattern_error)?;
    let stem = file_name.strip_suffix(".out").ok_or_else(pattern_error)?;
    let (base_name, digits) = stem.rsplit_once("-r").ok_or_else(pattern_error)?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(pattern_error());
    }
    let one_based: usize = digits.parse().map_err(|_| pattern_error())?;
    let distance = one_based.checked_sub(1).ok_or_else(pattern_error)?;

    Ok(CorrelationFileName {
        base_name: base_name.to_string(),
        distance,
    })
}

/// Parse one correlation file and attach the distance from its name.
pub fn read_correlation_file(path: &Path) -> Result<CorrelationRecord> {
    let name = parse_correlation_file_name(path)?;
    let table = parse_table::<Complex64>(path)?;
    Ok(CorrelationRecord {
        path: path.to_path_buf(),
        name,
        table,
    })
}

// ---------------------------------------------------------------------------
// Directory discovery
// ---------------------------------------------------------------------------

/// Input files found in one data directory.
#[derive(Debug, Clone)]
pub struct DataFiles {
    pub magnetization: PathBuf,
    /// Sorted by file name.
    pub correlations: Vec<PathBuf>,
    pub parameters: Option<PathBuf>,
}

/// Locate the magnetization, correlation and parameter files in `dir`.
pub fn discover(dir: &Path) -> Result<DataFiles> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| SpectrumError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()).map_err(|e| SpectrumError::io(dir, e)))
        .collect::<Result<Vec<_>>>()?;
    files.retain(|p| p.is_file());
    files.sort();

    let mut magnetization = files_matching(&files, |n| n.starts_with(MAGNETIZATION_PREFIX));
    let magnetization = match magnetization.len() {
        0 => {
            return Err(SpectrumError::NotFound {
                dir: dir.to_path_buf(),
                pattern: MAGNETIZATION_PREFIX.to_string(),
            })
        }
        1 => magnetization.remove(0),
        _ => {
            return Err(SpectrumError::AmbiguousInput {
                dir: dir.to_path_buf(),
                pattern: MAGNETIZATION_PREFIX.to_string(),
                candidates: magnetization,
            })
        }
    };

    let correlations = files_matching(&files, |n| n.starts_with(CORRELATION_PREFIX));

    let mut parameter_files = files_matching(&files, |n| n.ends_with(PARAMETER_SUFFIX));
    let parameters = match parameter_files.len() {
        0 => None,
        1 => Some(parameter_files.remove(0)),
        n => {
            warn!(
                "{}: {n} parameter files found, ignoring all of them",
                dir.display()
            );
            None
        }
    };

    debug!(
        "{}: magnetization {}, {} correlation files",
        dir.display(),
        magnetization.display(),
        correlations.len()
    );

    Ok(DataFiles {
        magnetization,
        correlations,
        parameters,
    })
}

fn files_matching(files: &[PathBuf], pred: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(&pred))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Parameter file
// ---------------------------------------------------------------------------

/// Keys that describe the run setup rather than numeric parameters.
const SKIPPED_PARAMETERS: [&str; 2] = ["sweepfile", "bc"];

/// Read `key=value` lines into numeric parameters.
pub fn read_parameters(path: &Path) -> Result<Parameters> {
    let text = std::fs::read_to_string(path).map_err(|e| SpectrumError::io(path, e))?;
    parse_parameters_str(&text, path)
}

pub fn parse_parameters_str(text: &str, source: &Path) -> Result<Parameters> {
    let mut parameters = Parameters::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| {
            SpectrumError::parse(source, i + 1, format!("'{line}' is not key=value"))
        })?;
        let key = key.trim();
        if SKIPPED_PARAMETERS.contains(&key) {
            continue;
        }
        let value: f64 = value.trim().parse().map_err(|_| {
            SpectrumError::parse(source, i + 1, format!("value of '{key}' is not a number"))
        })?;
        parameters.insert(key.to_string(), value);
    }
    Ok(parameters)
}

// ---------------------------------------------------------------------------
// Table writer
// ---------------------------------------------------------------------------

/// Write a table in the format [`parse_table`] reads back.
pub fn write_table<T: Scalar>(path: &Path, table: &ColumnTable<T>) -> Result<()> {
    let mut out = Vec::new();
    format_table(&mut out, table).map_err(|e| SpectrumError::io(path, e))?;
    std::fs::write(path, out).map_err(|e| SpectrumError::io(path, e))
}

pub fn format_table<T: Scalar, W: Write>(
    out: &mut W,
    table: &ColumnTable<T>,
) -> std::io::Result<()> {
    write!(out, "{:>8}", "")?;
    for name in table.names() {
        let (head, tail) = split_name(name);
        write!(out, " {head:>12} {tail:<12}")?;
    }
    writeln!(out)?;

    for row in 0..table.nrows() {
        write!(out, "{:>8}", row + 1)?;
        for (_, values) in table.iter() {
            write!(out, " {:>25}", values[row].format_token())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Split a column name into the two header fragments the parser re-joins.
fn split_name(name: &str) -> (&str, String) {
    let mid = name
        .char_indices()
        .map(|(i, _)| i)
        .nth(name.chars().count().div_ceil(2))
        .unwrap_or(name.len());
    let (head, tail) = name.split_at(mid);
    (head, format!("{tail}."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> &'static Path {
        Path::new("test.out")
    }

    #[test]
    fn complex_literal_is_exact() {
        assert_eq!(parse_complex("(3.5,-2.25)"), Some(Complex64::new(3.5, -2.25)));
        assert_eq!(parse_complex(" (1e-3, 2) "), Some(Complex64::new(1e-3, 2.0)));
    }

    #[test]
    fn malformed_complex_literals_are_rejected() {
        for token in ["3.5", "(3.5)", "(3.5,-2.25", "3.5,-2.25)", "(a,b)", "(1,2,3)"] {
            assert_eq!(parse_complex(token), None, "{token}");
        }
    }

    #[test]
    fn header_fragments_are_joined_and_dots_stripped() {
        let text = "   XX Corr.   XY Corr.\n1 (1,0) (2,0)\n2 (3,0) (4,0)\n";
        let table: ColumnTable<Complex64> = parse_table_str(text, src()).unwrap();
        assert_eq!(table.names(), ["XXCorr", "XYCorr"]);
        assert_eq!(table.nrows(), 2);
        assert_eq!(table.column("XYCorr").unwrap()[1], Complex64::new(4.0, 0.0));
    }

    #[test]
    fn shape_follows_header_and_rows() {
        let text = "a b. c d. e f.\n1 1.0 2.0 3.0\n2 4.0 5.0 6.0\n3 7 8 9\n4 0 0 0\n";
        let table: ColumnTable<f64> = parse_table_str(text, src()).unwrap();
        assert_eq!(table.ncols(), 3);
        assert_eq!(table.nrows(), 4);
        assert!(table.iter().all(|(_, c)| c.len() == 4));
        assert_eq!(table.names(), ["ab", "cd", "ef"]);
    }

    #[test]
    fn blank_lines_between_rows_are_skipped() {
        let text = ".a b. c d.\n1 (1,0) (2,0)\n\n2 (3,0) (4,0)\n";
        let table: ColumnTable<Complex64> = parse_table_str(text, src()).unwrap();
        // Only trailing dots are stripped.
        assert_eq!(table.names(), [".ab", "cd"]);
        assert_eq!(table.nrows(), 2);
        assert_eq!(table.column("cd").unwrap()[1], Complex64::new(4.0, 0.0));
    }

    #[test]
    fn integer_tables_parse() {
        let text = "n um\n1 10\n2 -3\n";
        let table: ColumnTable<i64> = parse_table_str(text, src()).unwrap();
        assert_eq!(table.column("num"), Some(&[10, -3][..]));
    }

    #[test]
    fn odd_header_is_a_parse_error() {
        let err = parse_table_str::<f64>("a b c\n1 2\n", src()).unwrap_err();
        assert!(matches!(err, SpectrumError::Parse { line: 1, .. }));
    }

    #[test]
    fn short_row_is_a_parse_error() {
        let err = parse_table_str::<f64>("a b c d\n1 2 3\n2 4\n", src()).unwrap_err();
        assert!(matches!(err, SpectrumError::Parse { line: 3, .. }));
    }

    #[test]
    fn bad_token_names_line_and_token() {
        let err = parse_table_str::<Complex64>("a b\n1 (1,0)\n2 (1;0)\n", src()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(":3:"), "{msg}");
        assert!(msg.contains("(1;0)"), "{msg}");
    }

    #[test]
    fn non_integer_row_index_is_rejected() {
        let err = parse_table_str::<f64>("a b\nx 1.0\n", src()).unwrap_err();
        assert!(matches!(err, SpectrumError::Parse { line: 2, .. }));
    }

    #[test]
    fn empty_file_is_a_parse_error() {
        assert!(parse_table_str::<f64>("\n  \n", src()).is_err());
    }

    #[test]
    fn duplicate_names_are_a_parse_error() {
        let err = parse_table_str::<f64>("a b a b\n1 1 2\n", src()).unwrap_err();
        assert!(matches!(err, SpectrumError::Parse { .. }));
    }

    #[test]
    fn distance_is_decoded_to_zero_based() {
        let name = parse_correlation_file_name(Path::new("data/corr-xy-r4.out")).unwrap();
        assert_eq!(name.distance, 3);
        assert_eq!(name.base_name, "corr-xy");

        let name = parse_correlation_file_name(Path::new("corr-r1.out")).unwrap();
        assert_eq!(name.distance, 0);
    }

    #[test]
    fn bad_file_names_are_rejected() {
        for name in ["corr-xy.out", "corr-r4.dat", "corr-r.out", "corr-r0.out", "corr-r4x.out"] {
            let err = parse_correlation_file_name(Path::new(name)).unwrap_err();
            assert!(matches!(err, SpectrumError::FilenamePattern { .. }), "{name}");
        }
    }

    #[test]
    fn discover_sorts_correlations_and_finds_parameters() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["mag-x.out", "corr-x-r2.out", "corr-x-r1.out", "notes.txt", "run.in"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("corr-dir")).unwrap();
        let files = discover(dir.path()).unwrap();
        assert_eq!(files.magnetization, dir.path().join("mag-x.out"));
        assert_eq!(
            files.correlations,
            [dir.path().join("corr-x-r1.out"), dir.path().join("corr-x-r2.out")]
        );
        assert_eq!(files.parameters, Some(dir.path().join("run.in")));
    }

    #[test]
    fn several_parameter_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["mag-x.out", "a.in", "b.in"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let files = discover(dir.path()).unwrap();
        assert!(files.parameters.is_none());
        assert!(files.correlations.is_empty());
    }

    #[test]
    fn parameters_skip_setup_keys() {
        let text = "L=12\nsweepfile=run.sweep\n\nbc=open\nJ = -1.5\n";
        let params = parse_parameters_str(text, src()).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params["L"], 12.0);
        assert_eq!(params["J"], -1.5);
    }

    #[test]
    fn malformed_parameter_line_is_rejected() {
        let err = parse_parameters_str("L=12\nJ\n", src()).unwrap_err();
        assert!(matches!(err, SpectrumError::Parse { line: 2, .. }));
    }

    #[test]
    fn written_tables_parse_back() {
        let table = ColumnTable::from_columns(vec![
            ("XXCorr".to_string(), vec![Complex64::new(0.1, -2.5), Complex64::new(3.0, 0.0)]),
            ("M".to_string(), vec![Complex64::new(1e-12, 7.25), Complex64::new(-0.0, 1.0)]),
        ])
        .unwrap();
        let mut out = Vec::new();
        format_table(&mut out, &table).unwrap();
        let text = String::from_utf8(out).unwrap();
        let parsed: ColumnTable<Complex64> = parse_table_str(&text, src()).unwrap();
        assert_eq!(parsed, table);
    }
}
