use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between reading a data directory and
/// producing a spectrum. Each variant names the offending file or index.
#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed literal, header, or row shape.
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        /// 1-based line number in the source file (0 when not line-bound).
        line: usize,
        message: String,
    },

    #[error("{}: file name does not end in '-r<distance>.out'", path.display())]
    FilenamePattern { path: PathBuf },

    #[error("no file matching '{pattern}*' in {}", dir.display())]
    NotFound { dir: PathBuf, pattern: String },

    #[error(
        "{} files matching '{pattern}*' in {}: {}",
        candidates.len(),
        dir.display(),
        join_paths(candidates)
    )]
    AmbiguousInput {
        dir: PathBuf,
        pattern: String,
        candidates: Vec<PathBuf>,
    },

    #[error(
        "incomplete correlation data for {sites} sites: \
         missing distances {missing:?}, duplicated distances {duplicated:?}"
    )]
    IncompleteData {
        sites: usize,
        missing: Vec<usize>,
        duplicated: Vec<usize>,
    },

    #[error("{}: expected {expected} {what}, found {actual}", path.display())]
    DimensionMismatch {
        path: PathBuf,
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{quantity} {index} out of range [0, {bound})")]
    OutOfRange {
        quantity: &'static str,
        index: usize,
        bound: usize,
    },

    #[error("invalid table: {0}")]
    InvalidTable(String),
}

impl SpectrumError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn out_of_range(quantity: &'static str, index: usize, bound: usize) -> Self {
        Self::OutOfRange {
            quantity,
            index,
            bound,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, SpectrumError>;
