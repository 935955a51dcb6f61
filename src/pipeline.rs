use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::correlation;
use crate::data::loader;
use crate::data::model::{Parameters, SpectrumRow};
use crate::data::Result;
use crate::spectrum;

/// Everything produced for one data directory.
#[derive(Debug, Clone, Serialize)]
pub struct SpectrumReport {
    pub directory: PathBuf,
    pub sites: usize,
    pub parameters: Parameters,
    pub rows: Vec<SpectrumRow>,
}

/// Discover, assemble and reduce one directory. Any error aborts the whole
/// directory; there is no partial report.
pub fn analyse_directory(dir: &Path) -> Result<SpectrumReport> {
    let files = loader::discover(dir)?;
    let parameters = match &files.parameters {
        Some(path) => loader::read_parameters(path)?,
        None => Parameters::new(),
    };

    let dataset = correlation::assemble_files(&files)?;
    let rows = spectrum::spectrum(&dataset);
    info!(
        "{}: {} sites, {} parameters",
        dir.display(),
        dataset.sites(),
        parameters.len()
    );

    Ok(SpectrumReport {
        directory: dir.to_path_buf(),
        sites: dataset.sites(),
        parameters,
        rows,
    })
}
