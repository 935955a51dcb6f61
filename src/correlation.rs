use std::path::Path;

use log::{debug, info};
use num_complex::Complex64;

use crate::data::loader::{self, DataFiles};
use crate::data::model::{
    ConnectedCorrelationSet, CorrelationRecord, CorrelationTensor, MagnetizationTable, AXIS_PAIRS,
};
use crate::data::{Result, SpectrumError};

// ---------------------------------------------------------------------------
// Correlation assembler
// ---------------------------------------------------------------------------

/// Discover and assemble the connected correlators of one data directory.
pub fn assemble(dir: &Path) -> Result<ConnectedCorrelationSet> {
    let files = loader::discover(dir)?;
    assemble_files(&files)
}

/// Assemble from an already discovered file set.
///
/// The magnetization file fixes `N`; every distance `0..N` must then be
/// covered by exactly one correlation file.
pub fn assemble_files(files: &DataFiles) -> Result<ConnectedCorrelationSet> {
    let magnetization = read_magnetization(&files.magnetization)?;
    let sites = magnetization.sites();
    let mut builder = ConnectedCorrelationSet::builder(sites);

    for path in &files.correlations {
        let record = loader::read_correlation_file(path)?;
        let tensor = connect(&record, &magnetization)?;
        debug!("{}: distance {}", path.display(), record.distance());
        builder.insert(record.distance(), tensor)?;
    }

    let set = builder.finish()?;
    info!(
        "assembled {} distances from {} correlation files",
        set.sites(),
        files.correlations.len()
    );
    Ok(set)
}

pub fn read_magnetization(path: &Path) -> Result<MagnetizationTable> {
    let table = loader::parse_table::<Complex64>(path)?;
    MagnetizationTable::new(path, table)
}

/// Subtract the disconnected part from one correlation file:
/// `connected_ab[i] = corr_ab[i] - m_a[r] * m_b[i]`, with `r` the file's
/// distance.
pub fn connect(
    record: &CorrelationRecord,
    magnetization: &MagnetizationTable,
) -> Result<CorrelationTensor> {
    let sites = magnetization.sites();
    let table = &record.table;

    if table.ncols() != AXIS_PAIRS.len() {
        return Err(SpectrumError::DimensionMismatch {
            path: record.path.clone(),
            what: "correlation columns",
            expected: AXIS_PAIRS.len(),
            actual: table.ncols(),
        });
    }
    if table.nrows() != sites {
        return Err(SpectrumError::DimensionMismatch {
            path: record.path.clone(),
            what: "rows (one per magnetization site)",
            expected: sites,
            actual: table.nrows(),
        });
    }

    let r = record.distance();
    if r >= sites {
        return Err(SpectrumError::out_of_range("distance", r, sites));
    }

    let columns: Vec<&[Complex64]> = table.iter().map(|(_, values)| values).collect();
    let components = std::array::from_fn(|c| {
        let pair = AXIS_PAIRS[c];
        let m_a = magnetization.component(pair.a)[r];
        columns[c]
            .iter()
            .zip(magnetization.component(pair.b))
            .map(|(&corr, &m_b)| corr - m_a * m_b)
            .collect()
    });

    Ok(CorrelationTensor::new(components))
}
